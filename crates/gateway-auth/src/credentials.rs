//! Credential state for one client
//!
//! Exactly one authentication mode governs header construction at a time.
//! Every setter replaces the whole mode, so a provider set after static
//! tokens fully supersedes them (and vice versa). The only internal mutation
//! is a successful refresh overwriting the stored pair.

use std::fmt;
use std::sync::Arc;

use common::Secret;

use crate::provider::TokenProvider;
use crate::token::{RefreshRequest, TokenPair};

/// Called with `(access_token, refresh_token)` after a successful refresh so
/// the caller can persist the new pair.
pub type RefreshHook = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Statically held bearer tokens plus the refresh configuration.
#[derive(Clone, Default)]
pub struct BearerTokens {
    pub access_token: Secret<String>,
    pub refresh_token: Secret<String>,
    pub refresh_endpoint: String,
    pub auto_refresh: bool,
    pub on_refreshed: Option<RefreshHook>,
}

impl fmt::Debug for BearerTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerTokens")
            .field("access_token", &self.access_token)
            .field("refresh_token", &self.refresh_token)
            .field("refresh_endpoint", &self.refresh_endpoint)
            .field("auto_refresh", &self.auto_refresh)
            .field("on_refreshed", &self.on_refreshed.is_some())
            .finish()
    }
}

/// The active authentication mode.
#[derive(Debug, Clone, Default)]
pub enum Credentials {
    #[default]
    None,
    Bearer(BearerTokens),
    Provider(TokenProvider),
    Basic {
        username: String,
        password: Secret<String>,
    },
    CustomHeader(Secret<String>),
}

/// Mode label for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    None,
    Bearer,
    Basic,
    CustomHeader,
}

impl AuthMode {
    pub fn label(&self) -> &'static str {
        match self {
            AuthMode::None => "none",
            AuthMode::Bearer => "bearer",
            AuthMode::Basic => "basic",
            AuthMode::CustomHeader => "custom_header",
        }
    }
}

impl Credentials {
    /// Static bearer tokens. `auto_refresh` arms refresh-on-unauthorized.
    pub fn bearer(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        refresh_endpoint: impl Into<String>,
        auto_refresh: bool,
        on_refreshed: Option<RefreshHook>,
    ) -> Self {
        Credentials::Bearer(BearerTokens {
            access_token: Secret::new(access_token.into()),
            refresh_token: Secret::new(refresh_token.into()),
            refresh_endpoint: refresh_endpoint.into(),
            auto_refresh,
            on_refreshed,
        })
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Basic {
            username: username.into(),
            password: Secret::new(password.into()),
        }
    }

    /// A literal `Authorization` value, sent verbatim (scheme included).
    pub fn custom_header(value: impl Into<String>) -> Self {
        Credentials::CustomHeader(Secret::new(value.into()))
    }

    pub fn mode(&self) -> AuthMode {
        match self {
            Credentials::None => AuthMode::None,
            Credentials::Bearer(_) | Credentials::Provider(_) => AuthMode::Bearer,
            Credentials::Basic { .. } => AuthMode::Basic,
            Credentials::CustomHeader(_) => AuthMode::CustomHeader,
        }
    }

    /// The stored static access token, empty in every other mode.
    pub fn access_token(&self) -> &str {
        match self {
            Credentials::Bearer(tokens) => tokens.access_token.expose(),
            _ => "",
        }
    }

    /// Whether an unauthorized result may be recovered by a refresh:
    /// static bearer mode, auto-refresh on, and a non-empty stored token.
    pub fn refresh_armed(&self) -> bool {
        match self {
            Credentials::Bearer(tokens) => tokens.auto_refresh && !tokens.access_token.is_empty(),
            _ => false,
        }
    }

    /// Endpoint and body for a refresh call, or `None` outside static bearer mode.
    pub fn refresh_request(&self) -> Option<(String, RefreshRequest)> {
        match self {
            Credentials::Bearer(tokens) => Some((
                tokens.refresh_endpoint.clone(),
                RefreshRequest {
                    access_token: tokens.access_token.expose().clone(),
                    refresh_token: tokens.refresh_token.expose().clone(),
                },
            )),
            _ => None,
        }
    }

    /// Overwrite the stored pair after a successful refresh.
    ///
    /// Returns false when the mode was replaced while the refresh was in
    /// flight; the new pair is then discarded.
    pub fn apply_refresh(&mut self, pair: &TokenPair) -> bool {
        match self {
            Credentials::Bearer(tokens) => {
                tokens.access_token = Secret::new(pair.access_token.clone());
                tokens.refresh_token = Secret::new(pair.refresh_token.clone());
                true
            }
            _ => false,
        }
    }

    /// The hook registered with the static tokens, if any.
    pub fn refresh_hook(&self) -> Option<RefreshHook> {
        match self {
            Credentials::Bearer(tokens) => tokens.on_refreshed.clone(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn default_is_none_mode() {
        let creds = Credentials::default();
        assert_eq!(creds.mode(), AuthMode::None);
        assert_eq!(creds.access_token(), "");
        assert!(!creds.refresh_armed());
        assert!(creds.refresh_request().is_none());
    }

    #[test]
    fn bearer_refresh_armed_requires_token_and_flag() {
        assert!(Credentials::bearer("T1", "R1", "/refresh", true, None).refresh_armed());
        assert!(!Credentials::bearer("T1", "R1", "/refresh", false, None).refresh_armed());
        assert!(!Credentials::bearer("", "R1", "/refresh", true, None).refresh_armed());
    }

    #[test]
    fn provider_mode_never_arms_refresh() {
        let creds = Credentials::Provider(TokenProvider::from_fn(|| {
            Ok::<_, crate::Error>("p".to_string())
        }));
        assert_eq!(creds.mode(), AuthMode::Bearer);
        assert_eq!(creds.access_token(), "");
        assert!(!creds.refresh_armed());
    }

    #[test]
    fn refresh_request_carries_current_pair() {
        let creds = Credentials::bearer("T1", "R1", "/auth/refresh", true, None);
        let (endpoint, body) = creds.refresh_request().unwrap();
        assert_eq!(endpoint, "/auth/refresh");
        assert_eq!(body.access_token, "T1");
        assert_eq!(body.refresh_token, "R1");
    }

    #[test]
    fn apply_refresh_overwrites_and_returns_hook() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let hook: RefreshHook = Arc::new(move |a: &str, r: &str| {
            *sink.lock().unwrap() = Some((a.to_string(), r.to_string()));
        });
        let mut creds = Credentials::bearer("T1", "R1", "/refresh", true, Some(hook));

        let pair = TokenPair {
            access_token: "T2".into(),
            refresh_token: "R2".into(),
        };
        assert!(creds.apply_refresh(&pair));
        assert_eq!(creds.access_token(), "T2");

        let hook = creds.refresh_hook().unwrap();

        hook(&pair.access_token, &pair.refresh_token);
        assert_eq!(
            seen.lock().unwrap().clone(),
            Some(("T2".to_string(), "R2".to_string()))
        );
    }

    #[test]
    fn apply_refresh_rejected_after_mode_switch() {
        let mut creds = Credentials::basic("alice", "secret");
        let pair = TokenPair {
            access_token: "T2".into(),
            refresh_token: "R2".into(),
        };
        assert!(!creds.apply_refresh(&pair));
        assert!(creds.refresh_hook().is_none());
        assert_eq!(creds.mode(), AuthMode::Basic);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let creds = Credentials::bearer("at_secret", "rt_secret", "/refresh", true, None);
        let debug = format!("{creds:?}");
        assert!(!debug.contains("at_secret"), "got: {debug}");
        assert!(!debug.contains("rt_secret"), "got: {debug}");

        let basic = format!("{:?}", Credentials::basic("alice", "pw123"));
        assert!(basic.contains("alice"));
        assert!(!basic.contains("pw123"));
    }
}
