//! `Authorization` header construction
//!
//! Per call, the caller states whether to authenticate and may pin an
//! explicit bearer token. A pinned token wins over every stored mode; this is
//! how the refresh-retry path forces the freshly refreshed token without
//! touching shared state.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::HeaderValue;
use tracing::debug;

use crate::credentials::Credentials;
use crate::error::{Error, Result};

/// Per-call authorization choice.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Auth {
    /// Send no `Authorization` header.
    #[default]
    Anonymous,
    /// Authenticate with the client's stored credentials.
    Stored,
    /// Send `Bearer <token>`. An empty token behaves like `Stored`.
    Token(String),
}

impl Auth {
    /// Build from the flag/token pair used by the verb entry points.
    pub fn from_flags(send_auth: bool, explicit_token: &str) -> Self {
        match (send_auth, explicit_token.is_empty()) {
            (false, _) => Auth::Anonymous,
            (true, true) => Auth::Stored,
            (true, false) => Auth::Token(explicit_token.to_owned()),
        }
    }

    pub fn sends_header(&self) -> bool {
        !matches!(self, Auth::Anonymous)
    }

    /// The caller-pinned token, ignoring an empty one.
    pub fn explicit_token(&self) -> Option<&str> {
        match self {
            Auth::Token(token) if !token.is_empty() => Some(token),
            _ => None,
        }
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Anonymous => f.write_str("Anonymous"),
            Auth::Stored => f.write_str("Stored"),
            Auth::Token(_) => f.write_str("Token([REDACTED])"),
        }
    }
}

/// Decide the `Authorization` value for one call.
///
/// Invokes the token provider when one is configured; its failure is
/// returned as `Error::TokenProvider`.
pub async fn authorization_header(
    credentials: &Credentials,
    auth: &Auth,
) -> Result<Option<HeaderValue>> {
    if !auth.sends_header() {
        return Ok(None);
    }

    if let Some(token) = auth.explicit_token() {
        return sensitive(format!("Bearer {token}")).map(Some);
    }

    let value = match credentials {
        Credentials::Basic { username, password } => {
            let raw = format!("{username}:{}", password.expose());
            format!("Basic {}", STANDARD.encode(raw.as_bytes()))
        }
        Credentials::CustomHeader(value) => value.expose().clone(),
        Credentials::Provider(provider) => {
            debug!(is_async = provider.is_async(), "fetching token from provider");
            format!("Bearer {}", provider.token().await?)
        }
        Credentials::Bearer(tokens) => format!("Bearer {}", tokens.access_token.expose()),
        // No mode configured: an empty stored token is still sent.
        Credentials::None => String::from("Bearer "),
    };

    sensitive(value).map(Some)
}

fn sensitive(value: String) -> Result<HeaderValue> {
    let mut header =
        HeaderValue::from_str(&value).map_err(|e| Error::InvalidHeader(e.to_string()))?;
    header.set_sensitive(true);
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::TokenProvider;

    fn header_str(value: Option<HeaderValue>) -> String {
        value.unwrap().to_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn anonymous_sends_nothing() {
        let creds = Credentials::bearer("T1", "R1", "/refresh", true, None);
        let header = authorization_header(&creds, &Auth::Anonymous).await.unwrap();
        assert!(header.is_none());
    }

    #[tokio::test]
    async fn explicit_token_overrides_every_mode() {
        let modes = [
            Credentials::None,
            Credentials::bearer("T1", "R1", "/refresh", true, None),
            Credentials::basic("alice", "pw"),
            Credentials::custom_header("MediaBrowser Client=\"x\""),
        ];
        for creds in &modes {
            let header = authorization_header(creds, &Auth::Token("forced".into()))
                .await
                .unwrap();
            assert_eq!(header_str(header), "Bearer forced", "mode {:?}", creds.mode());
        }
    }

    #[tokio::test]
    async fn empty_explicit_token_falls_back_to_stored() {
        let creds = Credentials::bearer("T1", "R1", "/refresh", true, None);
        let header = authorization_header(&creds, &Auth::Token(String::new()))
            .await
            .unwrap();
        assert_eq!(header_str(header), "Bearer T1");
    }

    #[tokio::test]
    async fn basic_encodes_username_and_password() {
        let creds = Credentials::basic("Aladdin", "open sesame");
        let header = authorization_header(&creds, &Auth::Stored).await.unwrap();
        assert_eq!(header_str(header), "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
    }

    #[tokio::test]
    async fn custom_header_is_sent_verbatim() {
        let value = r#"MediaBrowser Client="Jellyfin Web", Version="10.10.7""#;
        let creds = Credentials::custom_header(value);
        let header = authorization_header(&creds, &Auth::Stored).await.unwrap();
        assert_eq!(header_str(header), value);
    }

    #[tokio::test]
    async fn provider_token_is_used() {
        let sync = Credentials::Provider(TokenProvider::from_fn(|| {
            Ok::<_, Error>("sync-tok".to_string())
        }));
        let header = authorization_header(&sync, &Auth::Stored).await.unwrap();
        assert_eq!(header_str(header), "Bearer sync-tok");

        let async_provider = Credentials::Provider(TokenProvider::from_async_fn(|| async {
            Ok::<_, Error>("async-tok".to_string())
        }));
        let header = authorization_header(&async_provider, &Auth::Stored)
            .await
            .unwrap();
        assert_eq!(header_str(header), "Bearer async-tok");
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let creds = Credentials::Provider(TokenProvider::from_fn(|| {
            Err::<String, _>("expired session")
        }));
        let err = authorization_header(&creds, &Auth::Stored).await.unwrap_err();
        assert!(matches!(err, Error::TokenProvider(_)));
    }

    #[tokio::test]
    async fn static_mode_sends_possibly_empty_token() {
        let creds = Credentials::bearer("", "", "", false, None);
        let header = authorization_header(&creds, &Auth::Stored).await.unwrap();
        assert_eq!(header_str(header), "Bearer ");

        let header = authorization_header(&Credentials::None, &Auth::Stored)
            .await
            .unwrap();
        assert_eq!(header_str(header), "Bearer ");
    }

    #[tokio::test]
    async fn header_value_is_marked_sensitive() {
        let creds = Credentials::bearer("T1", "", "", false, None);
        let header = authorization_header(&creds, &Auth::Stored)
            .await
            .unwrap()
            .unwrap();
        assert!(header.is_sensitive());
    }

    #[tokio::test]
    async fn control_characters_are_rejected() {
        let creds = Credentials::custom_header("bad\nvalue");
        let err = authorization_header(&creds, &Auth::Stored).await.unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));
    }

    #[test]
    fn from_flags_maps_every_combination() {
        assert_eq!(Auth::from_flags(false, ""), Auth::Anonymous);
        assert_eq!(Auth::from_flags(false, "tok"), Auth::Anonymous);
        assert_eq!(Auth::from_flags(true, ""), Auth::Stored);
        assert_eq!(Auth::from_flags(true, "tok"), Auth::Token("tok".into()));
    }

    #[test]
    fn debug_redacts_pinned_token() {
        assert_eq!(format!("{:?}", Auth::Token("secret".into())), "Token([REDACTED])");
    }
}
