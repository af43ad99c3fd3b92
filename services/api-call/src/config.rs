//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The Basic password is loaded from API_PASSWORD or password_file, never
//! stored in the TOML directly. API_ACCESS_TOKEN overrides the access token
//! from both the TOML and the token file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use common::Secret;
use gateway_client::{ClientConfig, Credentials, DEFAULT_TIMEOUT_MS};
use serde::Deserialize;
use tracing::info;

use crate::token_file;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Remote API settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthModeConfig {
    #[default]
    None,
    Bearer,
    Basic,
    Custom,
}

/// Credential settings
#[derive(Debug, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthModeConfig,
    #[serde(default)]
    pub access_token: Option<Secret<String>>,
    #[serde(default)]
    pub refresh_token: Option<Secret<String>>,
    #[serde(default)]
    pub refresh_endpoint: Option<String>,
    #[serde(default = "default_auto_refresh")]
    pub auto_refresh: bool,
    /// Where refreshed tokens are persisted and reloaded from.
    #[serde(default)]
    pub token_file: Option<PathBuf>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(skip)]
    pub password: Option<Secret<String>>,
    /// Path to a file containing the Basic password (alternative to API_PASSWORD)
    #[serde(default)]
    pub password_file: Option<PathBuf>,
    /// Literal `Authorization` value for custom mode
    #[serde(default)]
    pub header: Option<Secret<String>>,
}

/// Relay server settings
#[derive(Debug, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_auto_refresh() -> bool {
    true
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8089))
}

fn default_max_connections() -> usize {
    256
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment
    /// variables and the token file.
    ///
    /// Access token resolution order:
    /// 1. API_ACCESS_TOKEN env var
    /// 2. token_file contents
    /// 3. access_token in the TOML
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if !config.api.host.is_empty()
            && !config.api.host.starts_with("http://")
            && !config.api.host.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "api.host must start with http:// or https://, got: {}",
                config.api.host
            )));
        }

        if config.api.timeout_ms == 0 {
            return Err(common::Error::Config(
                "timeout_ms must be greater than 0".into(),
            ));
        }

        if config.relay.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if let Some(auth) = config.auth.as_mut() {
            auth.resolve_secrets()?;
            auth.validate()?;
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("api-call.toml")
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.api.host.clone()).with_timeout_ms(self.api.timeout_ms)
    }

    /// Credentials for the client. Refreshed tokens are written back to
    /// `token_file` when one is configured.
    pub fn credentials(&self) -> Credentials {
        let Some(auth) = &self.auth else {
            return Credentials::None;
        };
        match auth.mode {
            AuthModeConfig::None => Credentials::None,
            AuthModeConfig::Bearer => Credentials::bearer(
                expose_or_empty(&auth.access_token),
                expose_or_empty(&auth.refresh_token),
                auth.refresh_endpoint.clone().unwrap_or_default(),
                auth.auto_refresh,
                auth.token_file.clone().map(token_file::persist_hook),
            ),
            AuthModeConfig::Basic => Credentials::basic(
                auth.username.clone().unwrap_or_default(),
                expose_or_empty(&auth.password),
            ),
            AuthModeConfig::Custom => Credentials::custom_header(expose_or_empty(&auth.header)),
        }
    }
}

impl AuthConfig {
    fn resolve_secrets(&mut self) -> common::Result<()> {
        if let Some(path) = &self.token_file
            && let Some(stored) = token_file::load(path)?
        {
            info!(path = %path.display(), "using token pair from token file");
            self.access_token = Some(Secret::new(stored.access_token));
            self.refresh_token = Some(Secret::new(stored.refresh_token));
        }
        if let Ok(token) = std::env::var("API_ACCESS_TOKEN") {
            self.access_token = Some(Secret::new(token));
        }

        if let Ok(password) = std::env::var("API_PASSWORD") {
            self.password = Some(Secret::new(password));
        } else if let Some(ref password_file) = self.password_file {
            let password = std::fs::read_to_string(password_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read password_file {}: {e}",
                    password_file.display()
                ))
            })?;
            let password = password.trim_end_matches(['\r', '\n']).to_owned();
            if !password.is_empty() {
                self.password = Some(Secret::new(password));
            }
        }
        Ok(())
    }

    fn validate(&self) -> common::Result<()> {
        let missing = |field: &str| {
            common::Error::Config(format!(
                "auth.{field} is required for mode = \"{}\"",
                self.mode.label()
            ))
        };
        match self.mode {
            AuthModeConfig::None => {}
            AuthModeConfig::Bearer => {
                if self.auto_refresh && self.refresh_endpoint.as_deref().unwrap_or("").is_empty() {
                    return Err(missing("refresh_endpoint"));
                }
            }
            AuthModeConfig::Basic => {
                if self.username.as_deref().unwrap_or("").is_empty() {
                    return Err(missing("username"));
                }
                if self.password.is_none() {
                    return Err(missing("password (API_PASSWORD or password_file)"));
                }
            }
            AuthModeConfig::Custom => {
                if self.header.as_ref().is_none_or(Secret::is_empty) {
                    return Err(missing("header"));
                }
            }
        }
        Ok(())
    }
}

impl AuthModeConfig {
    pub fn label(&self) -> &'static str {
        match self {
            AuthModeConfig::None => "none",
            AuthModeConfig::Bearer => "bearer",
            AuthModeConfig::Basic => "basic",
            AuthModeConfig::Custom => "custom",
        }
    }
}

fn expose_or_empty(secret: &Option<Secret<String>>) -> String {
    secret
        .as_ref()
        .map(|s| s.expose().clone())
        .unwrap_or_default()
}
