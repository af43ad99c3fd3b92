//! Client construction settings
//!
//! Deserializable so a service can embed it in its own TOML config.

use std::time::Duration;

use serde::Deserialize;

/// Timeout applied when none is configured.
pub const DEFAULT_TIMEOUT_MS: u64 = 100_000;

/// Construction-time settings of an `ApiClient`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Prefix prepended verbatim to every call address.
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_empty_host_and_100s() {
        let config = ClientConfig::default();
        assert_eq!(config.host, "");
        assert_eq!(config.timeout(), Duration::from_secs(100));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"host":"https://api.test"}"#).unwrap();
        assert_eq!(config, ClientConfig::new("https://api.test"));

        let config: ClientConfig = serde_json::from_str(r#"{"timeout_ms":250}"#).unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(250));
    }
}
