//! Configuration and persistence errors

use thiserror::Error;

/// Errors raised while loading configuration or persisted state
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = Error::Config("host must start with http://".into());
        assert_eq!(
            err.to_string(),
            "Configuration error: host must start with http://"
        );
    }

    #[test]
    fn json_error_converts() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = parse.into();
        assert!(err.to_string().starts_with("JSON error:"), "got: {err}");
    }

    #[test]
    fn io_error_keeps_variant_in_debug() {
        let err = Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let debug = format!("{err:?}");
        assert!(debug.contains("Io"), "got: {debug}");
    }
}
