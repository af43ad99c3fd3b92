//! Error types for credential and header operations

/// Errors raised while building the `Authorization` header.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("token provider failed: {0}")]
    TokenProvider(String),

    #[error("invalid authorization header value: {0}")]
    InvalidHeader(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
