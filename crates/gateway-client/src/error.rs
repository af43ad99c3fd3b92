//! Local failures of a call
//!
//! None of these reach the caller directly: the client converts every one of
//! them into a `server_unexpected_error` problem.

use gateway_auth::Error as AuthError;

/// Errors raised while building, sending or decoding a call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request body encoding failed: {0}")]
    Encode(String),

    #[error("response body decoding failed: {0}")]
    Decode(String),
}

/// Result alias for client internals.
pub type Result<T> = std::result::Result<T, Error>;
