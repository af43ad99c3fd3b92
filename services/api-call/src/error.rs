//! Service-specific error types

use thiserror::Error;

/// Command-line value errors, reported through clap. Startup failures
/// elsewhere go through `anyhow`.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("query parameter must be key=value, got: {0}")]
    InvalidQuery(String),

    #[error("--body is not valid JSON: {0}")]
    InvalidBody(String),
}
