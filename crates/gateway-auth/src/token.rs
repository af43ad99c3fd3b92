//! Refresh endpoint wire types
//!
//! The refresh call POSTs the current pair as JSON and expects the new pair
//! back. Keys are camelCase; PascalCase keys are accepted too since servers
//! built on .NET commonly emit them.

use serde::{Deserialize, Serialize};

/// An access/refresh token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Body sent to the refresh endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub access_token: String,
    pub refresh_token: String,
}

/// Body returned by the refresh endpoint.
///
/// `result` and `errors` are informational; a 2xx response is what marks the
/// refresh as successful. Missing tokens decode as empty strings.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    #[serde(default, alias = "Result")]
    pub result: bool,
    #[serde(default, alias = "AccessToken")]
    pub access_token: String,
    #[serde(default, alias = "RefreshToken")]
    pub refresh_token: String,
    #[serde(default, alias = "Errors", skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

impl RefreshResponse {
    pub fn into_pair(self) -> TokenPair {
        TokenPair {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
        }
    }
}
