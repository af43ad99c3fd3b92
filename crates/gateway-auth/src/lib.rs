//! Credential handling for the API gateway
//!
//! Holds the client's authentication mode and turns it into an
//! `Authorization` header for each outbound call. Four modes exist:
//! static bearer tokens (with optional refresh), a caller-supplied token
//! provider, basic credentials, and a literal custom header value.
//!
//! Call flow:
//! 1. The client snapshots its `Credentials` for the call
//! 2. `header::authorization_header()` decides what to send for the call's `Auth`
//! 3. On a refresh, `Credentials::refresh_request()` yields the body to POST
//! 4. `Credentials::apply_refresh()` stores the new pair and hands back the hook

pub mod credentials;
pub mod error;
pub mod header;
pub mod provider;
pub mod token;

pub use credentials::{AuthMode, BearerTokens, Credentials, RefreshHook};
pub use error::{Error, Result};
pub use header::{Auth, authorization_header};
pub use provider::TokenProvider;
pub use token::{RefreshRequest, RefreshResponse, TokenPair};
