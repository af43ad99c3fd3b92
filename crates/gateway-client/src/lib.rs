//! HTTP call gateway
//!
//! `ApiClient` issues GET/POST/PUT/PATCH/DELETE calls against a remote API
//! and returns every outcome as a `CallResult`: the decoded payload, or a
//! `ProblemDetails` describing what went wrong. Transport failures, decode
//! failures and credential errors are all folded into problems; nothing is
//! returned as `Err` from the call surface.
//!
//! An authorized call that comes back unauthorized is retried once after a
//! token refresh when the client holds static bearer tokens with
//! auto-refresh enabled.
//!
//! ```ignore
//! let client = ApiClient::new(ClientConfig::new("https://api.example.com"));
//! client.set_tokens(access, refresh, "/auth/refresh", true, None).await;
//! match client.get::<Json<User>>("/users/7", Auth::Stored, &[]).await {
//!     CallResult::Success(user) => println!("{}", user.name),
//!     CallResult::Problem(problem) => eprintln!("{:?}", problem.title),
//! }
//! ```

pub mod classify;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod metrics;
pub mod multipart;
pub mod problem;
pub mod transport;

pub use client::{ApiClient, Verb};
pub use config::{ClientConfig, DEFAULT_TIMEOUT_MS};
pub use decode::{Binary, DecodeKind, DecodeTarget, FileContent, Json, NoContent, Text};
pub use error::{Error, Result};
pub use multipart::MultipartForm;
pub use problem::{CallResult, ErrorKind, ProblemDetails};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, RequestBody, Transport};

pub use gateway_auth::{Auth, Credentials, RefreshHook, TokenPair, TokenProvider};
