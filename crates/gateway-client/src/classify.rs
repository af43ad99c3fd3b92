//! Response classification
//!
//! Turns a raw response into a `CallResult`. First match wins:
//! 1. 2xx: decode the body with the call's target
//! 2. 502: `connection_error`
//! 3. 401 / 403 / 405: `unauthorized`
//! 4. anything else: the server's own problem body if it parses, otherwise
//!    `server_error` (no body) or `server_unexpected_error` (undecodable body)
//!
//! The response is consumed, so its body is read exactly once.

use reqwest::StatusCode;

use crate::decode::DecodeTarget;
use crate::error::Result;
use crate::problem::{CallResult, ErrorKind, ProblemDetails};
use crate::transport::HttpResponse;

/// `instance` of problems synthesized from a response.
const CLASSIFIER_INSTANCE: &str = "ApiManager";

/// Classify a response for decode target `D`.
///
/// A decode failure on a 2xx body is returned as `Err`; the caller folds it
/// into a `server_unexpected_error` problem like any other local failure.
pub fn classify<D: DecodeTarget>(response: HttpResponse) -> Result<CallResult<D::Output>> {
    if response.status.is_success() {
        return D::decode(response).map(CallResult::Success);
    }
    Ok(CallResult::Problem(classify_failure(
        response.status,
        &response.url,
        &response.body,
    )))
}

/// Map a non-success response to its problem.
pub fn classify_failure(status: StatusCode, url: &str, body: &[u8]) -> ProblemDetails {
    match status {
        StatusCode::BAD_GATEWAY => ProblemDetails::new(
            ErrorKind::ConnectionError,
            status.as_u16(),
            format!("API Connection Error({url})"),
            "",
            CLASSIFIER_INSTANCE,
        ),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::METHOD_NOT_ALLOWED => {
            ProblemDetails::new(
                ErrorKind::Unauthorized,
                status.as_u16(),
                format!("API Error({url})"),
                "",
                CLASSIFIER_INSTANCE,
            )
        }
        _ => match parse_problem(body) {
            Ok(Some(problem)) => problem,
            Ok(None) => ProblemDetails::new(
                ErrorKind::ServerError,
                status.as_u16(),
                format!("API Error({url})"),
                "",
                CLASSIFIER_INSTANCE,
            ),
            Err(e) => ProblemDetails::new(
                ErrorKind::ServerUnexpectedError,
                status.as_u16(),
                format!("API Error({url})"),
                e.to_string(),
                CLASSIFIER_INSTANCE,
            ),
        },
    }
}

/// A blank body or a literal `null` yields `None`.
fn parse_problem(body: &[u8]) -> serde_json::Result<Option<ProblemDetails>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
}
