//! Call outcomes: success payloads and problem details
//!
//! A problem either mirrors the structured error body an upstream server
//! returned, or is synthesized locally with one of the four gateway kinds.

use std::collections::BTreeMap;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Problem kinds synthesized by the gateway itself.
///
/// A server-supplied problem keeps its own `type` string, which parses as
/// `Upstream` unless it happens to match one of the gateway kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Upstream answered 502.
    ConnectionError,
    /// 401, 403 or 405. Any of them may stem from an expired token.
    Unauthorized,
    /// Other non-success status without a usable problem body.
    ServerError,
    /// Local failure, or a problem body that failed to decode.
    ServerUnexpectedError,
    Upstream(String),
}

impl ErrorKind {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorKind::ConnectionError => "connection_error",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::ServerError => "server_error",
            ErrorKind::ServerUnexpectedError => "server_unexpected_error",
            ErrorKind::Upstream(kind) => kind,
        }
    }

    pub fn parse(kind: &str) -> Self {
        match kind {
            "connection_error" => ErrorKind::ConnectionError,
            "unauthorized" => ErrorKind::Unauthorized,
            "server_error" => ErrorKind::ServerError,
            "server_unexpected_error" => ErrorKind::ServerUnexpectedError,
            other => ErrorKind::Upstream(other.to_owned()),
        }
    }

    /// Bounded label for metrics; upstream kinds collapse into one value.
    pub fn metric_label(&self) -> &'static str {
        match self {
            ErrorKind::ConnectionError => "connection_error",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::ServerError => "server_error",
            ErrorKind::ServerUnexpectedError => "server_unexpected_error",
            ErrorKind::Upstream(_) => "upstream_problem",
        }
    }
}

/// Structured error body: `{type, status, title, detail, instance}` plus the
/// optional validation `errors` map.
///
/// Every field is optional because a pass-through problem is returned
/// exactly as the server sent it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemDetails {
    #[serde(rename = "type", alias = "Type", default, skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<String>,
    #[serde(alias = "Status", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(alias = "Title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(alias = "Detail", default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(alias = "Instance", default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(alias = "Errors", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ProblemDetails {
    /// A locally synthesized problem.
    pub fn new(
        kind: ErrorKind,
        status: u16,
        title: impl Into<String>,
        detail: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        Self {
            problem_type: Some(kind.as_str().to_owned()),
            status: Some(status),
            title: Some(title.into()),
            detail: Some(detail.into()),
            instance: Some(instance.into()),
            errors: BTreeMap::new(),
        }
    }

    /// The kind named by `type`, if the problem carries one.
    pub fn kind(&self) -> Option<ErrorKind> {
        self.problem_type.as_deref().map(ErrorKind::parse)
    }

    pub fn is_kind(&self, kind: &ErrorKind) -> bool {
        self.problem_type.as_deref() == Some(kind.as_str())
    }
}

/// The uniform result of every gateway call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallResult<T> {
    Success(T),
    Problem(ProblemDetails),
}

impl<T> CallResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, CallResult::Success(_))
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            CallResult::Success(payload) => Some(payload),
            CallResult::Problem(_) => None,
        }
    }

    pub fn problem(&self) -> Option<&ProblemDetails> {
        match self {
            CallResult::Success(_) => None,
            CallResult::Problem(problem) => Some(problem),
        }
    }

    pub fn into_result(self) -> Result<T, ProblemDetails> {
        match self {
            CallResult::Success(payload) => Ok(payload),
            CallResult::Problem(problem) => Err(problem),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CallResult<U> {
        match self {
            CallResult::Success(payload) => CallResult::Success(f(payload)),
            CallResult::Problem(problem) => CallResult::Problem(problem),
        }
    }

    /// Metrics label: `success` or the problem's bounded kind label.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            CallResult::Success(_) => "success",
            CallResult::Problem(problem) => problem
                .kind()
                .map(|kind| kind.metric_label())
                .unwrap_or("upstream_problem"),
        }
    }
}

/// Serialized as `{"isSuccess": bool, "result"?: T, "problem"?: ProblemDetails}`.
impl<T: Serialize> Serialize for CallResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CallResult", 2)?;
        state.serialize_field("isSuccess", &self.is_success())?;
        match self {
            CallResult::Success(payload) => state.serialize_field("result", payload)?,
            CallResult::Problem(problem) => state.serialize_field("problem", problem)?,
        }
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_round_trip_through_strings() {
        for kind in [
            ErrorKind::ConnectionError,
            ErrorKind::Unauthorized,
            ErrorKind::ServerError,
            ErrorKind::ServerUnexpectedError,
        ] {
            assert_eq!(ErrorKind::parse(kind.as_str()), kind);
        }
        assert_eq!(
            ErrorKind::parse("duplicate_request"),
            ErrorKind::Upstream("duplicate_request".into())
        );
    }

    #[test]
    fn synthesized_problem_fields() {
        let problem = ProblemDetails::new(
            ErrorKind::Unauthorized,
            401,
            "API Error(https://api.test/users)",
            "",
            "ApiManager",
        );
        assert!(problem.is_kind(&ErrorKind::Unauthorized));
        assert_eq!(problem.status, Some(401));
        assert_eq!(problem.detail.as_deref(), Some(""));
    }

    #[test]
    fn deserializes_validation_problem() {
        let body = r#"{
            "type": "invalid_request",
            "title": "One or more validation errors occurred.",
            "status": 400,
            "errors": {"Email": ["The Email field is required."]}
        }"#;
        let problem: ProblemDetails = serde_json::from_str(body).unwrap();
        assert_eq!(problem.kind(), Some(ErrorKind::Upstream("invalid_request".into())));
        assert_eq!(problem.status, Some(400));
        assert_eq!(problem.errors["Email"], vec!["The Email field is required."]);
        assert!(problem.instance.is_none());
    }

    #[test]
    fn deserializes_pascal_case_keys() {
        let body = r#"{"Type":"not_found","Status":404,"Title":"Missing","Detail":"no user"}"#;
        let problem: ProblemDetails = serde_json::from_str(body).unwrap();
        assert_eq!(problem.problem_type.as_deref(), Some("not_found"));
        assert_eq!(problem.status, Some(404));
        assert_eq!(problem.detail.as_deref(), Some("no user"));
    }

    #[test]
    fn success_and_problem_accessors_agree() {
        let ok: CallResult<u32> = CallResult::Success(7);
        assert!(ok.is_success());
        assert_eq!(ok.payload(), Some(&7));
        assert!(ok.problem().is_none());
        assert_eq!(ok.outcome_label(), "success");

        let problem = ProblemDetails::new(ErrorKind::ServerError, 500, "t", "", "i");
        let failed: CallResult<u32> = CallResult::Problem(problem.clone());
        assert!(!failed.is_success());
        assert!(failed.payload().is_none());
        assert_eq!(failed.problem(), Some(&problem));
        assert_eq!(failed.outcome_label(), "server_error");
        assert_eq!(failed.into_result(), Err(problem));
    }

    #[test]
    fn serializes_like_an_api_result() {
        let ok: CallResult<&str> = CallResult::Success("ok");
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            serde_json::json!({"isSuccess": true, "result": "ok"})
        );

        let failed: CallResult<()> = CallResult::Problem(ProblemDetails::new(
            ErrorKind::ConnectionError,
            502,
            "API Connection Error(http://x)",
            "",
            "ApiManager",
        ));
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["isSuccess"], false);
        assert_eq!(json["problem"]["type"], "connection_error");
        assert_eq!(json["problem"]["status"], 502);
    }

    #[test]
    fn upstream_kinds_collapse_in_metrics() {
        let problem = ProblemDetails {
            problem_type: Some("high_number_request".into()),
            ..Default::default()
        };
        let result: CallResult<()> = CallResult::Problem(problem);
        assert_eq!(result.outcome_label(), "upstream_problem");
    }
}
