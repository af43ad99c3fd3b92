//! Relay server
//!
//! Exposes the configured API through the gateway: `GET /relay/{*path}` is
//! issued as a gateway GET of `/{path}` with the client's stored credentials.
//! A successful payload is returned as-is with its content type; a problem
//! is returned as `application/problem+json` with the problem's status.
//!
//! Path and query string are forwarded verbatim, still percent-encoded, since
//! the gateway appends both without escaping.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::Router;
use axum::extract::{OriginalUri, RawQuery, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use gateway_client::{ApiClient, Auth, Binary, CallResult, ProblemDetails};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::{info, warn};

use crate::metrics::record_relay_request;

const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";
const RELAY_PREFIX: &str = "/relay";

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<ApiClient>,
    pub prometheus: PrometheusHandle,
    pub started_at: Instant,
    pub requests_total: Arc<AtomicU64>,
    pub problems_total: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(client: Arc<ApiClient>, prometheus: PrometheusHandle) -> Self {
        Self {
            client,
            prometheus,
            started_at: Instant::now(),
            requests_total: Arc::new(AtomicU64::new(0)),
            problems_total: Arc::new(AtomicU64::new(0)),
        }
    }
}

/// Build the axum router with all routes and shared state.
///
/// `max_connections` bounds concurrently handled requests; excess requests
/// wait for a slot.
pub fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/relay/{*path}", get(relay_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "host": state.client.host(),
        "auth_mode": state.client.auth_mode().await.label(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "requests_served": state.requests_total.load(Ordering::Relaxed),
        "problems_total": state.problems_total.load(Ordering::Relaxed),
    });
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

async fn relay_handler(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    RawQuery(query): RawQuery,
) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    let started = Instant::now();
    state.requests_total.fetch_add(1, Ordering::Relaxed);

    let address = relay_address(uri.path());
    let query = split_query(query.as_deref().unwrap_or(""));
    let result = state
        .client
        .get::<Binary>(address, Auth::Stored, &query)
        .await;
    let outcome = result.outcome_label();

    let mut response = match result {
        CallResult::Success(file) => {
            let content_type = HeaderValue::from_str(&file.content_type)
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], file.bytes).into_response()
        }
        CallResult::Problem(problem) => {
            state.problems_total.fetch_add(1, Ordering::Relaxed);
            warn!(
                request_id,
                address,
                kind = problem.problem_type.as_deref().unwrap_or(""),
                status = problem.status.unwrap_or_default(),
                "relayed call returned a problem"
            );
            problem_response(&problem)
        }
    };

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }

    let status = response.status().as_u16();
    let elapsed = started.elapsed();
    record_relay_request(status, outcome, elapsed.as_secs_f64());
    info!(
        request_id,
        address,
        status,
        outcome,
        latency_ms = elapsed.as_millis() as u64,
        "relayed request"
    );
    response
}

/// Render a problem as `application/problem+json`.
///
/// The problem's own status is used when it is an error status; anything
/// else (missing, out of range, or 1xx-3xx) becomes 502.
pub fn problem_response(problem: &ProblemDetails) -> Response {
    let status = problem
        .status
        .and_then(|status| StatusCode::from_u16(status).ok())
        .filter(|status| status.is_client_error() || status.is_server_error())
        .unwrap_or(StatusCode::BAD_GATEWAY);
    let body = serde_json::to_string(problem).unwrap_or_else(|_| String::from("{}"));
    (status, [(header::CONTENT_TYPE, PROBLEM_CONTENT_TYPE)], body).into_response()
}

/// The upstream address for a relay path, without decoding it.
fn relay_address(path: &str) -> &str {
    path.strip_prefix(RELAY_PREFIX).unwrap_or(path)
}

/// Split a raw query string into pairs without decoding.
fn split_query(raw: &str) -> Vec<(&str, &str)> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .collect()
}
