//! Call metrics
//!
//! Recorded through the `metrics` facade; the embedding application decides
//! whether a recorder is installed.
//!
//! - `gateway_calls_total` (counter): labels `method`, `outcome`
//! - `gateway_call_duration_seconds` (histogram): label `method`
//! - `gateway_token_refresh_total` (counter): label `result`

/// Histogram name, exported so recorders can configure its buckets.
pub const CALL_DURATION_METRIC: &str = "gateway_call_duration_seconds";

/// Bucket boundaries for `gateway_call_duration_seconds`, 5ms to the
/// default 100s timeout.
pub const CALL_DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 100.0,
];

/// Record one finished logical call (refresh retry included).
pub fn record_call(method: &'static str, outcome: &'static str, duration_secs: f64) {
    metrics::counter!("gateway_calls_total", "method" => method, "outcome" => outcome)
        .increment(1);
    metrics::histogram!(CALL_DURATION_METRIC, "method" => method).record(duration_secs);
}

/// Record a refresh attempt, `result` is `success` or `failure`.
pub fn record_refresh(success: bool) {
    let result = if success { "success" } else { "failure" };
    metrics::counter!("gateway_token_refresh_total", "result" => result).increment(1);
}
