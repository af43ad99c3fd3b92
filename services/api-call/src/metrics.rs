//! Prometheus metrics exposition
//!
//! Besides the gateway's own call metrics, the relay records:
//!
//! - `relay_requests_total` (counter): labels `status`, `outcome`
//! - `relay_request_duration_seconds` (histogram): label `status`

use gateway_client::metrics::{CALL_DURATION_BUCKETS, CALL_DURATION_METRIC};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

const RELAY_DURATION_METRIC: &str = "relay_request_duration_seconds";

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(CALL_DURATION_METRIC.to_string()),
            CALL_DURATION_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(RELAY_DURATION_METRIC.to_string()),
            CALL_DURATION_BUCKETS,
        )
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// Both duration metrics render as histograms (with `_bucket` lines) rather
/// than the default summary.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    Ok(builder()?.install_recorder()?)
}

/// Record a relayed request with its response status and call outcome.
pub fn record_relay_request(status: u16, outcome: &'static str, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!("relay_requests_total", "status" => status_str.clone(), "outcome" => outcome)
        .increment(1);
    metrics::histogram!(RELAY_DURATION_METRIC, "status" => status_str).record(duration_secs);
}

#[cfg(test)]
pub(crate) fn isolated_recorder() -> (
    metrics_exporter_prometheus::PrometheusRecorder,
    PrometheusHandle,
) {
    let recorder = builder().unwrap().build_recorder();
    let handle = recorder.handle();
    (recorder, handle)
}
