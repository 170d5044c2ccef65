//! Service metrics.

use anyhow::Result;
use metrics::{counter, describe_counter, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const REQUESTS_TOTAL: &str = "reformat_requests_total";
pub const FAILURES_TOTAL: &str = "reformat_failures_total";
pub const BYTES_DELIVERED_TOTAL: &str = "reformat_bytes_delivered_total";

/// Install the process-wide Prometheus recorder and register metric
/// metadata. Call once at startup.
pub fn install_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_counter!(REQUESTS_TOTAL, "Reformat requests received");
    describe_counter!(FAILURES_TOTAL, "Reformat requests that failed");
    describe_counter!(
        BYTES_DELIVERED_TOTAL,
        Unit::Bytes,
        "Bytes delivered to object storage"
    );
    Ok(handle)
}

pub fn record_request() {
    counter!(REQUESTS_TOTAL).increment(1);
}

pub fn record_failure() {
    counter!(FAILURES_TOTAL).increment(1);
}

pub fn record_delivered_bytes(bytes: u64) {
    counter!(BYTES_DELIVERED_TOTAL).increment(bytes);
}
