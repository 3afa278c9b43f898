//! Prometheus metrics
//!
//! Recording is a no-op until [`init_prometheus_recorder`] installs the
//! global recorder, so library users and tests pay nothing for it.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::{Result, ServerError};

pub const LOOKUPS_TOTAL: &str = "ensearch_lookups_total";
pub const BULK_REQUESTS_TOTAL: &str = "ensearch_bulk_requests_total";
pub const BULK_ENTRIES: &str = "ensearch_bulk_entries";
pub const SEARCH_REQUESTS_TOTAL: &str = "ensearch_search_requests_total";
pub const DIRECTORY_PROFILES: &str = "ensearch_directory_profiles";

/// Install the global Prometheus recorder and return a handle for rendering
pub fn init_prometheus_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Internal(format!("prometheus recorder: {e}")))
}

/// Count one point lookup by kind (`name`, `address`, `universal`) and status
pub fn record_lookup(kind: &'static str, status: u16) {
    let outcome = match status {
        200 => "found",
        404 => "not_found",
        400 => "invalid",
        _ => "error",
    };
    metrics::counter!(LOOKUPS_TOTAL, "kind" => kind, "outcome" => outcome).increment(1);
}

pub fn record_bulk(kind: &'static str, entries: usize, unique: usize) {
    metrics::counter!(BULK_REQUESTS_TOTAL, "kind" => kind).increment(1);
    metrics::histogram!(BULK_ENTRIES, "kind" => kind).record(entries as f64);
    tracing::debug!(kind, entries, unique, "Bulk request");
}

pub fn record_search(results: usize) {
    metrics::counter!(SEARCH_REQUESTS_TOTAL, "empty" => if results == 0 { "true" } else { "false" })
        .increment(1);
}

pub fn record_directory_size(profiles: usize) {
    metrics::gauge!(DIRECTORY_PROFILES).set(profiles as f64);
}
