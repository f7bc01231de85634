//! Metrics collection and exposition.
//!
//! # Metrics
//! - `pool_submissions_total` (counter): transactions sent through the pool
//! - `pool_accounts_created_total` (counter): accounts minted
//! - `pool_creation_failures_total` (counter): creation transactions without the creation event
//! - `pool_funder_waits_total` (counter): selections that had to wait for the funder
//! - `pool_size` (gauge): accounts in the pool
//! - `pool_access_health` (gauge): 1=reachable, 0=unreachable
//!
//! Recording is a no-op until a recorder is installed.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Start the Prometheus exporter on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_submission() {
    metrics::counter!("pool_submissions_total").increment(1);
}

pub fn record_account_created() {
    metrics::counter!("pool_accounts_created_total").increment(1);
}

pub fn record_creation_failure() {
    metrics::counter!("pool_creation_failures_total").increment(1);
}

pub fn record_funder_wait() {
    metrics::counter!("pool_funder_waits_total").increment(1);
}

pub fn record_pool_size(size: usize) {
    metrics::gauge!("pool_size").set(size as f64);
}

pub fn record_access_health(healthy: bool) {
    metrics::gauge!("pool_access_health").set(if healthy { 1.0 } else { 0.0 });
}
