//! Metrics collection and exposition.
//!
//! # Metrics
//! - `expiring_closes_total` (counter): closes by service, reason (idle, max_lifetime, explicit)
//! - `expiring_timer_cancellations_total` (counter): pending timers cancelled by a request
//! - `expiring_outstanding_requests` (gauge): calls currently in flight
//! - `expiring_schedule_failures_total` (counter): timers that could not be armed

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Install the Prometheus recorder with an HTTP scrape listener.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_close(service: &str, reason: &'static str) {
    counter!(
        "expiring_closes_total",
        "service" => service.to_string(),
        "reason" => reason
    )
    .increment(1);
}

pub fn record_timer_cancelled(service: &str, timer: &'static str) {
    counter!(
        "expiring_timer_cancellations_total",
        "service" => service.to_string(),
        "timer" => timer
    )
    .increment(1);
}

pub fn set_outstanding(service: &str, outstanding: usize) {
    gauge!("expiring_outstanding_requests", "service" => service.to_string())
        .set(outstanding as f64);
}

pub fn record_schedule_failure(service: &str, timer: &'static str) {
    counter!("expiring_schedule_failures_total", "service" => service.to_string(), "timer" => timer)
        .increment(1);
}
