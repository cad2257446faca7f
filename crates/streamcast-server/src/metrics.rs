//! Metrics collection and export for Streamcast.
//!
//! Uses the `metrics` crate for instrumentation and exports
//! to Prometheus format.

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Metric names.
pub mod names {
    pub const WEBHOOK_EVENTS_TOTAL: &str = "streamcast_webhook_events_total";
    pub const WEBHOOK_REJECTED_TOTAL: &str = "streamcast_webhook_rejected_total";
    pub const WEBHOOK_MALFORMED_TOTAL: &str = "streamcast_webhook_malformed_total";
    pub const ADMIN_COMMANDS_TOTAL: &str = "streamcast_admin_commands_total";
}

/// Initialize the metrics system.
pub fn init_metrics() {
    metrics::describe_counter!(
        names::WEBHOOK_EVENTS_TOTAL,
        "Total webhook callbacks accepted, labelled by action"
    );
    metrics::describe_counter!(
        names::WEBHOOK_REJECTED_TOTAL,
        "Total webhook callbacks rejected for an invalid action path"
    );
    metrics::describe_counter!(
        names::WEBHOOK_MALFORMED_TOTAL,
        "Total webhook callbacks with an unparseable body"
    );
    metrics::describe_counter!(
        names::ADMIN_COMMANDS_TOTAL,
        "Total admin API calls, labelled by command"
    );

    info!("Metrics initialized");
}

/// Start the Prometheus metrics server.
///
/// # Errors
///
/// Returns an error if the server cannot be started.
pub fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record an accepted webhook callback.
pub fn record_webhook_event(action: &str) {
    counter!(names::WEBHOOK_EVENTS_TOTAL, "action" => action.to_string()).increment(1);
}

/// Record a webhook callback rejected at the path level.
pub fn record_webhook_rejected() {
    counter!(names::WEBHOOK_REJECTED_TOTAL).increment(1);
}

/// Record a webhook callback whose body could not be parsed.
pub fn record_webhook_malformed() {
    counter!(names::WEBHOOK_MALFORMED_TOTAL).increment(1);
}

/// Record an admin API call.
pub fn record_admin_command(command: &str) {
    counter!(names::ADMIN_COMMANDS_TOTAL, "command" => command.to_string()).increment(1);
}
