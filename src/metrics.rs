// src/metrics.rs
use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics::{describe_counter, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "relay_frames_received_total",
            Unit::Count,
            "Frames read from the gotify stream."
        );
        describe_counter!(
            "relay_frames_malformed_total",
            Unit::Count,
            "Frames skipped because they were not valid message JSON."
        );
        describe_counter!(
            "relay_queue_dropped_total",
            Unit::Count,
            "Messages dropped because the work queue was full."
        );
        describe_counter!(
            "relay_deliveries_total",
            Unit::Count,
            "ntfy publish attempts by outcome."
        );
        describe_counter!("sync_cycles_total", Unit::Count, "App sync cycles by outcome.");
        describe_counter!(
            "sync_notifications_total",
            Unit::Count,
            "App change notifications sent, by kind."
        );
        describe_counter!(
            "stream_connect_attempts_total",
            Unit::Count,
            "Gotify stream connection attempts by outcome."
        );
    });
}

/// Install the Prometheus recorder with its own HTTP listener on `addr`.
/// Must be called from inside the Tokio runtime.
pub fn install_prometheus(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("prometheus: install recorder on {addr}"))?;
    ensure_metrics_described();
    Ok(())
}
