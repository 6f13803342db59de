//! gotify-ntfy-bridge — binary entrypoint.
//! Loads configuration, initialises tracing and runs the bridge forever.

use anyhow::Context;
use gotify_ntfy_bridge::{app, config::Config};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `RUST_LOG` wins; otherwise `info`, or crate-level debug with `NTFY_DEBUG=true`.
fn init_tracing(debug: bool) {
    let fallback = if debug {
        "gotify_ntfy_bridge=debug,info"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env when present; real environment variables take precedence.
    let _ = dotenvy::dotenv();

    let cfg = Config::from_env().context("loading configuration")?;
    init_tracing(cfg.debug);
    tracing::debug!(config = ?cfg, "configuration loaded");

    if let Some(addr) = cfg.metrics_addr {
        gotify_ntfy_bridge::metrics::install_prometheus(addr)?;
        tracing::info!(%addr, "prometheus exporter listening");
    }

    app::run(cfg).await
}
