// src/app.rs
//! Process wiring: seed app metadata, announce startup, start the sync loop
//! and hand control to the connection supervisor.

use std::sync::Arc;

use anyhow::Result;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::gotify::{App, GotifyClient, WsConnector};
use crate::ntfy::{NtfyClient, Publication, Publisher};
use crate::registry::AppRegistry;
use crate::relay::{RelayContext, RelaySettings};
use crate::snapshot::SnapshotStore;
use crate::supervisor::Supervisor;
use crate::sync::{spawn_sync_loop, AppSource, Reconciler};

pub const STARTUP_PRIORITY: i64 = 3;

/// Summary of the apps present at startup, sent to the default topic.
pub fn startup_publication(topic: &str, apps: &[App]) -> Publication {
    let lines: Vec<String> = apps
        .iter()
        .map(|app| format!("- {}: {}", app.name, app.description))
        .collect();
    Publication {
        topic: topic.to_string(),
        title: "Gotify Apps found on startup".to_string(),
        body: format!("Gotify apps on startup:\n{}", lines.join("\n")),
        priority: STARTUP_PRIORITY,
    }
}

/// Best-effort initial fetch. Returns the apps to seed the registry with
/// (empty when Gotify is unreachable).
pub async fn seed_apps(source: &dyn AppSource, publisher: &dyn Publisher, topic: &str) -> Vec<App> {
    let apps = match source.fetch_apps().await {
        Ok(apps) => apps,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "could not load applications");
            return Vec::new();
        }
    };

    info!(count = apps.len(), "got gotify apps");
    for app in &apps {
        info!(
            app_id = app.id,
            name = %app.name,
            description = %app.description,
            token = %app.masked_token(),
            "gotify app"
        );
    }

    match publisher.publish(&startup_publication(topic, &apps)).await {
        Ok(()) => info!(count = apps.len(), "sent startup message"),
        Err(e) => warn!(error = %format!("{e:#}"), "failed to send startup message"),
    }
    apps
}

/// Wait for the sync loop task and log its end. The loop never returns on
/// its own, so any exit means per-app routing stopped refreshing.
pub async fn watch_sync_loop(handle: JoinHandle<()>) -> Result<(), JoinError> {
    let outcome = handle.await;
    match &outcome {
        Ok(()) => warn!("app sync loop stopped"),
        Err(e) if e.is_panic() => error!(error = %e, "app sync loop panicked"),
        Err(e) => warn!(error = %e, "app sync loop cancelled"),
    }
    outcome
}

/// Run the bridge. Only returns on a setup error; connection problems are
/// retried forever.
pub async fn run(cfg: Config) -> Result<()> {
    info!(
        gotify = %cfg.gotify_url,
        ntfy = %cfg.ntfy_url,
        topic = %cfg.ntfy_topic,
        split_topics = cfg.split_topics,
        timezone = cfg.timezone.as_deref().unwrap_or("unset"),
        "starting forwarder"
    );
    if cfg.ntfy_auth_token.is_some() {
        info!("using ntfy auth token");
    }

    let gotify = Arc::new(GotifyClient::new(&cfg.gotify_url, cfg.gotify_token.clone())?);
    let ntfy: Arc<dyn Publisher> = Arc::new(NtfyClient::new(
        cfg.ntfy_url.clone(),
        cfg.ntfy_auth_token.clone(),
        cfg.ntfy_priority,
    )?);

    let initial = seed_apps(gotify.as_ref(), ntfy.as_ref(), &cfg.ntfy_topic).await;
    let registry = AppRegistry::new(&initial);

    if cfg.split_topics {
        let reconciler = Reconciler::new(
            gotify.clone(),
            ntfy.clone(),
            registry.clone(),
            SnapshotStore::new(&cfg.apps_db_path),
            cfg.ntfy_topic.clone(),
        );
        tokio::spawn(watch_sync_loop(spawn_sync_loop(reconciler, cfg.sync_interval)));
    }

    let settings = RelaySettings {
        workers: cfg.workers,
        queue_capacity: cfg.queue_capacity,
        split_topics: cfg.split_topics,
        default_topic: cfg.ntfy_topic.clone(),
    };
    let ctx = RelayContext::new(settings, registry, ntfy);
    let connector = WsConnector::new(cfg.gotify_url.clone(), cfg.gotify_token.clone());

    Supervisor::new(connector, ctx).run().await;
    Ok(())
}
