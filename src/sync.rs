// src/sync.rs
//! Periodic reconciliation of Gotify apps.
//!
//! Each cycle fetches `/application`, compares it with the last known state
//! (persisted in the snapshot file), announces new apps and description
//! changes on the default topic, and refreshes the registry used for
//! per-app topic routing.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::gotify::App;
use crate::ntfy::{Publication, Publisher};
use crate::registry::AppRegistry;
use crate::snapshot::{KnownApps, SnapshotStore};
use crate::topic::{ensure_topic, sanitize_topic};

/// Gotify priority used for "new app" announcements.
pub const NEW_APP_PRIORITY: i64 = 4;
/// Gotify priority used for "description changed" announcements.
pub const CHANGED_APP_PRIORITY: i64 = 3;

/// Where the current list of apps comes from.
#[async_trait::async_trait]
pub trait AppSource: Send + Sync {
    async fn fetch_apps(&self) -> Result<Vec<App>>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub new_apps: Vec<i64>,
    pub changed_apps: Vec<i64>,
    pub failed_notifications: usize,
    /// First cycle without a snapshot: state adopted silently.
    pub baseline: bool,
    pub topics: Vec<String>,
}

pub struct Reconciler {
    source: Arc<dyn AppSource>,
    publisher: Arc<dyn Publisher>,
    registry: AppRegistry,
    store: SnapshotStore,
    announce_topic: String,
    known: KnownApps,
    needs_baseline: bool,
}

impl Reconciler {
    /// Loads the snapshot; an unreadable snapshot is logged and treated as empty.
    pub fn new(
        source: Arc<dyn AppSource>,
        publisher: Arc<dyn Publisher>,
        registry: AppRegistry,
        store: SnapshotStore,
        announce_topic: impl Into<String>,
    ) -> Self {
        let needs_baseline = !store.exists();
        let known = match store.load() {
            Ok(known) => known,
            Err(e) => {
                warn!(error = %format!("{e:#}"), path = %store.path().display(), "could not load known apps db");
                KnownApps::new()
            }
        };
        if needs_baseline {
            info!(path = %store.path().display(), "no known apps db yet, first sync will record a baseline");
        }
        Self {
            source,
            publisher,
            registry,
            store,
            announce_topic: announce_topic.into(),
            known,
            needs_baseline,
        }
    }

    pub fn known(&self) -> &KnownApps {
        &self.known
    }

    /// One reconciliation pass. A fetch failure returns `Err` before any
    /// state is touched; delivery and save failures are logged only.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let current = self.source.fetch_apps().await?;
        let mut report = CycleReport::default();

        if self.needs_baseline {
            for app in &current {
                self.known.insert(app.id, app.clone());
            }
            self.registry.replace_all(&current);
            report.baseline = true;
            info!(apps = current.len(), "recorded baseline of gotify apps");
        } else {
            for app in &current {
                let (kind, publication) = match self.known.get(&app.id) {
                    None => {
                        report.new_apps.push(app.id);
                        ("new", new_app_publication(&self.announce_topic, app))
                    }
                    Some(old) if old.description != app.description => {
                        report.changed_apps.push(app.id);
                        ("changed", changed_app_publication(&self.announce_topic, old, app))
                    }
                    Some(_) => continue,
                };

                match self.publisher.publish(&publication).await {
                    Ok(()) => {
                        counter!("sync_notifications_total", "kind" => kind).increment(1);
                        info!(app_id = app.id, name = %app.name, kind, "notified about app change");
                    }
                    Err(e) => {
                        report.failed_notifications += 1;
                        warn!(
                            app_id = app.id,
                            name = %app.name,
                            kind,
                            error = %format!("{e:#}"),
                            "failed to notify about app change"
                        );
                    }
                }

                self.known.insert(app.id, app.clone());
            }
            // Unchanged apps still refresh routing: renames and a failed seed.
            self.registry.replace_all(&current);
        }

        if let Err(e) = self.store.save(&self.known) {
            warn!(error = %format!("{e:#}"), "could not save known apps db");
        } else {
            self.needs_baseline = false;
        }

        for app in &current {
            let topic = sanitize_topic(&app.name);
            match ensure_topic(&topic) {
                Ok(()) => debug!(app_id = app.id, %topic, "topic ready"),
                Err(e) => warn!(app_id = app.id, %topic, error = %e, "could not validate topic"),
            }
            report.topics.push(topic);
        }

        Ok(report)
    }
}

fn new_app_publication(topic: &str, app: &App) -> Publication {
    Publication {
        topic: topic.to_string(),
        title: "New Gotify app detected".to_string(),
        body: format!(
            "Name: {} (ID={})\nDescription: {:?}",
            app.name, app.id, app.description
        ),
        priority: NEW_APP_PRIORITY,
    }
}

fn changed_app_publication(topic: &str, old: &App, app: &App) -> Publication {
    Publication {
        topic: topic.to_string(),
        title: "Gotify app description updated".to_string(),
        body: format!(
            "App: {} (ID={})\nOld: {:?}\nNew: {:?}",
            app.name, app.id, old.description, app.description
        ),
        priority: CHANGED_APP_PRIORITY,
    }
}

/// Run a cycle now and then every `interval`, forever.
pub fn spawn_sync_loop(mut reconciler: Reconciler, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match reconciler.run_cycle().await {
                Ok(report) => {
                    counter!("sync_cycles_total", "outcome" => "ok").increment(1);
                    debug!(
                        new = report.new_apps.len(),
                        changed = report.changed_apps.len(),
                        failed = report.failed_notifications,
                        "sync cycle done"
                    );
                }
                Err(e) => {
                    counter!("sync_cycles_total", "outcome" => "error").increment(1);
                    warn!(error = %format!("{e:#}"), "could not load applications, skipping cycle");
                }
            }
        }
    })
}
