// tests/common/mod.rs
// Shared fakes for integration tests: recording publisher, scripted app source.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use gotify_ntfy_bridge::gotify::App;
use gotify_ntfy_bridge::ntfy::{Publication, Publisher};
use gotify_ntfy_bridge::sync::AppSource;
use tokio::sync::Semaphore;

pub fn app(id: i64, name: &str, description: &str) -> App {
    App {
        id,
        token: format!("Atok{id}"),
        name: name.to_string(),
        description: description.to_string(),
        image: String::new(),
    }
}

pub fn frame(id: i64, appid: i64, title: &str, message: &str, priority: i64) -> Vec<u8> {
    serde_json::json!({
        "id": id,
        "appid": appid,
        "title": title,
        "message": message,
        "priority": priority,
    })
    .to_string()
    .into_bytes()
}

/// Records every publication. Can be told to fail, to be slow, or to wait
/// for permits before completing each publish.
#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Mutex<Vec<Publication>>,
    pub attempts: AtomicUsize,
    fail: bool,
    delay: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Each publish consumes one permit from `gate` before finishing.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<Publication> {
        self.published.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, p: &Publication) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.map_err(|e| anyhow!("gate closed: {e}"))?.forget();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(anyhow!("ntfy error: 503 Service Unavailable: busy"));
        }
        self.published.lock().unwrap().push(p.clone());
        Ok(())
    }
}

/// App source returning whatever was last `set`, or failing on demand.
#[derive(Default)]
pub struct ScriptedSource {
    apps: Mutex<Vec<App>>,
    failing: Mutex<bool>,
    pub fetches: AtomicUsize,
}

impl ScriptedSource {
    pub fn with(apps: Vec<App>) -> Self {
        let s = Self::default();
        s.set(apps);
        s
    }

    pub fn set(&self, apps: Vec<App>) {
        *self.apps.lock().unwrap() = apps;
    }

    pub fn fail(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AppSource for ScriptedSource {
    async fn fetch_apps(&self) -> Result<Vec<App>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if *self.failing.lock().unwrap() {
            return Err(anyhow!("gotify /application failed: 502 Bad Gateway"));
        }
        Ok(self.apps.lock().unwrap().clone())
    }
}
