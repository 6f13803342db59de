// src/registry.rs
//! Shared, lock-guarded map of Gotify app id → app metadata.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::gotify::App;
use crate::topic::sanitize_topic;

/// Cheap-to-clone handle; every clone sees the same map.
///
/// Entries are only ever added or overwritten, never removed, so an app that
/// disappears upstream keeps its topic routing until restart.
#[derive(Clone, Default)]
pub struct AppRegistry {
    inner: Arc<RwLock<HashMap<i64, App>>>,
}

impl AppRegistry {
    pub fn new(initial: &[App]) -> Self {
        let registry = Self::default();
        registry.replace_all(initial);
        registry
    }

    // A panic while holding the lock cannot leave the map half-updated
    // (single insert per critical section), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<i64, App>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<i64, App>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Bulk upsert. Apps missing from `apps` stay registered.
    pub fn replace_all(&self, apps: &[App]) {
        let mut map = self.write();
        for app in apps {
            map.insert(app.id, app.clone());
        }
    }

    pub fn upsert(&self, app: App) {
        self.write().insert(app.id, app);
    }

    pub fn get(&self, id: i64) -> Option<App> {
        self.read().get(&id).cloned()
    }

    /// Sanitized app name when the app is known, else `fallback` untouched.
    pub fn topic_for(&self, id: i64, fallback: &str) -> String {
        match self.read().get(&id) {
            Some(app) => sanitize_topic(&app.name),
            None => fallback.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl std::fmt::Debug for AppRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppRegistry").field("apps", &self.len()).finish()
    }
}
