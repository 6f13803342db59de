// src/config.rs
//! Environment-driven configuration (`.env` is honoured via dotenvy in `main`).

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::relay::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};
use crate::snapshot::DEFAULT_SNAPSHOT_PATH;

pub const ENV_GOTIFY_URL: &str = "GOTIFY_URL";
pub const ENV_GOTIFY_TOKEN: &str = "GOTIFY_CLIENT_TOKEN";
pub const ENV_NTFY_URL: &str = "NTFY_URL";
pub const ENV_NTFY_TOPIC: &str = "NTFY_TOPIC";
pub const ENV_NTFY_AUTH_TOKEN: &str = "NTFY_AUTH_TOKEN";
pub const ENV_NTFY_PRIORITY: &str = "NTFY_PRIORITY";
pub const ENV_SPLIT_TOPICS: &str = "NTFY_SPLIT_TOPICS";
pub const ENV_SYNC_INTERVAL: &str = "NTFY_SYNC_INTERVAL";
pub const ENV_DEBUG: &str = "NTFY_DEBUG";
pub const ENV_TIMEZONE: &str = "TZ";
pub const ENV_APPS_DB: &str = "GOTIFY_APPS_DB";
pub const ENV_WORKERS: &str = "RELAY_WORKERS";
pub const ENV_QUEUE_CAPACITY: &str = "RELAY_QUEUE_CAPACITY";
pub const ENV_METRICS_ADDR: &str = "METRICS_ADDR";

pub const DEFAULT_PRIORITY: i64 = 3;
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Clone)]
pub struct Config {
    pub gotify_url: String,
    pub gotify_token: String,
    pub ntfy_url: String,
    pub ntfy_topic: String,
    pub ntfy_auth_token: Option<String>,
    /// Gotify-scale priority used when a message carries none.
    pub ntfy_priority: i64,
    pub split_topics: bool,
    pub sync_interval: Duration,
    pub debug: bool,
    /// Only reported at startup; timestamps come from the subscriber.
    pub timezone: Option<String>,
    pub apps_db_path: String,
    pub workers: usize,
    pub queue_capacity: usize,
    pub metrics_addr: Option<SocketAddr>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset and empty values are treated alike.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let flag = |key: &str| get(key).is_some_and(|v| v.eq_ignore_ascii_case("true"));

        let gotify_url = get(ENV_GOTIFY_URL);
        let gotify_token = get(ENV_GOTIFY_TOKEN);
        let ntfy_url = get(ENV_NTFY_URL);
        let ntfy_topic = get(ENV_NTFY_TOPIC);

        let (Some(gotify_url), Some(gotify_token), Some(ntfy_url), Some(ntfy_topic)) =
            (gotify_url, gotify_token, ntfy_url, ntfy_topic)
        else {
            let missing: Vec<&str> = [ENV_GOTIFY_URL, ENV_GOTIFY_TOKEN, ENV_NTFY_URL, ENV_NTFY_TOPIC]
                .into_iter()
                .filter(|k| get(*k).is_none())
                .collect();
            bail!("missing required env vars: {}", missing.join(", "));
        };

        let sync_interval = get(ENV_SYNC_INTERVAL)
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SYNC_INTERVAL);

        let metrics_addr = match get(ENV_METRICS_ADDR) {
            Some(raw) => match raw.parse() {
                Ok(addr) => Some(addr),
                Err(_) => bail!("{ENV_METRICS_ADDR} is not a socket address: {raw}"),
            },
            None => None,
        };

        Ok(Self {
            gotify_url,
            gotify_token,
            ntfy_url,
            ntfy_topic,
            ntfy_auth_token: get(ENV_NTFY_AUTH_TOKEN),
            ntfy_priority: get(ENV_NTFY_PRIORITY)
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PRIORITY),
            split_topics: flag(ENV_SPLIT_TOPICS),
            sync_interval,
            debug: flag(ENV_DEBUG),
            timezone: get(ENV_TIMEZONE),
            apps_db_path: get(ENV_APPS_DB).unwrap_or_else(|| DEFAULT_SNAPSHOT_PATH.to_string()),
            workers: get(ENV_WORKERS)
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_WORKERS),
            queue_capacity: get(ENV_QUEUE_CAPACITY)
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_QUEUE_CAPACITY),
            metrics_addr,
        })
    }
}

// Tokens never reach the logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("gotify_url", &self.gotify_url)
            .field("gotify_token", &"<redacted>")
            .field("ntfy_url", &self.ntfy_url)
            .field("ntfy_topic", &self.ntfy_topic)
            .field("ntfy_auth_token", &self.ntfy_auth_token.as_ref().map(|_| "<redacted>"))
            .field("ntfy_priority", &self.ntfy_priority)
            .field("split_topics", &self.split_topics)
            .field("sync_interval", &self.sync_interval)
            .field("debug", &self.debug)
            .field("timezone", &self.timezone)
            .field("apps_db_path", &self.apps_db_path)
            .field("workers", &self.workers)
            .field("queue_capacity", &self.queue_capacity)
            .field("metrics_addr", &self.metrics_addr)
            .finish()
    }
}
