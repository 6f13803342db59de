// src/ntfy.rs
//! ntfy publisher: one POST per notification, no retries.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use url::Url;

use crate::priority::map_priority;

/// Default bound on every publish request.
pub const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// One outgoing ntfy message. `priority` is on the Gotify scale (0–10) and is
/// mapped on the way out; zero means "use the configured default".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub topic: String,
    pub title: String,
    pub body: String,
    pub priority: i64,
}

#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, publication: &Publication) -> Result<()>;
}

/// `{base}/{topic}` with the topic as a single percent-escaped path segment.
pub fn topic_url(base: &str, topic: &str) -> Result<Url> {
    let mut url = Url::parse(base.trim_end_matches('/'))
        .with_context(|| format!("invalid NTFY_URL: {base}"))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("NTFY_URL cannot be a base: {base}"))?
        .pop_if_empty()
        .push(topic.trim_start_matches('/'));
    Ok(url)
}

/// POST `body` to `{base}/{topic}`. Succeeds only on a 2xx response; the
/// request is bounded by `client`'s timeout.
pub async fn deliver(
    client: &Client,
    base: &str,
    topic: &str,
    title: &str,
    body: &str,
    priority: i64,
    auth_token: Option<&str>,
) -> Result<()> {
    let url = topic_url(base, topic)?;
    let mapped = map_priority(priority);
    tracing::debug!(%url, incoming = priority, mapped, "publishing to ntfy");

    let mut req = client
        .post(url)
        .header("Priority", mapped.to_string())
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(body.to_string());
    if !title.is_empty() {
        req = req.header("Title", title);
    }
    if let Some(token) = auth_token {
        req = req.bearer_auth(token);
    }

    let resp = req.send().await.context("ntfy request")?;
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(anyhow!("ntfy error: {status}: {}", text.trim()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct NtfyClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
    default_priority: i64,
    timeout: Duration,
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("build ntfy http client")
}

impl NtfyClient {
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>, default_priority: i64) -> Result<Self> {
        Ok(Self {
            client: build_client(PUBLISH_TIMEOUT)?,
            base_url: base_url.into(),
            auth_token: auth_token.filter(|t| !t.is_empty()),
            default_priority,
            timeout: PUBLISH_TIMEOUT,
        })
    }

    /// Replace the publish timeout (default [`PUBLISH_TIMEOUT`]).
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(timeout)?;
        self.timeout = timeout;
        Ok(self)
    }

    /// Only an unset (zero) priority takes the default; negatives map to 1.
    fn effective_priority(&self, priority: i64) -> i64 {
        if priority == 0 {
            self.default_priority
        } else {
            priority
        }
    }
}

#[async_trait::async_trait]
impl Publisher for NtfyClient {
    async fn publish(&self, p: &Publication) -> Result<()> {
        deliver(
            &self.client,
            &self.base_url,
            &p.topic,
            &p.title,
            &p.body,
            self.effective_priority(p.priority),
            self.auth_token.as_deref(),
        )
        .await
    }
}

impl std::fmt::Debug for NtfyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NtfyClient")
            .field("base_url", &self.base_url)
            .field("auth", &self.auth_token.is_some())
            .field("default_priority", &self.default_priority)
            .field("timeout", &self.timeout)
            .finish()
    }
}
