// src/gotify/rest.rs
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use url::Url;

use super::{apps_url, App, GOTIFY_KEY_HEADER};
use crate::sync::AppSource;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the Gotify REST API (only `/application` is needed).
#[derive(Clone)]
pub struct GotifyClient {
    client: Client,
    apps_url: Url,
    token: String,
}

impl GotifyClient {
    /// Build a client from the configured stream URL and client token.
    pub fn new(stream_url: &str, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build gotify http client")?;
        Ok(Self {
            client,
            apps_url: apps_url(stream_url)?,
            token: token.into(),
        })
    }

    pub fn apps_url(&self) -> &Url {
        &self.apps_url
    }
}

#[async_trait::async_trait]
impl AppSource for GotifyClient {
    async fn fetch_apps(&self) -> Result<Vec<App>> {
        let resp = self
            .client
            .get(self.apps_url.clone())
            .header(GOTIFY_KEY_HEADER, &self.token)
            .send()
            .await
            .context("gotify /application request")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("gotify /application failed: {status}");
        }

        resp.json::<Vec<App>>()
            .await
            .context("parse gotify /application JSON")
    }
}
