// src/gotify/types.rs
use serde::{Deserialize, Serialize};

/// A Gotify application, as returned by `GET /application`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub id: i64,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

impl App {
    /// Token with every character replaced by `*`, for logs.
    pub fn masked_token(&self) -> String {
        "*".repeat(self.token.chars().count())
    }
}

/// One message frame from the Gotify `/stream` WebSocket (trimmed to what we relay).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamMessage {
    pub id: i64,
    pub appid: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub priority: i64,
}
