// src/topic.rs
//! ntfy topic helpers: turn free-text app names into safe topic names.

use anyhow::{bail, Result};
use once_cell::sync::OnceCell;
use regex::Regex;

/// Topic used when sanitizing leaves nothing behind.
pub const FALLBACK_TOPIC: &str = "default";

fn disallowed_run() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9_-]+").expect("static topic regex"))
}

/// Lower-case, collapse every run of characters outside `[a-z0-9_-]` into a
/// single `_`, trim `_` from both ends. Empty output becomes `"default"`.
pub fn sanitize_topic(label: &str) -> String {
    let lowered = label.to_lowercase();
    let replaced = disallowed_run().replace_all(&lowered, "_");
    let trimmed = replaced.trim_matches('_');
    if trimmed.is_empty() {
        FALLBACK_TOPIC.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Local check that a derived topic is usable.
///
/// ntfy topics are virtual: they exist as soon as someone publishes or
/// subscribes. Publishing here would notify subscribers, so nothing is sent.
pub fn ensure_topic(topic: &str) -> Result<()> {
    if topic.is_empty() {
        bail!("topic is empty");
    }
    if sanitize_topic(topic) != topic {
        bail!("topic {topic:?} contains characters outside [a-z0-9_-]");
    }
    tracing::debug!(%topic, "topic validated (no-op)");
    Ok(())
}
