// src/lib.rs
// Public library surface for integration tests and the binary.

pub mod config;
pub mod gotify;
pub mod ntfy;
pub mod priority;
pub mod registry;
pub mod relay;
pub mod snapshot;
pub mod supervisor;
pub mod sync;
pub mod topic;

pub mod app;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::config::Config;
pub use crate::gotify::{App, StreamMessage};
pub use crate::ntfy::{Publication, Publisher};
pub use crate::priority::map_priority;
pub use crate::registry::AppRegistry;
pub use crate::topic::sanitize_topic;
