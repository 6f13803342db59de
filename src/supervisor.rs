// src/supervisor.rs
//! Connection supervisor: keeps the Gotify stream alive forever.
//!
//! `Connecting → Streaming → Disconnected → (backoff) → Connecting`, one
//! transition per [`Supervisor::step`]. The process never exits because the
//! upstream went away; it just keeps retrying with capped exponential backoff.

use std::time::Duration;

use anyhow::Result;
use futures_util::stream::BoxStream;
use metrics::counter;
use tracing::{info, warn};

use crate::relay::{run_pipeline, RelayContext};

/// Raw frame payloads from one connection. An `Err` item means the read failed.
pub type FrameStream = BoxStream<'static, Result<Vec<u8>>>;

/// Something that can open the message stream.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<FrameStream>;
}

pub const BACKOFF_BASE: Duration = Duration::from_secs(5);
pub const BACKOFF_CAP: Duration = Duration::from_secs(60);
pub const BACKOFF_MAX_STEP: u32 = 6;

/// `min(base * 2^attempt, cap)`; the attempt counter saturates at `max_step`.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    max_step: u32,
    attempt: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BACKOFF_BASE, BACKOFF_CAP, BACKOFF_MAX_STEP)
    }
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration, max_step: u32) -> Self {
        Self {
            base,
            cap,
            max_step,
            attempt: 0,
        }
    }

    /// Delay to wait now, advancing the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let factor = 1u32.checked_shl(self.attempt).unwrap_or(u32::MAX);
        let delay = self.base.saturating_mul(factor).min(self.cap);
        if self.attempt < self.max_step {
            self.attempt += 1;
        }
        delay
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnState {
    Connecting,
    Streaming,
    Disconnected { reason: String },
}

pub struct Supervisor<C> {
    connector: C,
    ctx: RelayContext,
    backoff: Backoff,
    state: ConnState,
    stream: Option<FrameStream>,
    last_delay: Option<Duration>,
}

impl<C: Connector> Supervisor<C> {
    pub fn new(connector: C, ctx: RelayContext) -> Self {
        Self::with_backoff(connector, ctx, Backoff::default())
    }

    pub fn with_backoff(connector: C, ctx: RelayContext, backoff: Backoff) -> Self {
        Self {
            connector,
            ctx,
            backoff,
            state: ConnState::Connecting,
            stream: None,
            last_delay: None,
        }
    }

    pub fn state(&self) -> &ConnState {
        &self.state
    }

    /// Backoff slept during the most recent `Disconnected → Connecting` step.
    pub fn last_delay(&self) -> Option<Duration> {
        self.last_delay
    }

    /// Perform exactly one state transition and return the new state.
    pub async fn step(&mut self) -> &ConnState {
        let next = match std::mem::replace(&mut self.state, ConnState::Connecting) {
            ConnState::Connecting => match self.connector.connect().await {
                Ok(stream) => {
                    counter!("stream_connect_attempts_total", "outcome" => "ok").increment(1);
                    self.stream = Some(stream);
                    ConnState::Streaming
                }
                Err(e) => {
                    counter!("stream_connect_attempts_total", "outcome" => "error").increment(1);
                    warn!(error = %format!("{e:#}"), "connection error");
                    ConnState::Disconnected {
                        reason: format!("{e:#}"),
                    }
                }
            },
            ConnState::Streaming => match self.stream.take() {
                Some(frames) => {
                    let report = run_pipeline(frames, &self.ctx).await;
                    ConnState::Disconnected {
                        reason: report.close_reason,
                    }
                }
                None => ConnState::Connecting,
            },
            ConnState::Disconnected { reason } => {
                let delay = self.backoff.next_delay();
                info!(%reason, delay_secs = delay.as_secs(), "reconnecting after backoff");
                tokio::time::sleep(delay).await;
                self.last_delay = Some(delay);
                ConnState::Connecting
            }
        };
        self.state = next;
        &self.state
    }

    /// Run the state machine forever.
    pub async fn run(mut self) {
        loop {
            self.step().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        let mut b = Backoff::default();
        let secs: Vec<u64> = (0..9).map(|_| b.next_delay().as_secs()).collect();
        assert_eq!(secs, vec![5, 10, 20, 40, 60, 60, 60, 60, 60]);
        assert_eq!(b.attempt(), BACKOFF_MAX_STEP);
    }

    #[test]
    fn backoff_stays_at_cap_once_saturated() {
        let mut b = Backoff::default();
        for _ in 0..20 {
            b.next_delay();
        }
        assert_eq!(b.attempt(), BACKOFF_MAX_STEP);
        assert_eq!(b.next_delay(), Duration::from_secs(60));
    }

    #[test]
    fn huge_step_limit_does_not_overflow() {
        let mut b = Backoff::new(Duration::from_secs(5), Duration::from_secs(60), 100);
        for _ in 0..100 {
            assert!(b.next_delay() <= Duration::from_secs(60));
        }
    }
}
