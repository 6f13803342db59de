// src/relay.rs
//! Relay pipeline for one stream connection.
//!
//! A single reader decodes frames and hands them to a bounded queue without
//! ever waiting; a fixed pool of workers drains the queue and publishes to
//! ntfy. When the queue is full the incoming message is dropped (at-most-once,
//! best effort). When the connection ends the queue is closed, workers finish
//! what is already queued, and the session report is returned.

use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use metrics::counter;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::gotify::StreamMessage;
use crate::ntfy::{Publication, Publisher};
use crate::registry::AppRegistry;

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub workers: usize,
    pub queue_capacity: usize,
    /// Route each message to a topic derived from its app's name.
    pub split_topics: bool,
    pub default_topic: String,
}

impl RelaySettings {
    pub fn new(default_topic: impl Into<String>) -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            split_topics: false,
            default_topic: default_topic.into(),
        }
    }
}

/// Everything a worker needs; cloned into each worker task.
#[derive(Clone)]
pub struct RelayContext {
    pub settings: RelaySettings,
    pub registry: AppRegistry,
    pub publisher: Arc<dyn Publisher>,
}

impl RelayContext {
    pub fn new(settings: RelaySettings, registry: AppRegistry, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            settings,
            registry,
            publisher,
        }
    }

    /// Topic a message from `app_id` is published to.
    pub fn topic_for(&self, app_id: i64) -> String {
        if self.settings.split_topics {
            self.registry.topic_for(app_id, &self.settings.default_topic)
        } else {
            self.settings.default_topic.clone()
        }
    }
}

/// Outcome of a non-blocking enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    Accepted,
    /// Queue full; the message was discarded.
    Dropped,
    /// All workers are gone.
    Closed,
}

/// Producer half of the work queue. Dropping it closes the queue.
#[derive(Debug)]
pub struct WorkQueue {
    tx: mpsc::Sender<StreamMessage>,
}

/// Consumer half, shared by all workers of one pool.
pub struct QueueReceiver {
    rx: Arc<Mutex<mpsc::Receiver<StreamMessage>>>,
}

impl WorkQueue {
    /// Queue holding at most `capacity` messages (minimum 1).
    pub fn bounded(capacity: usize) -> (WorkQueue, QueueReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            WorkQueue { tx },
            QueueReceiver {
                rx: Arc::new(Mutex::new(rx)),
            },
        )
    }

    /// Never waits: a full queue drops `msg` (drop-newest).
    pub fn try_enqueue(&self, msg: StreamMessage) -> Enqueue {
        match self.tx.try_send(msg) {
            Ok(()) => Enqueue::Accepted,
            Err(mpsc::error::TrySendError::Full(msg)) => {
                counter!("relay_queue_dropped_total").increment(1);
                warn!(
                    app_id = msg.appid,
                    message_id = msg.id,
                    "message queue full, dropping message"
                );
                Enqueue::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Enqueue::Closed,
        }
    }
}

impl QueueReceiver {
    async fn next(&self) -> Option<StreamMessage> {
        self.rx.lock().await.recv().await
    }
}

/// Build and publish one relayed message. The caller decides what to do with
/// a failure; workers just log it.
pub async fn forward(ctx: &RelayContext, msg: &StreamMessage) -> anyhow::Result<()> {
    let body = if msg.title.is_empty() {
        msg.message.clone()
    } else {
        format!("{}: {}", msg.title, msg.message)
    };
    let publication = Publication {
        topic: ctx.topic_for(msg.appid),
        title: msg.title.clone(),
        body,
        priority: msg.priority,
    };
    debug!(topic = %publication.topic, app_id = msg.appid, message_id = msg.id, "forwarding");
    ctx.publisher.publish(&publication).await
}

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `ctx.settings.workers` workers (at least one) on `receiver`.
    pub fn spawn(ctx: &RelayContext, receiver: QueueReceiver) -> Self {
        let rx = receiver.rx;
        let handles = (1..=ctx.settings.workers.max(1))
            .map(|worker| {
                let ctx = ctx.clone();
                let rx = QueueReceiver { rx: Arc::clone(&rx) };
                tokio::spawn(async move {
                    while let Some(msg) = rx.next().await {
                        match forward(&ctx, &msg).await {
                            Ok(()) => {
                                counter!("relay_deliveries_total", "outcome" => "ok").increment(1);
                                debug!(worker, app_id = msg.appid, message_id = msg.id, "forwarded to ntfy");
                            }
                            Err(e) => {
                                counter!("relay_deliveries_total", "outcome" => "error").increment(1);
                                warn!(
                                    worker,
                                    app_id = msg.appid,
                                    message_id = msg.id,
                                    error = %format!("{e:#}"),
                                    "forward error"
                                );
                            }
                        }
                    }
                    debug!(worker, "worker drained, exiting");
                })
            })
            .collect();
        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Close `queue`, let workers finish everything already queued, join them.
    pub async fn shutdown(self, queue: WorkQueue) {
        drop(queue);
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "relay worker panicked");
            }
        }
    }
}

/// Counters for one connection lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub received: u64,
    pub enqueued: u64,
    pub dropped: u64,
    pub malformed: u64,
    pub close_reason: String,
}

/// Run the reader loop over `frames` until it ends or errors, then drain the
/// workers. Always returns; the connection is considered closed afterwards.
pub async fn run_pipeline<S>(frames: S, ctx: &RelayContext) -> SessionReport
where
    S: Stream<Item = anyhow::Result<Vec<u8>>> + Unpin,
{
    let (queue, receiver) = WorkQueue::bounded(ctx.settings.queue_capacity);
    let pool = WorkerPool::spawn(ctx, receiver);
    let mut report = SessionReport::default();
    let mut frames = frames;

    let close_reason = loop {
        let frame = match frames.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => break format!("{e:#}"),
            None => break "stream closed".to_string(),
        };
        report.received += 1;
        counter!("relay_frames_received_total").increment(1);

        let msg: StreamMessage = match serde_json::from_slice(&frame) {
            Ok(m) => m,
            Err(e) => {
                report.malformed += 1;
                counter!("relay_frames_malformed_total").increment(1);
                warn!(error = %e, "json error, skipping frame");
                continue;
            }
        };

        match queue.try_enqueue(msg) {
            Enqueue::Accepted => report.enqueued += 1,
            Enqueue::Dropped => report.dropped += 1,
            Enqueue::Closed => break "workers stopped".to_string(),
        }
    };
    report.close_reason = close_reason;

    info!(reason = %report.close_reason, "gotify stream ended, draining workers");
    pool.shutdown(queue).await;
    info!(
        received = report.received,
        enqueued = report.enqueued,
        dropped = report.dropped,
        malformed = report.malformed,
        "relay session finished"
    );
    report
}
