//! # Telemetry Batching
//!
//! Queues telemetry events locally and uploads them in batches.
//!
//! ## Usage
//!
//! ```text
//! 1. track(): the event is wrapped in an envelope and queued (never blocks on I/O)
//! 2. flush(): queued envelopes are sent in batch_size chunks
//! 3. On failure: the chunk is requeued at the front, in order
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use flow_core::{TelemetryEvent, TelemetrySink};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::identity::Identity;
use crate::store::current_timestamp_ms;
use crate::transport::EventTransport;
use crate::{ClientResult, RetryConfig};

/// A telemetry event with delivery metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    /// Unique event id, for server-side deduplication.
    pub id: Uuid,
    /// Device that produced the event.
    pub device_id: Uuid,
    /// Identified user at the time of the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Client session the event belongs to.
    pub session_id: Uuid,
    /// When the event was tracked (ms since epoch).
    pub timestamp: u64,
    /// The event itself.
    #[serde(flatten)]
    pub event: TelemetryEvent,
}

/// Outcome of a successful flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushReport {
    /// Events delivered.
    pub sent: usize,
    /// Requests made.
    pub batches: usize,
}

/// Bounded event queue in front of an [`EventTransport`].
pub struct EventBatcher {
    pending: Mutex<VecDeque<EventEnvelope>>,
    transport: Arc<dyn EventTransport>,
    identity: Arc<Identity>,
    session_id: Uuid,
    batch_size: usize,
    max_queue: usize,
    retry: RetryConfig,
    dropped: AtomicU64,
}

impl EventBatcher {
    /// Create a batcher with a fresh session id.
    #[must_use]
    pub fn new(
        transport: Arc<dyn EventTransport>,
        identity: Arc<Identity>,
        batch_size: usize,
        max_queue: usize,
        retry: RetryConfig,
    ) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            transport,
            identity,
            session_id: Uuid::new_v4(),
            batch_size: batch_size.max(1),
            max_queue: max_queue.max(1),
            retry,
            dropped: AtomicU64::new(0),
        }
    }

    /// Session id stamped on every envelope.
    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Number of queued envelopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Envelopes dropped because the queue was full.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Copy of the queued envelopes, oldest first.
    #[must_use]
    pub fn pending(&self) -> Vec<EventEnvelope> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<EventEnvelope>> {
        self.pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn enforce_bound(&self, pending: &mut VecDeque<EventEnvelope>) {
        while pending.len() > self.max_queue {
            pending.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn envelope(&self, event: TelemetryEvent) -> EventEnvelope {
        EventEnvelope {
            id: Uuid::new_v4(),
            device_id: self.identity.device_id(),
            user_id: self.identity.user_id(),
            session_id: self.session_id,
            timestamp: current_timestamp_ms(),
            event,
        }
    }

    fn take_chunk(&self) -> Vec<EventEnvelope> {
        let mut pending = self.lock();
        let n = pending.len().min(self.batch_size);
        pending.drain(..n).collect()
    }

    fn requeue(&self, chunk: Vec<EventEnvelope>) {
        let mut pending = self.lock();
        for envelope in chunk.into_iter().rev() {
            pending.push_front(envelope);
        }
        self.enforce_bound(&mut pending);
    }

    /// Send every queued envelope in `batch_size` chunks.
    ///
    /// Each chunk is retried per the retry policy. On final failure the chunk
    /// goes back to the front of the queue and flushing stops.
    ///
    /// # Errors
    ///
    /// Returns the transport error of the failing chunk.
    pub async fn flush(&self) -> ClientResult<FlushReport> {
        let mut report = FlushReport::default();
        loop {
            let chunk = self.take_chunk();
            if chunk.is_empty() {
                break;
            }
            let result = self
                .retry
                .run("telemetry upload", || self.transport.send_events(&chunk))
                .await;
            match result {
                Ok(()) => {
                    report.sent += chunk.len();
                    report.batches += 1;
                }
                Err(error) => {
                    tracing::warn!(
                        "Telemetry flush failed, requeueing {} events: {error}",
                        chunk.len()
                    );
                    self.requeue(chunk);
                    return Err(error);
                }
            }
        }
        if report.sent > 0 {
            tracing::info!(
                "Flushed {} telemetry events in {} batches",
                report.sent,
                report.batches
            );
        }
        Ok(report)
    }

    /// Flush every `interval` on the current tokio runtime until shut down.
    #[must_use]
    pub fn spawn_flush_task(self: &Arc<Self>, interval: Duration) -> FlushTask {
        let batcher = Arc::clone(self);
        let shutdown = Arc::new(Notify::new());
        let signal = Arc::clone(&shutdown);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = batcher.flush().await {
                            tracing::debug!("Periodic flush failed: {e}");
                        }
                    }
                    () = signal.notified() => {
                        if let Err(e) = batcher.flush().await {
                            tracing::warn!("Final flush failed: {e}");
                        }
                        break;
                    }
                }
            }
        });
        FlushTask { handle, shutdown }
    }
}

impl TelemetrySink for EventBatcher {
    fn track(&self, event: TelemetryEvent) {
        let envelope = self.envelope(event);
        let mut pending = self.lock();
        pending.push_back(envelope);
        self.enforce_bound(&mut pending);
    }
}

/// Handle to the background flush task.
pub struct FlushTask {
    handle: JoinHandle<()>,
    shutdown: Arc<Notify>,
}

impl FlushTask {
    /// Stop the task after one final flush and wait for it.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.handle.await {
            tracing::warn!("Flush task ended abnormally: {e}");
        }
    }
}
