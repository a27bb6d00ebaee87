#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Core event bus for the imgmill service.
//!
//! The bus provides a typed event enum, sequential identifiers, and support
//! for replaying recent events to late subscribers. Internally it uses
//! `tokio::broadcast` with a bounded buffer; when the channel overflows, the
//! oldest events are dropped. Tests assert on emitted events instead of
//! parsing log output.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::sync::broadcast::{Receiver, Sender};
use uuid::Uuid;

/// Identifier assigned to each event emitted by the service.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Typed pipeline events surfaced across the system.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A request entered the pipeline.
    RequestReceived {
        /// Request-scoped identifier.
        request_id: Uuid,
    },
    /// The multipart body was decoded into file parts.
    PartsDecoded {
        /// Request-scoped identifier.
        request_id: Uuid,
        /// Number of file parts found in the body.
        count: usize,
    },
    /// Uploaded parts were written (and archives expanded) into the input area.
    InputsMaterialized {
        /// Request-scoped identifier.
        request_id: Uuid,
        /// Names of the files written to the input area.
        files: Vec<String>,
    },
    /// One variant failed to render; the batch continues.
    VariantFailed {
        /// Request-scoped identifier.
        request_id: Uuid,
        /// Source image filename the variant derives from.
        source: String,
        /// Target width of the failed variant.
        target_width: u32,
        /// Failure detail.
        message: String,
    },
    /// The variant matrix finished rendering.
    VariantsGenerated {
        /// Request-scoped identifier.
        request_id: Uuid,
        /// Number of variant files written.
        outputs: usize,
    },
    /// The output area was serialized into an archive.
    ArchivePacked {
        /// Request-scoped identifier.
        request_id: Uuid,
        /// Size of the packed archive in bytes.
        size_bytes: u64,
    },
    /// The request completed successfully.
    RequestCompleted {
        /// Request-scoped identifier.
        request_id: Uuid,
    },
    /// The request failed before producing an archive.
    RequestFailed {
        /// Request-scoped identifier.
        request_id: Uuid,
        /// Failure detail.
        message: String,
    },
    /// Best-effort working-area removal failed.
    CleanupFailed {
        /// Request-scoped identifier.
        request_id: Uuid,
        /// Path that could not be removed.
        path: String,
    },
}

impl Event {
    /// Machine-friendly discriminator for metrics and log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RequestReceived { .. } => "request_received",
            Self::PartsDecoded { .. } => "parts_decoded",
            Self::InputsMaterialized { .. } => "inputs_materialized",
            Self::VariantFailed { .. } => "variant_failed",
            Self::VariantsGenerated { .. } => "variants_generated",
            Self::ArchivePacked { .. } => "archive_packed",
            Self::RequestCompleted { .. } => "request_completed",
            Self::RequestFailed { .. } => "request_failed",
            Self::CleanupFailed { .. } => "cleanup_failed",
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier assigned at publish time.
    pub id: EventId,
    /// Emission timestamp.
    pub timestamp: DateTime<Utc>,
    /// The event payload.
    pub event: Event,
}

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    buffer: Arc<Mutex<VecDeque<EventEnvelope>>>,
    next_id: Arc<std::sync::atomic::AtomicU64>,
    replay_capacity: usize,
}

impl EventBus {
    /// Construct a new bus with the provided broadcast capacity.
    ///
    /// The broadcast channel uses the same capacity as the in-memory replay
    /// buffer, ensuring dropped events impact both structures consistently.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "event bus capacity must be positive");
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            next_id: Arc::new(std::sync::atomic::AtomicU64::new(1)),
            replay_capacity: capacity,
        }
    }

    /// Construct a bus with the default in-memory buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish a new event to the bus, assigning it a sequential identifier.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    #[must_use]
    pub fn publish(&self, event: Event) -> EventId {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };

        {
            let mut buffer = self.buffer.lock().expect("event buffer mutex poisoned");
            if buffer.len() == self.replay_capacity {
                buffer.pop_front();
            }
            buffer.push_back(envelope.clone());
        }

        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe to the bus, replaying any buffered events newer than `since_id`.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream {
        let mut backlog = VecDeque::new();
        if let Some(since) = since_id {
            let buffer = self.buffer.lock().expect("event buffer mutex poisoned");
            for item in buffer.iter() {
                if item.id > since {
                    backlog.push_back(item.clone());
                }
            }
        }

        let receiver = self.sender.subscribe();
        EventStream { backlog, receiver }
    }

    /// Returns the last assigned identifier, if any events have been published.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        let buffer = self.buffer.lock().expect("event buffer mutex poisoned");
        buffer.back().map(|event| event.id)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream wrapper that yields events either from the replay backlog or from
/// the live broadcast channel.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    receiver: Receiver<EventEnvelope>,
}

impl EventStream {
    /// Receive the next event, respecting the replay backlog first.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }

        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(_)) => self.receiver.recv().await.ok(),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn sample_event(id: usize) -> Event {
        Event::PartsDecoded {
            request_id: Uuid::from_u128(id as u128 + 1),
            count: id,
        }
    }

    #[tokio::test]
    async fn sequential_ids_and_replay() {
        let bus = EventBus::with_capacity(16);

        let mut last_id = 0;
        for i in 0..5 {
            last_id = bus.publish(sample_event(i));
        }
        assert_eq!(last_id, 5);
        assert_eq!(bus.last_event_id(), Some(5));

        let mut stream = bus.subscribe(Some(2));
        let mut received = Vec::new();
        for _ in 0..3 {
            if let Some(event) = stream.next().await {
                received.push(event);
            }
        }

        assert_eq!(received.len(), 3);
        assert_eq!(received.first().unwrap().id, 3);
        assert_eq!(received.last().unwrap().id, 5);
    }

    #[tokio::test]
    async fn live_subscribers_observe_published_events() {
        let bus = EventBus::with_capacity(8);
        let mut stream = bus.subscribe(None);

        let request_id = Uuid::new_v4();
        let _ = bus.publish(Event::RequestReceived { request_id });

        let envelope = timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("event within timeout")
            .expect("bus still open");
        assert_eq!(envelope.event, Event::RequestReceived { request_id });
        assert_eq!(envelope.event.kind(), "request_received");
    }

    #[test]
    fn replay_ring_drops_oldest_events() {
        let bus = EventBus::with_capacity(2);
        for i in 0..4 {
            let _ = bus.publish(sample_event(i));
        }
        // Only the two newest envelopes remain in the ring.
        assert_eq!(bus.last_event_id(), Some(4));
        let buffer = bus.buffer.lock().expect("buffer");
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.front().map(|e| e.id), Some(3));
    }
}
