//! # Event Bus System
//!
//! Provides an event-driven view of the audio catalog using `tokio::sync::broadcast`.
//! Hosts subscribe to learn about resources being registered and about the
//! lifecycle of individual playback instances without polling the catalog.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enums for catalog and playback changes
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    emit     ┌───────────┐
//! │ AudioCatalog ├────────────>│           │    subscribe    ┌────────────┐
//! └──────────────┘             │ EventBus  ├────────────────>│ Subscriber │
//! ┌──────────────┐    emit     │ (broadcast│                 └────────────┘
//! │PlayerInstance├────────────>│  channel) │
//! └──────────────┘             └───────────┘
//! ```
//!
//! Player instances emit from whichever thread drives them, including the
//! device threads that deliver completion notifications. Emitting never
//! blocks.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
//!
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus.publish(CoreEvent::Catalog(CatalogEvent::ResourceRemoved {
//!     key: "sfx.jump".to_string(),
//! }));
//!
//! assert!(subscriber.try_recv().is_ok());
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that fall further behind than this receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Resource registration changes
    Catalog(CatalogEvent),
    /// Playback instance lifecycle changes
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Catalog(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
        }
    }

    /// Returns the resource key the event refers to.
    pub fn key(&self) -> &str {
        match self {
            CoreEvent::Catalog(e) => e.key(),
            CoreEvent::Playback(e) => e.key(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::SeekChanged { .. }) => EventSeverity::Debug,
            _ => EventSeverity::Info,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Catalog Events
// ============================================================================

/// Events related to resource registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CatalogEvent {
    /// A resource was registered.
    ResourceAdded {
        /// The resource key.
        key: String,
        /// Routing kind (`"bgm"` or `"sfx"`).
        kind: String,
    },
    /// A resource and all of its instances were removed.
    ResourceRemoved {
        /// The resource key.
        key: String,
    },
}

impl CatalogEvent {
    fn description(&self) -> &str {
        match self {
            CatalogEvent::ResourceAdded { .. } => "Resource added to catalog",
            CatalogEvent::ResourceRemoved { .. } => "Resource removed from catalog",
        }
    }

    fn key(&self) -> &str {
        match self {
            CatalogEvent::ResourceAdded { key, .. } | CatalogEvent::ResourceRemoved { key } => key,
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events related to a single playback instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// Playback started or resumed.
    Started {
        /// The resource key.
        key: String,
        /// The playback instance.
        instance_id: String,
    },
    /// Playback paused.
    Paused {
        /// The resource key.
        key: String,
        /// The playback instance.
        instance_id: String,
    },
    /// Playback stopped by an explicit request.
    Stopped {
        /// The resource key.
        key: String,
        /// The playback instance.
        instance_id: String,
    },
    /// A looping instance reached the end and restarted from zero.
    Looped {
        /// The resource key.
        key: String,
        /// The playback instance.
        instance_id: String,
    },
    /// A non-looping instance finished playing naturally.
    Completed {
        /// The resource key.
        key: String,
        /// The playback instance.
        instance_id: String,
    },
    /// Playback position moved by a seek.
    SeekChanged {
        /// The resource key.
        key: String,
        /// The playback instance.
        instance_id: String,
        /// New position (milliseconds).
        position_ms: u64,
    },
    /// The instance released its decoder and device. No further events follow.
    Disposed {
        /// The resource key.
        key: String,
        /// The playback instance.
        instance_id: String,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Stopped { .. } => "Playback stopped",
            PlaybackEvent::Looped { .. } => "Playback looped",
            PlaybackEvent::Completed { .. } => "Playback completed",
            PlaybackEvent::SeekChanged { .. } => "Playback position changed",
            PlaybackEvent::Disposed { .. } => "Playback instance disposed",
        }
    }

    fn key(&self) -> &str {
        match self {
            PlaybackEvent::Started { key, .. }
            | PlaybackEvent::Paused { key, .. }
            | PlaybackEvent::Stopped { key, .. }
            | PlaybackEvent::Looped { key, .. }
            | PlaybackEvent::Completed { key, .. }
            | PlaybackEvent::SeekChanged { key, .. }
            | PlaybackEvent::Disposed { key, .. } => key,
        }
    }

    /// Returns the instance the event refers to.
    pub fn instance_id(&self) -> &str {
        match self {
            PlaybackEvent::Started { instance_id, .. }
            | PlaybackEvent::Paused { instance_id, .. }
            | PlaybackEvent::Stopped { instance_id, .. }
            | PlaybackEvent::Looped { instance_id, .. }
            | PlaybackEvent::Completed { instance_id, .. }
            | PlaybackEvent::SeekChanged { instance_id, .. }
            | PlaybackEvent::Disposed { instance_id, .. } => instance_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
///
/// Sending does not require a running Tokio runtime, so device threads can
/// publish directly.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; `CatalogConfig::validate` rejects that
    /// value before a bus is built from configuration.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Publishes an event, ignoring the absence of subscribers.
    pub fn publish(&self, event: CoreEvent) {
        let _ = self.sender.send(event);
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all future events.
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with additional filtering capabilities.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let stream = EventStream::new(event_bus.subscribe());
///
/// // Only events for one resource
/// let theme_stream = stream.filter(|event| event.key() == "bgm.theme");
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    /// Drains every matching event that is currently buffered.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Some(result) = self.try_recv() {
            match result {
                Ok(event) => events.push(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn started(key: &str, instance: &str) -> CoreEvent {
        CoreEvent::Playback(PlaybackEvent::Started {
            key: key.to_string(),
            instance_id: instance.to_string(),
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(started("bgm.theme", "a")).is_err());
        // publish swallows the missing-subscriber case
        bus.publish(started("bgm.theme", "a"));
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Catalog(CatalogEvent::ResourceAdded {
            key: "sfx.explosion".to_string(),
            kind: "sfx".to_string(),
        });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe()).filter(|event| event.key() == "bgm.theme");

        bus.publish(started("sfx.jump", "a"));
        bus.publish(started("bgm.theme", "b"));

        let received = stream.recv().await.unwrap();
        assert_eq!(received, started("bgm.theme", "b"));
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.publish(started("sfx.hit", &i.to_string()));
        }

        let result = sub.recv().await;
        assert!(matches!(result, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_try_recv_and_drain() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());

        bus.publish(started("sfx.hit", "a"));
        bus.publish(started("sfx.hit", "b"));

        let events = stream.drain();
        assert_eq!(events.len(), 2);
        assert!(stream.try_recv().is_none());
    }

    #[test]
    fn test_publish_from_other_threads() {
        let bus = EventBus::new(100);
        let mut stream = EventStream::new(bus.subscribe());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let bus = bus.clone();
                std::thread::spawn(move || {
                    for i in 0..5 {
                        bus.publish(started("sfx.hit", &format!("{}-{}", t, i)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stream.drain().len(), 20);
    }

    #[test]
    fn test_event_metadata() {
        let event = CoreEvent::Playback(PlaybackEvent::Looped {
            key: "sfx.engine".to_string(),
            instance_id: "abc".to_string(),
        });
        assert_eq!(event.description(), "Playback looped");
        assert_eq!(event.key(), "sfx.engine");
        assert_eq!(event.severity(), EventSeverity::Info);

        let seek = CoreEvent::Playback(PlaybackEvent::SeekChanged {
            key: "bgm.theme".to_string(),
            instance_id: "abc".to_string(),
            position_ms: 1500,
        });
        assert_eq!(seek.severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Playback(PlaybackEvent::Completed {
            key: "sfx.explosion".to_string(),
            instance_id: "42".to_string(),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("sfx.explosion"));
        assert!(json.contains("Completed"));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }
}
