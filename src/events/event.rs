//! # Runtime events emitted by the runtime client.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Connection events**: transport handshake and loss
//! - **Registration events**: attempts, rejections, stale responses, success
//! - **Module events**: queued, requested, rejected, deleted
//! - **Teardown events**: cleanup and runtime deletion
//!
//! The [`Event`] struct carries metadata such as timestamps, topic, correlation id,
//! module name and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use rtmngr::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::RegistrationSent)
//!     .with_topic("realm/proc/reg")
//!     .with_object_id("8a4c...")
//!     .with_attempt(3);
//!
//! assert_eq!(ev.kind, EventKind::RegistrationSent);
//! assert_eq!(ev.topic.as_deref(), Some("realm/proc/reg"));
//! assert_eq!(ev.attempt, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `module`: subscriber name
    /// - `reason`: panic info
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `module`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    // === Connection events ===
    /// Transport handshake succeeded and the last will is armed.
    ///
    /// Sets:
    /// - `topic`: last-will topic
    /// - `reason`: transport name
    Connected,

    /// Transport handshake failed; the session ends.
    ///
    /// Sets:
    /// - `reason`: transport error
    ConnectFailed,

    /// Transport dropped its inbound channel.
    TransportClosed,

    /// A subscribe or unsubscribe was refused by the transport.
    ///
    /// Sets:
    /// - `topic`: topic
    /// - `reason`: transport error
    SubscribeFailed,

    /// A publish was refused by the transport.
    ///
    /// Sets:
    /// - `topic`: topic
    /// - `object_id`: message correlation id
    /// - `reason`: transport error
    PublishFailed,

    // === Registration events ===
    /// Registration request published.
    ///
    /// Sets:
    /// - `topic`: registration topic
    /// - `object_id`: new outstanding correlation id
    /// - `attempt`: attempt number (1-based)
    /// - `delay_ms`: time until the next attempt
    RegistrationSent,

    /// The orchestrator answered the outstanding request with a non-ok result.
    ///
    /// Sets:
    /// - `object_id`: correlation id
    /// - `reason`: response data
    RegistrationRejected,

    /// A response whose correlation id is not the outstanding one was ignored.
    ///
    /// Sets:
    /// - `object_id`: the response's correlation id
    StaleResponse,

    /// Registration confirmed; the runtime is live.
    ///
    /// Sets:
    /// - `object_id`: correlation id that was confirmed
    /// - `attempt`: attempt number that succeeded
    /// - `topic`: control topic now subscribed
    Registered,

    // === Inbound events ===
    /// An inbound message could not be parsed and was dropped.
    ///
    /// Sets:
    /// - `topic`: source topic
    /// - `reason`: parse error
    MessageDropped,

    /// A control message arrived after registration.
    ///
    /// Sets:
    /// - `topic`: source topic
    /// - `object_id`: message correlation id
    ControlReceived,

    // === Module events ===
    /// A module create was queued until registration completes.
    ///
    /// Sets:
    /// - `module`: module name
    /// - `attempt`: queue length after insertion
    ModuleQueued,

    /// A create-module request was published (fresh or restart).
    ///
    /// Sets:
    /// - `topic`: control topic
    /// - `object_id`: request correlation id
    /// - `module`: module name
    ModuleRequested,

    /// A module descriptor could not be turned into a request; nothing was sent.
    ///
    /// Sets:
    /// - `module`: module name
    /// - `reason`: factory error
    ModuleRejected,

    /// A delete-module request was published.
    ///
    /// Sets:
    /// - `topic`: control topic
    /// - `object_id`: request correlation id
    /// - `module`: module name
    ModuleDeleteSent,

    /// A reload is waiting before re-creating modules.
    ///
    /// Sets:
    /// - `delay_ms`: reload delay
    ReloadScheduled,

    // === Teardown events ===
    /// Termination observed (token cancelled, handles dropped or OS signal).
    ///
    /// Sets:
    /// - `reason`: trigger
    ShutdownRequested,

    /// Cleanup started.
    ///
    /// Sets:
    /// - `attempt`: number of modules about to be deleted
    CleanupStarted,

    /// The delete-runtime message was published explicitly.
    ///
    /// Sets:
    /// - `topic`: registration topic
    RuntimeDeleteSent,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Topic involved, if any.
    pub topic: Option<Arc<str>>,
    /// Correlation id of the message involved.
    pub object_id: Option<Arc<str>>,
    /// Module (or subscriber) name.
    pub module: Option<Arc<str>>,
    /// Attempt number or count, depending on the kind.
    pub attempt: Option<u32>,
    /// Delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, rejection details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            topic: None,
            object_id: None,
            module: None,
            attempt: None,
            delay_ms: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_topic(mut self, topic: impl Into<Arc<str>>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    #[inline]
    pub fn with_object_id(mut self, id: impl Into<Arc<str>>) -> Self {
        self.object_id = Some(id.into());
        self
    }

    #[inline]
    pub fn with_module(mut self, name: impl Into<Arc<str>>) -> Self {
        self.module = Some(name.into());
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_module(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_module(subscriber)
            .with_reason(info)
    }

    /// Delay as a [`Duration`], if set.
    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(|ms| Duration::from_millis(u64::from(ms)))
    }
}
