//! # Pub/sub transport contract.
//!
//! The runtime client never speaks a wire protocol itself. It drives a
//! [`Transport`] that offers connect-with-last-will, publish, subscribe and
//! unsubscribe, and that pushes inbound messages into an mpsc channel handed
//! over at connect time.
//!
//! ## Architecture
//! ```text
//!  RuntimeClient ──connect(opts, tx)──► Transport ──► broker
//!        ▲                                  │
//!        └──────── mpsc<Inbound> ◄──────────┘ (one message per delivery)
//! ```
//!
//! ## Last will as a failure detector
//! [`LastWill`] is armed once, at connect time, with a pre-serialized
//! delete-runtime message. The broker publishes it if the connection drops
//! without a clean disconnect. It is **not** guaranteed to fire on every
//! disconnect path (a clean close of a dying process looks graceful to the
//! broker), so the client also publishes the same message explicitly on cleanup.
//!
//! Reconnection, if any, belongs to the transport (see [`ConnectOptions::reconnect`]).

mod memory;

pub use memory::{MemoryTransport, Published};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Delivery guarantee requested for a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QoS {
    #[default]
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

/// Message the broker publishes on our behalf after an unclean disconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastWill {
    pub topic: String,
    pub payload: String,
    pub qos: QoS,
    pub retained: bool,
}

impl LastWill {
    /// Arms a last will for `topic`, delivered exactly once and not retained.
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos: QoS::ExactlyOnce,
            retained: false,
        }
    }
}

/// Parameters of the connect handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Client identifier presented to the broker.
    pub client_id: String,
    /// Broker address.
    pub host: String,
    pub username: String,
    pub token: String,
    /// Whether the transport should reconnect by itself after a drop.
    pub reconnect: bool,
    pub last_will: LastWill,
}

/// One message delivered by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub topic: String,
    pub payload: String,
}

impl Inbound {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// A publish/subscribe transport.
///
/// ### Implementation requirements
/// - `connect` completes the handshake (success or failure) before returning and
///   arms `opts.last_will` with the broker.
/// - Every message received on a subscribed topic is sent to `inbound`;
///   dropping `inbound` tells the client the transport is gone for good.
/// - `publish`, `subscribe` and `unsubscribe` must not wait for remote acknowledgement.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opens the connection and arms the last will.
    async fn connect(
        &self,
        opts: ConnectOptions,
        inbound: mpsc::Sender<Inbound>,
    ) -> Result<(), TransportError>;

    async fn subscribe(&self, topic: &str) -> Result<(), TransportError>;

    async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError>;

    async fn publish(
        &self,
        topic: &str,
        payload: String,
        qos: QoS,
        retained: bool,
    ) -> Result<(), TransportError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
