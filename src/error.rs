//! Error types used by the runtime client, the message factory and transports.
//!
//! This module defines three enums:
//!
//! - [`RuntimeError`]: errors that end a runtime session.
//! - [`FactoryError`]: a module descriptor that cannot be turned into a create request.
//! - [`TransportError`]: failures reported by a [`Transport`](crate::Transport) implementation.
//!
//! All of them provide `as_label` for logs, and only [`RuntimeError`] is ever returned
//! from [`RuntimeClient::run`](crate::RuntimeClient::run). The other two are recoverable
//! and surface as [`Event`](crate::Event)s.

use thiserror::Error;

/// # Errors that terminate a runtime session.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The transport refused the initial connection. Reconnection is the transport's job,
    /// so the client gives up.
    #[error("transport connect failed: {0}")]
    Connect(#[source] TransportError),

    /// The transport dropped its inbound channel while the session was running.
    #[error("transport inbound channel closed")]
    TransportClosed,

    /// The runtime actor is gone; the command could not be delivered.
    #[error("runtime client is not running")]
    Closed,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use rtmngr::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::Closed.as_label(), "runtime_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Connect(_) => "runtime_connect_failed",
            RuntimeError::TransportClosed => "runtime_transport_closed",
            RuntimeError::Closed => "runtime_closed",
        }
    }
}

/// # Errors produced while building a module create request.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FactoryError {
    /// `instantiate: "single"` requires the descriptor id to be a hyphenated UUID.
    #[error("object id {object_id:?} must be a valid uuid for instantiate=single")]
    InvalidSingleId {
        /// The offending descriptor id.
        object_id: String,
    },
}

impl FactoryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            FactoryError::InvalidSingleId { .. } => "factory_invalid_single_id",
        }
    }
}

/// # Errors reported by a transport.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Broker rejected or never answered the connect handshake.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// An operation was attempted before `connect` succeeded.
    #[error("not connected")]
    NotConnected,

    /// A publish could not be handed to the broker.
    #[error("publish failed: {0}")]
    Publish(String),

    /// A subscribe or unsubscribe was refused.
    #[error("subscription failed: {0}")]
    Subscribe(String),
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use rtmngr::TransportError;
    ///
    /// let err = TransportError::Publish("broker gone".into());
    /// assert_eq!(err.as_label(), "transport_publish");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::ConnectFailed(_) => "transport_connect_failed",
            TransportError::NotConnected => "transport_not_connected",
            TransportError::Publish(_) => "transport_publish",
            TransportError::Subscribe(_) => "transport_subscribe",
        }
    }
}
