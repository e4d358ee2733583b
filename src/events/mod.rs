//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the runtime session, the client
//! actor and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Session` (protocol decisions), `RuntimeClient` (connect, shutdown),
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the subscriber listener spawned by `RuntimeClient::run`
//!   (fans out to `SubscriberSet`), and any receiver from `RuntimeHandle::events`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
