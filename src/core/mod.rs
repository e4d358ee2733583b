//! Runtime core: the session state machine and the actor that drives it.
//!
//! The public API from this module is [`RuntimeBuilder`], [`RuntimeClient`],
//! [`RuntimeHandle`], [`RegistrationState`] and the [`ControlHook`] trait.
//!
//! Internal modules:
//! - [`session`]: registration, module requests, reload and cleanup;
//! - [`client`]: the `select!` loop over token, commands, inbound and deadlines;
//! - [`handle`]: caller-side commands, state watch and event receivers;
//! - [`pending`]: creates queued before registration;
//! - [`ledger`]: creates issued after registration;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod builder;
mod client;
mod handle;
mod hook;
mod ledger;
mod pending;
mod session;
mod shutdown;

pub use builder::RuntimeBuilder;
pub use client::RuntimeClient;
pub use handle::RuntimeHandle;
pub use hook::ControlHook;
pub use session::RegistrationState;
