//! # rtmngr
//!
//! **rtmngr** registers a runtime with a pub/sub compute orchestrator and asks it
//! to start and stop program modules (WASM or Python) on the runtime's behalf.
//!
//! It survives unreliable delivery (registration is retried at a fixed interval
//! until a matching acknowledgement arrives), slow orchestrators (module creates
//! issued early are queued in order) and abrupt termination (a delete-runtime
//! message is armed as the transport's last will, and republished on cleanup).
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   caller                          RuntimeClient::run() (one task)
//! ┌───────────────┐  Command   ┌──────────────────────────────────────────┐
//! │ RuntimeHandle │──────────► │ select! { token, commands, inbound,      │
//! │  create_module│            │           retry deadline, reload deadline}│
//! │  reload       │◄── watch ──│                                          │
//! │  registered() │   state    │  Session                                 │
//! └───────────────┘            │   ├─ MessageFactory ─► Variables/resolve │
//!                              │   ├─ PendingQueue (FIFO, before reg)     │
//!                              │   └─ ModuleLedger (after reg, owned set) │
//!                              └──────┬──────────────────────▲────────────┘
//!                                     │ publish/subscribe    │ mpsc<Inbound>
//!                                     ▼                      │
//!                              ┌─────────────────────────────┴─┐
//!                              │ Transport (last will armed)   │
//!                              └───────────────────────────────┘
//!
//!   Session ── publish(Event) ──► Bus ──► listener ──► SubscriberSet ──► LogWriter, ...
//! ```
//!
//! ### Lifecycle
//! ```text
//! build() ─► run()
//!   ├─► connect(last_will = delete-runtime on {realm}/proc/reg)
//!   ├─► subscribe {realm}/proc/reg
//!   ├─► register: new object_id, publish, retry every reg_interval
//!   ├─► resp{object_id == latest, result: ok}
//!   │     ├─► unsubscribe reg, subscribe {realm}/proc/control/{uuid}
//!   │     ├─► request queued modules in order
//!   │     └─► on_init()
//!   ├─► ... create_module / reload / restart / control messages ...
//!   └─► termination (token, last handle dropped, signal, shutdown command)
//!         ├─► delete owned modules
//!         └─► republish delete-runtime
//! ```
//!
//! ## Features
//! | Area               | Description                                              | Key types / traits                       |
//! |--------------------|----------------------------------------------------------|------------------------------------------|
//! | **Runtime client** | Registration, module requests, reload, cleanup           | [`RuntimeBuilder`], [`RuntimeHandle`]    |
//! | **Protocol**       | Wire messages and the module request factory             | [`Message`], [`MessageFactory`]          |
//! | **Templates**      | `${key}` substitution in module launch parameters         | [`Variables`], [`resolve`]               |
//! | **Transport**      | Pub/sub contract with last will; in-memory double        | [`Transport`], [`MemoryTransport`]       |
//! | **Subscriber API** | Hook into runtime events                                 | [`Subscribe`], [`Event`]                 |
//! | **Errors**         | Typed errors for sessions, factory and transports        | [`RuntimeError`], [`FactoryError`]       |
//! | **Configuration**  | Centralized runtime settings                             | [`Config`]                               |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], which renders events through `tracing`;
//!   [`RuntimeBuilder`] installs one unless told otherwise.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use rtmngr::{Config, MemoryTransport, PersistObject, RuntimeBuilder, Variables};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Arc::new(MemoryTransport::new());
//!     let (client, handle) = RuntimeBuilder::new(Config::default(), transport.clone()).build();
//!     let run = tokio::spawn(client.run());
//!
//!     // Queued until the orchestrator acknowledges the registration.
//!     let program = PersistObject::from_json(
//!         r#"{"object_id":"p1","attributes":{"name":"arena/py/box","instantiate":"client","filename":"box.py","filetype":"PY"}}"#,
//!     )?;
//!     handle.create_module(program, Variables::from_pairs([("scene", "lobby")])).await?;
//!
//!     handle.shutdown();
//!     run.await??;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod protocol;
mod subscribers;
mod template;
mod transport;

// ---- Public re-exports ----

pub use config::{Config, TopicOverrides};
pub use core::{ControlHook, RegistrationState, RuntimeBuilder, RuntimeClient, RuntimeHandle};
pub use error::{FactoryError, RuntimeError, TransportError};
pub use events::{Bus, Event, EventKind};
pub use protocol::{
    Action, Affinity, Channel, ChannelParams, FileType, InboundMessage, Message, MessageFactory,
    ModuleData, MsgType, ParentRef, Payload, PersistObject, ProgramAttributes, RUNTIME_TYPE,
    ResultCode, RuntimeData, RuntimeIdentity,
};
pub use subscribers::{Subscribe, SubscriberSet};
pub use template::{Variables, resolve};
pub use transport::{ConnectOptions, Inbound, LastWill, MemoryTransport, Published, QoS, Transport};

// Optional: built-in tracing-backed event writer.
// Enable with: `--features logging` (on by default)
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
