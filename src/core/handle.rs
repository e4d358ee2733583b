//! # RuntimeHandle: caller-side access to a running runtime client.
//!
//! The handle is the only way to talk to the actor once `run()` is spawned:
//!
//! ```text
//! RuntimeHandle ──mpsc<Command>──► RuntimeClient (actor)
//!       ▲  ▲                              │
//!       │  └──── watch<RegistrationState> ┤
//!       └─────── broadcast<Event> (Bus) ◄─┘
//! ```
//!
//! ## Rules
//! - Handles are cheap to clone; dropping the **last** one makes the actor clean up and stop.
//! - Commands are applied in the order they are sent, between inbound messages.
//! - A closed actor turns every command into [`RuntimeError::Closed`].

use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::error::RuntimeError;
use crate::events::{Bus, Event};
use crate::protocol::PersistObject;
use crate::template::Variables;

use super::session::RegistrationState;

/// Requests accepted by the runtime actor.
#[derive(Debug)]
pub(crate) enum Command {
    CreateModule {
        descriptor: PersistObject,
        vars: Variables,
    },
    Restart {
        all: bool,
    },
    Reload {
        all: bool,
    },
    Shutdown {
        all: bool,
    },
}

/// Cloneable handle to a [`RuntimeClient`](crate::RuntimeClient).
#[derive(Clone)]
pub struct RuntimeHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<RegistrationState>,
    bus: Bus,
    token: CancellationToken,
    uuid: String,
    debug_topic: String,
}

impl RuntimeHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<Command>,
        state: watch::Receiver<RegistrationState>,
        bus: Bus,
        token: CancellationToken,
        uuid: String,
        debug_topic: String,
    ) -> Self {
        Self {
            commands,
            state,
            bus,
            token,
            uuid,
            debug_topic,
        }
    }

    /// Requests a module from a persisted descriptor.
    ///
    /// Before registration the request is queued and sent, in order, once the
    /// runtime is registered. `vars` override page query variables in templates.
    pub async fn create_module(
        &self,
        descriptor: PersistObject,
        vars: Variables,
    ) -> Result<(), RuntimeError> {
        self.send(Command::CreateModule { descriptor, vars }).await
    }

    /// Re-sends the create requests of owned modules (every module when `all`).
    pub async fn restart(&self, all: bool) -> Result<(), RuntimeError> {
        self.send(Command::Restart { all }).await
    }

    /// Deletes owned modules (every module when `all`) and re-creates them after
    /// the configured reload delay. The runtime itself stays registered.
    pub async fn reload(&self, all: bool) -> Result<(), RuntimeError> {
        self.send(Command::Reload { all }).await
    }

    /// Asks the actor to delete every module it created (not only owned ones),
    /// delete the runtime and stop.
    pub async fn shutdown_all(&self) -> Result<(), RuntimeError> {
        self.send(Command::Shutdown { all: true }).await
    }

    /// Cancels the runtime: owned modules and the runtime are deleted, then the actor stops.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Current registration state.
    pub fn state(&self) -> RegistrationState {
        *self.state.borrow()
    }

    /// Waits until the runtime is registered.
    ///
    /// # Errors
    /// [`RuntimeError::Closed`] if the actor stops first.
    pub async fn registered(&self) -> Result<(), RuntimeError> {
        let mut rx = self.state.clone();
        rx.wait_for(|s| s.is_registered())
            .await
            .map(|_| ())
            .map_err(|_| RuntimeError::Closed)
    }

    /// Receiver for events published from now on.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// The runtime uuid announced to the orchestrator.
    pub fn runtime_uuid(&self) -> &str {
        &self.uuid
    }

    /// Topic where modules of this runtime exchange stdio.
    pub fn debug_topic(&self) -> &str {
        &self.debug_topic
    }

    /// Token cancelled when the runtime is shut down.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    async fn send(&self, cmd: Command) -> Result<(), RuntimeError> {
        self.commands
            .send(cmd)
            .await
            .map_err(|_| RuntimeError::Closed)
    }
}
