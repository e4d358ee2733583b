//! # Session: the registration and orchestration state machine.
//!
//! A [`Session`] owns everything one runtime knows about itself: its identity
//! (through the [`MessageFactory`]), its registration state, the outstanding
//! registration correlation id, the pending-create queue and the module ledger.
//! It is driven by exactly one task ([`RuntimeClient`](crate::RuntimeClient)), so
//! none of this state is locked.
//!
//! ## Registration
//! ```text
//!             init()                    resp{object_id == outstanding, result: ok}
//! Unregistered ──► Registering ───────────────────────────────────────► Registered
//!                    │    ▲                                                 │
//!      retry_at due  │    │ new object_id,                                  ├─► unsubscribe reg topic
//!                    └────┘ retry_at = now + reg_interval                   ├─► subscribe ctl topic
//!                                                                           ├─► drain pending (FIFO)
//!                                                                           └─► on_init() once
//! ```
//!
//! ## Rules
//! - Only a `resp` whose `object_id` equals the **latest** registration request is honoured.
//! - The retry deadline is cleared when registration succeeds; nothing fires afterwards.
//! - Creates issued before registration are queued, never dropped or reordered.
//! - Publish failures are reported as events and never end the session.
//! - Cleanup never waits for acknowledgements.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::config::Config;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::protocol::{InboundMessage, MessageFactory, ModuleData, PersistObject, ResultCode};
use crate::template::Variables;
use crate::transport::{ConnectOptions, Inbound, LastWill, QoS, Transport};

use super::hook::ControlHook;
use super::ledger::ModuleLedger;
use super::pending::PendingQueue;

/// Registration state of a runtime. `Registered` is terminal for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationState {
    #[default]
    Unregistered,
    Registering,
    Registered,
}

impl RegistrationState {
    pub fn as_str(self) -> &'static str {
        match self {
            RegistrationState::Unregistered => "unregistered",
            RegistrationState::Registering => "registering",
            RegistrationState::Registered => "registered",
        }
    }

    #[inline]
    pub fn is_registered(self) -> bool {
        self == RegistrationState::Registered
    }
}

/// Called once, right after the pending queue has been drained.
pub(crate) type InitCallback = Box<dyn FnOnce() + Send + Sync>;

pub(crate) struct Session {
    transport: Arc<dyn Transport>,
    factory: MessageFactory,
    bus: Bus,
    state: watch::Sender<RegistrationState>,

    reg_topic: String,
    ctl_topic: String,
    dbg_topic: String,
    reg_interval: Duration,
    reload_delay: Duration,
    connect: ConnectOptions,
    will_id: String,

    reg_request: Option<String>,
    attempts: u32,
    retry_at: Option<Instant>,
    reload_at: Option<Instant>,
    reload_all: bool,

    pending: PendingQueue,
    ledger: ModuleLedger,
    on_init: Option<InitCallback>,
    hook: Option<Arc<dyn ControlHook>>,
}

impl Session {
    pub(crate) fn new(
        cfg: &Config,
        transport: Arc<dyn Transport>,
        factory: MessageFactory,
        bus: Bus,
        state: watch::Sender<RegistrationState>,
    ) -> Self {
        let uuid = factory.runtime().uuid.clone();
        let reg_topic = cfg.reg_topic();
        let delete = factory.delete_runtime();
        let will = LastWill::new(reg_topic.clone(), delete.to_json());
        let connect = ConnectOptions {
            client_id: uuid.clone(),
            host: cfg.host.clone(),
            username: cfg.username.clone(),
            token: cfg.token.clone(),
            reconnect: cfg.reconnect,
            last_will: will,
        };

        Self {
            transport,
            factory,
            bus,
            state,
            ctl_topic: cfg.ctl_topic(&uuid),
            dbg_topic: cfg.dbg_topic(&uuid),
            reg_topic,
            reg_interval: cfg.reg_interval,
            reload_delay: cfg.reload_delay,
            connect,
            will_id: delete.object_id,
            reg_request: None,
            attempts: 0,
            retry_at: None,
            reload_at: None,
            reload_all: false,
            pending: PendingQueue::new(),
            ledger: ModuleLedger::new(),
            on_init: None,
            hook: None,
        }
    }

    pub(crate) fn with_on_init(mut self, f: Option<InitCallback>) -> Self {
        self.on_init = f;
        self
    }

    pub(crate) fn with_hook(mut self, hook: Option<Arc<dyn ControlHook>>) -> Self {
        self.hook = hook;
        self
    }

    #[inline]
    pub(crate) fn state(&self) -> RegistrationState {
        *self.state.borrow()
    }

    #[inline]
    pub(crate) fn retry_deadline(&self) -> Option<Instant> {
        self.retry_at
    }

    #[inline]
    pub(crate) fn reload_deadline(&self) -> Option<Instant> {
        self.reload_at
    }

    pub(crate) fn debug_topic(&self) -> &str {
        &self.dbg_topic
    }

    /// Connects the transport with the delete-runtime last will armed, then
    /// starts registering.
    pub(crate) async fn init(
        &mut self,
        inbound: mpsc::Sender<Inbound>,
    ) -> Result<(), RuntimeError> {
        if let Err(e) = self.transport.connect(self.connect.clone(), inbound).await {
            self.bus
                .publish(Event::new(EventKind::ConnectFailed).with_reason(e.to_string()));
            return Err(RuntimeError::Connect(e));
        }
        self.bus
            .publish(
                Event::new(EventKind::Connected)
                    .with_topic(self.reg_topic.as_str())
                    .with_reason(self.transport.name()),
            );

        self.subscribe(&self.reg_topic).await;
        self.register().await;
        Ok(())
    }

    /// Sends a registration request with a fresh correlation id and arms the retry deadline.
    ///
    /// No-op once registered.
    pub(crate) async fn register(&mut self) {
        if self.state().is_registered() {
            return;
        }
        self.set_state(RegistrationState::Registering);

        let msg = self.factory.register_runtime();
        self.reg_request = Some(msg.object_id.clone());
        self.attempts = self.attempts.saturating_add(1);
        self.retry_at = Some(Instant::now() + self.reg_interval);

        self.publish(&self.reg_topic, msg.to_json(), &msg.object_id)
            .await;
        self.bus.publish(
            Event::new(EventKind::RegistrationSent)
                .with_topic(self.reg_topic.as_str())
                .with_object_id(msg.object_id)
                .with_attempt(self.attempts)
                .with_delay(self.reg_interval),
        );
    }

    /// Retry deadline reached without a matching response.
    pub(crate) async fn on_retry_due(&mut self) {
        self.retry_at = None;
        self.register().await;
    }

    /// Handles one message delivered by the transport.
    pub(crate) async fn on_inbound(&mut self, inbound: Inbound) {
        let msg = match InboundMessage::parse(&inbound.payload) {
            Ok(msg) => msg,
            Err(e) => {
                self.bus.publish(
                    Event::new(EventKind::MessageDropped)
                        .with_topic(inbound.topic)
                        .with_reason(e.to_string()),
                );
                return;
            }
        };

        if !self.state().is_registered() {
            self.on_registration_response(msg).await;
            return;
        }

        self.bus.publish(
            Event::new(EventKind::ControlReceived)
                .with_topic(inbound.topic.as_str())
                .with_object_id(msg.object_id.as_str()),
        );
        if let Some(hook) = &self.hook {
            hook.on_control(&inbound.topic, &msg);
        }
    }

    async fn on_registration_response(&mut self, msg: InboundMessage) {
        // Our own request echoes back on the shared topic.
        if !msg.is_response() {
            return;
        }
        if self.reg_request.as_deref() != Some(msg.object_id.as_str()) {
            self.bus
                .publish(Event::new(EventKind::StaleResponse).with_object_id(msg.object_id));
            return;
        }
        if msg.result() != Some(ResultCode::Ok) {
            self.bus.publish(
                Event::new(EventKind::RegistrationRejected)
                    .with_object_id(msg.object_id)
                    .with_reason(msg.data.to_string()),
            );
            return;
        }
        self.on_registered().await;
    }

    /// Registration confirmed: move to the control topic and flush queued creates.
    pub(crate) async fn on_registered(&mut self) {
        self.set_state(RegistrationState::Registered);
        self.retry_at = None;

        self.unsubscribe(&self.reg_topic).await;
        self.subscribe(&self.ctl_topic).await;

        self.bus.publish(
            Event::new(EventKind::Registered)
                .with_object_id(self.reg_request.as_deref().unwrap_or_default())
                .with_attempt(self.attempts)
                .with_topic(self.ctl_topic.as_str()),
        );

        for queued in self.pending.drain() {
            self.create_module_from_persist(queued.descriptor, queued.vars)
                .await;
        }

        if let Some(on_init) = self.on_init.take() {
            on_init();
        }
    }

    /// Requests a module for `descriptor`, or queues it until registration.
    pub(crate) async fn create_module_from_persist(
        &mut self,
        descriptor: PersistObject,
        vars: Variables,
    ) {
        if !self.state().is_registered() {
            let name = descriptor.attributes.name.clone();
            let queued = self.pending.push(descriptor, vars);
            self.bus.publish(
                Event::new(EventKind::ModuleQueued)
                    .with_module(name)
                    .with_attempt(u32::try_from(queued).unwrap_or(u32::MAX)),
            );
            return;
        }

        let affinity = descriptor.affinity();
        let msg = match self.factory.module_from_persist(&descriptor, &vars) {
            Ok(msg) => msg,
            Err(e) => {
                self.bus.publish(
                    Event::new(EventKind::ModuleRejected)
                        .with_module(descriptor.attributes.name)
                        .with_object_id(descriptor.object_id)
                        .with_reason(e.to_string()),
                );
                return;
            }
        };

        self.publish(&self.ctl_topic, msg.to_json(), &msg.object_id)
            .await;
        self.bus.publish(
            Event::new(EventKind::ModuleRequested)
                .with_topic(self.ctl_topic.as_str())
                .with_object_id(msg.object_id.as_str())
                .with_module(descriptor.attributes.name),
        );
        self.ledger.record(affinity, msg);
    }

    /// Re-sends the recorded create requests of owned modules (every module when `all`).
    pub(crate) async fn restart(&mut self, all: bool) {
        for entry in self.ledger.select(all) {
            let name = entry.module().map(|m| m.name.clone()).unwrap_or_default();
            self.publish(&self.ctl_topic, entry.create.to_json(), &entry.create.object_id)
                .await;
            self.bus.publish(
                Event::new(EventKind::ModuleRequested)
                    .with_topic(self.ctl_topic.as_str())
                    .with_object_id(entry.create.object_id.as_str())
                    .with_module(name)
                    .with_reason("restart"),
            );
        }
    }

    /// Deletes owned modules (every module when `all`) and re-creates them after
    /// `reload_delay`. Ignored while another reload is pending.
    pub(crate) async fn reload(&mut self, all: bool) {
        if self.reload_at.is_some() {
            return;
        }
        self.send_deletes(all).await;
        self.reload_at = Some(Instant::now() + self.reload_delay);
        self.reload_all = all;
        self.bus
            .publish(Event::new(EventKind::ReloadScheduled).with_delay(self.reload_delay));
    }

    /// Reload deadline reached.
    pub(crate) async fn on_reload_due(&mut self) {
        self.reload_at = None;
        self.restart(self.reload_all).await;
    }

    /// Session teardown: deletes owned modules (every module when `all`), then
    /// republishes the delete-runtime message in case the last will never fires.
    pub(crate) async fn cleanup(&mut self, all: bool) {
        self.retry_at = None;
        self.reload_at = None;

        let entries = self.ledger.take(all);
        self.bus.publish(
            Event::new(EventKind::CleanupStarted)
                .with_attempt(u32::try_from(entries.len()).unwrap_or(u32::MAX)),
        );
        for entry in &entries {
            if let Some(module) = entry.module() {
                self.send_delete(module).await;
            }
        }

        let will = &self.connect.last_will;
        self.publish(&will.topic, will.payload.clone(), &self.will_id)
            .await;
        self.bus
            .publish(Event::new(EventKind::RuntimeDeleteSent).with_topic(will.topic.as_str()));
    }

    async fn send_deletes(&self, all: bool) {
        for entry in self.ledger.select(all) {
            if let Some(module) = entry.module() {
                self.send_delete(module).await;
            }
        }
    }

    async fn send_delete(&self, module: &ModuleData) {
        let msg = self.factory.delete_module(module);
        self.publish(&self.ctl_topic, msg.to_json(), &msg.object_id)
            .await;
        self.bus.publish(
            Event::new(EventKind::ModuleDeleteSent)
                .with_topic(self.ctl_topic.as_str())
                .with_object_id(msg.object_id)
                .with_module(module.name.as_str()),
        );
    }

    fn set_state(&self, next: RegistrationState) {
        self.state.send_replace(next);
    }

    async fn publish(&self, topic: &str, payload: String, object_id: &str) {
        if let Err(e) = self
            .transport
            .publish(topic, payload, QoS::AtMostOnce, false)
            .await
        {
            self.bus.publish(
                Event::new(EventKind::PublishFailed)
                    .with_topic(topic)
                    .with_object_id(object_id)
                    .with_reason(e.to_string()),
            );
        }
    }

    async fn subscribe(&self, topic: &str) {
        if let Err(e) = self.transport.subscribe(topic).await {
            self.bus.publish(
                Event::new(EventKind::SubscribeFailed)
                    .with_topic(topic)
                    .with_reason(e.to_string()),
            );
        }
    }

    async fn unsubscribe(&self, topic: &str) {
        if let Err(e) = self.transport.unsubscribe(topic).await {
            self.bus.publish(
                Event::new(EventKind::SubscribeFailed)
                    .with_topic(topic)
                    .with_reason(e.to_string()),
            );
        }
    }
}
