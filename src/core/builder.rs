use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    events::Bus,
    protocol::{MessageFactory, RuntimeIdentity},
    subscribers::Subscribe,
    template::Variables,
    transport::Transport,
};

use super::{
    client::RuntimeClient,
    handle::RuntimeHandle,
    hook::ControlHook,
    session::{InitCallback, RegistrationState, Session},
};

/// Builder for a [`RuntimeClient`] and its [`RuntimeHandle`].
///
/// With the `logging` feature a [`LogWriter`](crate::LogWriter) is installed
/// ahead of the user subscribers, so registration failures, dropped messages
/// and rejected modules reach `tracing` without extra setup. Turn it off with
/// [`with_log_writer(false)`](Self::with_log_writer). Without the feature the
/// runtime only publishes events; nothing is logged unless a subscriber does it.
pub struct RuntimeBuilder {
    cfg: Config,
    transport: Arc<dyn Transport>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    on_init: Option<InitCallback>,
    hook: Option<Arc<dyn ControlHook>>,
    #[cfg(feature = "logging")]
    log_writer: bool,
}

impl RuntimeBuilder {
    /// Creates a new builder over `transport`.
    pub fn new<T: Transport>(cfg: Config, transport: Arc<T>) -> Self {
        Self {
            cfg,
            transport,
            subscribers: Vec::new(),
            on_init: None,
            hook: None,
            #[cfg(feature = "logging")]
            log_writer: true,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (registration, modules, teardown)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Enables or disables the built-in [`LogWriter`](crate::LogWriter) (on by default).
    #[cfg(feature = "logging")]
    pub fn with_log_writer(mut self, enabled: bool) -> Self {
        self.log_writer = enabled;
        self
    }

    /// Called exactly once, after registration, once queued modules were requested.
    pub fn with_on_init(mut self, f: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.on_init = Some(Box::new(f));
        self
    }

    /// Receives control-topic messages after registration.
    pub fn with_control_hook(mut self, hook: Arc<dyn ControlHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Builds the client and its first handle.
    ///
    /// Runtime uuid and name are fixed here (generated when the config leaves
    /// them unset). Nothing is spawned until [`RuntimeClient::run`] is awaited.
    pub fn build(self) -> (RuntimeClient, RuntimeHandle) {
        let cfg = self.cfg;
        #[allow(unused_mut)]
        let mut subscribers = self.subscribers;
        #[cfg(feature = "logging")]
        if self.log_writer {
            subscribers.insert(0, Arc::new(crate::subscribers::LogWriter::new()));
        }
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let token = CancellationToken::new();

        let identity = RuntimeIdentity::new(
            cfg.uuid,
            cfg.name.clone(),
            cfg.max_nmodules,
            cfg.apis.clone(),
        );
        let query = cfg
            .page_url
            .as_deref()
            .map(Variables::from_query)
            .unwrap_or_default();
        let factory = MessageFactory::new(identity, cfg.filestore.clone(), query);
        let uuid = factory.runtime().uuid.clone();

        let (state_tx, state_rx) = watch::channel(RegistrationState::Unregistered);
        let (cmd_tx, cmd_rx) = mpsc::channel(cfg.command_capacity_clamped());

        let session = Session::new(&cfg, self.transport, factory, bus.clone(), state_tx)
            .with_on_init(self.on_init)
            .with_hook(self.hook);
        let debug_topic = session.debug_topic().to_string();

        let handle = RuntimeHandle::new(
            cmd_tx,
            state_rx,
            bus.clone(),
            token.clone(),
            uuid,
            debug_topic,
        );
        let client = RuntimeClient {
            session,
            commands: cmd_rx,
            subscribers,
            bus,
            token,
            inbound_capacity: cfg.inbound_capacity_clamped(),
            handle_signals: cfg.handle_signals,
        };
        (client, handle)
    }
}

#[cfg(all(test, feature = "logging"))]
mod tests {
    use super::*;
    use crate::events::Event;
    use crate::transport::MemoryTransport;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl Subscribe for Noop {
        async fn on_event(&self, _: &Event) {}

        fn name(&self) -> &'static str {
            "noop"
        }
    }

    fn names(client: &RuntimeClient) -> Vec<&'static str> {
        client.subscribers.iter().map(|s| s.name()).collect()
    }

    #[test]
    fn test_log_writer_installed_by_default() {
        let t = Arc::new(MemoryTransport::new());
        let (client, _h) = RuntimeBuilder::new(Config::default(), t.clone()).build();
        assert_eq!(names(&client), vec!["LogWriter"]);

        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Noop)];
        let (client, _h) = RuntimeBuilder::new(Config::default(), t.clone())
            .with_subscribers(subs.clone())
            .build();
        assert_eq!(names(&client), vec!["LogWriter", "noop"]);

        let (client, _h) = RuntimeBuilder::new(Config::default(), t)
            .with_log_writer(false)
            .with_subscribers(subs)
            .build();
        assert_eq!(names(&client), vec!["noop"]);
    }
}
