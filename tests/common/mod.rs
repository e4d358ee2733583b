#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use rtmngr::{
    Config, Event, EventKind, MemoryTransport, RuntimeBuilder, RuntimeError, RuntimeHandle,
};
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub const R1: &str = "6f1c2c9e-5a4b-4c1e-9a3d-0b8e7f6a5d41";
pub const REG: &str = "realm/proc/reg";

pub fn ctl() -> String {
    format!("realm/proc/control/{R1}")
}

pub fn config() -> Config {
    Config {
        uuid: Some(uuid::Uuid::parse_str(R1).unwrap()),
        name: Some("rt-test".into()),
        ..Config::default()
    }
}

pub struct Harness {
    pub transport: Arc<MemoryTransport>,
    pub handle: RuntimeHandle,
    pub events: broadcast::Receiver<Event>,
    pub run: JoinHandle<Result<(), RuntimeError>>,
}

pub fn start(cfg: Config) -> Harness {
    start_with(cfg, |b| b)
}

pub fn start_with(cfg: Config, f: impl FnOnce(RuntimeBuilder) -> RuntimeBuilder) -> Harness {
    let transport = Arc::new(MemoryTransport::new());
    let (client, handle) = f(RuntimeBuilder::new(cfg, transport.clone())).build();
    let events = handle.events();
    let run = tokio::spawn(client.run());
    Harness {
        transport,
        handle,
        events,
        run,
    }
}

/// Waits for the next event of `kind`, skipping others.
pub async fn next_kind(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
    loop {
        let ev = tokio::time::timeout(Duration::from_secs(30), rx.recv())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {kind:?}"))
            .expect("event bus closed");
        if ev.kind == kind {
            return ev;
        }
    }
}

pub fn ok_response(object_id: &str) -> String {
    json!({"object_id": object_id, "action": "create", "type": "resp", "data": {"result": "ok"}})
        .to_string()
}

pub fn parse(payload: &str) -> Value {
    serde_json::from_str(payload).unwrap()
}

impl Harness {
    /// Answers the next registration request with `ok`; returns its correlation id.
    pub async fn register(&mut self) -> String {
        let sent = next_kind(&mut self.events, EventKind::RegistrationSent).await;
        let id = sent.object_id.unwrap().to_string();
        assert!(self.transport.inject(REG, ok_response(&id)).await);
        next_kind(&mut self.events, EventKind::Registered).await;
        id
    }

    pub async fn expect(&mut self, kind: EventKind) -> Event {
        next_kind(&mut self.events, kind).await
    }

    /// JSON of every publish on `topic`.
    pub async fn sent_on(&self, topic: &str) -> Vec<Value> {
        self.transport
            .published_on(topic)
            .await
            .iter()
            .map(|p| parse(&p.payload))
            .collect()
    }

    pub async fn stop(self) -> Result<(), RuntimeError> {
        self.handle.shutdown();
        self.run.await.unwrap()
    }
}
