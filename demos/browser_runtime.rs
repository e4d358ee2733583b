//! # Browser runtime demo
//!
//! Registers a runtime against a simulated orchestrator over the in-memory
//! transport, requests two modules before registration completes, reloads them,
//! and shuts down.
//!
//! The orchestrator ignores the first registration attempt, so the retry is visible.
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example browser_runtime
//! ```

use std::{sync::Arc, time::Duration};

use rtmngr::{Config, MemoryTransport, PersistObject, RuntimeBuilder, Variables};
use tracing_subscriber::EnvFilter;

const BOX: &str = r#"{
  "object_id": "38bffa0e-b3ab-4f5b-854f-b9dc6b52ec0c",
  "action": "create",
  "persist": true,
  "type": "program",
  "attributes": {
    "name": "arena/py/moving-box",
    "instantiate": "client",
    "filename": "box.py",
    "filetype": "PY",
    "env": ["SCENE=${scene}", "MQTTH=${mqtth}", "REALM=realm", "NAMESPACE=${namespace}"],
    "channels": []
  }
}"#;

const COUNTER: &str = r#"{
  "object_id": "1a7c3c1e-8f3e-4b0f-9d52-3cbb2a7c9a10",
  "attributes": {
    "name": "demo/counter",
    "instantiate": "single",
    "filename": "counter.wasm",
    "args": ["--rt", "${runtimeid}", "--id", "${moduleid}"],
    "channels": [{"path": "/ch/out", "type": "pubsub", "mode": "rw", "params": {"topic": "realm/s/${scene}/out"}}]
  }
}"#;

/// Answers the `n`-th registration request with `result: ok`.
async fn orchestrator(transport: Arc<MemoryTransport>, reg_topic: String, answer_attempt: usize) {
    loop {
        let requests: Vec<_> = transport
            .published_on(&reg_topic)
            .await
            .into_iter()
            .filter_map(|p| serde_json::from_str::<serde_json::Value>(&p.payload).ok())
            .filter(|v| v["action"] == "create")
            .collect();
        if let Some(req) = requests.get(answer_attempt - 1) {
            let resp = serde_json::json!({
                "object_id": req["object_id"],
                "action": "create",
                "type": "resp",
                "data": {"result": "ok"},
            });
            transport.inject(&reg_topic, resp.to_string()).await;
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = Config {
        reg_interval: Duration::from_millis(300),
        reload_delay: Duration::from_millis(200),
        page_url: Some("https://arenaxr.org/?scene=lobby&namespace=demo&mqtth=mqtt.local".into()),
        ..Config::default()
    };
    let reg_topic = cfg.reg_topic();

    let transport = Arc::new(MemoryTransport::new());
    let (client, handle) = RuntimeBuilder::new(cfg, transport.clone())
        .with_on_init(|| tracing::info!("runtime ready"))
        .build();
    let run = tokio::spawn(client.run());

    handle
        .create_module(PersistObject::from_json(BOX)?, Variables::new())
        .await?;
    handle
        .create_module(PersistObject::from_json(COUNTER)?, Variables::new())
        .await?;

    tokio::spawn(orchestrator(transport.clone(), reg_topic, 2));
    handle.registered().await?;
    tracing::info!(uuid = handle.runtime_uuid(), debug = handle.debug_topic(), "registered");

    handle.reload(false).await?;
    tokio::time::sleep(Duration::from_millis(400)).await;

    handle.shutdown();
    run.await??;

    for p in transport.published().await {
        println!("{:<60} {}", p.topic, p.payload);
    }
    Ok(())
}
