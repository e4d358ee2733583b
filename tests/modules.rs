mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{R1, REG, config, ctl, start, start_with};
use rtmngr::{
    Affinity, Config, Event, EventKind, PersistObject, ProgramAttributes, Subscribe, Variables,
};
use serde_json::json;

const SINGLE_ID: &str = "38bffa0e-b3ab-4f5b-854f-b9dc6b52ec0c";

fn program(name: &str, instantiate: Option<Affinity>) -> PersistObject {
    PersistObject::new(
        SINGLE_ID,
        ProgramAttributes {
            name: name.to_string(),
            instantiate,
            filename: Some(format!("{name}.wasm")),
            ..ProgramAttributes::default()
        },
    )
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_box_scenario() {
    let mut h = start(config());

    let descriptor = PersistObject::from_json(
        r#"{
            "object_id": "38bffa0e-b3ab-4f5b-854f-b9dc6b52ec0c",
            "action": "create",
            "persist": true,
            "type": "program",
            "attributes": {
                "name": "box.py",
                "instantiate": "client",
                "filename": "box.py",
                "filetype": "PY",
                "env": ["SCENE=${scene}", "RT=${runtimeid}"]
            }
        }"#,
    )
    .unwrap();
    h.handle
        .create_module(descriptor, Variables::from_pairs([("scene", "lobby")]))
        .await
        .unwrap();
    h.expect(EventKind::ModuleQueued).await;
    assert!(h.transport.published_on(&ctl()).await.is_empty());

    h.register().await;
    assert_eq!(h.transport.subscriptions().await, vec![ctl()]);

    h.expect(EventKind::ModuleRequested).await;
    let creates = h.sent_on(&ctl()).await;
    assert_eq!(creates.len(), 1);
    let create = &creates[0];
    assert_eq!(create["action"], "create");
    assert_eq!(create["type"], "req");
    assert_eq!(create["data"]["type"], "module");
    assert_eq!(create["data"]["name"], "box.py");
    assert_eq!(create["data"]["filename"], "box.py");
    assert_eq!(create["data"]["parent"]["uuid"], R1);
    assert_ne!(create["data"]["uuid"], SINGLE_ID);
    assert_eq!(create["data"]["env"], json!(["SCENE=lobby", format!("RT={R1}")]));
    assert_eq!(create["data"]["apis"], json!(["python:python3"]));

    h.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_queued_creates_keep_submission_order() {
    let mut h = start(config());
    for name in ["c1", "c2", "c3"] {
        h.handle
            .create_module(program(name, None), Variables::new())
            .await
            .unwrap();
        h.expect(EventKind::ModuleQueued).await;
    }

    h.register().await;
    for _ in 0..3 {
        h.expect(EventKind::ModuleRequested).await;
    }
    let names: Vec<_> = h
        .sent_on(&ctl())
        .await
        .iter()
        .map(|m| m["data"]["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["c1", "c2", "c3"]);

    h.stop().await.unwrap();
}

#[tokio::test]
async fn test_affinity_identity_rules() {
    let mut h = start(config());
    h.register().await;

    h.handle
        .create_module(program("single", Some(Affinity::Single)), Variables::new())
        .await
        .unwrap();
    h.handle
        .create_module(program("client", Some(Affinity::Client)), Variables::new())
        .await
        .unwrap();
    let mut placed = program("placed", None);
    placed.attributes.parent = Some(rtmngr::ParentRef {
        uuid: "other-runtime".into(),
    });
    h.handle
        .create_module(placed, Variables::new())
        .await
        .unwrap();
    for _ in 0..3 {
        h.expect(EventKind::ModuleRequested).await;
    }

    let sent = h.sent_on(&ctl()).await;
    assert_eq!(sent[0]["data"]["uuid"], SINGLE_ID);
    assert!(sent[0]["data"].get("parent").is_none());

    assert_ne!(sent[1]["data"]["uuid"], SINGLE_ID);
    assert_eq!(sent[1]["data"]["parent"]["uuid"], R1);

    assert_ne!(sent[2]["data"]["uuid"], SINGLE_ID);
    assert_ne!(sent[2]["data"]["uuid"], sent[1]["data"]["uuid"]);
    assert_eq!(sent[2]["data"]["parent"]["uuid"], "other-runtime");

    h.stop().await.unwrap();
}

#[tokio::test]
async fn test_invalid_single_id_publishes_nothing() {
    let mut h = start(config());
    h.register().await;

    let mut bad = program("single", Some(Affinity::Single));
    bad.object_id = "not-a-uuid".into();
    h.handle.create_module(bad, Variables::new()).await.unwrap();

    let rejected = h.expect(EventKind::ModuleRejected).await;
    assert_eq!(rejected.module.as_deref(), Some("single"));
    assert!(h.transport.published_on(&ctl()).await.is_empty());

    // Nothing was recorded, so cleanup deletes only the runtime.
    h.handle.shutdown_all().await.unwrap();
    h.run.await.unwrap().unwrap();
    assert!(h.transport.published_on(&ctl()).await.is_empty());
}

#[tokio::test]
async fn test_cleanup_deletes_owned_modules_then_runtime() {
    let mut h = start(config());
    h.register().await;

    for (name, affinity) in [
        ("a", Some(Affinity::Client)),
        ("b", None),
        ("c", Some(Affinity::Client)),
    ] {
        h.handle
            .create_module(program(name, affinity), Variables::new())
            .await
            .unwrap();
        h.expect(EventKind::ModuleRequested).await;
    }
    let creates = h.sent_on(&ctl()).await;
    h.transport.clear_published().await;

    let will = h.transport.connect_options().await.unwrap().last_will;
    let transport = h.transport.clone();
    h.stop().await.unwrap();

    let sent = transport.published().await;
    assert_eq!(sent.len(), 3);

    let deleted: Vec<_> = sent[..2]
        .iter()
        .map(|p| serde_json::from_str::<serde_json::Value>(&p.payload).unwrap())
        .collect();
    for (del, create) in deleted.iter().zip([&creates[0], &creates[2]]) {
        assert_eq!(del["action"], "delete");
        assert_eq!(del["data"]["uuid"], create["data"]["uuid"]);
        assert_ne!(del["object_id"], create["object_id"]);
    }
    assert_eq!(sent[2].topic, REG);
    assert_eq!(sent[2].payload, will.payload);
}

#[tokio::test]
async fn test_shutdown_all_deletes_every_module() {
    let mut h = start(config());
    h.register().await;
    for (name, affinity) in [("a", Some(Affinity::Client)), ("b", None)] {
        h.handle
            .create_module(program(name, affinity), Variables::new())
            .await
            .unwrap();
        h.expect(EventKind::ModuleRequested).await;
    }
    h.transport.clear_published().await;

    h.handle.shutdown_all().await.unwrap();
    h.run.await.unwrap().unwrap();

    let deletes = h.transport.published_on(&ctl()).await;
    assert_eq!(deletes.len(), 2);
    assert_eq!(h.transport.published_on(REG).await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reload_deletes_then_recreates_after_delay() {
    let cfg = Config {
        reload_delay: std::time::Duration::from_secs(1),
        ..config()
    };
    let mut h = start(cfg);
    h.register().await;
    h.handle
        .create_module(program("a", Some(Affinity::Client)), Variables::new())
        .await
        .unwrap();
    h.expect(EventKind::ModuleRequested).await;

    let started = tokio::time::Instant::now();
    h.handle.reload(false).await.unwrap();
    h.handle.reload(false).await.unwrap();
    let scheduled = h.expect(EventKind::ReloadScheduled).await;
    assert_eq!(scheduled.delay_ms, Some(1000));

    let restarted = h.expect(EventKind::ModuleRequested).await;
    assert_eq!(restarted.reason.as_deref(), Some("restart"));
    assert!(started.elapsed() >= std::time::Duration::from_secs(1));

    let sent = h.sent_on(&ctl()).await;
    let actions: Vec<_> = sent.iter().map(|m| m["action"].as_str().unwrap()).collect();
    assert_eq!(actions, vec!["create", "delete", "create"]);
    assert_eq!(sent[2]["object_id"], sent[0]["object_id"]);
    // The runtime itself is untouched.
    assert_eq!(h.sent_on(REG).await.len(), 1);

    h.stop().await.unwrap();
}

struct Recorder(Arc<Mutex<Vec<EventKind>>>);

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.0.lock().unwrap().push(ev.kind);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test]
async fn test_subscribers_see_teardown_before_run_returns() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder: Arc<dyn Subscribe> = Arc::new(Recorder(seen.clone()));
    let mut h = start_with(config(), |b| b.with_subscribers(vec![recorder]));
    h.register().await;
    h.stop().await.unwrap();

    let kinds = seen.lock().unwrap().clone();
    assert_eq!(kinds.first(), Some(&EventKind::Connected));
    assert!(kinds.contains(&EventKind::Registered));
    assert_eq!(kinds.last(), Some(&EventKind::RuntimeDeleteSent));
}
