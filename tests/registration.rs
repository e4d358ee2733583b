mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::{R1, REG, config, ctl, ok_response, parse, start, start_with};
use rtmngr::{
    EventKind, MemoryTransport, QoS, RegistrationState, RuntimeBuilder, RuntimeError,
    TransportError,
};
use serde_json::json;

#[tokio::test(start_paused = true)]
async fn test_retry_uses_fresh_ids_and_ignores_stale_ok() {
    let mut h = start(config());

    let first = h.expect(EventKind::RegistrationSent).await;
    assert_eq!(first.attempt, Some(1));
    // Nobody answers: the deadline fires and a new request goes out.
    let second = h.expect(EventKind::RegistrationSent).await;
    assert_eq!(second.attempt, Some(2));
    assert_ne!(first.object_id, second.object_id);

    h.transport
        .inject(REG, ok_response(first.object_id.as_deref().unwrap()))
        .await;
    let stale = h.expect(EventKind::StaleResponse).await;
    assert_eq!(stale.object_id, first.object_id);
    assert_eq!(h.handle.state(), RegistrationState::Registering);

    h.transport
        .inject(REG, ok_response(second.object_id.as_deref().unwrap()))
        .await;
    h.expect(EventKind::Registered).await;
    assert_eq!(h.handle.state(), RegistrationState::Registered);

    // Every request announces the same runtime.
    let requests = h.sent_on(REG).await;
    assert_eq!(requests.len(), 2);
    for req in &requests {
        assert_eq!(req["action"], "create");
        assert_eq!(req["type"], "req");
        assert_eq!(req["data"]["type"], "runtime");
        assert_eq!(req["data"]["uuid"], R1);
        assert_eq!(req["data"]["runtime_type"], "browser");
    }

    // The retry deadline is gone once registered.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.sent_on(REG).await.len(), 2);

    h.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_error_result_waits_for_next_attempt() {
    let mut h = start(config());
    let sent = h.expect(EventKind::RegistrationSent).await;
    let body = json!({
        "object_id": sent.object_id.as_deref().unwrap(),
        "type": "resp",
        "data": {"result": "error", "details": "realm full"}
    });
    h.transport.inject(REG, body.to_string()).await;

    let rejected = h.expect(EventKind::RegistrationRejected).await;
    assert!(rejected.reason.as_deref().unwrap().contains("realm full"));

    let retry = h.expect(EventKind::RegistrationSent).await;
    assert_eq!(retry.attempt, Some(2));
    h.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_malformed_message_is_dropped() {
    let mut h = start(config());
    h.expect(EventKind::RegistrationSent).await;
    h.transport.inject(REG, "{\"object_id\": ").await;
    let dropped = h.expect(EventKind::MessageDropped).await;
    assert_eq!(dropped.topic.as_deref(), Some(REG));

    h.register().await;
    h.stop().await.unwrap();
}

#[tokio::test]
async fn test_registered_moves_to_control_topic_and_calls_init_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = calls.clone();
    let mut h = start_with(config(), |b| {
        b.with_on_init(move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    });

    let id = h.register().await;
    assert_eq!(h.transport.subscriptions().await, vec![ctl()]);
    assert_eq!(h.transport.subscribe_log().await, vec![REG.to_string(), ctl()]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.handle.debug_topic(), format!("realm/proc/debug/{R1}"));
    assert_eq!(h.handle.runtime_uuid(), R1);

    // A duplicate ok, now on the control topic, is just a control message.
    h.transport.inject(&ctl(), ok_response(&id)).await;
    h.expect(EventKind::ControlReceived).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    h.stop().await.unwrap();
}

#[tokio::test]
async fn test_control_messages_reach_hook() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut h = start_with(config(), |b| {
        b.with_control_hook(Arc::new(move |topic: &str, msg: &rtmngr::InboundMessage| {
            let _ = tx.send((topic.to_string(), msg.object_id.clone()));
        }))
    });
    h.register().await;

    let req = json!({
        "object_id": "m-1",
        "action": "delete",
        "type": "req",
        "data": {"type": "module"}
    });
    h.transport.inject(&ctl(), req.to_string()).await;

    let (topic, object_id) = rx.recv().await.unwrap();
    assert_eq!(topic, ctl());
    assert_eq!(object_id, "m-1");
    h.stop().await.unwrap();
}

#[tokio::test]
async fn test_last_will_carries_delete_runtime() {
    let mut h = start(config());
    h.expect(EventKind::RegistrationSent).await;

    let opts = h.transport.connect_options().await.unwrap();
    assert_eq!(opts.client_id, R1);
    assert!(opts.reconnect);

    assert!(h.transport.fire_last_will().await);
    let will = h.transport.published().await.pop().unwrap();
    assert_eq!(will.topic, REG);
    assert_eq!(will.qos, QoS::ExactlyOnce);
    assert!(!will.retained);
    let body = parse(&will.payload);
    assert_eq!(body["action"], "delete");
    assert_eq!(body["data"]["type"], "runtime");
    assert_eq!(body["data"]["uuid"], R1);

    // Losing the transport ends the session.
    let res = h.run.await.unwrap();
    assert!(matches!(res, Err(RuntimeError::TransportClosed)));
}

#[tokio::test]
async fn test_connect_failure_is_fatal() {
    let transport = Arc::new(MemoryTransport::refusing("broker unreachable"));
    let (client, handle) = RuntimeBuilder::new(config(), transport.clone()).build();

    let res = client.run().await;
    match res {
        Err(RuntimeError::Connect(TransportError::ConnectFailed(reason))) => {
            assert_eq!(reason, "broker unreachable");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(transport.published().await.is_empty());
    assert!(matches!(handle.registered().await, Err(RuntimeError::Closed)));
}

#[tokio::test]
async fn test_dropping_last_handle_cleans_up() {
    let h = start(config());
    let run = h.run;
    let transport = h.transport;
    drop(h.handle);

    run.await.unwrap().unwrap();
    let last = transport.published().await.pop().unwrap();
    assert_eq!(last.topic, REG);
    assert_eq!(parse(&last.payload)["action"], "delete");
}
