//! # LogWriter: events rendered through `tracing`.
//!
//! A subscriber that turns every [`Event`] into one `tracing` record with
//! structured fields. Install any `tracing` subscriber (e.g. `tracing-subscriber`'s
//! `fmt`) to see them.
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO rtmngr: registration sent topic="realm/proc/reg" object_id="9f1c.." attempt=1
//! WARN rtmngr: registration rejected object_id="9f1c.." reason="{\"result\":\"error\"}"
//! INFO rtmngr: registered object_id="0b7e.." attempt=2 topic="realm/proc/control/R1"
//! INFO rtmngr: module requested module="box.py" object_id="51aa.."
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let topic = e.topic.as_deref().unwrap_or("");
        let object_id = e.object_id.as_deref().unwrap_or("");
        let module = e.module.as_deref().unwrap_or("");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::Connected => {
                tracing::info!(seq = e.seq, transport = reason, last_will = topic, "connected");
            }
            EventKind::ConnectFailed => {
                tracing::error!(seq = e.seq, reason, "connect failed");
            }
            EventKind::TransportClosed => {
                tracing::warn!(seq = e.seq, "transport closed");
            }
            EventKind::SubscribeFailed => {
                tracing::warn!(seq = e.seq, topic, reason, "subscribe failed");
            }
            EventKind::PublishFailed => {
                tracing::warn!(seq = e.seq, topic, object_id, reason, "publish failed");
            }
            EventKind::RegistrationSent => {
                tracing::info!(
                    seq = e.seq,
                    topic,
                    object_id,
                    attempt = e.attempt,
                    retry_ms = e.delay_ms,
                    "registration sent"
                );
            }
            EventKind::RegistrationRejected => {
                tracing::warn!(seq = e.seq, object_id, reason, "registration rejected");
            }
            EventKind::StaleResponse => {
                tracing::debug!(seq = e.seq, object_id, "stale response ignored");
            }
            EventKind::Registered => {
                tracing::info!(
                    seq = e.seq,
                    object_id,
                    attempt = e.attempt,
                    topic,
                    "registered"
                );
            }
            EventKind::MessageDropped => {
                tracing::warn!(seq = e.seq, topic, reason, "malformed message dropped");
            }
            EventKind::ControlReceived => {
                tracing::debug!(seq = e.seq, topic, object_id, "control message");
            }
            EventKind::ModuleQueued => {
                tracing::info!(seq = e.seq, module, pending = e.attempt, "module queued");
            }
            EventKind::ModuleRequested => {
                tracing::info!(seq = e.seq, module, object_id, topic, "module requested");
            }
            EventKind::ModuleRejected => {
                tracing::error!(seq = e.seq, module, reason, "module rejected");
            }
            EventKind::ModuleDeleteSent => {
                tracing::info!(seq = e.seq, module, object_id, "module delete sent");
            }
            EventKind::ReloadScheduled => {
                tracing::info!(seq = e.seq, delay_ms = e.delay_ms, "reload scheduled");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(seq = e.seq, reason, "shutdown requested");
            }
            EventKind::CleanupStarted => {
                tracing::info!(seq = e.seq, modules = e.attempt, "cleanup started");
            }
            EventKind::RuntimeDeleteSent => {
                tracing::info!(seq = e.seq, topic, "runtime delete sent");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(seq = e.seq, subscriber = module, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::warn!(seq = e.seq, subscriber = module, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
