//! Collaborator for control messages received after registration.

use crate::protocol::InboundMessage;

/// Receives every message that arrives on the control topic once the runtime
/// is registered (module create/delete requests, responses to our own module
/// requests).
///
/// Called on the runtime actor; implementations must return quickly and must
/// not block. Hand work off to a channel or a spawned task.
///
/// Any `Fn(&str, &InboundMessage)` closure is a hook:
/// ```rust
/// use std::sync::Arc;
/// use rtmngr::{ControlHook, InboundMessage};
///
/// let hook: Arc<dyn ControlHook> = Arc::new(|topic: &str, msg: &InboundMessage| {
///     println!("{topic}: {}", msg.object_id);
/// });
/// # let _ = hook;
/// ```
pub trait ControlHook: Send + Sync + 'static {
    fn on_control(&self, topic: &str, msg: &InboundMessage);
}

impl<F> ControlHook for F
where
    F: Fn(&str, &InboundMessage) + Send + Sync + 'static,
{
    fn on_control(&self, topic: &str, msg: &InboundMessage) {
        self(topic, msg)
    }
}
