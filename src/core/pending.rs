//! FIFO of module creates requested before registration completed.
//!
//! Entries are never reordered or deduplicated; the queue is drained whole,
//! once, when the runtime becomes registered.

use std::collections::VecDeque;

use crate::protocol::PersistObject;
use crate::template::Variables;

/// A create request waiting for registration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingCreate {
    pub descriptor: PersistObject,
    pub vars: Variables,
}

#[derive(Debug, Default)]
pub(crate) struct PendingQueue {
    items: VecDeque<PendingCreate>,
}

impl PendingQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends a request; returns the queue length afterwards.
    pub(crate) fn push(&mut self, descriptor: PersistObject, vars: Variables) -> usize {
        self.items.push_back(PendingCreate { descriptor, vars });
        self.items.len()
    }

    /// Takes every queued request in arrival order, leaving the queue empty.
    pub(crate) fn drain(&mut self) -> Vec<PendingCreate> {
        self.items.drain(..).collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ProgramAttributes;

    fn obj(name: &str) -> PersistObject {
        PersistObject::new(
            format!("id-{name}"),
            ProgramAttributes {
                name: name.to_string(),
                ..ProgramAttributes::default()
            },
        )
    }

    #[test]
    fn test_drain_keeps_arrival_order() {
        let mut q = PendingQueue::new();
        assert_eq!(q.push(obj("c1"), Variables::new()), 1);
        assert_eq!(q.push(obj("c2"), Variables::new()), 2);
        assert_eq!(q.push(obj("c1"), Variables::new()), 3);

        let names: Vec<_> = q
            .drain()
            .into_iter()
            .map(|p| p.descriptor.attributes.name)
            .collect();
        assert_eq!(names, vec!["c1", "c2", "c1"]);
        assert!(q.is_empty());
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn test_vars_travel_with_descriptor() {
        let mut q = PendingQueue::new();
        q.push(obj("c1"), Variables::from_pairs([("scene", "lobby")]));
        let drained = q.drain();
        assert_eq!(drained[0].vars.get("scene"), Some("lobby"));
    }
}
