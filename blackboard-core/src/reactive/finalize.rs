//! Finalization
//!
//! Work that must wait until the Eval pass has fully drained: trigger resets
//! and observer notifications. Both are queued as the Eval pass produces
//! them and run afterwards, in the order they were queued.
//!
//! Observers never see the graph. A callback gets the notification and an
//! [`EditQueue`] through which it may ask for new input; the engine applies
//! those edits once finalization is over, and they make up the next pass.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::graph::NodeId;
use crate::types::Value;

/// Unique identifier for an observer, issued by the engine it is registered
/// with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// What an observer is told.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A value node settled on a new value.
    ValueChanged { node: NodeId, value: Value },
    /// A trigger fired.
    Provoked { node: NodeId },
}

impl Notification {
    pub fn node(&self) -> NodeId {
        match self {
            Notification::ValueChanged { node, .. } | Notification::Provoked { node } => *node,
        }
    }
}

/// An external write requested by an observer.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    SetValue { node: NodeId, value: Value },
    Provoke { node: NodeId },
}

/// Edits collected from observer callbacks.
#[derive(Debug, Default)]
pub struct EditQueue {
    edits: Vec<Edit>,
}

impl EditQueue {
    pub fn set_input_value(&mut self, node: NodeId, value: impl Into<Value>) {
        self.edits.push(Edit::SetValue {
            node,
            value: value.into(),
        });
    }

    pub fn provoke_trigger(&mut self, node: NodeId) {
        self.edits.push(Edit::Provoke { node });
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, Edit> {
        self.edits.drain(..)
    }
}

/// Observer callback.
pub type Callback = Box<dyn FnMut(&Notification, &mut EditQueue) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Watch {
    Value,
    Provoke,
}

struct Observer {
    node: NodeId,
    watch: Watch,
    callback: Callback,
}

/// A unit of finalization work.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Task {
    Reset(NodeId),
    Notify(ObserverId, Notification),
}

/// Observer registry plus the queue of pending finalization work.
#[derive(Default)]
pub(crate) struct Finalizer {
    observers: IndexMap<ObserverId, Observer>,
    by_node: HashMap<NodeId, Vec<ObserverId>>,
    tasks: Vec<Task>,
    next_id: u64,
}

impl Finalizer {
    pub(crate) fn register(&mut self, node: NodeId, watch: Watch, callback: Callback) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.insert(
            id,
            Observer {
                node,
                watch,
                callback,
            },
        );
        self.by_node.entry(node).or_default().push(id);
        id
    }

    pub(crate) fn unregister(&mut self, id: ObserverId) -> bool {
        let Some(observer) = self.observers.shift_remove(&id) else {
            return false;
        };
        if let Some(ids) = self.by_node.get_mut(&observer.node) {
            ids.retain(|o| *o != id);
            if ids.is_empty() {
                self.by_node.remove(&observer.node);
            }
        }
        self.tasks
            .retain(|task| !matches!(task, Task::Notify(o, _) if *o == id));
        true
    }

    /// Drop every observer of a removed node.
    pub(crate) fn forget_node(&mut self, node: NodeId) {
        for id in self.by_node.remove(&node).unwrap_or_default() {
            self.observers.shift_remove(&id);
        }
        self.tasks.retain(|task| match task {
            Task::Reset(n) => *n != node,
            Task::Notify(_, notification) => notification.node() != node,
        });
    }

    #[cfg(test)]
    pub(crate) fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn queue_reset(&mut self, node: NodeId) {
        self.tasks.push(Task::Reset(node));
    }

    /// Queue a notification for every observer of `node` watching `watch`.
    /// `make` only runs if someone is listening.
    pub(crate) fn queue_notify(&mut self, node: NodeId, watch: Watch, make: impl FnOnce() -> Notification) {
        let Some(ids) = self.by_node.get(&node) else {
            return;
        };
        let mut make = Some(make);
        let mut notification = None;
        for id in ids {
            let matches = self
                .observers
                .get(id)
                .is_some_and(|observer| observer.watch == watch);
            if !matches {
                continue;
            }
            if let Some(make) = make.take() {
                notification = Some(make());
            }
            if let Some(n) = &notification {
                self.tasks.push(Task::Notify(*id, n.clone()));
            }
        }
    }

    pub(crate) fn take_tasks(&mut self) -> Vec<Task> {
        std::mem::take(&mut self.tasks)
    }

    /// Run one observer. Returns false if it was removed in the meantime.
    pub(crate) fn notify(&mut self, id: ObserverId, notification: &Notification, edits: &mut EditQueue) -> bool {
        match self.observers.get_mut(&id) {
            Some(observer) => {
                (observer.callback)(notification, edits);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for Finalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Finalizer")
            .field("observers", &self.observers.len())
            .field("tasks", &self.tasks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn node(i: u32) -> NodeId {
        NodeId::new(i, 0)
    }

    #[test]
    fn observer_ids_are_unique() {
        let mut fin = Finalizer::default();
        let a = fin.register(node(0), Watch::Value, Box::new(|_, _| {}));
        let b = fin.register(node(0), Watch::Value, Box::new(|_, _| {}));
        assert_ne!(a, b);
        assert_eq!(fin.observer_count(), 2);
    }

    #[test]
    fn notifications_only_reach_matching_watchers() {
        let mut fin = Finalizer::default();
        let values = fin.register(node(1), Watch::Value, Box::new(|_, _| {}));
        fin.register(node(1), Watch::Provoke, Box::new(|_, _| {}));

        fin.queue_notify(node(1), Watch::Value, || Notification::ValueChanged {
            node: node(1),
            value: Value::Int(2),
        });
        fin.queue_notify(node(2), Watch::Value, || unreachable!());

        let tasks = fin.take_tasks();
        assert_eq!(tasks.len(), 1);
        assert!(matches!(&tasks[0], Task::Notify(id, _) if *id == values));
    }

    #[test]
    fn callbacks_queue_edits() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut fin = Finalizer::default();
        let id = fin.register(
            node(3),
            Watch::Provoke,
            Box::new(move |n, edits| {
                sink.lock().unwrap().push(n.node());
                edits.provoke_trigger(node(4));
            }),
        );

        let mut edits = EditQueue::default();
        assert!(fin.notify(id, &Notification::Provoked { node: node(3) }, &mut edits));
        assert_eq!(edits.len(), 1);
        assert_eq!(*seen.lock().unwrap(), vec![node(3)]);

        assert!(fin.unregister(id));
        assert!(!fin.notify(id, &Notification::Provoked { node: node(3) }, &mut edits));
    }

    #[test]
    fn forgetting_a_node_drops_its_work() {
        let mut fin = Finalizer::default();
        fin.register(node(5), Watch::Provoke, Box::new(|_, _| {}));
        fin.queue_reset(node(5));
        fin.queue_reset(node(6));
        fin.forget_node(node(5));
        assert_eq!(fin.observer_count(), 0);
        assert_eq!(fin.take_tasks(), vec![Task::Reset(node(6))]);
    }
}
