use huddle_core::{MessageType, SignalMessage};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::error;

/// Everything the transport client publishes to its subscribers.
#[derive(Debug, Clone)]
pub enum SignalEvent {
    Connected,
    Disconnected,
    Error(String),
    Message(SignalMessage),
}

/// Subscription key. `Message` listens to one message type, `AnyMessage` to all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Disconnected,
    Error,
    Message(MessageType),
    AnyMessage,
}

impl SignalEvent {
    fn kinds(&self) -> Vec<EventKind> {
        match self {
            SignalEvent::Connected => vec![EventKind::Connected],
            SignalEvent::Disconnected => vec![EventKind::Disconnected],
            SignalEvent::Error(_) => vec![EventKind::Error],
            SignalEvent::Message(msg) => {
                vec![EventKind::Message(msg.message_type()), EventKind::AnyMessage]
            }
        }
    }
}

pub type Listener = Arc<dyn Fn(&SignalEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    by_kind: HashMap<EventKind, Vec<(SubscriptionId, Listener)>>,
}

impl Listeners {
    pub(crate) fn add(&mut self, kind: EventKind, listener: Listener) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.by_kind.entry(kind).or_default().push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let mut removed = false;
        for entries in self.by_kind.values_mut() {
            let before = entries.len();
            entries.retain(|(entry_id, _)| *entry_id != id);
            removed |= entries.len() != before;
        }
        self.by_kind.retain(|_, entries| !entries.is_empty());
        removed
    }

    fn snapshot(&self, kind: EventKind) -> Vec<Listener> {
        self.by_kind
            .get(&kind)
            .map(|entries| entries.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default()
    }
}

/// Runs every listener registered for `event` outside the registry lock.
/// A panicking listener is logged and the rest still run.
pub(crate) fn publish(listeners: &Mutex<Listeners>, event: &SignalEvent) {
    for kind in event.kinds() {
        let targets = listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot(kind);

        for listener in targets {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                error!("Signaling listener for {:?} panicked", kind);
            }
        }
    }
}
