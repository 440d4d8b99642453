//! In-process pub/sub for task progress, keyed by `taskId:sessionId`.
//!
//! Subscribers hold an unbounded channel; a dropped [`Subscription`]
//! unregisters itself, and publishing prunes any subscriber whose receiver
//! is gone.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use uipin_core::{topic_key, BusEvent, SessionId, TaskId};

struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<BusEvent>,
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    topics: HashMap<String, Vec<Subscriber>>,
}

/// Fan-out event bus shared between the runner and SSE handlers.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusState>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Subscribe to one task+session topic. The subscription receives every
    /// event published after this call, in publish order.
    pub fn subscribe(&self, task_id: &TaskId, session_id: &SessionId) -> Subscription {
        let key = topic_key(task_id, session_id);
        let (tx, rx) = mpsc::unbounded_channel();

        let mut state = self.state();
        state.next_id += 1;
        let id = state.next_id;
        state
            .topics
            .entry(key.clone())
            .or_default()
            .push(Subscriber { id, tx });

        Subscription {
            bus: self.clone(),
            key,
            id,
            rx,
        }
    }

    /// Deliver an event to every live subscriber of the topic.
    pub fn publish(&self, task_id: &TaskId, session_id: &SessionId, event: &BusEvent) {
        let key = topic_key(task_id, session_id);
        let mut state = self.state();
        if let Some(subscribers) = state.topics.get_mut(&key) {
            subscribers.retain(|subscriber| subscriber.tx.send(event.clone()).is_ok());
            if subscribers.is_empty() {
                state.topics.remove(&key);
            }
        }
    }

    fn unsubscribe(&self, key: &str, id: u64) {
        let mut state = self.state();
        if let Some(subscribers) = state.topics.get_mut(key) {
            subscribers.retain(|subscriber| subscriber.id != id);
            if subscribers.is_empty() {
                state.topics.remove(key);
            }
        }
    }

    #[cfg(test)]
    fn subscriber_count(&self, task_id: &TaskId, session_id: &SessionId) -> usize {
        let key = topic_key(task_id, session_id);
        self.state().topics.get(&key).map_or(0, Vec::len)
    }
}

/// A live topic subscription; dropping it unregisters the subscriber.
pub struct Subscription {
    bus: EventBus,
    key: String,
    id: u64,
    rx: mpsc::UnboundedReceiver<BusEvent>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<BusEvent> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(&self.key, self.id);
    }
}
