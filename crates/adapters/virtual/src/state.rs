//! In-memory state store.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::trace;

use scenehub_app::ports::{StateChange, StateSnapshot, StateStore, Subscription};
use scenehub_domain::error::SceneHubError;
use scenehub_domain::value::Value;

use crate::lock;

/// States kept in a map. Every write is broadcast as a [`StateChange`] when
/// the current subscription covers it.
pub struct MemoryStateStore {
    states: Mutex<HashMap<String, StateSnapshot>>,
    subscription: Mutex<Subscription>,
    changes: broadcast::Sender<StateChange>,
}

impl MemoryStateStore {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self {
            states: Mutex::new(HashMap::new()),
            subscription: Mutex::new(Subscription::None),
            changes,
        }
    }

    /// Receive the changes selected by the engine's subscription.
    #[must_use]
    pub fn changes(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }

    /// Set a state without notifying anyone.
    pub fn seed(&self, id: impl Into<String>, value: Value, ack: bool) {
        lock(&self.states).insert(
            id.into(),
            StateSnapshot {
                value: Some(value),
                ack,
            },
        );
    }

    /// Whether a state with this id exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        lock(&self.states).contains_key(id)
    }

    #[must_use]
    pub fn snapshot(&self, id: &str) -> Option<StateSnapshot> {
        lock(&self.states).get(id).cloned()
    }

    fn store(&self, id: &str, value: Value, ack: bool) {
        let snapshot = StateSnapshot {
            value: Some(value),
            ack,
        };
        lock(&self.states).insert(id.to_string(), snapshot.clone());
        if lock(&self.subscription).covers(id) {
            trace!(id, ack, "broadcasting state change");
            // send only fails without receivers
            let _ = self.changes.send(StateChange {
                id: id.to_string(),
                snapshot,
            });
        }
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl StateStore for MemoryStateStore {
    fn read(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<StateSnapshot>, SceneHubError>> + Send {
        let r = self.snapshot(id);
        async { Ok(r) }
    }

    fn write(
        &self,
        id: &str,
        value: Value,
        ack: bool,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        self.store(id, value, ack);
        async { Ok(()) }
    }

    fn subscribe(
        &self,
        subscription: Subscription,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        *lock(&self.subscription) = subscription;
        async { Ok(()) }
    }
}
