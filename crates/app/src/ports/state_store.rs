//! State store port: live device states the engine reads, writes and
//! watches.

use std::collections::BTreeSet;
use std::future::Future;

use serde::{Deserialize, Serialize};

use scenehub_domain::error::SceneHubError;
use scenehub_domain::value::Value;

/// Current value of a state and whether it was acknowledged by its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub value: Option<Value>,
    pub ack: bool,
}

impl StateSnapshot {
    #[must_use]
    pub fn new(value: impl Into<Value>, ack: bool) -> Self {
        Self {
            value: Some(value.into()),
            ack,
        }
    }
}

/// A state-change notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub id: String,
    #[serde(flatten)]
    pub snapshot: StateSnapshot,
}

/// Which state changes the engine wants to receive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Subscription {
    #[default]
    None,
    Ids(BTreeSet<String>),
    /// Every state change, relevant or not.
    All,
}

impl Subscription {
    /// Whether a change of `id` should be delivered.
    #[must_use]
    pub fn covers(&self, id: &str) -> bool {
        match self {
            Self::None => false,
            Self::Ids(ids) => ids.contains(id),
            Self::All => true,
        }
    }
}

/// Read/write access to live states.
pub trait StateStore {
    /// Read a state. `Ok(None)` when the state does not exist.
    fn read(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<StateSnapshot>, SceneHubError>> + Send;

    /// Write a state.
    fn write(
        &self,
        id: &str,
        value: Value,
        ack: bool,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send;

    /// Replace the set of states whose changes are delivered to the engine.
    fn subscribe(
        &self,
        subscription: Subscription,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send;
}

impl<T: StateStore + Send + Sync> StateStore for std::sync::Arc<T> {
    fn read(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<StateSnapshot>, SceneHubError>> + Send {
        (**self).read(id)
    }

    fn write(
        &self,
        id: &str,
        value: Value,
        ack: bool,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        (**self).write(id, value, ack)
    }

    fn subscribe(
        &self,
        subscription: Subscription,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        (**self).subscribe(subscription)
    }
}
