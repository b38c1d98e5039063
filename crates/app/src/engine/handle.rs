//! Cloneable handle used by adapters to talk to a running engine.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use scenehub_domain::command::{Command, CommandOutcome};
use scenehub_domain::error::SceneHubError;
use scenehub_domain::scene::{RuntimeValue, SceneId};

use crate::ports::StateChange;

/// The engine task is gone.
#[derive(Debug, thiserror::Error)]
#[error("scene engine is not running")]
pub struct EngineStopped;

impl From<EngineStopped> for SceneHubError {
    fn from(err: EngineStopped) -> Self {
        Self::Storage(Box::new(err))
    }
}

/// Summary of one live scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneStatus {
    pub id: SceneId,
    pub name: Option<String>,
    pub virtual_group: bool,
    pub members: usize,
    /// Last value the engine published, if any.
    pub value: Option<RuntimeValue>,
}

/// Inbound engine messages.
#[derive(Debug)]
pub enum EngineEvent {
    StateChanged(StateChange),
    /// A configuration object was created, changed or deleted.
    ObjectChanged {
        id: String,
    },
    Command {
        command: Command,
        reply: oneshot::Sender<Result<CommandOutcome, SceneHubError>>,
    },
    ListScenes {
        reply: oneshot::Sender<Vec<SceneStatus>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Sender side of the engine's inbound channel.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    sender: mpsc::Sender<EngineEvent>,
}

impl EngineHandle {
    pub(crate) fn new(sender: mpsc::Sender<EngineEvent>) -> Self {
        Self { sender }
    }

    async fn send(&self, event: EngineEvent) -> Result<(), SceneHubError> {
        self.sender.send(event).await.map_err(|_| EngineStopped.into())
    }

    /// Forward a state change.
    ///
    /// # Errors
    ///
    /// Returns [`EngineStopped`] (as a storage error) once the engine exited.
    pub async fn state_changed(&self, change: StateChange) -> Result<(), SceneHubError> {
        self.send(EngineEvent::StateChanged(change)).await
    }

    /// Forward an object-change notification.
    ///
    /// # Errors
    ///
    /// Returns [`EngineStopped`] (as a storage error) once the engine exited.
    pub async fn object_changed(&self, id: impl Into<String>) -> Result<(), SceneHubError> {
        self.send(EngineEvent::ObjectChanged { id: id.into() }).await
    }

    /// Run a command and wait for its outcome.
    ///
    /// # Errors
    ///
    /// Returns the command's own error, or [`EngineStopped`] as a storage
    /// error when the engine is gone.
    pub async fn command(&self, command: Command) -> Result<CommandOutcome, SceneHubError> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineEvent::Command { command, reply }).await?;
        rx.await.map_err(|_| SceneHubError::from(EngineStopped))?
    }

    /// List live scenes with their published values.
    ///
    /// # Errors
    ///
    /// Returns [`EngineStopped`] (as a storage error) once the engine exited.
    pub async fn list_scenes(&self) -> Result<Vec<SceneStatus>, SceneHubError> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineEvent::ListScenes { reply }).await?;
        rx.await.map_err(|_| EngineStopped.into())
    }

    /// Stop the engine, cancelling every timer and cron job.
    ///
    /// # Errors
    ///
    /// Returns [`EngineStopped`] (as a storage error) if it already exited.
    pub async fn shutdown(&self) -> Result<(), SceneHubError> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineEvent::Shutdown { reply }).await?;
        rx.await.map_err(|_| EngineStopped.into())
    }
}
