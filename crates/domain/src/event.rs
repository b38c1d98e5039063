//! Event: an immutable record of something the engine did.
//!
//! Events are produced when a scene publishes its own value, when a branch
//! is activated, and when the engine (re)loads its scenes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::EventId;
use crate::scene::{SceneId, SceneValue};

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SceneEventKind {
    /// The scene's own state was written.
    ValuePublished { value: SceneValue, ack: bool },
    /// A branch was activated.
    Activated { is_true: bool },
    /// The engine rebuilt its registry.
    Reloaded { scenes: usize },
}

/// A timestamped engine event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneEvent {
    pub id: EventId,
    pub scene_id: Option<SceneId>,
    #[serde(flatten)]
    pub kind: SceneEventKind,
    pub timestamp: DateTime<Utc>,
}

impl SceneEvent {
    /// Create a new event stamped with the current time.
    #[must_use]
    pub fn new(scene_id: Option<SceneId>, kind: SceneEventKind) -> Self {
        Self {
            id: EventId::new(),
            scene_id,
            kind,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn value_published(scene_id: SceneId, value: SceneValue, ack: bool) -> Self {
        Self::new(Some(scene_id), SceneEventKind::ValuePublished { value, ack })
    }

    #[must_use]
    pub fn activated(scene_id: SceneId, is_true: bool) -> Self {
        Self::new(Some(scene_id), SceneEventKind::Activated { is_true })
    }

    #[must_use]
    pub fn reloaded(scenes: usize) -> Self {
        Self::new(None, SceneEventKind::Reloaded { scenes })
    }
}
