//! Common error types used across the workspace.
//!
//! Each failure family has its own typed enum; [`SceneHubError`] wraps them
//! with `#[from]` conversions so port boundaries carry a single error type.

use crate::scene::SceneId;

/// Top-level error crossing port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum SceneHubError {
    /// An indirect `{{id}}` value could not be resolved.
    #[error("value resolution failed")]
    Resolve(#[from] ResolveError),

    /// Configuration or command input is invalid.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A referenced object is not tracked.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// An adapter failed to read or write.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Failure resolving an indirect value reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The reference was written as `{{}}`.
    #[error("indirect reference is empty")]
    EmptyReference,

    /// The referenced state does not exist or holds no value.
    #[error("referenced state {id} has no value")]
    DanglingReference { id: String },
}

/// Invalid configuration or command input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A scene id is empty.
    #[error("scene id must not be empty")]
    EmptySceneId,

    /// A delay (or burst interval when `member` is `None`) is not a
    /// non-negative integer. The value is coerced to 0.
    #[error("scene {scene}: invalid delay {value:?} (member {member:?}), using 0")]
    InvalidDelay {
        scene: SceneId,
        member: Option<usize>,
        value: String,
    },

    /// A member has neither a state id nor a category selector.
    #[error("scene {scene}: member {member} has no target")]
    MissingMemberTarget { scene: SceneId, member: usize },

    /// A category member could not be mapped to a controllable state.
    #[error("scene {scene}: cannot resolve category member {id}")]
    UnresolvableCategoryMember { scene: SceneId, id: String },

    /// A trigger condition is not one of the known operators.
    #[error("scene {scene}: unknown trigger condition {condition:?}, using ==")]
    UnknownCondition { scene: SceneId, condition: String },

    /// A cron expression could not be parsed.
    #[error("scene {scene}: invalid cron expression {expression:?}")]
    InvalidCron { scene: SceneId, expression: String },

    /// An inbound command payload could not be understood.
    #[error("malformed command {command:?}: {reason}")]
    MalformedCommand {
        command: String,
        reason: &'static str,
    },
}

/// A referenced object does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

impl NotFoundError {
    /// The "unknown scene" error.
    #[must_use]
    pub fn scene(id: &SceneId) -> Self {
        Self {
            entity: "Scene",
            id: id.to_string(),
        }
    }
}
