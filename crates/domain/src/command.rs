//! Inbound commands and their replies.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::scene::{Branch, SceneId};
use crate::value::Value;

/// A request addressed to the engine from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Snapshot current member values into the branch's desired values.
    Save { scene_id: SceneId, branch: Branch },
    Enable { scene_id: SceneId },
    Disable { scene_id: SceneId },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScenePayload {
    scene_id: Option<String>,
    is_for_true: Option<bool>,
}

impl Command {
    /// Parse a command name and its JSON payload.
    ///
    /// The payload is either `{"sceneId": .., "isForTrue": ..}` or the bare
    /// scene id as a string. `isForTrue` defaults to `true`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MalformedCommand`] for unknown commands and
    /// payloads without a usable scene id.
    pub fn parse(name: &str, payload: &serde_json::Value) -> Result<Self, ValidationError> {
        let malformed = |reason| ValidationError::MalformedCommand {
            command: name.to_string(),
            reason,
        };
        let (scene_id, is_for_true) = match payload {
            serde_json::Value::String(id) => (Some(id.clone()), None),
            serde_json::Value::Object(_) => {
                let payload = ScenePayload::deserialize(payload)
                    .map_err(|_| malformed("payload fields have the wrong type"))?;
                (payload.scene_id, payload.is_for_true)
            }
            _ => return Err(malformed("payload must be an object or a scene id")),
        };
        let scene_id = scene_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .map(SceneId::from)
            .ok_or_else(|| malformed("missing sceneId"))?;

        match name {
            "save" => Ok(Self::Save {
                scene_id,
                branch: Branch::from(is_for_true.unwrap_or(true)),
            }),
            "enable" => Ok(Self::Enable { scene_id }),
            "disable" => Ok(Self::Disable { scene_id }),
            _ => Err(malformed("unknown command")),
        }
    }

    #[must_use]
    pub fn scene_id(&self) -> &SceneId {
        match self {
            Self::Save { scene_id, .. } | Self::Enable { scene_id } | Self::Disable { scene_id } => {
                scene_id
            }
        }
    }
}

/// Per configured member result of a save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSaveStatus {
    /// Index of the configured member.
    pub origin: usize,
    pub saved: bool,
}

/// Reply to [`Command::Save`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReport {
    pub all_saved: bool,
    pub members: Vec<MemberSaveStatus>,
}

impl SaveReport {
    #[must_use]
    pub fn new(members: Vec<MemberSaveStatus>) -> Self {
        Self {
            all_saved: members.iter().all(|m| m.saved),
            members,
        }
    }
}

/// Reply to any command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandOutcome {
    Saved(SaveReport),
    Toggled { scene_id: SceneId, enabled: bool },
}

/// The single value shared by every device feeding one configured member.
///
/// `None` when the devices disagree or none reports a value.
#[must_use]
pub fn unanimous(actuals: &[Option<Value>]) -> Option<Value> {
    let (first, rest) = actuals.split_first()?;
    let first = first.as_ref()?;
    rest.iter()
        .all(|v| v.as_ref().is_some_and(|v| v.loosely_eq(first)))
        .then(|| first.clone())
}
