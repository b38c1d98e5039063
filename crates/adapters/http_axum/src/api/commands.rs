//! JSON handler for engine commands.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};

use scenehub_domain::command::{Command, CommandOutcome};
use scenehub_domain::error::{SceneHubError, ValidationError};

use crate::error::ApiError;
use crate::state::AppState;

/// Possible responses from the command endpoint.
pub enum CommandResponse {
    Ok(Json<CommandOutcome>),
}

impl IntoResponse for CommandResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `POST /api/commands/{command}`
///
/// The body is the command payload: `{"sceneId": .., "isForTrue": ..}` or a
/// bare JSON string holding the scene id.
pub async fn run(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<CommandResponse, ApiError> {
    let payload: serde_json::Value = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|_| {
            SceneHubError::from(ValidationError::MalformedCommand {
                command: name.clone(),
                reason: "payload is not valid JSON",
            })
        })?
    };
    let command = Command::parse(&name, &payload).map_err(SceneHubError::from)?;
    tracing::debug!(?command, "running command");
    let outcome = state.engine.command(command).await?;
    Ok(CommandResponse::Ok(Json(outcome)))
}
