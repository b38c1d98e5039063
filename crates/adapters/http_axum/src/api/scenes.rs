//! JSON handlers for scenes.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};

use scenehub_app::engine::SceneStatus;

use crate::error::ApiError;
use crate::state::AppState;

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<SceneStatus>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/scenes`
pub async fn list(State(state): State<AppState>) -> Result<ListResponse, ApiError> {
    let scenes = state.engine.list_scenes().await?;
    Ok(ListResponse::Ok(Json(scenes)))
}
