//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod commands;
#[allow(clippy::missing_errors_doc)]
pub mod scenes;
pub mod sse;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/scenes", get(scenes::list))
        .route("/commands/{command}", post(commands::run))
        .route("/events/stream", get(sse::stream))
}
