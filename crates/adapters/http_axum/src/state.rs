//! Shared application state for axum handlers.

use std::sync::Arc;

use scenehub_app::engine::EngineHandle;
use scenehub_app::event_bus::InProcessEventBus;

/// Application state shared across all axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Handle of the running scene engine.
    pub engine: EngineHandle,
    /// Bus the engine publishes its events on.
    pub event_bus: Arc<InProcessEventBus>,
}

impl AppState {
    #[must_use]
    pub fn new(engine: EngineHandle, event_bus: Arc<InProcessEventBus>) -> Self {
        Self { engine, event_bus }
    }
}
