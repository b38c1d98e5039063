//! Engine tunables.

use std::time::Duration;

/// Runtime settings of a [`crate::engine::SceneEngine`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Engine instance name. Only scenes owned by it are loaded.
    pub instance: String,
    /// Coalescing window of the per-scene consistency check.
    pub consistency_debounce: Duration,
    /// Above this many watched ids the engine subscribes to every state.
    pub coarse_subscription_threshold: usize,
    /// Capacity of the engine's inbound event channel.
    pub channel_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            instance: "scenes.0".to_string(),
            consistency_debounce: Duration::from_millis(200),
            coarse_subscription_threshold: 200,
            channel_capacity: 1024,
        }
    }
}
