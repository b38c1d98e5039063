//! Capability detection over known devices and existing states.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use scenehub_app::ports::CapabilityDetector;
use scenehub_domain::category::DetectedObject;
use scenehub_domain::error::SceneHubError;

use crate::lock;
use crate::state::MemoryStateStore;

/// Describes registered devices; any other id that exists in the state
/// store is a plain state.
pub struct MemoryDetector {
    devices: Mutex<HashMap<String, DetectedObject>>,
    states: Arc<MemoryStateStore>,
}

impl MemoryDetector {
    #[must_use]
    pub fn new(states: Arc<MemoryStateStore>) -> Self {
        Self {
            devices: Mutex::new(HashMap::new()),
            states,
        }
    }

    /// Register or replace a device description.
    pub fn register(&self, id: impl Into<String>, object: DetectedObject) {
        lock(&self.devices).insert(id.into(), object);
    }
}

impl CapabilityDetector for MemoryDetector {
    fn describe(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<DetectedObject>, SceneHubError>> + Send {
        let r = lock(&self.devices)
            .get(id)
            .cloned()
            .or_else(|| self.states.contains(id).then_some(DetectedObject::State));
        async { Ok(r) }
    }
}
