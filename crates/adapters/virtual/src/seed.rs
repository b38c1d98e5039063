//! JSON seed document for the virtual backend.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::info;

use scenehub_domain::category::DetectedObject;
use scenehub_domain::config::SceneObject;
use scenehub_domain::error::SceneHubError;
use scenehub_domain::value::Value;

use crate::{MemoryDetector, MemoryObjectStore, MemoryStateStore};

/// Initial content of the virtual backend.
///
/// ```json
/// {
///   "scenes": [ { "id": "scene.0.evening", "native": { "members": [] } } ],
///   "categories": { "enum.rooms.living": ["zigbee.0.lamp"] },
///   "devices": { "zigbee.0.lamp": { "kind": "device", "device_type": "light", "controls": [] } },
///   "states": { "sensor.lux": 120 }
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Seed {
    pub scenes: Vec<SceneObject>,
    pub categories: HashMap<String, Vec<String>>,
    pub devices: HashMap<String, DetectedObject>,
    /// Initial, acknowledged state values.
    pub states: HashMap<String, Value>,
}

impl Seed {
    /// Parse a seed document.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the document is not a valid seed.
    pub fn from_json(json: &str) -> Result<Self, SceneHubError> {
        serde_json::from_str(json).map_err(|err| SceneHubError::Storage(Box::new(err)))
    }

    /// Fill the stores without emitting any notification.
    pub fn apply(
        self,
        states: &MemoryStateStore,
        objects: &MemoryObjectStore,
        detector: &MemoryDetector,
    ) {
        info!(
            scenes = self.scenes.len(),
            categories = self.categories.len(),
            devices = self.devices.len(),
            states = self.states.len(),
            "applying seed"
        );
        for (id, value) in self.states {
            states.seed(id, value, true);
        }
        for (id, members) in self.categories {
            objects.set_category(id, members);
        }
        for object in self.scenes {
            objects.put(object);
        }
        for (id, object) in self.devices {
            detector.register(id, object);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scenehub_app::ports::{CapabilityDetector, CategoryService, SceneRepository, StateStore};

    use super::*;

    const SEED: &str = r#"{
        "scenes": [ { "id": "scene.0.evening", "native": { "members": [ { "id": "light.a", "setIfTrue": true } ] } } ],
        "categories": { "enum.rooms.living": ["zigbee.0.lamp"] },
        "devices": {
            "zigbee.0.lamp": {
                "kind": "device",
                "device_type": "light",
                "controls": [ { "name": "ON", "state_id": "zigbee.0.lamp.on" } ]
            }
        },
        "states": { "sensor.lux": 120, "light.a": false }
    }"#;

    #[tokio::test]
    async fn should_fill_every_store() {
        let states = Arc::new(MemoryStateStore::default());
        let objects = MemoryObjectStore::default();
        let detector = MemoryDetector::new(Arc::clone(&states));

        Seed::from_json(SEED)
            .unwrap()
            .apply(&states, &objects, &detector);

        assert_eq!(objects.list().await.unwrap().len(), 1);
        assert_eq!(
            objects.members("enum.rooms.living").await.unwrap(),
            vec!["zigbee.0.lamp"]
        );
        assert!(matches!(
            detector.describe("zigbee.0.lamp").await.unwrap(),
            Some(DetectedObject::Device { .. })
        ));
        let lux = states.read("sensor.lux").await.unwrap().unwrap();
        assert_eq!(lux.value, Some(Value::from(120)));
        assert!(lux.ack);
    }

    #[test]
    fn should_accept_empty_document() {
        let seed = Seed::from_json("{}").unwrap();
        assert!(seed.scenes.is_empty());
        assert!(seed.states.is_empty());
    }

    #[test]
    fn should_reject_invalid_document() {
        let err = Seed::from_json(r#"{ "scenes": 3 }"#).unwrap_err();
        assert!(matches!(err, SceneHubError::Storage(_)));
    }
}
