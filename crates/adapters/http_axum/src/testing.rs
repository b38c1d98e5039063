//! A running engine over the virtual backend, for handler tests.

use std::sync::Arc;

use scenehub_adapter_virtual::{MemoryDetector, MemoryObjectStore, MemoryStateStore};
use scenehub_app::engine::SceneEngine;
use scenehub_app::event_bus::InProcessEventBus;
use scenehub_app::settings::EngineSettings;
use scenehub_domain::value::Value;

use crate::state::AppState;

pub(crate) async fn spawn_state(
    scenes: Vec<serde_json::Value>,
    states: &[(&str, Value)],
) -> AppState {
    let store = Arc::new(MemoryStateStore::default());
    for (id, value) in states {
        store.seed(*id, value.clone(), true);
    }
    let objects = Arc::new(MemoryObjectStore::default());
    for scene in scenes {
        objects.put(serde_json::from_value(scene).unwrap());
    }
    let detector = Arc::new(MemoryDetector::new(Arc::clone(&store)));
    let bus = Arc::new(InProcessEventBus::new(64));

    let (engine, handle, events) = SceneEngine::new(
        store,
        Arc::clone(&objects),
        objects,
        detector,
        Arc::clone(&bus),
        EngineSettings::default(),
    );
    tokio::spawn(engine.run(events));
    AppState::new(handle, bus)
}

pub(crate) fn scene(id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "common": { "name": "Evening" },
        "native": { "members": [ { "id": "light.a", "setIfTrue": true, "setIfFalse": false } ] }
    })
}
