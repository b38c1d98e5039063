//! Tasks pushing the backend's broadcasts into a scene engine.

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use scenehub_app::engine::EngineHandle;

use crate::{MemoryObjectStore, MemoryStateStore};

/// Forward subscribed state changes to the engine until either side closes.
///
/// The subscription to the store is taken before this returns, so no change
/// written afterwards is missed.
pub fn forward_changes(states: &MemoryStateStore, engine: EngineHandle) -> JoinHandle<()> {
    let mut changes = states.changes();
    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(change) => {
                    if engine.state_changed(change).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "engine lagging behind state changes");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("state change forwarding stopped");
    })
}

/// Forward object-change notifications to the engine until either side
/// closes.
pub fn forward_notifications(objects: &MemoryObjectStore, engine: EngineHandle) -> JoinHandle<()> {
    let mut notifications = objects.notifications();
    tokio::spawn(async move {
        loop {
            match notifications.recv().await {
                Ok(id) => {
                    if engine.object_changed(id).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "engine lagging behind object changes");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("object change forwarding stopped");
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use scenehub_app::engine::SceneEngine;
    use scenehub_app::event_bus::InProcessEventBus;
    use scenehub_app::ports::StateStore;
    use scenehub_app::settings::EngineSettings;
    use scenehub_domain::value::Value;
    use serde_json::json;

    use super::*;
    use crate::MemoryDetector;

    #[tokio::test(start_paused = true)]
    async fn should_drive_engine_from_store_changes() {
        let states = Arc::new(MemoryStateStore::default());
        let objects = Arc::new(MemoryObjectStore::default());
        objects.put(
            serde_json::from_value(json!({
                "id": "scene.0.button",
                "native": {
                    "onTrue": { "trigger": { "id": "button.press", "condition": "update" } },
                    "members": [ { "id": "light.a", "setIfTrue": true } ]
                }
            }))
            .unwrap(),
        );
        let detector = Arc::new(MemoryDetector::new(Arc::clone(&states)));
        let bus = Arc::new(InProcessEventBus::new(16));
        let (engine, handle, events) = SceneEngine::new(
            Arc::clone(&states),
            Arc::clone(&objects),
            Arc::clone(&objects),
            detector,
            bus,
            EngineSettings::default(),
        );
        forward_changes(&states, handle.clone());
        forward_notifications(&objects, handle.clone());
        tokio::spawn(engine.run(events));
        handle.list_scenes().await.unwrap();

        states.write("button.press", Value::Bool(true), true).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.list_scenes().await.unwrap();

        let light = states.read("light.a").await.unwrap().unwrap();
        assert_eq!(light.value, Some(Value::Bool(true)));
    }
}
