//! In-memory scene objects and categories.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::debug;

use scenehub_app::ports::{CategoryService, SceneRepository};
use scenehub_domain::config::SceneObject;
use scenehub_domain::error::SceneHubError;
use scenehub_domain::scene::SceneId;

use crate::lock;

/// Scene objects and category membership lists.
///
/// Each change is announced by broadcasting the changed object's id, the way
/// a configuration database announces object changes.
pub struct MemoryObjectStore {
    scenes: Mutex<BTreeMap<SceneId, SceneObject>>,
    categories: Mutex<HashMap<String, Vec<String>>>,
    notifications: broadcast::Sender<String>,
}

impl MemoryObjectStore {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (notifications, _) = broadcast::channel(capacity.max(1));
        Self {
            scenes: Mutex::new(BTreeMap::new()),
            categories: Mutex::new(HashMap::new()),
            notifications,
        }
    }

    /// Receive the id of every changed object.
    #[must_use]
    pub fn notifications(&self) -> broadcast::Receiver<String> {
        self.notifications.subscribe()
    }

    /// Add or replace a scene object.
    pub fn put(&self, object: SceneObject) {
        let id = object.id.clone();
        lock(&self.scenes).insert(id.clone(), object);
        self.notify(id.as_str());
    }

    /// Remove a scene object. Returns whether it existed.
    pub fn remove(&self, id: &SceneId) -> bool {
        let removed = lock(&self.scenes).remove(id).is_some();
        if removed {
            self.notify(id.as_str());
        }
        removed
    }

    /// Replace the member list of a category.
    pub fn set_category(&self, id: impl Into<String>, members: Vec<String>) {
        let id = id.into();
        lock(&self.categories).insert(id.clone(), members);
        self.notify(&id);
    }

    fn notify(&self, id: &str) {
        debug!(id, "object changed");
        // send only fails without receivers
        let _ = self.notifications.send(id.to_string());
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new(256)
    }
}

impl SceneRepository for MemoryObjectStore {
    fn list(&self) -> impl Future<Output = Result<Vec<SceneObject>, SceneHubError>> + Send {
        let r = lock(&self.scenes).values().cloned().collect();
        async { Ok(r) }
    }

    fn get(
        &self,
        id: &SceneId,
    ) -> impl Future<Output = Result<Option<SceneObject>, SceneHubError>> + Send {
        let r = lock(&self.scenes).get(id).cloned();
        async { Ok(r) }
    }

    fn update(
        &self,
        object: SceneObject,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        self.put(object);
        async { Ok(()) }
    }
}

impl CategoryService for MemoryObjectStore {
    fn members(
        &self,
        category_id: &str,
    ) -> impl Future<Output = Result<Vec<String>, SceneHubError>> + Send {
        let r = lock(&self.categories)
            .get(category_id)
            .cloned()
            .unwrap_or_default();
        async { Ok(r) }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(id: &str) -> SceneObject {
        serde_json::from_value(json!({ "id": id, "native": { "members": [] } })).unwrap()
    }

    #[tokio::test]
    async fn should_notify_on_update() {
        let store = MemoryObjectStore::default();
        let mut notifications = store.notifications();

        store.update(object("scene.0.a")).await.unwrap();

        assert_eq!(notifications.recv().await.unwrap(), "scene.0.a");
        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(store.get(&SceneId::from("scene.0.a")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn should_notify_on_removal_of_existing_object_only() {
        let store = MemoryObjectStore::default();
        store.put(object("scene.0.a"));
        let mut notifications = store.notifications();

        assert!(!store.remove(&SceneId::from("scene.0.b")));
        assert!(store.remove(&SceneId::from("scene.0.a")));

        assert_eq!(notifications.recv().await.unwrap(), "scene.0.a");
        assert!(notifications.try_recv().is_err());
    }

    #[tokio::test]
    async fn should_return_empty_members_for_unknown_category() {
        let store = MemoryObjectStore::default();
        store.set_category("enum.rooms.kitchen", vec!["light.a".to_string()]);

        assert_eq!(store.members("enum.rooms.kitchen").await.unwrap(), vec!["light.a"]);
        assert!(store.members("enum.rooms.attic").await.unwrap().is_empty());
    }
}
