//! Scene repository port: access to stored scene configuration objects.

use std::future::Future;

use scenehub_domain::config::SceneObject;
use scenehub_domain::error::SceneHubError;
use scenehub_domain::scene::SceneId;

/// Read and update stored scene objects.
///
/// Updating an object is expected to surface as an object-change
/// notification, which in turn reloads the engine.
pub trait SceneRepository {
    /// List every stored scene object, for every engine instance.
    fn list(&self) -> impl Future<Output = Result<Vec<SceneObject>, SceneHubError>> + Send;

    /// Get a scene object by id.
    fn get(
        &self,
        id: &SceneId,
    ) -> impl Future<Output = Result<Option<SceneObject>, SceneHubError>> + Send;

    /// Replace a stored scene object.
    fn update(
        &self,
        object: SceneObject,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send;
}

impl<T: SceneRepository + Send + Sync> SceneRepository for std::sync::Arc<T> {
    fn list(&self) -> impl Future<Output = Result<Vec<SceneObject>, SceneHubError>> + Send {
        (**self).list()
    }

    fn get(
        &self,
        id: &SceneId,
    ) -> impl Future<Output = Result<Option<SceneObject>, SceneHubError>> + Send {
        (**self).get(id)
    }

    fn update(
        &self,
        object: SceneObject,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        (**self).update(object)
    }
}
