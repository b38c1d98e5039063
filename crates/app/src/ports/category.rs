//! Category ports: category membership and device capability detection,
//! both consulted only while expanding category selectors.

use std::future::Future;

use scenehub_domain::category::DetectedObject;
use scenehub_domain::error::SceneHubError;

/// Lists the members of a category (`enum.rooms.kitchen`, …).
pub trait CategoryService {
    /// Member ids of `category_id`; empty when the category is unknown.
    fn members(
        &self,
        category_id: &str,
    ) -> impl Future<Output = Result<Vec<String>, SceneHubError>> + Send;
}

/// Tells plain states apart from devices and lists a device's controls.
pub trait CapabilityDetector {
    /// Describe `id`, or `Ok(None)` when nothing is known about it.
    fn describe(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<DetectedObject>, SceneHubError>> + Send;
}

impl<T: CategoryService + Send + Sync> CategoryService for std::sync::Arc<T> {
    fn members(
        &self,
        category_id: &str,
    ) -> impl Future<Output = Result<Vec<String>, SceneHubError>> + Send {
        (**self).members(category_id)
    }
}

impl<T: CapabilityDetector + Send + Sync> CapabilityDetector for std::sync::Arc<T> {
    fn describe(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<DetectedObject>, SceneHubError>> + Send {
        (**self).describe(id)
    }
}
