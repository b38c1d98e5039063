//! Event bus port: publish/subscribe for engine events.

use std::future::Future;

use scenehub_domain::error::SceneHubError;
use scenehub_domain::event::SceneEvent;

/// Publishes engine events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: SceneEvent) -> impl Future<Output = Result<(), SceneHubError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(&self, event: SceneEvent) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        (**self).publish(event)
    }
}
