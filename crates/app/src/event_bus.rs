//! Fan-out of engine events to in-process listeners (SSE clients, tests).

use std::future::Future;

use tokio::sync::broadcast;

use scenehub_domain::error::SceneHubError;
use scenehub_domain::event::SceneEvent;

use crate::ports::EventPublisher;

/// [`EventPublisher`] over a tokio [`broadcast`] channel.
///
/// Events published while nobody listens are dropped. A listener that falls
/// more than `capacity` events behind loses the oldest ones and sees
/// [`broadcast::error::RecvError::Lagged`].
pub struct InProcessEventBus {
    sender: broadcast::Sender<SceneEvent>,
}

impl InProcessEventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Listen to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SceneEvent> {
        self.sender.subscribe()
    }

    /// Number of live listeners.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: SceneEvent) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        // send only fails without receivers
        let _ = self.sender.send(event);
        async { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast::error::RecvError;

    use scenehub_domain::event::SceneEventKind;
    use scenehub_domain::scene::{SceneId, SceneValue};

    use super::*;

    #[tokio::test]
    async fn should_fan_out_engine_events_in_order() {
        let bus = InProcessEventBus::new(16);
        let mut sse = bus.subscribe();
        let mut audit = bus.subscribe();
        let evening = SceneId::from("scene.0.evening");

        bus.publish(SceneEvent::activated(evening.clone(), true))
            .await
            .unwrap();
        bus.publish(SceneEvent::value_published(evening, SceneValue::from(true), true))
            .await
            .unwrap();

        for rx in [&mut sse, &mut audit] {
            assert_eq!(
                rx.recv().await.unwrap().kind,
                SceneEventKind::Activated { is_true: true }
            );
            assert!(matches!(
                rx.recv().await.unwrap().kind,
                SceneEventKind::ValuePublished { ack: true, .. }
            ));
        }
    }

    #[tokio::test]
    async fn should_drop_events_nobody_listens_to() {
        let bus = InProcessEventBus::new(16);
        bus.publish(SceneEvent::reloaded(3)).await.unwrap();

        let mut rx = bus.subscribe();
        bus.publish(SceneEvent::reloaded(4)).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().kind, SceneEventKind::Reloaded { scenes: 4 });
    }

    #[tokio::test]
    async fn should_report_lag_to_slow_listener() {
        let bus = InProcessEventBus::new(2);
        let mut rx = bus.subscribe();

        for scenes in 0..3 {
            bus.publish(SceneEvent::reloaded(scenes)).await.unwrap();
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(1))));
        assert_eq!(rx.recv().await.unwrap().kind, SceneEventKind::Reloaded { scenes: 1 });
    }

    #[test]
    fn should_count_live_subscriptions() {
        let bus = InProcessEventBus::new(16);
        let rx = bus.subscribe();
        assert_eq!(bus.receiver_count(), 1);
        drop(rx);
        assert_eq!(bus.receiver_count(), 0);
    }
}
