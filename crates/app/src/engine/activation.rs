//! Branch activation: member writes, delays and burst pacing.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use scenehub_domain::event::SceneEvent;
use scenehub_domain::id::TimerId;
use scenehub_domain::member::{Member, effective_delays};
use scenehub_domain::scene::{Branch, SceneId, SceneValue};
use scenehub_domain::value::Value;

use super::timers::DelayedWrite;
use super::{Internal, SceneEngine};
use crate::ports::{
    CapabilityDetector, CategoryService, EventPublisher, SceneRepository, StateStore,
};

/// A burst activation walking its members one step at a time.
pub(super) struct BurstWalk {
    scene_id: SceneId,
    branch: Branch,
    /// Remaining members with their effective delays.
    steps: VecDeque<(Member, u64)>,
    interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl BurstWalk {
    pub(super) fn abort(self) {
        if let Some(handle) = self.handle {
            handle.abort();
        }
    }
}

impl<S, R, C, D, P> SceneEngine<S, R, C, D, P>
where
    S: StateStore,
    R: SceneRepository,
    C: CategoryService,
    D: CapabilityDetector,
    P: EventPublisher,
{
    /// Activate `branch` of a scene.
    ///
    /// Activating the false branch of a scene without one does nothing.
    #[tracing::instrument(skip(self))]
    pub(super) async fn activate(&mut self, scene_id: &SceneId, branch: Branch) {
        let Some(scene) = self.registry.get(scene_id) else {
            Self::unknown_scene(scene_id);
            return;
        };
        if branch == Branch::False && !scene.has_false_branch() {
            debug!("false branch disabled, ignoring");
            return;
        }

        let steps: Vec<(Member, u64)> = scene
            .members
            .iter()
            .cloned()
            .zip(effective_delays(&scene.members))
            .collect();
        let burst_interval = scene.burst_interval;
        info!(members = steps.len(), burst_interval, "activating scene");
        self.emit(SceneEvent::activated(scene_id.clone(), branch.is_true()))
            .await;

        if burst_interval == 0 {
            for (member, delay) in &steps {
                self.dispatch(member, branch, *delay).await;
            }
            self.publish_activation(scene_id, branch).await;
        } else {
            self.start_burst(
                scene_id,
                branch,
                steps,
                Duration::from_millis(burst_interval),
            )
            .await;
        }
    }

    /// Write a member's desired value for `branch`, now or after `delay` ms.
    async fn dispatch(&mut self, member: &Member, branch: Branch, delay: u64) {
        let Some(desired) = member.desired(branch) else {
            return;
        };
        match self.resolve(desired).await {
            Ok(value) => self.dispatch_value(member, value, delay).await,
            Err(err) => warn!(member = %member.id, error = %err, "member skipped"),
        }
    }

    async fn dispatch_value(&mut self, member: &Member, value: Value, delay: u64) {
        if member.stop_all_delays {
            let cancelled = self.timers.cancel_target(&member.id);
            if cancelled > 0 {
                debug!(member = %member.id, cancelled, "cancelled pending writes");
            }
        }
        if delay == 0 {
            self.write_member(&member.id, value, member.ack_true, member.do_not_overwrite)
                .await;
        } else {
            let write = DelayedWrite {
                target: member.id.clone(),
                value,
                ack: member.ack_true,
                do_not_overwrite: member.do_not_overwrite,
            };
            self.timers
                .schedule(&self.internal_tx, write, Duration::from_millis(delay));
        }
    }

    /// Apply one value to every member of a virtual group.
    pub(super) async fn apply_to_group(&mut self, scene_id: &SceneId, value: &Value) {
        let Some(scene) = self.registry.get(scene_id) else {
            Self::unknown_scene(scene_id);
            return;
        };
        let delays = effective_delays(&scene.members);
        let members = scene.members.clone();
        for (member, delay) in members.iter().zip(delays) {
            self.dispatch_value(member, value.clone(), delay).await;
        }
    }

    /// The scene's own value right after activation.
    async fn publish_activation(&mut self, scene_id: &SceneId, branch: Branch) {
        let Some(scene) = self.registry.get(scene_id) else {
            return;
        };
        if scene.virtual_group {
            return;
        }
        let value = if scene.has_false_branch() {
            SceneValue::from(branch.is_true())
        } else {
            SceneValue::from(true)
        };
        self.publish_value(scene_id, value, true).await;
    }

    async fn start_burst(
        &mut self,
        scene_id: &SceneId,
        branch: Branch,
        steps: Vec<(Member, u64)>,
        interval: Duration,
    ) {
        let running: Vec<TimerId> = self
            .bursts
            .iter()
            .filter(|(_, walk)| &walk.scene_id == scene_id)
            .map(|(id, _)| *id)
            .collect();
        for id in running {
            if let Some(walk) = self.bursts.remove(&id) {
                debug!("restarting burst");
                walk.abort();
            }
        }

        let id = TimerId::new();
        let walk = BurstWalk {
            scene_id: scene_id.clone(),
            branch,
            steps: steps.into(),
            interval,
            handle: None,
        };
        self.bursts.insert(id, walk);
        self.burst_step(id).await;
    }

    /// Activate the next member of a burst and schedule the following step.
    /// After the last member the scene's value is published.
    pub(super) async fn burst_step(&mut self, id: TimerId) {
        let Some(mut walk) = self.bursts.remove(&id) else {
            return;
        };
        if let Some((member, delay)) = walk.steps.pop_front() {
            self.dispatch(&member, walk.branch, delay).await;
        }
        if walk.steps.is_empty() {
            debug!(scene = %walk.scene_id, "burst complete");
            self.publish_activation(&walk.scene_id, walk.branch).await;
            return;
        }
        let tx = self.internal_tx.clone();
        let interval = walk.interval;
        walk.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            let _ = tx.send(Internal::BurstStep(id));
        }));
        self.bursts.insert(id, walk);
    }
}
