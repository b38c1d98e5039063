//! Scene engine: a single task owning every scene, timer and schedule.
//!
//! All inbound notifications arrive over one channel and are processed one at
//! a time, so the engine's tables need no locking. Timers, debounces and cron
//! jobs are small spawned tasks that only report back over the engine's
//! internal channel; the engine itself performs every read and write.
//!
//! ```text
//! state change ──► route ──► trigger match ──► activate ──► member writes
//!                    │                                          │
//!                    └──► set actual ──► debounced check ◄──────┘ (echo)
//! ```

mod activation;
mod commands;
mod consistency;
pub mod handle;
pub mod registry;
pub mod scheduler;
pub mod timers;

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use scenehub_domain::config::is_category_object;
use scenehub_domain::error::{NotFoundError, ResolveError};
use scenehub_domain::event::SceneEvent;
use scenehub_domain::id::TimerId;
use scenehub_domain::scene::{Branch, RuntimeValue, SceneId, SceneValue};
use scenehub_domain::value::Value;

use crate::ports::{
    CapabilityDetector, CategoryService, EventPublisher, SceneRepository, StateChange,
    StateStore,
};
use crate::settings::EngineSettings;

pub use handle::{EngineEvent, EngineHandle, EngineStopped, SceneStatus};

use activation::BurstWalk;
use registry::Registry;
use scheduler::Scheduler;
use timers::TimerManager;

/// Messages sent to the engine by its own timer tasks.
#[derive(Debug)]
pub enum Internal {
    WriteDue(TimerId),
    CheckDue(SceneId),
    CronDue { scene: SceneId, branch: Branch },
    BurstStep(TimerId),
}

enum Next {
    External(EngineEvent),
    Internal(Internal),
    Stop,
}

/// The scene engine. Create with [`SceneEngine::new`], then drive with
/// [`SceneEngine::run`].
pub struct SceneEngine<S, R, C, D, P> {
    states: S,
    repo: R,
    categories: C,
    detector: D,
    publisher: P,
    settings: EngineSettings,
    registry: Registry,
    runtime: HashMap<SceneId, RuntimeValue>,
    timers: TimerManager,
    debounce: HashMap<SceneId, JoinHandle<()>>,
    scheduler: Scheduler,
    bursts: HashMap<TimerId, BurstWalk>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
}

impl<S, R, C, D, P> SceneEngine<S, R, C, D, P>
where
    S: StateStore,
    R: SceneRepository,
    C: CategoryService,
    D: CapabilityDetector,
    P: EventPublisher,
{
    /// Create an engine and the handle feeding it.
    pub fn new(
        states: S,
        repo: R,
        categories: C,
        detector: D,
        publisher: P,
        settings: EngineSettings,
    ) -> (Self, EngineHandle, mpsc::Receiver<EngineEvent>) {
        let (sender, receiver) = mpsc::channel(settings.channel_capacity.max(1));
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let engine = Self {
            states,
            repo,
            categories,
            detector,
            publisher,
            settings,
            registry: Registry::default(),
            runtime: HashMap::new(),
            timers: TimerManager::default(),
            debounce: HashMap::new(),
            scheduler: Scheduler::default(),
            bursts: HashMap::new(),
            internal_tx,
            internal_rx,
        };
        (engine, EngineHandle::new(sender), receiver)
    }

    /// Load every scene, then process events until shutdown or until every
    /// handle is dropped.
    pub async fn run(mut self, mut events: mpsc::Receiver<EngineEvent>) {
        self.load().await;
        loop {
            let next = tokio::select! {
                event = events.recv() => event.map_or(Next::Stop, Next::External),
                Some(internal) = self.internal_rx.recv() => Next::Internal(internal),
            };
            match next {
                Next::External(EngineEvent::Shutdown { reply }) => {
                    self.teardown();
                    info!("scene engine stopped");
                    let _ = reply.send(());
                    return;
                }
                Next::External(event) => self.handle_event(event).await,
                Next::Internal(internal) => self.handle_internal(internal).await,
                Next::Stop => break,
            }
        }
        self.teardown();
        info!("scene engine stopped, all handles dropped");
    }

    async fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::StateChanged(change) => self.on_state_change(change).await,
            EngineEvent::ObjectChanged { id } => self.on_object_change(&id).await,
            EngineEvent::Command { command, reply } => {
                let outcome = self.execute(command).await;
                let _ = reply.send(outcome);
            }
            EngineEvent::ListScenes { reply } => {
                let _ = reply.send(self.statuses());
            }
            EngineEvent::Shutdown { reply } => {
                self.teardown();
                let _ = reply.send(());
            }
        }
    }

    async fn handle_internal(&mut self, internal: Internal) {
        match internal {
            Internal::WriteDue(id) => {
                if let Some(write) = self.timers.take_due(id) {
                    self.write_member(&write.target, write.value, write.ack, write.do_not_overwrite)
                        .await;
                }
            }
            Internal::CheckDue(scene) => {
                self.debounce.remove(&scene);
                self.check(&scene).await;
            }
            Internal::CronDue { scene, branch } => {
                debug!(scene = %scene, %branch, "cron fired");
                self.activate(&scene, branch).await;
            }
            Internal::BurstStep(id) => self.burst_step(id).await,
        }
    }

    #[tracing::instrument(skip(self, change), fields(id = %change.id, ack = change.snapshot.ack))]
    async fn on_state_change(&mut self, change: StateChange) {
        let StateChange { id, snapshot } = change;

        if !snapshot.ack && self.registry.contains(&id) {
            if let Some(value) = &snapshot.value {
                let scene_id = SceneId::from(id.as_str());
                // unacknowledged until the engine publishes again
                self.runtime.insert(
                    scene_id.clone(),
                    RuntimeValue {
                        value: SceneValue::from_state(value.clone()),
                        ack: false,
                    },
                );
                self.on_direct_write(&scene_id, value).await;
            }
        }

        for scene in self.registry.set_actual(&id, snapshot.value.as_ref()) {
            self.schedule_check(&scene);
        }

        for (scene, branch) in self.registry.triggered_by(&id, snapshot.value.as_ref()) {
            debug!(scene = %scene, %branch, "trigger matched");
            self.activate(&scene, branch).await;
        }
    }

    /// A write to the scene's own state that did not come from the engine.
    async fn on_direct_write(&mut self, scene_id: &SceneId, value: &Value) {
        let Some(scene) = self.registry.get(scene_id) else {
            return;
        };
        if scene.virtual_group {
            info!(scene = %scene_id, %value, "applying value to virtual group");
            self.apply_to_group(scene_id, value).await;
            self.schedule_check(scene_id);
        } else {
            self.activate(scene_id, Branch::from(value.is_truthy())).await;
        }
    }

    async fn on_object_change(&mut self, id: &str) {
        let relevant = if is_category_object(id) {
            self.registry.uses_categories()
        } else if self.registry.knows(id) {
            true
        } else {
            match self.repo.get(&SceneId::from(id)).await {
                Ok(Some(object)) => object.belongs_to(&self.settings.instance),
                Ok(None) => false,
                Err(err) => {
                    error!(id, error = %err, "failed to read changed object");
                    false
                }
            }
        };
        if relevant {
            info!(id, "configuration changed, reloading");
            self.reload().await;
        } else {
            debug!(id, "ignoring object change");
        }
    }

    /// Cancel everything and forget all scenes.
    fn teardown(&mut self) {
        self.timers.cancel_all();
        for (_, job) in self.debounce.drain() {
            job.abort();
        }
        for (_, walk) in self.bursts.drain() {
            walk.abort();
        }
        self.scheduler.cancel_all();
        self.runtime.clear();
        self.registry = Registry::default();
    }

    /// Full teardown followed by a fresh load.
    pub async fn reload(&mut self) {
        self.teardown();
        self.load().await;
    }

    #[tracing::instrument(skip(self), fields(instance = %self.settings.instance))]
    async fn load(&mut self) {
        self.registry = match registry::load(
            &self.repo,
            &self.categories,
            &self.detector,
            &self.settings,
        )
        .await
        {
            Ok(registry) => registry,
            Err(err) => {
                error!(error = %err, "failed to load scenes");
                Registry::default()
            }
        };

        for id in self.registry.member_ids() {
            match self.states.read(&id).await {
                Ok(snapshot) => {
                    let value = snapshot.and_then(|s| s.value);
                    self.registry.set_actual(&id, value.as_ref());
                }
                Err(err) => warn!(id = %id, error = %err, "failed to read member state"),
            }
        }

        for scene_id in self.registry.scene_ids() {
            match self.states.read(scene_id.as_str()).await {
                Ok(Some(snapshot)) => {
                    if let Some(value) = snapshot.value {
                        let runtime = RuntimeValue {
                            value: SceneValue::from_state(value),
                            ack: snapshot.ack,
                        };
                        self.runtime.insert(scene_id, runtime);
                    }
                }
                Ok(None) => {}
                Err(err) => warn!(scene = %scene_id, error = %err, "failed to read scene state"),
            }
        }

        let schedules: Vec<(SceneId, Branch, String)> = self
            .registry
            .scenes()
            .flat_map(|scene| {
                Branch::ALL.into_iter().filter_map(|branch| {
                    scene
                        .branch(branch)
                        .cron()
                        .map(|cron| (scene.id.clone(), branch, cron.to_string()))
                })
            })
            .collect();
        for (scene_id, branch, cron) in schedules {
            if let Err(err) = self
                .scheduler
                .register(&self.internal_tx, &scene_id, branch, &cron)
            {
                warn!(error = %err, "cron job not registered");
            }
        }

        if let Err(err) = self
            .states
            .subscribe(self.registry.subscription().clone())
            .await
        {
            error!(error = %err, "failed to subscribe to state changes");
        }

        for scene_id in self.registry.scene_ids() {
            self.check(&scene_id).await;
        }

        info!(
            scenes = self.registry.len(),
            cron_jobs = self.scheduler.len(),
            "scenes loaded"
        );
        self.emit(SceneEvent::reloaded(self.registry.len())).await;
    }

    /// Resolve a configured value, following a `{{stateId}}` reference.
    async fn resolve(&self, value: &Value) -> Result<Value, ResolveError> {
        let id = match value.as_reference() {
            None => return Ok(value.clone()),
            Some(reference) => reference?,
        };
        let dangling = || ResolveError::DanglingReference { id: id.to_string() };
        match self.states.read(id).await {
            Ok(Some(snapshot)) => snapshot.value.ok_or_else(dangling),
            Ok(None) => Err(dangling()),
            Err(err) => {
                warn!(id, error = %err, "failed to read referenced state");
                Err(dangling())
            }
        }
    }

    /// Write `value` to a member target, honouring `doNotOverwrite`.
    async fn write_member(&self, target: &str, value: Value, ack: bool, do_not_overwrite: bool) {
        if do_not_overwrite {
            match self.states.read(target).await {
                Ok(Some(current)) if current.value.as_ref().is_some_and(|v| v.loosely_eq(&value)) => {
                    debug!(target, "value unchanged, not overwriting");
                    return;
                }
                Ok(_) => {}
                Err(err) => {
                    let issue = ResolveError::DanglingReference {
                        id: target.to_string(),
                    };
                    warn!(error = %issue, cause = %err, "skipping write");
                    return;
                }
            }
        }
        debug!(target, %value, ack, "writing member");
        if let Err(err) = self.states.write(target, value, ack).await {
            error!(target, error = %err, "member write failed");
        }
    }

    /// Publish the scene's own value unless it is already the current one.
    async fn publish_value(&mut self, scene_id: &SceneId, value: SceneValue, ack: bool) {
        if !RuntimeValue::differs(self.runtime.get(scene_id), &value, ack) {
            return;
        }
        self.runtime.insert(
            scene_id.clone(),
            RuntimeValue {
                value: value.clone(),
                ack,
            },
        );
        info!(scene = %scene_id, value = %value.to_value(), ack, "publishing scene value");
        if let Err(err) = self.states.write(scene_id.as_str(), value.to_value(), ack).await {
            error!(scene = %scene_id, error = %err, "failed to write scene state");
        }
        self.emit(SceneEvent::value_published(scene_id.clone(), value, ack))
            .await;
    }

    async fn emit(&self, event: SceneEvent) {
        if let Err(err) = self.publisher.publish(event).await {
            warn!(error = %err, "failed to publish engine event");
        }
    }

    fn unknown_scene(scene_id: &SceneId) {
        error!(error = %NotFoundError::scene(scene_id), "operation aborted");
    }

    fn statuses(&self) -> Vec<SceneStatus> {
        self.registry
            .scenes()
            .map(|scene| SceneStatus {
                id: scene.id.clone(),
                name: scene.name.clone(),
                virtual_group: scene.virtual_group,
                members: scene.members.len(),
                value: self.runtime.get(&scene.id).cloned(),
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod test_support;
