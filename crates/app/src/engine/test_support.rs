//! In-memory fakes and fixtures shared by the engine tests.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use scenehub_domain::category::DetectedObject;
use scenehub_domain::config::SceneObject;
use scenehub_domain::error::SceneHubError;
use scenehub_domain::scene::SceneId;
use scenehub_domain::value::Value;

use super::{EngineEvent, EngineHandle, SceneEngine};
use crate::event_bus::InProcessEventBus;
use crate::ports::{
    CapabilityDetector, CategoryService, SceneRepository, StateSnapshot, StateStore,
    Subscription,
};
use crate::settings::EngineSettings;

#[derive(Default)]
pub(crate) struct FakeStore {
    states: Mutex<HashMap<String, StateSnapshot>>,
    writes: Mutex<Vec<(String, Value, bool)>>,
    subscription: Mutex<Subscription>,
    unreadable: Mutex<HashSet<String>>,
}

impl FakeStore {
    /// Seed a state without recording it as an engine write.
    pub(crate) fn set(&self, id: &str, value: impl Into<Value>, ack: bool) {
        self.states
            .lock()
            .unwrap()
            .insert(id.to_string(), StateSnapshot::new(value, ack));
    }

    pub(crate) fn snapshot(&self, id: &str) -> Option<StateSnapshot> {
        self.states.lock().unwrap().get(id).cloned()
    }

    pub(crate) fn value(&self, id: &str) -> Option<Value> {
        self.snapshot(id).and_then(|s| s.value)
    }

    pub(crate) fn writes(&self) -> Vec<(String, Value, bool)> {
        self.writes.lock().unwrap().clone()
    }

    pub(crate) fn writes_to(&self, id: &str) -> usize {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(target, _, _)| target == id)
            .count()
    }

    /// Make every later read of `id` fail.
    pub(crate) fn fail_reads(&self, id: &str) {
        self.unreadable.lock().unwrap().insert(id.to_string());
    }

    pub(crate) fn subscription(&self) -> Subscription {
        self.subscription.lock().unwrap().clone()
    }
}

impl StateStore for FakeStore {
    fn read(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<StateSnapshot>, SceneHubError>> + Send {
        let r = if self.unreadable.lock().unwrap().contains(id) {
            Err(SceneHubError::Storage(Box::new(std::io::Error::other(
                "state unavailable",
            ))))
        } else {
            Ok(self.snapshot(id))
        };
        async { r }
    }

    fn write(
        &self,
        id: &str,
        value: Value,
        ack: bool,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        self.writes
            .lock()
            .unwrap()
            .push((id.to_string(), value.clone(), ack));
        self.states.lock().unwrap().insert(
            id.to_string(),
            StateSnapshot {
                value: Some(value),
                ack,
            },
        );
        async { Ok(()) }
    }

    fn subscribe(
        &self,
        subscription: Subscription,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        *self.subscription.lock().unwrap() = subscription;
        async { Ok(()) }
    }
}

#[derive(Default)]
pub(crate) struct FakeRepo {
    objects: Mutex<Vec<SceneObject>>,
}

impl FakeRepo {
    pub(crate) fn new(objects: Vec<serde_json::Value>) -> Self {
        let repo = Self::default();
        for object in objects {
            repo.insert(object);
        }
        repo
    }

    /// Add or replace a scene object given as JSON.
    pub(crate) fn insert(&self, object: serde_json::Value) {
        self.store(serde_json::from_value(object).unwrap());
    }

    pub(crate) fn object(&self, id: &str) -> Option<SceneObject> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id.as_str() == id)
            .cloned()
    }

    fn store(&self, object: SceneObject) {
        let mut objects = self.objects.lock().unwrap();
        match objects.iter_mut().find(|o| o.id == object.id) {
            Some(existing) => *existing = object,
            None => objects.push(object),
        }
    }
}

impl SceneRepository for FakeRepo {
    fn list(&self) -> impl Future<Output = Result<Vec<SceneObject>, SceneHubError>> + Send {
        let r = self.objects.lock().unwrap().clone();
        async { Ok(r) }
    }

    fn get(
        &self,
        id: &SceneId,
    ) -> impl Future<Output = Result<Option<SceneObject>, SceneHubError>> + Send {
        let r = self.object(id.as_str());
        async { Ok(r) }
    }

    fn update(
        &self,
        object: SceneObject,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        self.store(object);
        async { Ok(()) }
    }
}

#[derive(Default)]
pub(crate) struct FakeCategories(Mutex<HashMap<String, Vec<String>>>);

impl FakeCategories {
    pub(crate) fn new(membership: HashMap<String, Vec<String>>) -> Self {
        Self(Mutex::new(membership))
    }

    /// Replace the members of one category.
    pub(crate) fn set(&self, category_id: &str, members: Vec<String>) {
        self.0.lock().unwrap().insert(category_id.to_string(), members);
    }
}

impl CategoryService for FakeCategories {
    fn members(
        &self,
        category_id: &str,
    ) -> impl Future<Output = Result<Vec<String>, SceneHubError>> + Send {
        let r = self
            .0
            .lock()
            .unwrap()
            .get(category_id)
            .cloned()
            .unwrap_or_default();
        async { Ok(r) }
    }
}

#[derive(Default)]
pub(crate) struct FakeDetector(Mutex<HashMap<String, DetectedObject>>);

impl FakeDetector {
    pub(crate) fn new(objects: HashMap<String, DetectedObject>) -> Self {
        Self(Mutex::new(objects))
    }
}

impl CapabilityDetector for FakeDetector {
    fn describe(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<DetectedObject>, SceneHubError>> + Send {
        let r = self.0.lock().unwrap().get(id).cloned();
        async { Ok(r) }
    }
}

pub(crate) type TestEngine = SceneEngine<
    Arc<FakeStore>,
    Arc<FakeRepo>,
    Arc<FakeCategories>,
    Arc<FakeDetector>,
    Arc<InProcessEventBus>,
>;

/// Fakes wired to an engine that the test drives by hand.
pub(crate) struct Fixture {
    pub(crate) store: Arc<FakeStore>,
    pub(crate) repo: Arc<FakeRepo>,
    pub(crate) categories: Arc<FakeCategories>,
    pub(crate) detector: Arc<FakeDetector>,
    pub(crate) bus: Arc<InProcessEventBus>,
}

impl Fixture {
    pub(crate) fn new(objects: Vec<serde_json::Value>) -> Self {
        Self {
            store: Arc::new(FakeStore::default()),
            repo: Arc::new(FakeRepo::new(objects)),
            categories: Arc::new(FakeCategories::default()),
            detector: Arc::new(FakeDetector::default()),
            bus: Arc::new(InProcessEventBus::new(64)),
        }
    }

    /// Seed an acknowledged state.
    pub(crate) fn with_state(self, id: &str, value: impl Into<Value>) -> Self {
        self.store.set(id, value, true);
        self
    }

    pub(crate) fn with_categories(self, membership: HashMap<String, Vec<String>>) -> Self {
        self.categories.0.lock().unwrap().extend(membership);
        self
    }

    pub(crate) fn with_device(self, id: &str, object: DetectedObject) -> Self {
        self.detector
            .0
            .lock()
            .unwrap()
            .insert(id.to_string(), object);
        self
    }

    fn parts(&self) -> (TestEngine, EngineHandle, mpsc::Receiver<EngineEvent>) {
        SceneEngine::new(
            Arc::clone(&self.store),
            Arc::clone(&self.repo),
            Arc::clone(&self.categories),
            Arc::clone(&self.detector),
            Arc::clone(&self.bus),
            EngineSettings::default(),
        )
    }

    /// An engine that already went through its initial load.
    pub(crate) async fn loaded_engine(&self) -> TestEngine {
        let (mut engine, _, _) = self.parts();
        engine.load().await;
        engine
    }
}

impl TestEngine {
    /// Move the paused clock forward and process whatever timers fired.
    pub(crate) async fn advance(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
        loop {
            for _ in 0..8 {
                tokio::task::yield_now().await;
            }
            let mut handled = false;
            while let Ok(internal) = self.internal_rx.try_recv() {
                self.handle_internal(internal).await;
                handled = true;
            }
            if !handled {
                break;
            }
        }
    }
}

/// A spawned engine reachable through its handle.
pub(crate) struct Harness {
    pub(crate) handle: EngineHandle,
    pub(crate) store: Arc<FakeStore>,
    pub(crate) repo: Arc<FakeRepo>,
    pub(crate) bus: Arc<InProcessEventBus>,
}

impl Harness {
    pub(crate) async fn start(objects: Vec<serde_json::Value>, states: &[(&str, Value)]) -> Self {
        let fixture = Fixture::new(objects);
        for (id, value) in states {
            fixture.store.set(id, value.clone(), true);
        }
        let (engine, handle, events) = fixture.parts();
        tokio::spawn(engine.run(events));
        // the reply arrives once the initial load finished
        handle.list_scenes().await.unwrap();
        Self {
            handle,
            store: fixture.store,
            repo: fixture.repo,
            bus: fixture.bus,
        }
    }

    /// Let debounces and short timers elapse, then wait for the engine to
    /// drain its queue.
    pub(crate) async fn settle(&self) {
        tokio::time::sleep(Duration::from_secs(1)).await;
        self.handle.list_scenes().await.unwrap();
    }
}
