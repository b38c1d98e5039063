//! Scene registry: the live scenes of one engine instance and the indices
//! used to route state changes to them.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::{debug, warn};

use scenehub_domain::category::resolve_control;
use scenehub_domain::config::{MemberTarget, SceneTemplate};
use scenehub_domain::error::{SceneHubError, ValidationError};
use scenehub_domain::member::Member;
use scenehub_domain::scene::{Branch, Scene, SceneId};
use scenehub_domain::value::Value;

use crate::ports::{CapabilityDetector, CategoryService, SceneRepository, Subscription};
use crate::settings::EngineSettings;

/// Live scenes plus routing indices. Rebuilt from scratch on every reload.
#[derive(Debug, Default)]
pub struct Registry {
    scenes: BTreeMap<SceneId, Scene>,
    /// Member state id → scenes reconciling it.
    by_state: HashMap<String, Vec<SceneId>>,
    /// Trigger source id → branches listening to it.
    by_trigger: HashMap<String, Vec<(SceneId, Branch)>>,
    /// Every scene object of this instance, live or not.
    known: HashSet<SceneId>,
    subscription: Subscription,
    uses_categories: bool,
}

impl Registry {
    /// Index `scenes`. Scenes that are disabled or have no member are only
    /// remembered as known objects.
    #[must_use]
    pub fn build(scenes: Vec<Scene>, coarse_threshold: usize) -> Self {
        let mut registry = Self::default();
        for scene in scenes {
            registry.known.insert(scene.id.clone());
            // Includes selectors that currently expand to nothing.
            registry.uses_categories |= scene.enabled && scene.uses_categories;
            if !scene.is_live() {
                debug!(scene = %scene.id, "scene not live, skipping");
                continue;
            }
            for member in &scene.members {
                let listeners = registry.by_state.entry(member.id.clone()).or_default();
                if !listeners.contains(&scene.id) {
                    listeners.push(scene.id.clone());
                }
            }
            for branch in Branch::ALL {
                if let Some(source) = scene.branch(branch).source_id() {
                    registry
                        .by_trigger
                        .entry(source.to_string())
                        .or_default()
                        .push((scene.id.clone(), branch));
                }
            }
            registry.scenes.insert(scene.id.clone(), scene);
        }

        let watched: BTreeSet<String> = registry
            .by_state
            .keys()
            .chain(registry.by_trigger.keys())
            .cloned()
            .collect();
        registry.subscription = if watched.len() > coarse_threshold {
            Subscription::All
        } else if registry.scenes.is_empty() {
            Subscription::None
        } else {
            let mut ids = watched;
            ids.extend(registry.scenes.keys().map(|id| id.as_str().to_string()));
            Subscription::Ids(ids)
        };
        registry
    }

    #[must_use]
    pub fn get(&self, id: &SceneId) -> Option<&Scene> {
        self.scenes.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.scenes.contains_key(id)
    }

    /// Whether `id` is a scene object of this instance, live or not.
    #[must_use]
    pub fn knows(&self, id: &str) -> bool {
        self.known.contains(id)
    }

    pub fn scenes(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.values()
    }

    #[must_use]
    pub fn scene_ids(&self) -> Vec<SceneId> {
        self.scenes.keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    #[must_use]
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Whether any enabled scene uses a category selector, even one that
    /// currently expands to no member.
    #[must_use]
    pub fn uses_categories(&self) -> bool {
        self.uses_categories
    }

    /// Distinct member state ids.
    #[must_use]
    pub fn member_ids(&self) -> Vec<String> {
        self.by_state.keys().cloned().collect()
    }

    /// Record the observed value of state `id` on every member targeting it.
    ///
    /// Returns the scenes to reconcile.
    pub fn set_actual(&mut self, id: &str, value: Option<&Value>) -> Vec<SceneId> {
        let Some(scene_ids) = self.by_state.get(id) else {
            return Vec::new();
        };
        for scene_id in scene_ids {
            if let Some(scene) = self.scenes.get_mut(scene_id) {
                for member in scene.members.iter_mut().filter(|m| m.id == id) {
                    member.actual = value.cloned();
                }
            }
        }
        scene_ids.clone()
    }

    /// Branches whose trigger fires on `source` changing to `value`.
    #[must_use]
    pub fn triggered_by(&self, source: &str, value: Option<&Value>) -> Vec<(SceneId, Branch)> {
        let Some(listeners) = self.by_trigger.get(source) else {
            return Vec::new();
        };
        listeners
            .iter()
            .filter(|(scene_id, branch)| {
                self.scenes
                    .get(scene_id)
                    .is_some_and(|scene| scene.branch(*branch).matches(source, value))
            })
            .cloned()
            .collect()
    }
}

/// Load, normalize and expand every scene object owned by this instance.
///
/// Normalization and expansion issues are logged and never abort the load.
///
/// # Errors
///
/// Returns the repository error when scene objects cannot be listed.
pub async fn load<R, C, D>(
    repo: &R,
    categories: &C,
    detector: &D,
    settings: &EngineSettings,
) -> Result<Registry, SceneHubError>
where
    R: SceneRepository,
    C: CategoryService,
    D: CapabilityDetector,
{
    let objects = repo.list().await?;
    let mut scenes = Vec::new();
    let mut membership = HashMap::new();
    for object in objects.iter().filter(|o| o.belongs_to(&settings.instance)) {
        let normalized = object.normalize();
        for issue in &normalized.issues {
            warn!(error = %issue, "scene configuration corrected");
        }
        let template = normalized.template;
        let members = if template.enabled {
            expand(&template, categories, detector, &mut membership).await
        } else {
            Vec::new()
        };
        scenes.push(template.into_scene(members));
    }
    Ok(Registry::build(
        scenes,
        settings.coarse_subscription_threshold,
    ))
}

/// Replace category selectors with one member per resolvable device.
///
/// `membership` caches category contents for the duration of one load.
async fn expand<C, D>(
    template: &SceneTemplate,
    categories: &C,
    detector: &D,
    membership: &mut HashMap<String, Vec<String>>,
) -> Vec<Member>
where
    C: CategoryService,
    D: CapabilityDetector,
{
    let mut members = Vec::with_capacity(template.members.len());
    for entry in &template.members {
        let (selector, kind) = match &entry.target {
            MemberTarget::State(_) => {
                members.push(entry.member.clone());
                continue;
            }
            MemberTarget::Category { selector, kind } => (selector, *kind),
        };

        for category in selector.category_ids() {
            if membership.contains_key(category) {
                continue;
            }
            let ids = categories.members(category).await.unwrap_or_else(|err| {
                warn!(category, error = %err, "failed to read category");
                Vec::new()
            });
            membership.insert(category.to_string(), ids);
        }

        for id in selector.select(membership) {
            let detected = match detector.describe(&id).await {
                Ok(detected) => detected,
                Err(err) => {
                    warn!(id = %id, error = %err, "capability detection failed");
                    None
                }
            };
            match detected.and_then(|d| resolve_control(&id, &d, kind)) {
                Some(state_id) => {
                    let mut member = entry.member.clone();
                    member.id = state_id;
                    members.push(member);
                }
                None => {
                    let issue = ValidationError::UnresolvableCategoryMember {
                        scene: template.id.clone(),
                        id,
                    };
                    warn!(error = %issue, "category member dropped");
                }
            }
        }
    }
    members
}

#[cfg(test)]
mod tests {
    use scenehub_domain::category::{DetectedObject, DeviceControl};
    use scenehub_domain::trigger::{Condition, TriggerDescriptor};
    use serde_json::json;

    use super::super::test_support::{FakeCategories, FakeDetector, FakeRepo};
    use super::*;

    fn kitchen() -> (FakeCategories, FakeDetector) {
        let categories = FakeCategories::new(HashMap::from([(
            "enum.rooms.kitchen".to_string(),
            vec![
                "zigbee.0.ceiling".to_string(),
                "hm.0.socket.STATE".to_string(),
                "unknown.0.thing".to_string(),
            ],
        )]));
        let detector = FakeDetector::new(HashMap::from([
            (
                "zigbee.0.ceiling".to_string(),
                DetectedObject::Device {
                    device_type: "light".to_string(),
                    controls: vec![DeviceControl {
                        name: "on".to_string(),
                        state_id: "zigbee.0.ceiling.on".to_string(),
                    }],
                },
            ),
            ("hm.0.socket.STATE".to_string(), DetectedObject::State),
        ]));
        (categories, detector)
    }

    #[tokio::test]
    async fn should_expand_category_members_in_place() {
        let repo = FakeRepo::new(vec![json!({
            "id": "scene.0.kitchen",
            "native": { "members": [
                { "id": "light.first", "setIfTrue": true },
                { "enums": { "rooms": ["enum.rooms.kitchen"] }, "setIfTrue": true, "delay": 100 },
                { "id": "light.last", "setIfTrue": true }
            ] }
        })]);
        let (categories, detector) = kitchen();

        let registry = load(&repo, &categories, &detector, &EngineSettings::default())
            .await
            .unwrap();

        let scene = registry.get(&SceneId::from("scene.0.kitchen")).unwrap();
        let ids: Vec<&str> = scene.members.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["light.first", "zigbee.0.ceiling.on", "hm.0.socket.STATE", "light.last"]
        );
        assert_eq!(scene.members[1].delay, 100);
        assert_eq!(scene.members[2].delay, 100);
        assert_eq!(scene.members[2].origin, 1);
        assert!(registry.uses_categories());
    }

    #[tokio::test]
    async fn should_skip_scenes_of_other_instances_and_disabled_scenes() {
        let repo = FakeRepo::new(vec![
            json!({ "id": "scene.0.mine", "native": { "members": [ { "id": "a" } ] } }),
            json!({
                "id": "scene.1.theirs",
                "common": { "engine": "system.adapter.scenes.1" },
                "native": { "members": [ { "id": "b" } ] }
            }),
            json!({
                "id": "scene.0.off",
                "common": { "enabled": false },
                "native": { "members": [ { "id": "c" } ] }
            }),
            json!({ "id": "scene.0.empty", "native": { "members": [] } }),
        ]);
        let (categories, detector) = kitchen();

        let registry = load(&repo, &categories, &detector, &EngineSettings::default())
            .await
            .unwrap();

        assert_eq!(registry.scene_ids(), vec![SceneId::from("scene.0.mine")]);
        assert!(registry.knows("scene.0.off"));
        assert!(registry.knows("scene.0.empty"));
        assert!(!registry.knows("scene.1.theirs"));
    }

    #[tokio::test]
    async fn should_watch_categories_of_scenes_with_empty_selectors() {
        let repo = FakeRepo::new(vec![json!({
            "id": "scene.0.cellar",
            "native": { "members": [ { "enums": { "rooms": ["enum.rooms.cellar"] }, "setIfTrue": true } ] }
        })]);
        let categories = FakeCategories::new(HashMap::from([(
            "enum.rooms.cellar".to_string(),
            Vec::new(),
        )]));

        let registry = load(&repo, &categories, &FakeDetector::default(), &EngineSettings::default())
            .await
            .unwrap();

        assert!(registry.is_empty());
        assert!(registry.knows("scene.0.cellar"));
        assert!(registry.uses_categories());
    }

    fn scene(id: &str, members: &[&str], trigger: Option<&str>) -> Scene {
        let mut builder = Scene::builder().id(id);
        for member in members {
            builder = builder.member(Member::builder(*member).set_if_true(true).build());
        }
        if let Some(source) = trigger {
            builder = builder.on_true(TriggerDescriptor::on_state(source, Condition::Update, None));
        }
        builder.build().unwrap()
    }

    #[test]
    fn should_subscribe_to_members_triggers_and_scene_states() {
        let registry = Registry::build(vec![scene("scene.0.a", &["light.a"], Some("button"))], 200);
        let Subscription::Ids(ids) = registry.subscription() else {
            panic!("expected per-id subscription");
        };
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        assert_eq!(ids, vec!["button", "light.a", "scene.0.a"]);
    }

    #[test]
    fn should_switch_to_coarse_subscription_above_threshold() {
        let members: Vec<String> = (0..5).map(|i| format!("light.{i}")).collect();
        let refs: Vec<&str> = members.iter().map(String::as_str).collect();
        let registry = Registry::build(vec![scene("scene.0.big", &refs, None)], 4);
        assert_eq!(registry.subscription(), &Subscription::All);
    }

    #[test]
    fn should_route_trigger_and_member_changes() {
        let mut registry = Registry::build(
            vec![
                scene("scene.0.a", &["light.a"], Some("button")),
                scene("scene.0.b", &["light.a", "light.b"], None),
            ],
            200,
        );
        assert_eq!(
            registry.triggered_by("button", None),
            vec![(SceneId::from("scene.0.a"), Branch::True)]
        );
        assert!(registry.triggered_by("light.a", None).is_empty());

        let affected = registry.set_actual("light.a", Some(&Value::Bool(true)));
        assert_eq!(affected.len(), 2);
        let b = registry.get(&SceneId::from("scene.0.b")).unwrap();
        assert_eq!(b.members[0].actual, Some(Value::Bool(true)));
        assert_eq!(b.members[1].actual, None);
    }
}
