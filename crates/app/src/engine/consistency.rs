//! Debounced reconciliation of a scene's value with its members' states.

use tracing::debug;

use scenehub_domain::consistency::{Desired, MemberCheck, aggregate, evaluate};
use scenehub_domain::member::Member;
use scenehub_domain::scene::{Branch, SceneId};
use scenehub_domain::value::Value;

use super::{Internal, SceneEngine};
use crate::ports::{
    CapabilityDetector, CategoryService, EventPublisher, SceneRepository, StateStore,
};

impl<S, R, C, D, P> SceneEngine<S, R, C, D, P>
where
    S: StateStore,
    R: SceneRepository,
    C: CategoryService,
    D: CapabilityDetector,
    P: EventPublisher,
{
    /// Check `scene_id` once the debounce window elapses.
    ///
    /// Requests arriving while a check is pending are absorbed by it.
    pub(super) fn schedule_check(&mut self, scene_id: &SceneId) {
        if self.debounce.contains_key(scene_id) {
            return;
        }
        let tx = self.internal_tx.clone();
        let scene = scene_id.clone();
        let window = self.settings.consistency_debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let _ = tx.send(Internal::CheckDue(scene));
        });
        self.debounce.insert(scene_id.clone(), handle);
    }

    /// Recompute the scene's value and publish it if it changed.
    #[tracing::instrument(skip(self))]
    pub(super) async fn check(&mut self, scene_id: &SceneId) {
        let Some(scene) = self.registry.get(scene_id) else {
            Self::unknown_scene(scene_id);
            return;
        };

        let verdict = if scene.virtual_group {
            let actuals: Vec<Option<Value>> =
                scene.members.iter().map(|m| m.actual.clone()).collect();
            aggregate(scene.aggregation, &actuals)
        } else {
            let has_false_branch = scene.has_false_branch();
            let members = scene.members.clone();
            let mut checks = Vec::with_capacity(members.len());
            for member in &members {
                let if_false = if has_false_branch {
                    self.desired(member, Branch::False).await
                } else {
                    None
                };
                checks.push(MemberCheck {
                    actual: member.actual.clone(),
                    if_true: self.desired(member, Branch::True).await,
                    if_false,
                });
            }
            evaluate(&checks, has_false_branch)
        };

        match verdict {
            Some(value) => self.publish_value(scene_id, value, true).await,
            None => debug!("no verdict, keeping current value"),
        }
    }

    async fn desired(&self, member: &Member, branch: Branch) -> Option<Desired> {
        let configured = member.desired(branch)?;
        match self.resolve(configured).await {
            Ok(value) => Some(Desired::new(value, member.tolerance(branch))),
            Err(err) => {
                debug!(member = %member.id, %branch, error = %err, "desired value unresolved");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::super::test_support::Fixture;
    use super::*;

    fn group(aggregation: &str) -> serde_json::Value {
        json!({
            "id": "scene.0.group",
            "native": {
                "virtualGroup": true,
                "aggregation": aggregation,
                "members": [ { "id": "dimmer.a" }, { "id": "dimmer.b" }, { "id": "dimmer.c" } ]
            }
        })
    }

    fn plain() -> serde_json::Value {
        json!({
            "id": "scene.0.plain",
            "native": {
                "onFalse": { "enabled": true },
                "members": [
                    { "id": "light.a", "setIfTrue": true, "setIfFalse": false },
                    { "id": "heater.b", "setIfTrue": 21, "setIfTrueTolerance": 0.5, "setIfFalse": 0 }
                ]
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn should_publish_average_of_virtual_group() {
        let fixture = Fixture::new(vec![group("avg")])
            .with_state("dimmer.a", 2)
            .with_state("dimmer.b", 4)
            .with_state("dimmer.c", 6);

        fixture.loaded_engine().await;

        assert_eq!(fixture.store.value("scene.0.group"), Some(Value::Number(4.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_write_twice_when_nothing_changed() {
        let fixture = Fixture::new(vec![plain()])
            .with_state("light.a", true)
            .with_state("heater.b", 21.3);
        let mut engine = fixture.loaded_engine().await;
        assert_eq!(fixture.store.writes_to("scene.0.plain"), 1);

        let scene = SceneId::from("scene.0.plain");
        engine.check(&scene).await;
        engine.check(&scene).await;

        assert_eq!(fixture.store.writes_to("scene.0.plain"), 1);
        assert_eq!(fixture.store.value("scene.0.plain"), Some(Value::Bool(true)));
    }

    #[tokio::test(start_paused = true)]
    async fn should_report_false_and_uncertain() {
        let fixture = Fixture::new(vec![plain()])
            .with_state("light.a", false)
            .with_state("heater.b", 0);
        let mut engine = fixture.loaded_engine().await;
        assert_eq!(fixture.store.value("scene.0.plain"), Some(Value::Bool(false)));

        let scene = SceneId::from("scene.0.plain");
        engine.registry.set_actual("heater.b", Some(&Value::from(18)));
        engine.check(&scene).await;
        assert_eq!(fixture.store.value("scene.0.plain"), Some(Value::from("uncertain")));
    }

    #[tokio::test(start_paused = true)]
    async fn should_debounce_checks_per_scene() {
        let fixture = Fixture::new(vec![group("max")]);
        let mut engine = fixture.loaded_engine().await;
        let scene = SceneId::from("scene.0.group");

        engine.registry.set_actual("dimmer.a", Some(&Value::from(10)));
        engine.schedule_check(&scene);
        engine.registry.set_actual("dimmer.b", Some(&Value::from(30)));
        engine.schedule_check(&scene);
        assert_eq!(engine.debounce.len(), 1);

        engine.advance(Duration::from_millis(199)).await;
        assert_eq!(fixture.store.writes_to("scene.0.group"), 0);

        engine.advance(Duration::from_millis(1)).await;
        assert_eq!(fixture.store.writes_to("scene.0.group"), 1);
        assert_eq!(fixture.store.value("scene.0.group"), Some(Value::Number(30.0)));
        assert!(engine.debounce.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_skip_members_with_unresolvable_desired_value() {
        let fixture = Fixture::new(vec![json!({
            "id": "scene.0.ref",
            "native": { "members": [
                { "id": "light.a", "setIfTrue": true },
                { "id": "thermostat.b", "setIfTrue": "{{sensor.missing}}" }
            ] }
        })])
        .with_state("light.a", true);

        fixture.loaded_engine().await;

        assert_eq!(fixture.store.value("scene.0.ref"), Some(Value::Bool(true)));
    }
}
