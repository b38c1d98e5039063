//! Inbound commands: save, enable, disable.

use std::collections::BTreeMap;

use tracing::{info, warn};

use scenehub_domain::command::{
    Command, CommandOutcome, MemberSaveStatus, SaveReport, unanimous,
};
use scenehub_domain::config::SceneObject;
use scenehub_domain::error::{NotFoundError, SceneHubError};
use scenehub_domain::scene::{Branch, SceneId};

use super::SceneEngine;
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
    #[tracing::instrument(skip(self))]
    pub(super) async fn execute(
        &mut self,
        command: Command,
    ) -> Result<CommandOutcome, SceneHubError> {
        match command {
            Command::Save { scene_id, branch } => {
                self.save(&scene_id, branch).await.map(CommandOutcome::Saved)
            }
            Command::Enable { scene_id } => self.set_enabled(&scene_id, true).await,
            Command::Disable { scene_id } => self.set_enabled(&scene_id, false).await,
        }
    }

    /// Store the members' current values as the branch's desired values.
    ///
    /// A configured member expanded into several devices is only saved when
    /// all of them report the same value.
    async fn save(
        &mut self,
        scene_id: &SceneId,
        branch: Branch,
    ) -> Result<SaveReport, SceneHubError> {
        let Some(scene) = self.registry.get(scene_id) else {
            Self::unknown_scene(scene_id);
            return Err(NotFoundError::scene(scene_id).into());
        };
        let mut sources: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for member in &scene.members {
            sources
                .entry(member.origin)
                .or_default()
                .push(member.id.clone());
        }

        let mut object = self.owned_object(scene_id).await?;
        let mut statuses = Vec::with_capacity(sources.len());
        for (origin, ids) in sources {
            let mut actuals = Vec::with_capacity(ids.len());
            let mut readable = true;
            for id in &ids {
                match self.states.read(id).await {
                    Ok(snapshot) => actuals.push(snapshot.and_then(|s| s.value)),
                    Err(err) => {
                        warn!(origin, id = %id, error = %err, "member not saved, read failed");
                        readable = false;
                        break;
                    }
                }
            }
            let saved = readable
                && unanimous(&actuals)
                    .is_some_and(|value| object.set_desired(origin, branch, Some(value)));
            if readable && !saved {
                warn!(origin, devices = ids.len(), "member not saved, devices disagree");
            }
            statuses.push(MemberSaveStatus { origin, saved });
        }

        self.repo.update(object).await?;
        let report = SaveReport::new(statuses);
        info!(all_saved = report.all_saved, "scene saved");
        Ok(report)
    }

    async fn set_enabled(
        &mut self,
        scene_id: &SceneId,
        enabled: bool,
    ) -> Result<CommandOutcome, SceneHubError> {
        let mut object = self.owned_object(scene_id).await?;
        object.common.enabled = enabled;
        self.repo.update(object).await?;
        info!(enabled, "scene toggled");
        Ok(CommandOutcome::Toggled {
            scene_id: scene_id.clone(),
            enabled,
        })
    }

    async fn owned_object(&self, scene_id: &SceneId) -> Result<SceneObject, SceneHubError> {
        match self.repo.get(scene_id).await? {
            Some(object) if object.belongs_to(&self.settings.instance) => Ok(object),
            _ => {
                Self::unknown_scene(scene_id);
                Err(NotFoundError::scene(scene_id).into())
            }
        }
    }
}
