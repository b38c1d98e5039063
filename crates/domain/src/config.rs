//! Scene configuration objects as stored by the platform, and their
//! normalization into runtime scenes.
//!
//! Stored objects carry years of format drift: delays saved as strings,
//! tolerances saved as text, `=`/`<>` operators and missing branch
//! descriptors. [`SceneObject::normalize`] absorbs all of it and returns what
//! it had to correct as [`ValidationError`]s for the caller to log.

use serde::{Deserialize, Serialize};

use crate::category::{CategorySelector, ControlKind};
use crate::error::ValidationError;
use crate::member::Member;
use crate::scene::{Aggregation, Branch, Scene, SceneId};
use crate::trigger::{Condition, TriggerDescriptor, TriggerSource};
use crate::value::Value;

/// Prefix of category object ids.
pub const CATEGORY_PREFIX: &str = "enum.";

/// Whether an object id names a category.
#[must_use]
pub fn is_category_object(id: &str) -> bool {
    id.starts_with(CATEGORY_PREFIX)
}

const fn default_true() -> bool {
    true
}

/// A stored scene configuration object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    #[serde(alias = "_id")]
    pub id: SceneId,
    #[serde(default)]
    pub common: SceneCommon,
    #[serde(default)]
    pub native: SceneNative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneCommon {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Owning engine instance, either `scenes.0` or `system.adapter.scenes.0`.
    #[serde(default)]
    pub engine: Option<String>,
}

impl Default for SceneCommon {
    fn default() -> Self {
        Self {
            name: None,
            enabled: true,
            engine: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SceneNative {
    pub members: Vec<MemberConfig>,
    pub on_true: Option<TriggerConfig>,
    pub on_false: Option<TriggerConfig>,
    pub virtual_group: bool,
    pub aggregation: Option<String>,
    pub burst_interval: Option<serde_json::Value>,
    /// Editor hint, carried through untouched.
    pub easy: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MemberConfig {
    pub id: Option<String>,
    pub set_if_true: Option<Value>,
    pub set_if_false: Option<Value>,
    pub set_if_true_tolerance: Option<serde_json::Value>,
    pub set_if_false_tolerance: Option<serde_json::Value>,
    pub delay: Option<serde_json::Value>,
    pub stack_next_delays: bool,
    pub stop_all_delays: bool,
    pub do_not_overwrite: bool,
    pub ack_true: bool,
    pub disabled: bool,
    pub desc: Option<String>,
    /// Category selector replacing `id`.
    pub enums: Option<CategorySelector>,
    /// Control kind requested from category members.
    #[serde(rename = "type")]
    pub control_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub enabled: Option<bool>,
    pub trigger: Option<TriggerSourceConfig>,
    pub cron: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerSourceConfig {
    pub id: Option<String>,
    pub condition: Option<String>,
    pub value: Option<Value>,
}

/// Where a member's target state comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberTarget {
    State(String),
    Category {
        selector: CategorySelector,
        kind: ControlKind,
    },
}

/// A configured member before category expansion.
#[derive(Debug, Clone)]
pub struct MemberTemplate {
    pub target: MemberTarget,
    /// Settings shared by every member this template expands into.
    pub member: Member,
}

/// A normalized scene whose members are not expanded yet.
#[derive(Debug, Clone)]
pub struct SceneTemplate {
    pub id: SceneId,
    pub name: Option<String>,
    pub enabled: bool,
    pub members: Vec<MemberTemplate>,
    pub on_true: TriggerDescriptor,
    pub on_false: TriggerDescriptor,
    pub virtual_group: bool,
    pub aggregation: Aggregation,
    pub burst_interval: u64,
}

impl SceneTemplate {
    /// Whether any member is a category selector.
    #[must_use]
    pub fn uses_categories(&self) -> bool {
        self.members
            .iter()
            .any(|m| matches!(m.target, MemberTarget::Category { .. }))
    }

    /// Assemble the runtime scene from expanded members.
    #[must_use]
    pub fn into_scene(self, members: Vec<Member>) -> Scene {
        let uses_categories = self.uses_categories();
        Scene {
            id: self.id,
            name: self.name,
            enabled: self.enabled,
            members,
            on_true: self.on_true,
            on_false: self.on_false,
            virtual_group: self.virtual_group,
            aggregation: self.aggregation,
            burst_interval: self.burst_interval,
            uses_categories,
        }
    }
}

/// Result of normalizing a [`SceneObject`].
#[derive(Debug, Clone)]
pub struct Normalized {
    pub template: SceneTemplate,
    /// Corrections applied along the way.
    pub issues: Vec<ValidationError>,
}

impl SceneObject {
    /// Whether the scene is run by engine `instance` (e.g. `scenes.0`).
    ///
    /// Scenes without an owner belong to every instance.
    #[must_use]
    pub fn belongs_to(&self, instance: &str) -> bool {
        match self.common.engine.as_deref() {
            None | Some("") => true,
            Some(engine) => {
                engine == instance
                    || engine
                        .strip_prefix("system.adapter.")
                        .is_some_and(|rest| rest == instance)
            }
        }
    }

    /// Store `value` as the desired value of configured member `origin`.
    ///
    /// Returns `false` when no such member exists.
    pub fn set_desired(&mut self, origin: usize, branch: Branch, value: Option<Value>) -> bool {
        let Some(member) = self.native.members.get_mut(origin) else {
            return false;
        };
        match branch {
            Branch::True => member.set_if_true = value,
            Branch::False => member.set_if_false = value,
        }
        true
    }

    /// Convert into a [`SceneTemplate`], correcting legacy fields.
    #[must_use]
    pub fn normalize(&self) -> Normalized {
        let mut issues = Vec::new();
        let scene = &self.id;

        let members = self
            .native
            .members
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.disabled)
            .filter_map(|(origin, config)| {
                normalize_member(scene, origin, config, &mut issues)
            })
            .collect();

        let burst_interval =
            parse_millis(self.native.burst_interval.as_ref()).unwrap_or_else(|raw| {
                issues.push(ValidationError::InvalidDelay {
                    scene: scene.clone(),
                    member: None,
                    value: raw,
                });
                0
            });

        let on_true = normalize_trigger(scene, self.native.on_true.as_ref(), true, &mut issues);
        let on_false = normalize_trigger(scene, self.native.on_false.as_ref(), false, &mut issues);

        let aggregation = self
            .native
            .aggregation
            .as_deref()
            .and_then(Aggregation::parse)
            .unwrap_or_default();

        Normalized {
            template: SceneTemplate {
                id: self.id.clone(),
                name: self.common.name.clone(),
                enabled: self.common.enabled,
                members,
                on_true,
                on_false,
                virtual_group: self.native.virtual_group,
                aggregation,
                burst_interval,
            },
            issues,
        }
    }
}

fn normalize_member(
    scene: &SceneId,
    origin: usize,
    config: &MemberConfig,
    issues: &mut Vec<ValidationError>,
) -> Option<MemberTemplate> {
    let target = match (&config.enums, config.id.as_deref()) {
        (Some(selector), _) => MemberTarget::Category {
            selector: selector.clone(),
            kind: match config.control_type.as_deref() {
                Some("number") => ControlKind::Number,
                _ => ControlKind::Boolean,
            },
        },
        (None, Some(id)) if !id.trim().is_empty() => MemberTarget::State(id.trim().to_string()),
        _ => {
            issues.push(ValidationError::MissingMemberTarget {
                scene: scene.clone(),
                member: origin,
            });
            return None;
        }
    };

    let delay = parse_millis(config.delay.as_ref()).unwrap_or_else(|raw| {
        issues.push(ValidationError::InvalidDelay {
            scene: scene.clone(),
            member: Some(origin),
            value: raw,
        });
        0
    });

    let id = match &target {
        MemberTarget::State(id) => id.clone(),
        MemberTarget::Category { .. } => String::new(),
    };
    let mut builder = Member::builder(id)
        .origin(origin)
        .tolerances(
            parse_tolerance(config.set_if_true_tolerance.as_ref()),
            parse_tolerance(config.set_if_false_tolerance.as_ref()),
        )
        .delay(delay)
        .stack_next_delays(config.stack_next_delays)
        .stop_all_delays(config.stop_all_delays)
        .do_not_overwrite(config.do_not_overwrite)
        .ack_true(config.ack_true);
    if let Some(value) = &config.set_if_true {
        builder = builder.set_if_true(value.clone());
    }
    if let Some(value) = &config.set_if_false {
        builder = builder.set_if_false(value.clone());
    }

    Some(MemberTemplate {
        target,
        member: builder.build(),
    })
}

fn normalize_trigger(
    scene: &SceneId,
    config: Option<&TriggerConfig>,
    default_enabled: bool,
    issues: &mut Vec<ValidationError>,
) -> TriggerDescriptor {
    let Some(config) = config else {
        return TriggerDescriptor::disabled();
    };
    let trigger = config.trigger.as_ref().and_then(|source| {
        let id = source.id.as_deref().map(str::trim).filter(|id| !id.is_empty())?;
        let condition = match source.condition.as_deref() {
            None => Condition::Eq,
            Some(text) => Condition::parse(text).unwrap_or_else(|| {
                issues.push(ValidationError::UnknownCondition {
                    scene: scene.clone(),
                    condition: text.to_string(),
                });
                Condition::Eq
            }),
        };
        Some(TriggerSource {
            id: id.to_string(),
            condition,
            value: source.value.clone(),
        })
    });
    TriggerDescriptor {
        enabled: config.enabled.unwrap_or(default_enabled),
        trigger,
        cron: config
            .cron
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(ToString::to_string),
    }
}

/// Parse a millisecond count stored as a number or numeric string.
///
/// Missing and empty values are `0`. Anything else that is not a
/// non-negative integer is returned as `Err` with its raw text.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn parse_millis(raw: Option<&serde_json::Value>) -> Result<u64, String> {
    let Some(raw) = raw else {
        return Ok(0);
    };
    match raw {
        serde_json::Value::Null => Ok(0),
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                    .map(|f| f as u64)
            })
            .ok_or_else(|| n.to_string()),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(0),
        serde_json::Value::String(s) => s.trim().parse().map_err(|_| s.clone()),
        other => Err(other.to_string()),
    }
}

fn parse_tolerance(raw: Option<&serde_json::Value>) -> Option<f64> {
    match raw? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}
