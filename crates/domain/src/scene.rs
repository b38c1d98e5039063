//! Scene: a named value derived from, and imposed onto, a set of member states.
//!
//! A scene owns an ordered list of [`Member`]s, one [`TriggerDescriptor`] per
//! [`Branch`], and the reconciliation settings that decide what value the
//! scene itself reports.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SceneHubError, ValidationError};
use crate::member::Member;
use crate::trigger::TriggerDescriptor;
use crate::value::Value;

/// Identifier of a scene. It is also the id of the scene's own state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(String);

impl SceneId {
    /// Borrow the id as a state id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SceneId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for SceneId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// The "true" or "false" half of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    True,
    False,
}

impl Branch {
    /// Both branches, true first.
    pub const ALL: [Self; 2] = [Self::True, Self::False];

    /// The truth value activated by this branch.
    #[must_use]
    pub fn is_true(self) -> bool {
        matches!(self, Self::True)
    }
}

impl From<bool> for Branch {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_true() { "true" } else { "false" })
    }
}

/// Fold applied to virtual-group member values once they diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Any mismatch makes the group `uncertain`.
    #[default]
    Uncertain,
    /// First non-null member value.
    Any,
    Avg,
    Min,
    Max,
}

impl Aggregation {
    /// Parse a configured aggregation name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "uncertain" => Some(Self::Uncertain),
            "any" => Some(Self::Any),
            "avg" => Some(Self::Avg),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            _ => None,
        }
    }
}

/// The value a scene reports for itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum SceneValue {
    Value(Value),
    Uncertain,
}

impl SceneValue {
    /// Literal written to the scene state for [`SceneValue::Uncertain`].
    pub const UNCERTAIN: &'static str = "uncertain";

    /// The state value to write.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Uncertain => Value::String(Self::UNCERTAIN.to_string()),
        }
    }

    /// Read back a written state value.
    #[must_use]
    pub fn from_state(value: Value) -> Self {
        match value {
            Value::String(s) if s == Self::UNCERTAIN => Self::Uncertain,
            other => Self::Value(other),
        }
    }
}

impl From<Value> for SceneValue {
    fn from(value: Value) -> Self {
        Self::from_state(value)
    }
}

impl From<SceneValue> for Value {
    fn from(value: SceneValue) -> Self {
        match value {
            SceneValue::Value(v) => v,
            SceneValue::Uncertain => Value::String(SceneValue::UNCERTAIN.to_string()),
        }
    }
}

impl From<bool> for SceneValue {
    fn from(value: bool) -> Self {
        Self::Value(Value::Bool(value))
    }
}

/// Last value the engine published for a scene. Suppresses redundant writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeValue {
    pub value: SceneValue,
    pub ack: bool,
}

impl RuntimeValue {
    /// Whether publishing `value`/`ack` would change anything.
    #[must_use]
    pub fn differs(current: Option<&Self>, value: &SceneValue, ack: bool) -> bool {
        current.is_none_or(|c| c.ack != ack || c.value != *value)
    }
}

/// A fully resolved scene as the live engine sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub id: SceneId,
    pub name: Option<String>,
    pub enabled: bool,
    pub members: Vec<Member>,
    pub on_true: TriggerDescriptor,
    pub on_false: TriggerDescriptor,
    pub virtual_group: bool,
    pub aggregation: Aggregation,
    /// Milliseconds between successive member activations; `0` = all at once.
    pub burst_interval: u64,
    /// At least one member came from a category selector.
    pub uses_categories: bool,
}

impl Scene {
    /// Create a builder for constructing a [`Scene`].
    #[must_use]
    pub fn builder() -> SceneBuilder {
        SceneBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptySceneId`] when `id` is empty.
    pub fn validate(&self) -> Result<(), SceneHubError> {
        if self.id.as_str().is_empty() {
            return Err(ValidationError::EmptySceneId.into());
        }
        Ok(())
    }

    /// Whether the scene takes part in the live engine.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.enabled && !self.members.is_empty()
    }

    /// Trigger descriptor for a branch.
    #[must_use]
    pub fn branch(&self, branch: Branch) -> &TriggerDescriptor {
        match branch {
            Branch::True => &self.on_true,
            Branch::False => &self.on_false,
        }
    }

    /// Whether the scene distinguishes "false" from "not true".
    #[must_use]
    pub fn has_false_branch(&self) -> bool {
        self.on_false.enabled
    }
}

/// Step-by-step builder for [`Scene`].
#[derive(Debug, Default)]
pub struct SceneBuilder {
    id: Option<SceneId>,
    name: Option<String>,
    enabled: Option<bool>,
    members: Vec<Member>,
    on_true: Option<TriggerDescriptor>,
    on_false: Option<TriggerDescriptor>,
    virtual_group: bool,
    aggregation: Aggregation,
    burst_interval: u64,
    uses_categories: bool,
}

impl SceneBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<SceneId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    #[must_use]
    pub fn members(mut self, members: Vec<Member>) -> Self {
        self.members = members;
        self
    }

    #[must_use]
    pub fn on_true(mut self, trigger: TriggerDescriptor) -> Self {
        self.on_true = Some(trigger);
        self
    }

    #[must_use]
    pub fn on_false(mut self, trigger: TriggerDescriptor) -> Self {
        self.on_false = Some(trigger);
        self
    }

    #[must_use]
    pub fn virtual_group(mut self, aggregation: Aggregation) -> Self {
        self.virtual_group = true;
        self.aggregation = aggregation;
        self
    }

    #[must_use]
    pub fn burst_interval(mut self, millis: u64) -> Self {
        self.burst_interval = millis;
        self
    }

    #[must_use]
    pub fn uses_categories(mut self, uses: bool) -> Self {
        self.uses_categories = uses;
        self
    }

    /// Consume the builder, validate, and return a [`Scene`].
    ///
    /// # Errors
    ///
    /// Returns [`SceneHubError::Validation`] if the id is missing or empty.
    pub fn build(self) -> Result<Scene, SceneHubError> {
        let scene = Scene {
            id: self.id.unwrap_or_else(|| SceneId::from("")),
            name: self.name,
            enabled: self.enabled.unwrap_or(true),
            members: self.members,
            on_true: self.on_true.unwrap_or_else(TriggerDescriptor::manual),
            on_false: self.on_false.unwrap_or_else(TriggerDescriptor::disabled),
            virtual_group: self.virtual_group,
            aggregation: self.aggregation,
            burst_interval: self.burst_interval,
            uses_categories: self.uses_categories,
        };
        scene.validate()?;
        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str) -> Member {
        Member::builder(id).set_if_true(true).build()
    }

    #[test]
    fn should_build_scene_with_defaults() {
        let scene = Scene::builder()
            .id("scene.0.evening")
            .member(member("light.a"))
            .build()
            .unwrap();
        assert!(scene.enabled);
        assert!(scene.on_true.enabled);
        assert!(!scene.has_false_branch());
        assert!(!scene.virtual_group);
        assert_eq!(scene.burst_interval, 0);
        assert!(scene.is_live());
    }

    #[test]
    fn should_reject_missing_id() {
        let result = Scene::builder().member(member("light.a")).build();
        assert!(matches!(
            result,
            Err(SceneHubError::Validation(ValidationError::EmptySceneId))
        ));
    }

    #[test]
    fn should_not_be_live_without_members() {
        let scene = Scene::builder().id("scene.0.empty").build().unwrap();
        assert!(!scene.is_live());
    }

    #[test]
    fn should_not_be_live_when_disabled() {
        let scene = Scene::builder()
            .id("scene.0.off")
            .enabled(false)
            .member(member("light.a"))
            .build()
            .unwrap();
        assert!(!scene.is_live());
    }

    #[test]
    fn should_write_uncertain_as_literal_string() {
        assert_eq!(SceneValue::Uncertain.to_value(), Value::from("uncertain"));
        assert_eq!(
            SceneValue::from_state(Value::from("uncertain")),
            SceneValue::Uncertain
        );
    }

    #[test]
    fn should_serialize_scene_value_as_plain_state() {
        assert_eq!(serde_json::to_string(&SceneValue::Uncertain).unwrap(), "\"uncertain\"");
        assert_eq!(serde_json::to_string(&SceneValue::from(true)).unwrap(), "true");
    }

    #[test]
    fn should_detect_runtime_value_changes() {
        let current = RuntimeValue {
            value: SceneValue::from(true),
            ack: true,
        };
        assert!(!RuntimeValue::differs(Some(&current), &SceneValue::from(true), true));
        assert!(RuntimeValue::differs(Some(&current), &SceneValue::from(true), false));
        assert!(RuntimeValue::differs(Some(&current), &SceneValue::Uncertain, true));
        assert!(RuntimeValue::differs(None, &SceneValue::from(false), true));
    }

    #[test]
    fn should_parse_aggregation_names() {
        assert_eq!(Aggregation::parse("avg"), Some(Aggregation::Avg));
        assert_eq!(Aggregation::parse("median"), None);
    }
}
