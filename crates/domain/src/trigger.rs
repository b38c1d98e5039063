//! Trigger descriptors and condition evaluation.
//!
//! Each scene carries one [`TriggerDescriptor`] per branch. A descriptor fires
//! when its source state changes in a way its [`Condition`] accepts, or when
//! its cron schedule elapses.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{Value, format_number, parse_float_prefix};

/// Comparison applied between an incoming state value and the configured one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Condition {
    #[default]
    #[serde(rename = "==", alias = "=")]
    Eq,
    #[serde(rename = "!=", alias = "<>")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    /// Fires on every change of the source state.
    #[serde(rename = "update")]
    Update,
}

impl Condition {
    /// Parse a configured operator, accepting the legacy `=` and `<>` spellings.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "" | "==" | "=" => Some(Self::Eq),
            "!=" | "<>" => Some(Self::Ne),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "update" => Some(Self::Update),
            _ => None,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Update => "update",
        }
    }

    /// Evaluate `actual <op> expected`.
    #[must_use]
    pub fn evaluate(self, actual: Option<&Value>, expected: Option<&Value>) -> bool {
        let actual = stringify(actual);
        let expected = stringify(expected);
        let ordering = || match (round_trip_number(&actual), round_trip_number(&expected)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => Some(actual.as_str().cmp(expected.as_str())),
        };
        match self {
            Self::Update => true,
            Self::Eq => actual == expected,
            Self::Ne => actual != expected,
            Self::Lt => ordering() == Some(Ordering::Less),
            Self::Le => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
            Self::Gt => ordering() == Some(Ordering::Greater),
            Self::Ge => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

fn stringify(value: Option<&Value>) -> String {
    value.map_or_else(|| "null".to_string(), ToString::to_string)
}

/// The number `text` denotes, if printing that number yields `text` again.
///
/// `"10"` qualifies, `"10.0"`, `"+5"` and `"abc"` do not.
#[must_use]
pub fn round_trip_number(text: &str) -> Option<f64> {
    parse_float_prefix(text).filter(|n| format_number(*n) == text)
}

/// The state a branch listens to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerSource {
    pub id: String,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub value: Option<Value>,
}

/// One branch's activation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDescriptor {
    pub enabled: bool,
    pub trigger: Option<TriggerSource>,
    pub cron: Option<String>,
}

impl TriggerDescriptor {
    /// A branch that never fires.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            trigger: None,
            cron: None,
        }
    }

    /// An enabled branch without trigger or schedule, activated by commands
    /// and direct writes only.
    #[must_use]
    pub fn manual() -> Self {
        Self {
            enabled: true,
            trigger: None,
            cron: None,
        }
    }

    /// An enabled branch fired by `id` changing.
    #[must_use]
    pub fn on_state(id: impl Into<String>, condition: Condition, value: Option<Value>) -> Self {
        Self {
            enabled: true,
            trigger: Some(TriggerSource {
                id: id.into(),
                condition,
                value,
            }),
            cron: None,
        }
    }

    /// An enabled branch fired by a cron schedule.
    #[must_use]
    pub fn on_schedule(expression: impl Into<String>) -> Self {
        Self {
            enabled: true,
            trigger: None,
            cron: Some(expression.into()),
        }
    }

    /// Source state id, when the branch is enabled and has a trigger.
    #[must_use]
    pub fn source_id(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.trigger
            .as_ref()
            .map(|t| t.id.as_str())
            .filter(|id| !id.is_empty())
    }

    /// Cron expression, when the branch is enabled and has a non-empty one.
    #[must_use]
    pub fn cron(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.cron.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    /// Whether a change of `source` to `value` fires this branch.
    #[must_use]
    pub fn matches(&self, source: &str, value: Option<&Value>) -> bool {
        if self.source_id() != Some(source) {
            return false;
        }
        self.trigger
            .as_ref()
            .is_some_and(|t| t.condition.evaluate(value, t.value.as_ref()))
    }
}
