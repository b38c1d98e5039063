//! Reconciliation of desired vs. actual member values.
//!
//! These functions decide which value a scene reports for itself. They are
//! pure; resolving indirect references and debouncing happen in the engine.

use crate::scene::{Aggregation, SceneValue};
use crate::value::Value;

/// A resolved desired value and its optional tolerance.
#[derive(Debug, Clone, PartialEq)]
pub struct Desired {
    pub value: Value,
    pub tolerance: Option<f64>,
}

impl Desired {
    #[must_use]
    pub fn new(value: Value, tolerance: Option<f64>) -> Self {
        Self { value, tolerance }
    }

    /// Whether `actual` counts as having reached this value.
    #[must_use]
    pub fn matches(&self, actual: Option<&Value>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        if actual.loosely_eq(&self.value) {
            return true;
        }
        match (self.tolerance, numeric(actual), numeric(&self.value)) {
            (Some(tolerance), Some(a), Some(d)) => tolerance.abs() >= (a - d).abs(),
            _ => false,
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(f64::from(u8::from(*b))),
        other => other.as_f64(),
    }
}

/// One member as seen by the reconciliation.
///
/// A `None` desired value takes no part in that branch's verdict.
#[derive(Debug, Clone, Default)]
pub struct MemberCheck {
    pub actual: Option<Value>,
    pub if_true: Option<Desired>,
    pub if_false: Option<Desired>,
}

fn all_match<'a>(
    checks: &'a [MemberCheck],
    desired: impl Fn(&'a MemberCheck) -> Option<&'a Desired>,
) -> bool {
    let mut participating = false;
    for check in checks {
        if let Some(d) = desired(check) {
            participating = true;
            if !d.matches(check.actual.as_ref()) {
                return false;
            }
        }
    }
    participating
}

/// Value of a plain (non virtual-group) scene.
///
/// Returns `None` when the scene has no false branch and is not fully true:
/// such a scene keeps whatever it last reported.
#[must_use]
pub fn evaluate(checks: &[MemberCheck], has_false_branch: bool) -> Option<SceneValue> {
    if all_match(checks, |c| c.if_true.as_ref()) {
        return Some(SceneValue::from(true));
    }
    if !has_false_branch {
        return None;
    }
    if all_match(checks, |c| c.if_false.as_ref()) {
        Some(SceneValue::from(false))
    } else {
        Some(SceneValue::Uncertain)
    }
}

/// Value of a virtual group from its members' actual values.
///
/// Agreeing members yield their shared value. Otherwise `mode` folds the
/// values; non-numeric values count as `0` for the numeric modes. Returns
/// `None` when there is nothing to report.
#[must_use]
pub fn aggregate(mode: Aggregation, actuals: &[Option<Value>]) -> Option<SceneValue> {
    let (first, rest) = actuals.split_first()?;
    let agree = rest.iter().all(|v| match (first, v) {
        (None, None) => true,
        (Some(a), Some(b)) => a.loosely_eq(b),
        _ => false,
    });
    if agree {
        return first.clone().map(SceneValue::Value);
    }

    let numbers = || {
        actuals
            .iter()
            .map(|v| v.as_ref().map_or(0.0, Value::to_number_or_zero))
    };
    let result = match mode {
        Aggregation::Uncertain => return Some(SceneValue::Uncertain),
        Aggregation::Any => return actuals.iter().flatten().next().cloned().map(SceneValue::Value),
        Aggregation::Min => numbers().fold(f64::INFINITY, f64::min),
        Aggregation::Max => numbers().fold(f64::NEG_INFINITY, f64::max),
        Aggregation::Avg => {
            let (sum, count) = numbers().fold((0.0, 0_u32), |(s, c), n| (s + n, c + 1));
            sum / f64::from(count)
        }
    };
    Some(SceneValue::Value(Value::Number(result)))
}
