//! Member: one controllable state governed by a scene.

use serde::{Deserialize, Serialize};

use crate::scene::Branch;
use crate::value::Value;

/// A concrete scene member after category expansion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    /// Target state id.
    pub id: String,
    /// Index of the configured member this one was produced from.
    ///
    /// Category selectors expand into several members sharing one origin.
    pub origin: usize,
    /// Desired value when the scene is true. `None` leaves the state alone.
    pub set_if_true: Option<Value>,
    pub set_if_false: Option<Value>,
    pub set_if_true_tolerance: Option<f64>,
    pub set_if_false_tolerance: Option<f64>,
    /// Own delay in milliseconds.
    pub delay: u64,
    pub stack_next_delays: bool,
    pub stop_all_delays: bool,
    pub do_not_overwrite: bool,
    /// Ack flag used when writing the target.
    pub ack_true: bool,
    /// Last observed value of the target. Runtime only.
    #[serde(skip)]
    pub actual: Option<Value>,
}

impl Member {
    /// Start building a member targeting `id`.
    #[must_use]
    pub fn builder(id: impl Into<String>) -> MemberBuilder {
        MemberBuilder {
            member: Self {
                id: id.into(),
                origin: 0,
                set_if_true: None,
                set_if_false: None,
                set_if_true_tolerance: None,
                set_if_false_tolerance: None,
                delay: 0,
                stack_next_delays: false,
                stop_all_delays: false,
                do_not_overwrite: false,
                ack_true: false,
                actual: None,
            },
        }
    }

    /// Configured desired value for a branch.
    #[must_use]
    pub fn desired(&self, branch: Branch) -> Option<&Value> {
        match branch {
            Branch::True => self.set_if_true.as_ref(),
            Branch::False => self.set_if_false.as_ref(),
        }
    }

    /// Configured tolerance for a branch.
    #[must_use]
    pub fn tolerance(&self, branch: Branch) -> Option<f64> {
        match branch {
            Branch::True => self.set_if_true_tolerance,
            Branch::False => self.set_if_false_tolerance,
        }
    }
}

/// Builder for [`Member`]. Every field has a default, so building never fails.
#[derive(Debug)]
pub struct MemberBuilder {
    member: Member,
}

impl MemberBuilder {
    #[must_use]
    pub fn origin(mut self, origin: usize) -> Self {
        self.member.origin = origin;
        self
    }

    #[must_use]
    pub fn set_if_true(mut self, value: impl Into<Value>) -> Self {
        self.member.set_if_true = Some(value.into());
        self
    }

    #[must_use]
    pub fn set_if_false(mut self, value: impl Into<Value>) -> Self {
        self.member.set_if_false = Some(value.into());
        self
    }

    #[must_use]
    pub fn tolerances(mut self, if_true: Option<f64>, if_false: Option<f64>) -> Self {
        self.member.set_if_true_tolerance = if_true;
        self.member.set_if_false_tolerance = if_false;
        self
    }

    #[must_use]
    pub fn delay(mut self, millis: u64) -> Self {
        self.member.delay = millis;
        self
    }

    #[must_use]
    pub fn stack_next_delays(mut self, stack: bool) -> Self {
        self.member.stack_next_delays = stack;
        self
    }

    #[must_use]
    pub fn stop_all_delays(mut self, stop: bool) -> Self {
        self.member.stop_all_delays = stop;
        self
    }

    #[must_use]
    pub fn do_not_overwrite(mut self, keep: bool) -> Self {
        self.member.do_not_overwrite = keep;
        self
    }

    #[must_use]
    pub fn ack_true(mut self, ack: bool) -> Self {
        self.member.ack_true = ack;
        self
    }

    #[must_use]
    pub fn build(self) -> Member {
        self.member
    }
}

/// Effective write delay of every member, in order.
///
/// A member marked `stack_next_delays` starts a chain: every following member
/// waits for the sum of the delays from that member up to its predecessor, on
/// top of its own delay. A member without the flag that follows a chain
/// extends it, so the chain only restarts at the next stacking member.
#[must_use]
pub fn effective_delays(members: &[Member]) -> Vec<u64> {
    let mut out = Vec::with_capacity(members.len());
    let mut stacked: Option<u64> = None;
    for member in members {
        out.push(stacked.unwrap_or(0).saturating_add(member.delay));
        stacked = if member.stack_next_delays {
            Some(member.delay)
        } else {
            stacked.map(|sum| sum.saturating_add(member.delay))
        };
    }
    out
}
