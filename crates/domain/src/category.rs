//! Category selectors and their expansion into concrete state ids.
//!
//! A selector names rooms, functions and other categories. Expansion is a
//! set expression over category membership; each surviving id is then mapped
//! to the state that actually controls it through a fixed capability table.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Set expression over categories: rooms ∩ functions ∪ others − exclude.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategorySelector {
    pub rooms: Vec<String>,
    pub funcs: Vec<String>,
    pub others: Vec<String>,
    pub exclude: Vec<String>,
}

impl CategorySelector {
    /// Every category id the selector reads membership from.
    #[must_use]
    pub fn category_ids(&self) -> Vec<&str> {
        self.rooms
            .iter()
            .chain(&self.funcs)
            .chain(&self.others)
            .map(String::as_str)
            .collect()
    }

    /// Evaluate the expression against category membership lists.
    ///
    /// Unknown categories count as empty. The result keeps first-seen order
    /// and contains no duplicates.
    #[must_use]
    pub fn select(&self, membership: &HashMap<String, Vec<String>>) -> Vec<String> {
        let members_of = |ids: &[String]| -> Vec<String> {
            ids.iter()
                .filter_map(|id| membership.get(id))
                .flatten()
                .cloned()
                .collect()
        };

        let mut candidates = if self.rooms.is_empty() {
            members_of(&self.funcs)
        } else {
            let in_rooms = members_of(&self.rooms);
            if self.funcs.is_empty() {
                in_rooms
            } else {
                let in_funcs: HashSet<String> = members_of(&self.funcs).into_iter().collect();
                in_rooms
                    .into_iter()
                    .filter(|id| in_funcs.contains(id))
                    .collect()
            }
        };
        candidates.extend(members_of(&self.others));

        let excluded: HashSet<&str> = self.exclude.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        candidates.retain(|id| !excluded.contains(id.as_str()) && seen.insert(id.clone()));
        candidates
    }
}

/// The kind of control a category member should be driven through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    #[default]
    Boolean,
    Number,
}

/// Control state attached to a detected device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceControl {
    pub name: String,
    pub state_id: String,
}

/// What the capability detector knows about an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectedObject {
    /// Already a controllable state.
    State,
    /// A device or channel exposing named controls.
    Device {
        device_type: String,
        controls: Vec<DeviceControl>,
    },
}

type ControlNames = &'static [&'static str];

/// Device type → control kind → control names to try, in order.
static CAPABILITIES: &[(&str, &[(ControlKind, ControlNames)])] = &[
    ("light", &[(ControlKind::Boolean, &["SET", "ON"])]),
    (
        "dimmer",
        &[
            (ControlKind::Boolean, &["ON_SET", "ON"]),
            (ControlKind::Number, &["SET", "LEVEL", "BRIGHTNESS"]),
        ],
    ),
    ("socket", &[(ControlKind::Boolean, &["SET", "ON", "STATE"])]),
    (
        "blind",
        &[
            (ControlKind::Boolean, &["STOP"]),
            (ControlKind::Number, &["SET", "LEVEL"]),
        ],
    ),
    ("thermostat", &[(ControlKind::Number, &["SET", "SETPOINT"])]),
    (
        "airCondition",
        &[
            (ControlKind::Boolean, &["POWER", "ON"]),
            (ControlKind::Number, &["SET", "SETPOINT"]),
        ],
    ),
    ("vacuumCleaner", &[(ControlKind::Boolean, &["POWER", "ON"])]),
    (
        "mediaPlayer",
        &[
            (ControlKind::Boolean, &["STATE", "PLAY"]),
            (ControlKind::Number, &["VOLUME"]),
        ],
    ),
    ("volume", &[(ControlKind::Number, &["SET", "LEVEL"])]),
    ("lock", &[(ControlKind::Boolean, &["SET", "OPEN"])]),
    (
        "ct",
        &[
            (ControlKind::Boolean, &["ON"]),
            (ControlKind::Number, &["DIMMER", "BRIGHTNESS"]),
        ],
    ),
    (
        "rgb",
        &[
            (ControlKind::Boolean, &["ON"]),
            (ControlKind::Number, &["DIMMER", "BRIGHTNESS"]),
        ],
    ),
    (
        "hue",
        &[
            (ControlKind::Boolean, &["ON"]),
            (ControlKind::Number, &["DIMMER", "BRIGHTNESS"]),
        ],
    ),
];

/// Control names to try for a device type and kind.
#[must_use]
pub fn control_candidates(device_type: &str, kind: ControlKind) -> ControlNames {
    CAPABILITIES
        .iter()
        .find(|(ty, _)| *ty == device_type)
        .and_then(|(_, controls)| controls.iter().find(|(k, _)| *k == kind))
        .map_or(&[] as ControlNames, |(_, names)| *names)
}

/// Map a category member to the state that controls it.
///
/// Plain states pass through. Devices resolve to their first control whose
/// name (case-insensitively) is a candidate for `kind`.
#[must_use]
pub fn resolve_control(id: &str, detected: &DetectedObject, kind: ControlKind) -> Option<String> {
    match detected {
        DetectedObject::State => Some(id.to_string()),
        DetectedObject::Device {
            device_type,
            controls,
        } => control_candidates(device_type, kind)
            .iter()
            .find_map(|candidate| {
                controls
                    .iter()
                    .find(|c| c.name.eq_ignore_ascii_case(candidate))
            })
            .map(|c| c.state_id.clone()),
    }
}
