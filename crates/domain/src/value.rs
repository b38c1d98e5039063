//! State values and the loose comparison rules scenes rely on.
//!
//! Device states arrive as untyped JSON scalars. Scenes compare them the way
//! the surrounding platform does: `1`, `"1"` and `true` are all the same
//! value, and numbers print without a trailing `.0`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

/// A single scalar state value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    String(String),
}

/// `{{stateId}}`, with surrounding whitespace allowed.
static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\{\{([^}]*)\}\}\s*$").expect("reference pattern is valid")
});

impl Value {
    /// Numeric view: numbers, and strings holding exactly one number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => s.trim().parse().ok().filter(|n: &f64| n.is_finite()),
            Self::Bool(_) => None,
        }
    }

    /// Leading-number parse of the textual form, `0` when nothing parses.
    #[must_use]
    pub fn to_number_or_zero(&self) -> f64 {
        match self {
            Self::Number(n) if n.is_finite() => *n,
            Self::String(s) => parse_float_prefix(s).unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// Equality across representations (`1 == "1"`, `true == 1`, `"true" == true`).
    #[must_use]
    pub fn loosely_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Number(n), Self::String(s)) | (Self::String(s), Self::Number(n)) => {
                s.trim().parse::<f64>().is_ok_and(|parsed| parsed == *n)
            }
            (Self::Bool(b), Self::Number(n)) | (Self::Number(n), Self::Bool(b)) => {
                *n == if *b { 1.0 } else { 0.0 }
            }
            (Self::Bool(b), Self::String(s)) | (Self::String(s), Self::Bool(b)) => {
                s == if *b { "true" } else { "false" }
                    || s.trim().parse::<f64>().is_ok_and(|n| n == f64::from(u8::from(*b)))
            }
        }
    }

    /// Whether a direct write of this value means "switch the scene on".
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => matches!(s.trim(), "true" | "1" | "on" | "ON" | "True"),
        }
    }

    /// Interpret the value as an indirect `{{stateId}}` reference.
    ///
    /// Returns `None` for plain values.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::EmptyReference`] for `{{}}`.
    pub fn as_reference(&self) -> Option<Result<&str, ResolveError>> {
        let Self::String(text) = self else {
            return None;
        };
        let captures = REFERENCE.captures(text)?;
        let id = captures.get(1).map_or("", |m| m.as_str());
        if id.is_empty() {
            Some(Err(ResolveError::EmptyReference))
        } else {
            Some(Ok(id))
        }
    }
}

/// Render a number the way the platform stringifies it (`4`, `1.5`, `NaN`).
///
/// Magnitudes below `1e-6` or from `1e21` up use exponent notation with an
/// explicit sign (`1e-7`, `1.5e+21`).
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.abs() < 1e-6 || n.abs() >= 1e21 {
        let formatted = format!("{n:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => formatted,
        };
    }
    if n.fract() == 0.0 {
        return format!("{n:.0}");
    }
    format!("{n}")
}

/// Parse the longest leading prefix of `text` that is a decimal number,
/// optionally followed by an exponent.
#[must_use]
pub fn parse_float_prefix(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let digits = |from: usize| {
        bytes
            .get(from..)
            .map_or(0, |rest| rest.iter().take_while(|b| b.is_ascii_digit()).count())
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let integral = digits(end);
    end += integral;
    let mut fraction = 0;
    if bytes.get(end) == Some(&b'.') {
        fraction = digits(end + 1);
        end += 1 + fraction;
    }
    if integral + fraction == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exponent = digits(end + 1 + sign);
        if exponent > 0 {
            end += 1 + sign + exponent;
        }
    }
    text[..end].trim_end_matches('.').parse().ok()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}
