use std::fmt;
use std::str::FromStr;

use crate::error::RuleError;

/// The six threshold operators a labeling rule can use. Parsed from the
/// user-facing names stored in configuration, so an unrecognized condition
/// never makes it past the parse boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Equal,
    IsBetween,
}

impl Condition {
    pub const ALL: [Condition; 6] = [
        Condition::GreaterThan,
        Condition::LessThan,
        Condition::GreaterThanOrEqual,
        Condition::LessThanOrEqual,
        Condition::Equal,
        Condition::IsBetween,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::GreaterThan => "Greater than",
            Condition::LessThan => "Less than",
            Condition::GreaterThanOrEqual => "Greater than or equal to",
            Condition::LessThanOrEqual => "Less than or equal to",
            Condition::Equal => "Equal",
            Condition::IsBetween => "Is between",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Condition::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| RuleError::UnknownCondition(s.to_string()))
    }
}

/// Evaluate a threshold rule against a single control value.
///
/// `threshold2` is only consulted by `Is between`, which is strict on both
/// sides: a control value exactly equal to either bound does not match. For
/// that operator the bounds must satisfy `threshold1 < threshold2`; inverted
/// and degenerate (equal) bounds are rejected with distinct errors.
pub fn evaluate(
    condition: Condition,
    control_value: f64,
    threshold1: f64,
    threshold2: f64,
) -> Result<bool, RuleError> {
    match condition {
        Condition::GreaterThan => Ok(control_value > threshold1),
        Condition::LessThan => Ok(control_value < threshold1),
        Condition::GreaterThanOrEqual => Ok(control_value >= threshold1),
        Condition::LessThanOrEqual => Ok(control_value <= threshold1),
        Condition::Equal => Ok(control_value == threshold1),
        Condition::IsBetween => {
            if threshold2 < threshold1 {
                return Err(RuleError::InvertedBounds {
                    lower: threshold1,
                    upper: threshold2,
                });
            }
            if threshold2 == threshold1 {
                return Err(RuleError::EqualBounds(threshold1));
            }
            Ok(control_value > threshold1 && control_value < threshold2)
        }
    }
}
