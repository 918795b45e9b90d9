//! Coordinate-variable classification.
//!
//! Coordinate and axis variables (longitude, latitude, time, levels) are
//! never packed, to keep coordinates exact. Which variables count as
//! coordinates is decided by pluggable strategies.

use ncpack_core::VariableDef;

use crate::config::{ClassifierKind, PackConfig};

/// First `units` tokens that mark a time coordinate.
pub const TIME_UNIT_TOKENS: &[&str] = &[
    "common_year", "common_years", "year", "years", "yr", "a", "month", "months", "week",
    "weeks", "day", "days", "d", "hour", "hours", "hr", "h", "minute", "minutes", "min",
    "second", "seconds", "s", "sec",
];

pub trait CoordinateClassifier {
    fn name(&self) -> &'static str;

    fn is_coordinate(&self, var: &VariableDef) -> bool;
}

/// Matches a fixed list of variable names.
pub struct StaticNames {
    names: Vec<String>,
}

impl StaticNames {
    pub fn new(names: &[String]) -> Self {
        Self {
            names: names.to_vec(),
        }
    }
}

impl CoordinateClassifier for StaticNames {
    fn name(&self) -> &'static str {
        "static-names"
    }

    fn is_coordinate(&self, var: &VariableDef) -> bool {
        self.names.iter().any(|n| n == &var.name)
    }
}

/// Matches variables whose `axis` attribute is one of the configured axes.
pub struct AxisAttribute {
    axes: Vec<String>,
}

impl AxisAttribute {
    pub fn new(axes: &[String]) -> Self {
        Self { axes: axes.to_vec() }
    }
}

impl CoordinateClassifier for AxisAttribute {
    fn name(&self) -> &'static str {
        "axis-attribute"
    }

    fn is_coordinate(&self, var: &VariableDef) -> bool {
        var.attributes
            .get("axis")
            .and_then(|v| v.as_text())
            .is_some_and(|axis| self.axes.iter().any(|a| a.eq_ignore_ascii_case(axis.trim())))
    }
}

/// Matches time coordinates by the first token of `units`
/// ("days since 1950-01-01" → "days").
pub struct UnitsToken;

impl CoordinateClassifier for UnitsToken {
    fn name(&self) -> &'static str {
        "units-token"
    }

    fn is_coordinate(&self, var: &VariableDef) -> bool {
        var.attributes
            .get("units")
            .and_then(|v| v.as_text())
            .and_then(|units| units.split(' ').next())
            .is_some_and(|token| TIME_UNIT_TOKENS.contains(&token))
    }
}

/// Union of several strategies.
pub struct AnyOf(Vec<Box<dyn CoordinateClassifier>>);

impl AnyOf {
    pub fn from_config(config: &PackConfig) -> Self {
        let strategies = config
            .classifiers
            .iter()
            .map(|kind| -> Box<dyn CoordinateClassifier> {
                match kind {
                    ClassifierKind::StaticNames => Box::new(StaticNames::new(&config.exclude)),
                    ClassifierKind::AxisAttribute => Box::new(AxisAttribute::new(&config.axes)),
                    ClassifierKind::UnitsToken => Box::new(UnitsToken),
                }
            })
            .collect();
        Self(strategies)
    }
}

impl CoordinateClassifier for AnyOf {
    fn name(&self) -> &'static str {
        "any-of"
    }

    fn is_coordinate(&self, var: &VariableDef) -> bool {
        self.0.iter().any(|c| c.is_coordinate(var))
    }
}
