use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Coordinate/axis variable names never packed, even when 2-D or larger.
pub const DEFAULT_EXCLUDE: &[&str] = &[
    "lon", "lat", "slon", "slat", "slonu", "slatu", "slonv", "slatv", "time", "time_bnds",
    "rlon", "rlat", "level_bnds", "level", "levels",
];

/// Coordinate classification strategies; a variable is a coordinate if any
/// configured strategy says so.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifierKind {
    /// Name is in `exclude`.
    StaticNames,
    /// `axis` attribute is one of `axes`.
    AxisAttribute,
    /// First token of `units` is a time unit.
    UnitsToken,
}

impl std::str::FromStr for ClassifierKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "static-names" | "names" => Ok(ClassifierKind::StaticNames),
            "axis-attribute" | "axis" => Ok(ClassifierKind::AxisAttribute),
            "units-token" | "units" => Ok(ClassifierKind::UnitsToken),
            other => anyhow::bail!(
                "unknown classifier '{}'. Valid options: static-names, axis-attribute, units-token",
                other
            ),
        }
    }
}

/// Which variables get packed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetSelection {
    /// Every candidate the selection predicate accepts.
    Auto,
    /// Exactly these names, candidates or not.
    Explicit(Vec<String>),
}

/// Immutable settings for one packing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackConfig {
    /// Compression level for packed variables (0–9 for deflate).
    pub compression_level: u32,
    /// A variable is skewed when its smaller mean-to-extreme gap is below
    /// `(max - min) / skew_divisor`.
    pub skew_divisor: f64,
    pub exclude: Vec<String>,
    pub classifiers: Vec<ClassifierKind>,
    /// `axis` values the axis-attribute classifier treats as coordinates.
    pub axes: Vec<String>,
    pub targets: TargetSelection,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            compression_level: 9,
            skew_divisor: 1000.0,
            exclude: DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect(),
            classifiers: vec![ClassifierKind::StaticNames],
            axes: ["T", "Z", "X", "Y"].iter().map(|s| s.to_string()).collect(),
            targets: TargetSelection::Auto,
        }
    }
}

impl PackConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {:?}", path))?;
        let config: Self =
            serde_json::from_str(&text).with_context(|| format!("parsing config file {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.skew_divisor.is_finite() && self.skew_divisor > 0.0) {
            anyhow::bail!("skew_divisor must be a positive number, got {}", self.skew_divisor);
        }
        if self.classifiers.is_empty() {
            anyhow::bail!("at least one coordinate classifier is required");
        }
        if let TargetSelection::Explicit(names) = &self.targets {
            if names.is_empty() {
                anyhow::bail!("explicit target list is empty");
            }
        }
        Ok(())
    }

    /// Replace the target selection with an explicit list.
    pub fn with_targets(mut self, names: Vec<String>) -> Self {
        self.targets = TargetSelection::Explicit(names);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_constants() {
        let config = PackConfig::default();
        assert_eq!(config.compression_level, 9);
        assert_eq!(config.skew_divisor, 1000.0);
        assert_eq!(config.exclude.len(), 15);
        assert!(config.exclude.iter().any(|n| n == "time_bnds"));
        assert_eq!(config.targets, TargetSelection::Auto);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pack.json");
        std::fs::write(
            &path,
            r#"{ "compression_level": 4, "classifiers": ["static-names", "units-token"],
                 "targets": { "explicit": ["pr"] } }"#,
        )
        .unwrap();
        let config = PackConfig::from_json_file(&path).unwrap();
        assert_eq!(config.compression_level, 4);
        assert_eq!(config.skew_divisor, 1000.0);
        assert_eq!(config.classifiers, vec![ClassifierKind::StaticNames, ClassifierKind::UnitsToken]);
        assert_eq!(config.targets, TargetSelection::Explicit(vec!["pr".into()]));
    }

    #[test]
    fn test_unknown_field_and_bad_divisor_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "complevel": 9 }"#).unwrap();
        assert!(PackConfig::from_json_file(&path).is_err());

        let config = PackConfig {
            skew_divisor: 0.0,
            ..PackConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_classifier_names_parse() {
        assert_eq!("axis".parse::<ClassifierKind>().unwrap(), ClassifierKind::AxisAttribute);
        assert!("grid".parse::<ClassifierKind>().is_err());
    }
}
