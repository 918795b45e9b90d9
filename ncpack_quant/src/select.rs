//! Which source variables are packed.

use std::collections::BTreeSet;

use ncpack_core::{DataType, StoreRead, VariableDef};
use tracing::warn;

use crate::classify::{AnyOf, CoordinateClassifier};
use crate::config::{PackConfig, TargetSelection};

/// Element types eligible for packing.
pub const PACKABLE_TYPES: [DataType; 4] = [DataType::F64, DataType::F32, DataType::U32, DataType::U16];

/// Rank ≥ 2, packable element type, and not a coordinate.
pub fn is_candidate(var: &VariableDef, classifier: &dyn CoordinateClassifier) -> bool {
    var.rank() >= 2 && PACKABLE_TYPES.contains(&var.dtype) && !classifier.is_coordinate(var)
}

/// Candidate names in declaration order.
pub fn select_candidates(variables: &[VariableDef], config: &PackConfig) -> Vec<String> {
    let classifier = AnyOf::from_config(config);
    variables
        .iter()
        .filter(|v| is_candidate(v, &classifier))
        .map(|v| v.name.clone())
        .collect()
}

/// The names that will actually be packed.
///
/// An explicit list takes precedence over auto-selection. Explicit names
/// must exist in the store; names outside the candidate set are packed
/// anyway, with a warning.
pub fn resolve_targets<S: StoreRead + ?Sized>(src: &S, config: &PackConfig) -> anyhow::Result<BTreeSet<String>> {
    let candidates = select_candidates(src.variables(), config);
    match &config.targets {
        TargetSelection::Auto => Ok(candidates.into_iter().collect()),
        TargetSelection::Explicit(names) => {
            let mut targets = BTreeSet::new();
            for name in names {
                let var = src
                    .variable(name)
                    .ok_or_else(|| anyhow::anyhow!("variable '{}' not found in input", name))?;
                if !var.dtype.is_float() && !var.dtype.is_integer() {
                    anyhow::bail!("variable '{}' has type {} and cannot be packed", name, var.dtype);
                }
                if !candidates.contains(name) {
                    warn!(var = %name, "packing variable outside the candidate set");
                }
                targets.insert(name.clone());
            }
            Ok(targets)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncpack_core::{ArrayData, MemoryStore, StoreWrite, VariableSpec};

    fn store() -> MemoryStore {
        let mut s = MemoryStore::new();
        s.add_dimension("time", None).unwrap();
        s.add_dimension("lat", Some(2)).unwrap();
        s.add_dimension("lon", Some(3)).unwrap();
        for (name, dtype, dims) in [
            ("lat", DataType::F64, vec!["lat"]),
            ("lon", DataType::F64, vec!["lon"]),
            ("pr", DataType::F32, vec!["time", "lat", "lon"]),
            ("mask", DataType::I32, vec!["lat", "lon"]),
            ("orog", DataType::F64, vec!["lat", "lon"]),
            ("counts", DataType::U16, vec!["lat", "lon"]),
            ("slon", DataType::F64, vec!["lat", "lon"]),
        ] {
            s.define_variable(VariableSpec::new(name, dtype, &dims)).unwrap();
        }
        s.put_values("pr", ArrayData::F32(vec![0.0; 6])).unwrap();
        s
    }

    #[test]
    fn test_candidates_follow_rank_type_and_names() {
        let s = store();
        let candidates = select_candidates(s.variables(), &PackConfig::default());
        assert_eq!(candidates, vec!["pr", "orog", "counts"]);
    }

    #[test]
    fn test_auto_targets_are_candidates() {
        let targets = resolve_targets(&store(), &PackConfig::default()).unwrap();
        assert_eq!(targets.into_iter().collect::<Vec<_>>(), vec!["counts", "orog", "pr"]);
    }

    #[test]
    fn test_explicit_targets_take_precedence() {
        let config = PackConfig::default().with_targets(vec!["pr".into(), "mask".into()]);
        let targets = resolve_targets(&store(), &config).unwrap();
        assert_eq!(targets.into_iter().collect::<Vec<_>>(), vec!["mask", "pr"]);
    }

    #[test]
    fn test_unknown_explicit_target_fails() {
        let config = PackConfig::default().with_targets(vec!["tas".into()]);
        let err = resolve_targets(&store(), &config).unwrap_err().to_string();
        assert!(err.contains("'tas' not found"), "got: {err}");
    }
}
