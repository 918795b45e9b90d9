//! Decoded-value comparison between a source and a destination store.

use std::collections::BTreeSet;

use ncpack_core::packing::LinearPacking;
use ncpack_core::StoreRead;
use tracing::info;

/// How close decoded destination values must be to the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tolerance {
    /// Bitwise equal; masked entries must be masked on both sides.
    Exact,
    /// Within one `scale_factor` of the destination variable.
    Quantized,
}

/// Compare the decoded values of `name` in both stores.
pub fn check_values<R, D>(src: &mut R, dst: &mut D, name: &str, tolerance: Tolerance) -> anyhow::Result<()>
where
    R: StoreRead + ?Sized,
    D: StoreRead + ?Sized,
{
    let expected = src.read_unpacked(name)?;
    let actual = dst.read_unpacked(name)?;
    if expected.len() != actual.len() {
        anyhow::bail!(
            "value check for {} failed: source has {} values, destination {}",
            name,
            expected.len(),
            actual.len()
        );
    }

    let bound = match tolerance {
        Tolerance::Exact => 0.0,
        Tolerance::Quantized => dst
            .variable(name)
            .and_then(|v| LinearPacking::from_attributes(&v.attributes))
            .map_or(0.0, |p| p.scale_factor.abs()),
    };

    for (i, (a, b)) in expected.iter().zip(&actual).enumerate() {
        let ok = match (a.is_nan(), b.is_nan()) {
            (true, true) => true,
            (false, false) if tolerance == Tolerance::Exact => a == b,
            (false, false) => (a - b).abs() <= bound,
            _ => false,
        };
        if !ok {
            anyhow::bail!(
                "value check for {} failed at index {}: source {} vs destination {}",
                name,
                i,
                a,
                b
            );
        }
    }
    info!("Value check for {} passed.", name);
    Ok(())
}

/// Check every destination variable: quantized tolerance for `packed`,
/// exact for the rest.
pub fn check_all<R, D>(src: &mut R, dst: &mut D, packed: &BTreeSet<String>) -> anyhow::Result<()>
where
    R: StoreRead + ?Sized,
    D: StoreRead + ?Sized,
{
    let names: Vec<String> = dst.variables().iter().map(|v| v.name.clone()).collect();
    for name in names {
        let tolerance = if packed.contains(&name) {
            Tolerance::Quantized
        } else {
            Tolerance::Exact
        };
        check_values(src, dst, &name, tolerance)?;
    }
    Ok(())
}
