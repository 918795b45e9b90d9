//! Structural copy of a store: global attributes, dimensions and every
//! variable, with selected variables handed to a transform.

use std::collections::BTreeSet;

use anyhow::Context;
use ncpack_core::{ArrayData, StoreRead, StoreWrite, VariableDef, VariableMut, VariableSpec};
use tracing::info;

/// Creates the destination variable for a variable selected for
/// transformation. The caller writes the unpacked source values into the
/// returned handle.
pub trait VariableTransform<W: StoreWrite + ?Sized> {
    fn create<'w>(
        &mut self,
        src: &VariableDef,
        shape: &[usize],
        values: &[f64],
        dst: &'w mut W,
    ) -> anyhow::Result<VariableMut<'w, W>>;
}

/// Names of the variables copied verbatim and transformed, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopySummary {
    pub copied: Vec<String>,
    pub transformed: Vec<String>,
}

/// Reproduce `src` in `dst`. Variables named in `targets` go through
/// `transform`; every other variable is copied with its type, dimensions,
/// attributes and values unchanged. Unlimited dimensions stay unlimited.
pub fn copy_all<R, W, T>(
    src: &mut R,
    dst: &mut W,
    targets: &BTreeSet<String>,
    transform: &mut T,
) -> anyhow::Result<CopySummary>
where
    R: StoreRead + ?Sized,
    W: StoreWrite + ?Sized,
    T: VariableTransform<W> + ?Sized,
{
    for attr in src.global_attributes().iter() {
        dst.set_global_attribute(&attr.name, attr.value.clone())?;
    }
    for dim in src.dimensions() {
        if dim.unlimited {
            dst.add_dimension(&dim.name, None)?;
            dst.grow_dimension(&dim.name, dim.len)?;
        } else {
            dst.add_dimension(&dim.name, Some(dim.len))?;
        }
    }

    let mut summary = CopySummary::default();
    let variables = src.variables().to_vec();
    for def in &variables {
        if targets.contains(&def.name) {
            let shape = src.shape(def)?;
            let values = src
                .read_unpacked(&def.name)
                .with_context(|| format!("reading variable '{}'", def.name))?;
            let mut var = transform.create(def, &shape, &values, dst)?;
            var.put_values(ArrayData::F64(values))
                .with_context(|| format!("writing packed variable '{}'", def.name))?;
            summary.transformed.push(def.name.clone());
        } else {
            info!("processing variable: {} copy", def.name);
            copy_variable(src, dst, def)?;
            summary.copied.push(def.name.clone());
        }
    }
    Ok(summary)
}

/// Identically typed and dimensioned, stored unchunked and uncompressed.
fn copy_variable<R, W>(src: &mut R, dst: &mut W, def: &VariableDef) -> anyhow::Result<()>
where
    R: StoreRead + ?Sized,
    W: StoreWrite + ?Sized,
{
    dst.define_variable(VariableSpec::new(def.name.as_str(), def.dtype, &def.dims))?;
    for attr in def.attributes.iter() {
        dst.set_variable_attribute(&def.name, &attr.name, attr.value.clone())?;
    }
    let values = src
        .read_values(&def.name)
        .with_context(|| format!("reading variable '{}'", def.name))?;
    dst.put_values(&def.name, values)
        .with_context(|| format!("writing variable '{}'", def.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncpack_core::{AttrValue, DataType, MemoryStore};

    fn source() -> MemoryStore {
        let mut s = MemoryStore::new();
        s.set_global_attribute("title", AttrValue::from("test")).unwrap();
        s.set_global_attribute("Conventions", AttrValue::from("CF-1.6")).unwrap();
        s.add_dimension("time", None).unwrap();
        s.add_dimension("x", Some(3)).unwrap();

        let mut time = s.add_variable(VariableSpec::new("time", DataType::F64, &["time"])).unwrap();
        time.set_attribute("units", "days since 2000-01-01").unwrap();
        time.put_values(ArrayData::F64(vec![0.5, 1.5])).unwrap();

        let mut t = s
            .add_variable(VariableSpec::new("t", DataType::I16, &["time", "x"]).fill_value(ArrayData::I16(vec![-1])))
            .unwrap();
        t.set_attribute("scale_factor", 0.1f64).unwrap();
        t.put_values(ArrayData::I16(vec![1, 2, 3, -1, 5, 6])).unwrap();
        s
    }

    /// Records calls and creates a plain f64 variable.
    struct Recorder(Vec<String>);

    impl VariableTransform<MemoryStore> for Recorder {
        fn create<'w>(
            &mut self,
            src: &VariableDef,
            _shape: &[usize],
            _values: &[f64],
            dst: &'w mut MemoryStore,
        ) -> anyhow::Result<VariableMut<'w, MemoryStore>> {
            self.0.push(src.name.clone());
            dst.add_variable(VariableSpec::new(src.name.as_str(), DataType::F64, &src.dims))
        }
    }

    #[test]
    fn test_empty_target_set_is_lossless() {
        let mut src = source();
        let mut dst = MemoryStore::new();
        let mut recorder = Recorder(Vec::new());
        let summary = copy_all(&mut src, &mut dst, &BTreeSet::new(), &mut recorder).unwrap();

        assert!(recorder.0.is_empty());
        assert_eq!(summary.copied, vec!["time", "t"]);
        assert_eq!(dst.global_attributes(), src.global_attributes());
        assert_eq!(dst.dimensions(), src.dimensions());
        assert_eq!(dst.variables(), src.variables());
        for name in ["time", "t"] {
            assert_eq!(dst.read_values(name).unwrap(), src.read_values(name).unwrap());
        }
    }

    #[test]
    fn test_targets_receive_unpacked_values() {
        let mut src = source();
        let mut dst = MemoryStore::new();
        let mut recorder = Recorder(Vec::new());
        let targets: BTreeSet<String> = ["t".to_string()].into_iter().collect();
        let summary = copy_all(&mut src, &mut dst, &targets, &mut recorder).unwrap();

        assert_eq!(recorder.0, vec!["t"]);
        assert_eq!(summary.transformed, vec!["t"]);
        let written = dst.read_values("t").unwrap().to_f64_vec();
        assert!((written[2] - 0.3).abs() < 1e-12);
        assert!(written[3].is_nan());
        assert!(dst.dimension("time").unwrap().unlimited);
        assert_eq!(dst.dimension("time").unwrap().len, 2);
    }

    #[test]
    fn test_trailing_unlimited_dimension_copies_before_its_coordinate() {
        let mut src = MemoryStore::new();
        src.add_dimension("x", Some(2)).unwrap();
        src.add_dimension("time", None).unwrap();
        src.define_variable(VariableSpec::new("v", DataType::F32, &["x", "time"])).unwrap();
        src.define_variable(VariableSpec::new("time", DataType::F64, &["time"])).unwrap();
        src.put_values("time", ArrayData::F64(vec![0.0, 1.0, 2.0])).unwrap();
        src.grow_dimension("time", 3).unwrap();
        src.put_values("v", ArrayData::F32(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])).unwrap();

        let mut dst = MemoryStore::new();
        let mut recorder = Recorder(Vec::new());
        let summary = copy_all(&mut src, &mut dst, &BTreeSet::new(), &mut recorder).unwrap();

        assert_eq!(summary.copied, vec!["v", "time"]);
        assert_eq!(dst.dimensions(), src.dimensions());
        assert!(dst.dimension("time").unwrap().unlimited);
        assert_eq!(dst.read_values("v").unwrap(), ArrayData::F32(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        assert_eq!(dst.read_values("time").unwrap(), ArrayData::F64(vec![0.0, 1.0, 2.0]));
    }

    #[test]
    fn test_grow_rejects_fixed_dimension() {
        let mut store = MemoryStore::new();
        store.add_dimension("x", Some(2)).unwrap();
        assert!(store.grow_dimension("x", 4).is_err());
        assert!(store.grow_dimension("missing", 1).is_err());
    }
}
