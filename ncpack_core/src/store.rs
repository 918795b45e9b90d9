//! The structured array store capability: read and write traits plus the
//! definition bookkeeping shared by every store implementation.

use std::collections::HashSet;

use crate::model::{ArrayData, AttrValue, Attributes, DataType, Dimension, VariableDef};
use crate::packing;

// ── Variable creation ──────────────────────────────────────────────────────

/// Everything needed to declare a variable in a writable store.
#[derive(Debug, Clone)]
pub struct VariableSpec {
    pub name: String,
    pub dtype: DataType,
    pub dims: Vec<String>,
    pub chunk_shape: Option<Vec<usize>>,
    pub compression_level: Option<u32>,
    /// Written as the `_FillValue` attribute; its type must match `dtype`.
    pub fill_value: Option<ArrayData>,
}

impl VariableSpec {
    pub fn new(name: impl Into<String>, dtype: DataType, dims: &[impl AsRef<str>]) -> Self {
        Self {
            name: name.into(),
            dtype,
            dims: dims.iter().map(|d| d.as_ref().to_string()).collect(),
            chunk_shape: None,
            compression_level: None,
            fill_value: None,
        }
    }

    pub fn chunked(mut self, chunk_shape: Vec<usize>) -> Self {
        self.chunk_shape = Some(chunk_shape);
        self
    }

    pub fn compressed(mut self, level: u32) -> Self {
        self.compression_level = Some(level);
        self
    }

    pub fn fill_value(mut self, fill: ArrayData) -> Self {
        self.fill_value = Some(fill);
        self
    }
}

// ── Traits ─────────────────────────────────────────────────────────────────

/// Read access to a store.
pub trait StoreRead {
    fn global_attributes(&self) -> &Attributes;

    /// Dimensions in declaration order.
    fn dimensions(&self) -> &[Dimension];

    /// Variables in declaration order.
    fn variables(&self) -> &[VariableDef];

    /// Full array of stored (still packed) values of `name`.
    fn read_values(&mut self, name: &str) -> anyhow::Result<ArrayData>;

    fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions().iter().find(|d| d.name == name)
    }

    fn variable(&self, name: &str) -> Option<&VariableDef> {
        self.variables().iter().find(|v| v.name == name)
    }

    /// Current shape of a variable, from its dimensions' lengths.
    fn shape(&self, var: &VariableDef) -> anyhow::Result<Vec<usize>> {
        shape_of(self.dimensions(), var)
    }

    /// Full array of `name` decoded with mask-and-scale: masked entries are
    /// NaN and `scale_factor`/`add_offset` are applied.
    fn read_unpacked(&mut self, name: &str) -> anyhow::Result<Vec<f64>> {
        let raw = self.read_values(name)?;
        let def = self
            .variable(name)
            .ok_or_else(|| anyhow::anyhow!("no variable named '{}'", name))?;
        Ok(packing::unpack(&def.attributes, &raw))
    }
}

/// Write access to a store.
pub trait StoreWrite {
    fn global_attribute(&self, name: &str) -> Option<&AttrValue>;

    fn set_global_attribute(&mut self, name: &str, value: AttrValue) -> anyhow::Result<()>;

    /// `len = None` declares an unlimited dimension.
    fn add_dimension(&mut self, name: &str, len: Option<usize>) -> anyhow::Result<()>;

    /// Extend an unlimited dimension to at least `len` records. Variables
    /// written shorter than that read back padded with their fill value.
    fn grow_dimension(&mut self, name: &str, len: usize) -> anyhow::Result<()>;

    fn define_variable(&mut self, spec: VariableSpec) -> anyhow::Result<()>;

    fn variable_attributes(&self, var: &str) -> Option<&Attributes>;

    fn set_variable_attribute(&mut self, var: &str, name: &str, value: AttrValue)
        -> anyhow::Result<()>;

    /// When enabled, float data written to a packed integer variable is
    /// encoded with its `scale_factor`/`add_offset`/`_FillValue`.
    fn set_auto_mask_and_scale(&mut self, var: &str, enabled: bool) -> anyhow::Result<()>;

    /// Write the full array of `var`.
    fn put_values(&mut self, var: &str, values: ArrayData) -> anyhow::Result<()>;

    /// Declare a variable and return a handle to it.
    fn add_variable(&mut self, spec: VariableSpec) -> anyhow::Result<VariableMut<'_, Self>> {
        let name = spec.name.clone();
        self.define_variable(spec)?;
        Ok(VariableMut { store: self, name })
    }

    /// Handle to an existing variable.
    fn variable_mut(&mut self, var: &str) -> Option<VariableMut<'_, Self>> {
        self.variable_attributes(var)?;
        Some(VariableMut {
            store: self,
            name: var.to_string(),
        })
    }
}

/// Mutable handle to one variable of a writable store.
pub struct VariableMut<'a, S: StoreWrite + ?Sized> {
    store: &'a mut S,
    name: String,
}

impl<'a, S: StoreWrite + ?Sized> VariableMut<'a, S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> Option<&Attributes> {
        self.store.variable_attributes(&self.name)
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<AttrValue>) -> anyhow::Result<()> {
        self.store.set_variable_attribute(&self.name, name, value.into())
    }

    pub fn set_auto_mask_and_scale(&mut self, enabled: bool) -> anyhow::Result<()> {
        self.store.set_auto_mask_and_scale(&self.name, enabled)
    }

    pub fn put_values(&mut self, values: ArrayData) -> anyhow::Result<()> {
        self.store.put_values(&self.name, values)
    }
}

// ── Shared definition bookkeeping ──────────────────────────────────────────

/// Current shape of `var` given the store's dimensions.
pub fn shape_of(dims: &[Dimension], var: &VariableDef) -> anyhow::Result<Vec<usize>> {
    var.dims
        .iter()
        .map(|name| {
            dims.iter()
                .find(|d| &d.name == name)
                .map(|d| d.len)
                .ok_or_else(|| anyhow::anyhow!("variable '{}' uses unknown dimension '{}'", var.name, name))
        })
        .collect()
}

/// Definitions of a store under construction: global attributes, dimensions,
/// variables, and which variables have auto mask-and-scale on.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub attributes: Attributes,
    pub dimensions: Vec<Dimension>,
    pub variables: Vec<VariableDef>,
    auto_scale: HashSet<String>,
}

impl Schema {
    pub fn add_dimension(&mut self, name: &str, len: Option<usize>) -> anyhow::Result<()> {
        if self.dimensions.iter().any(|d| d.name == name) {
            anyhow::bail!("dimension '{}' already defined", name);
        }
        self.dimensions.push(Dimension {
            name: name.to_string(),
            len: len.unwrap_or(0),
            unlimited: len.is_none(),
        });
        Ok(())
    }

    pub fn grow_dimension(&mut self, name: &str, len: usize) -> anyhow::Result<()> {
        let dim = self
            .dimensions
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| anyhow::anyhow!("no dimension named '{}'", name))?;
        if !dim.unlimited {
            anyhow::bail!("dimension '{}' is fixed at {} and cannot grow", name, dim.len);
        }
        dim.len = dim.len.max(len);
        Ok(())
    }

    pub fn define_variable(&mut self, spec: VariableSpec) -> anyhow::Result<()> {
        if self.variables.iter().any(|v| v.name == spec.name) {
            anyhow::bail!("variable '{}' already defined", spec.name);
        }
        for dim in &spec.dims {
            if !self.dimensions.iter().any(|d| &d.name == dim) {
                anyhow::bail!("variable '{}' uses unknown dimension '{}'", spec.name, dim);
            }
        }
        if let Some(chunk) = &spec.chunk_shape {
            if chunk.len() != spec.dims.len() {
                anyhow::bail!(
                    "variable '{}': chunk shape {:?} does not match rank {}",
                    spec.name,
                    chunk,
                    spec.dims.len()
                );
            }
            if chunk.iter().any(|&c| c == 0) {
                anyhow::bail!("variable '{}': chunk shape {:?} has a zero axis", spec.name, chunk);
            }
        }

        let mut attributes = Attributes::new();
        if let Some(fill) = spec.fill_value {
            if fill.dtype() != spec.dtype || fill.len() != 1 {
                anyhow::bail!(
                    "variable '{}': fill value must be a single {} element",
                    spec.name,
                    spec.dtype
                );
            }
            attributes.set(packing::FILL_VALUE, fill);
        }

        self.variables.push(VariableDef {
            name: spec.name,
            dtype: spec.dtype,
            dims: spec.dims,
            attributes,
            chunk_shape: spec.chunk_shape,
            compression_level: spec.compression_level,
        });
        Ok(())
    }

    pub fn variable(&self, name: &str) -> Option<&VariableDef> {
        self.variables.iter().find(|v| v.name == name)
    }

    fn variable_mut(&mut self, name: &str) -> anyhow::Result<&mut VariableDef> {
        self.variables
            .iter_mut()
            .find(|v| v.name == name)
            .ok_or_else(|| anyhow::anyhow!("no variable named '{}'", name))
    }

    pub fn set_variable_attribute(&mut self, var: &str, name: &str, value: AttrValue) -> anyhow::Result<()> {
        self.variable_mut(var)?.attributes.set(name, value);
        Ok(())
    }

    pub fn set_auto_mask_and_scale(&mut self, var: &str, enabled: bool) -> anyhow::Result<()> {
        self.variable_mut(var)?;
        if enabled {
            self.auto_scale.insert(var.to_string());
        } else {
            self.auto_scale.remove(var);
        }
        Ok(())
    }

    /// Validate a full-array write and convert it to the variable's stored
    /// type. Grows a leading unlimited dimension to fit the data.
    ///
    /// Returns the stored values and the shape they were written with.
    pub fn prepare_put(&mut self, var: &str, values: ArrayData) -> anyhow::Result<(ArrayData, Vec<usize>)> {
        let def = self
            .variable(var)
            .ok_or_else(|| anyhow::anyhow!("no variable named '{}'", var))?
            .clone();

        let stored = if values.dtype() == def.dtype {
            values
        } else if self.auto_scale.contains(var)
            && values.dtype().is_float()
            && packing::LinearPacking::from_attributes(&def.attributes).is_some()
        {
            packing::pack(&def.attributes, def.dtype, &values.to_f64_vec())?
        } else {
            anyhow::bail!(
                "cannot write {} data to {} variable '{}'",
                values.dtype(),
                def.dtype,
                var
            );
        };

        let mut shape = shape_of(&self.dimensions, &def)?;
        let leading_unlimited = def
            .dims
            .first()
            .and_then(|d| self.dimensions.iter().find(|x| &x.name == d))
            .is_some_and(|d| d.unlimited);

        if leading_unlimited {
            let inner: usize = shape[1..].iter().product();
            if inner == 0 || stored.len() % inner != 0 {
                anyhow::bail!(
                    "variable '{}': {} values do not fill whole records of {} elements",
                    var,
                    stored.len(),
                    inner
                );
            }
            let records = stored.len() / inner;
            shape[0] = records;
            if let Some(dim) = self.dimensions.iter_mut().find(|d| d.name == def.dims[0]) {
                dim.len = dim.len.max(records);
            }
        } else {
            let expected: usize = shape.iter().product();
            if stored.len() != expected {
                anyhow::bail!(
                    "variable '{}' has shape {:?} ({} values) but {} were written",
                    var,
                    shape,
                    expected,
                    stored.len()
                );
            }
        }

        Ok((stored, shape))
    }
}

/// Expand stored values to the variable's current shape. Records missing
/// along a grown unlimited dimension (or a variable never written) read back
/// as the fill value.
pub fn complete_to_shape(
    def: &VariableDef,
    shape: &[usize],
    stored: Option<ArrayData>,
) -> anyhow::Result<ArrayData> {
    let total: usize = shape.iter().product();
    match stored {
        Some(data) if data.len() == total => Ok(data),
        Some(data) if data.len() > total => {
            anyhow::bail!("variable '{}' holds more values than its shape allows", def.name)
        }
        other => {
            let fill = packing::fill_value(&def.attributes, def.dtype);
            let mut bytes = ArrayData::filled(def.dtype, fill, total).to_le_bytes();
            if let Some(data) = other {
                let prefix = data.to_le_bytes();
                bytes[..prefix.len()].copy_from_slice(&prefix);
            }
            ArrayData::from_le_bytes(def.dtype, &bytes)
        }
    }
}
