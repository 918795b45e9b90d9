//! Fixed-width integer quantization of one variable.
//!
//! # Encoding selection
//! A variable whose mean sits within `(max - min) / skew_divisor` of one of
//! its extremes is packed into 32 bits, everything else into 16 bits. Two
//! codes at the top of each range are held back: the maximum is the fill
//! value, the one below it is headroom.
//!
//! # Descriptor
//! ```text
//! scale_factor = (max - min) / R      (1 when max == min)
//! add_offset   = min
//! chunk        = (1, …, 1, len(dim[N-2]), len(dim[N-1]))
//! ```

use ncpack_core::packing::{ADD_OFFSET, FILL_VALUE, SCALE_FACTOR};
use ncpack_core::{ArrayData, DataType, StoreWrite, VariableDef, VariableMut, VariableSpec};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::PackConfig;
use crate::copy::VariableTransform;
use crate::stats::Distribution;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// `u16`, 65534 usable steps.
    Narrow,
    /// `u32`, 4294967294 usable steps.
    Wide,
}

impl Encoding {
    pub fn select(dist: &Distribution, skew_divisor: f64) -> Self {
        if dist.smaller_gap() < dist.range_over(skew_divisor) {
            Encoding::Wide
        } else {
            Encoding::Narrow
        }
    }

    pub fn dtype(self) -> DataType {
        match self {
            Encoding::Narrow => DataType::U16,
            Encoding::Wide => DataType::U32,
        }
    }

    /// Number of quantization steps across `[min, max]`.
    pub fn resolution(self) -> f64 {
        match self {
            Encoding::Narrow => (u16::MAX - 1) as f64,
            Encoding::Wide => (u32::MAX - 1) as f64,
        }
    }

    pub fn fill_value(self) -> ArrayData {
        match self {
            Encoding::Narrow => ArrayData::U16(vec![u16::MAX]),
            Encoding::Wide => ArrayData::U32(vec![u32::MAX]),
        }
    }
}

/// Everything that defines how one variable is packed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackedDescriptor {
    pub encoding: Encoding,
    pub scale_factor: f64,
    pub add_offset: f64,
    pub chunk_shape: Vec<usize>,
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

impl PackedDescriptor {
    pub fn derive(dist: &Distribution, shape: &[usize], skew_divisor: f64) -> Self {
        let encoding = Encoding::select(dist, skew_divisor);
        let mut scale_factor = dist.range_over(encoding.resolution());
        if scale_factor == 0.0 {
            scale_factor = 1.0;
        }
        Self {
            encoding,
            scale_factor,
            add_offset: dist.min,
            chunk_shape: chunk_shape(shape),
            min: dist.min,
            mean: dist.mean,
            max: dist.max,
        }
    }
}

/// One full horizontal slice per chunk: the last two axes at full extent,
/// every leading axis at 1.
pub fn chunk_shape(shape: &[usize]) -> Vec<usize> {
    let leading = shape.len().saturating_sub(2);
    shape
        .iter()
        .enumerate()
        .map(|(i, &len)| if i < leading { 1 } else { len.max(1) })
        .collect()
}

/// Create the packed destination variable for `src` and return its handle,
/// ready for the unpacked values to be written through auto mask-and-scale.
pub fn compress<'w, W: StoreWrite + ?Sized>(
    src: &VariableDef,
    shape: &[usize],
    values: &[f64],
    dst: &'w mut W,
    config: &PackConfig,
) -> anyhow::Result<(VariableMut<'w, W>, PackedDescriptor)> {
    let dist = Distribution::of(values);
    if dist.count == 0 {
        warn!(var = %src.name, "no unmasked values; packing as constant 0");
    } else if dist.range() == 0.0 {
        warn!(var = %src.name, value = dist.min, "constant variable; scale_factor falls back to 1");
    }

    let desc = PackedDescriptor::derive(&dist, shape, config.skew_divisor);
    info!(
        "Packing variable {} [min={}, mean={}, max={}] as {}",
        src.name,
        desc.min,
        desc.mean,
        desc.max,
        desc.encoding.dtype()
    );

    let spec = VariableSpec::new(src.name.as_str(), desc.encoding.dtype(), &src.dims)
        .chunked(desc.chunk_shape.clone())
        .compressed(config.compression_level)
        .fill_value(desc.encoding.fill_value());
    let mut var = dst.add_variable(spec)?;
    var.set_attribute(SCALE_FACTOR, desc.scale_factor)?;
    var.set_attribute(ADD_OFFSET, desc.add_offset)?;
    var.set_attribute(FILL_VALUE, desc.encoding.fill_value())?;
    var.set_auto_mask_and_scale(true)?;

    for attr in src.attributes.iter() {
        let already_set = var.attributes().is_some_and(|a| a.contains(&attr.name));
        if !already_set {
            var.set_attribute(&attr.name, attr.value.clone())?;
        }
    }
    debug!(
        var = %src.name,
        scale_factor = desc.scale_factor,
        add_offset = desc.add_offset,
        chunk = ?desc.chunk_shape,
        "created packed variable"
    );
    Ok((var, desc))
}

/// A variable packed during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackedVariable {
    pub name: String,
    #[serde(flatten)]
    pub descriptor: PackedDescriptor,
}

/// [`VariableTransform`] that packs every variable it is handed and records
/// the descriptors.
pub struct Quantizer<'c> {
    config: &'c PackConfig,
    packed: Vec<PackedVariable>,
}

impl<'c> Quantizer<'c> {
    pub fn new(config: &'c PackConfig) -> Self {
        Self {
            config,
            packed: Vec::new(),
        }
    }

    pub fn packed(&self) -> &[PackedVariable] {
        &self.packed
    }

    pub fn into_packed(self) -> Vec<PackedVariable> {
        self.packed
    }
}

impl<W: StoreWrite + ?Sized> VariableTransform<W> for Quantizer<'_> {
    fn create<'w>(
        &mut self,
        src: &VariableDef,
        shape: &[usize],
        values: &[f64],
        dst: &'w mut W,
    ) -> anyhow::Result<VariableMut<'w, W>> {
        let (var, descriptor) = compress(src, shape, values, dst, self.config)?;
        self.packed.push(PackedVariable {
            name: src.name.clone(),
            descriptor,
        });
        Ok(var)
    }
}
