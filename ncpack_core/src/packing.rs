//! Linear packing: the automatic mask-and-scale transform a store applies
//! to variables carrying `scale_factor` / `add_offset` / `_FillValue`.
//!
//! ```text
//! decoded = stored * scale_factor + add_offset
//! stored  = round((decoded - add_offset) / scale_factor)
//! ```
//!
//! A stored value equal to `_FillValue` (or `missing_value`) decodes to NaN,
//! and NaN encodes to the fill value.

use crate::model::{ArrayData, Attributes, DataType};

pub const SCALE_FACTOR: &str = "scale_factor";
pub const ADD_OFFSET: &str = "add_offset";
pub const FILL_VALUE: &str = "_FillValue";
pub const MISSING_VALUE: &str = "missing_value";

/// Parameters of the linear decode transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearPacking {
    pub scale_factor: f64,
    pub add_offset: f64,
}

impl LinearPacking {
    /// Read packing parameters from a variable's attributes. Returns `None`
    /// when neither `scale_factor` nor `add_offset` is present.
    pub fn from_attributes(attrs: &Attributes) -> Option<Self> {
        let scale = attrs.get(SCALE_FACTOR).and_then(|v| v.as_f64());
        let offset = attrs.get(ADD_OFFSET).and_then(|v| v.as_f64());
        if scale.is_none() && offset.is_none() {
            return None;
        }
        Some(Self {
            scale_factor: scale.unwrap_or(1.0),
            add_offset: offset.unwrap_or(0.0),
        })
    }

    /// Falls back to a halved evaluation when the product overflows but the
    /// decoded value itself is representable.
    #[inline]
    pub fn decode(&self, stored: f64) -> f64 {
        let decoded = stored * self.scale_factor + self.add_offset;
        if decoded.is_finite() || !stored.is_finite() {
            decoded
        } else {
            (stored * (self.scale_factor * 0.5) + self.add_offset * 0.5) * 2.0
        }
    }

    /// Unclamped, rounded integer code for `value`.
    #[inline]
    pub fn encode(&self, value: f64) -> f64 {
        let delta = value - self.add_offset;
        if delta.is_finite() || !value.is_finite() {
            (delta / self.scale_factor).round()
        } else {
            (value / self.scale_factor - self.add_offset / self.scale_factor).round()
        }
    }
}

/// Stored values that mean "missing": `_FillValue` and every `missing_value`.
pub fn mask_values(attrs: &Attributes) -> Vec<f64> {
    let mut masked = Vec::new();
    for name in [FILL_VALUE, MISSING_VALUE] {
        if let Some(v) = attrs.get(name) {
            masked.extend(v.to_f64_vec());
        }
    }
    masked
}

/// Fill value for a variable: its `_FillValue` attribute, else the type's
/// default (zero for floats and char, the maximum code for integers).
pub fn fill_value(attrs: &Attributes, dtype: DataType) -> f64 {
    attrs
        .get(FILL_VALUE)
        .and_then(|v| v.as_f64())
        .unwrap_or_else(|| default_fill(dtype))
}

fn default_fill(dtype: DataType) -> f64 {
    if dtype.is_integer() {
        dtype.max_value()
    } else {
        0.0
    }
}

/// Decode stored values to f64, masking fill/missing entries as NaN.
pub fn unpack(attrs: &Attributes, raw: &ArrayData) -> Vec<f64> {
    let masked = mask_values(attrs);
    let packing = LinearPacking::from_attributes(attrs);
    raw.to_f64_vec()
        .into_iter()
        .map(|x| {
            if x.is_nan() || masked.iter().any(|m| *m == x) {
                f64::NAN
            } else {
                match packing {
                    Some(p) => p.decode(x),
                    None => x,
                }
            }
        })
        .collect()
}

/// Encode decoded values into `dtype` using the variable's packing
/// attributes. Codes are clamped to the type's range and never collide with
/// the fill value unless the input was NaN.
pub fn pack(attrs: &Attributes, dtype: DataType, values: &[f64]) -> anyhow::Result<ArrayData> {
    if !dtype.is_integer() {
        anyhow::bail!("cannot pack into non-integer type {}", dtype);
    }
    let packing = LinearPacking::from_attributes(attrs)
        .ok_or_else(|| anyhow::anyhow!("variable has no {SCALE_FACTOR}/{ADD_OFFSET} attributes"))?;
    if packing.scale_factor == 0.0 || !packing.scale_factor.is_finite() {
        anyhow::bail!("invalid {SCALE_FACTOR} {}", packing.scale_factor);
    }

    let fill = fill_value(attrs, dtype);
    let (lo, hi) = (dtype.min_value(), dtype.max_value());
    let codes: Vec<f64> = values
        .iter()
        .map(|&v| {
            if v.is_nan() {
                return fill;
            }
            let code = packing.encode(v).clamp(lo, hi);
            if code == fill {
                // step back into the usable range, away from the sentinel
                if fill >= hi {
                    code - 1.0
                } else {
                    code + 1.0
                }
            } else {
                code
            }
        })
        .collect();
    Ok(ArrayData::from_f64(dtype, &codes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packed_attrs(scale: f64, offset: f64, fill: u16) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.set(SCALE_FACTOR, scale);
        attrs.set(ADD_OFFSET, offset);
        attrs.set(FILL_VALUE, ArrayData::U16(vec![fill]));
        attrs
    }

    #[test]
    fn test_pack_unpack_within_half_scale() {
        let attrs = packed_attrs(0.01, -5.0, u16::MAX);
        let values = [-5.0, -4.996, 0.0, 1.234_567, 600.0];
        let packed = pack(&attrs, DataType::U16, &values).unwrap();
        let back = unpack(&attrs, &packed);
        for (v, b) in values.iter().zip(&back) {
            assert!((v - b).abs() <= 0.005 + 1e-12, "{v} -> {b}");
        }
    }

    #[test]
    fn test_nan_maps_to_fill_and_back() {
        let attrs = packed_attrs(1.0, 0.0, u16::MAX);
        let packed = pack(&attrs, DataType::U16, &[f64::NAN, 3.0]).unwrap();
        assert_eq!(packed, ArrayData::U16(vec![u16::MAX, 3]));
        let back = unpack(&attrs, &packed);
        assert!(back[0].is_nan());
        assert_eq!(back[1], 3.0);
    }

    #[test]
    fn test_out_of_range_never_hits_fill() {
        let attrs = packed_attrs(1.0, 0.0, u16::MAX);
        let packed = pack(&attrs, DataType::U16, &[1e9, -1e9]).unwrap();
        assert_eq!(packed, ArrayData::U16(vec![u16::MAX - 1, 0]));
    }

    #[test]
    fn test_extreme_offset_does_not_overflow() {
        let p = LinearPacking {
            scale_factor: 1e308 / 65534.0 * 2.0,
            add_offset: -1e308,
        };
        assert_eq!(p.encode(-1e308), 0.0);
        assert_eq!(p.encode(1e308), 65534.0);
        let top = p.decode(65534.0);
        assert!(top.is_finite());
        assert!((top - 1e308).abs() <= p.scale_factor);
        assert_eq!(p.decode(0.0), -1e308);
    }

    #[test]
    fn test_pack_rejects_float_target() {
        let attrs = packed_attrs(1.0, 0.0, 0);
        assert!(pack(&attrs, DataType::F32, &[1.0]).is_err());
    }

    #[test]
    fn test_unpack_masks_missing_value_without_scaling() {
        let mut attrs = Attributes::new();
        attrs.set(MISSING_VALUE, ArrayData::F32(vec![-999.0]));
        let raw = ArrayData::F32(vec![1.0, -999.0, f32::NAN]);
        let back = unpack(&attrs, &raw);
        assert_eq!(back[0], 1.0);
        assert!(back[1].is_nan());
        assert!(back[2].is_nan());
    }
}
