use serde::{Deserialize, Serialize};

// ── Element types ──────────────────────────────────────────────────────────

/// Element type of a variable or numeric attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Char,
}

impl DataType {
    /// Bytes per element.
    pub fn size(self) -> usize {
        match self {
            DataType::I8 | DataType::U8 | DataType::Char => 1,
            DataType::I16 | DataType::U16 => 2,
            DataType::I32 | DataType::U32 | DataType::F32 => 4,
            DataType::I64 | DataType::U64 | DataType::F64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::I8 => "byte",
            DataType::U8 => "ubyte",
            DataType::I16 => "short",
            DataType::U16 => "ushort",
            DataType::I32 => "int",
            DataType::U32 => "uint",
            DataType::I64 => "int64",
            DataType::U64 => "uint64",
            DataType::F32 => "float",
            DataType::F64 => "double",
            DataType::Char => "char",
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, DataType::F32 | DataType::F64)
    }

    pub fn is_integer(self) -> bool {
        !self.is_float() && self != DataType::Char
    }

    /// Smallest representable value, as f64. Floats report `-inf`.
    pub fn min_value(self) -> f64 {
        match self {
            DataType::I8 => i8::MIN as f64,
            DataType::I16 => i16::MIN as f64,
            DataType::I32 => i32::MIN as f64,
            DataType::I64 => i64::MIN as f64,
            DataType::U8 | DataType::U16 | DataType::U32 | DataType::U64 | DataType::Char => 0.0,
            DataType::F32 | DataType::F64 => f64::NEG_INFINITY,
        }
    }

    /// Largest representable value, as f64. Floats report `+inf`.
    pub fn max_value(self) -> f64 {
        match self {
            DataType::I8 => i8::MAX as f64,
            DataType::U8 | DataType::Char => u8::MAX as f64,
            DataType::I16 => i16::MAX as f64,
            DataType::U16 => u16::MAX as f64,
            DataType::I32 => i32::MAX as f64,
            DataType::U32 => u32::MAX as f64,
            DataType::I64 => i64::MAX as f64,
            DataType::U64 => u64::MAX as f64,
            DataType::F32 | DataType::F64 => f64::INFINITY,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Typed arrays ───────────────────────────────────────────────────────────

/// A flat, row-major array of one element type.
///
/// Used both for variable payloads and for numeric attribute values
/// (a scalar attribute is a one-element array).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "EncodedArray", try_from = "EncodedArray")]
pub enum ArrayData {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Char(Vec<u8>),
}

macro_rules! each_variant {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ArrayData::I8($v) => $body,
            ArrayData::U8($v) => $body,
            ArrayData::I16($v) => $body,
            ArrayData::U16($v) => $body,
            ArrayData::I32($v) => $body,
            ArrayData::U32($v) => $body,
            ArrayData::I64($v) => $body,
            ArrayData::U64($v) => $body,
            ArrayData::F32($v) => $body,
            ArrayData::F64($v) => $body,
            ArrayData::Char($v) => $body,
        }
    };
}

macro_rules! decode_le {
    ($bytes:expr, $t:ty) => {
        $bytes
            .chunks_exact(std::mem::size_of::<$t>())
            .map(|c| {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(c);
                <$t>::from_le_bytes(buf)
            })
            .collect::<Vec<$t>>()
    };
}

impl ArrayData {
    pub fn dtype(&self) -> DataType {
        match self {
            ArrayData::I8(_) => DataType::I8,
            ArrayData::U8(_) => DataType::U8,
            ArrayData::I16(_) => DataType::I16,
            ArrayData::U16(_) => DataType::U16,
            ArrayData::I32(_) => DataType::I32,
            ArrayData::U32(_) => DataType::U32,
            ArrayData::I64(_) => DataType::I64,
            ArrayData::U64(_) => DataType::U64,
            ArrayData::F32(_) => DataType::F32,
            ArrayData::F64(_) => DataType::F64,
            ArrayData::Char(_) => DataType::Char,
        }
    }

    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `idx` widened to f64.
    pub fn get_f64(&self, idx: usize) -> Option<f64> {
        each_variant!(self, v => v.get(idx).map(|x| *x as f64))
    }

    /// Every element widened to f64.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        each_variant!(self, v => v.iter().map(|x| *x as f64).collect())
    }

    /// Build an array of `dtype` from f64 values using saturating `as` casts.
    pub fn from_f64(dtype: DataType, values: &[f64]) -> Self {
        macro_rules! cast {
            ($t:ty) => {
                values.iter().map(|x| *x as $t).collect()
            };
        }
        match dtype {
            DataType::I8 => ArrayData::I8(cast!(i8)),
            DataType::U8 => ArrayData::U8(cast!(u8)),
            DataType::I16 => ArrayData::I16(cast!(i16)),
            DataType::U16 => ArrayData::U16(cast!(u16)),
            DataType::I32 => ArrayData::I32(cast!(i32)),
            DataType::U32 => ArrayData::U32(cast!(u32)),
            DataType::I64 => ArrayData::I64(cast!(i64)),
            DataType::U64 => ArrayData::U64(cast!(u64)),
            DataType::F32 => ArrayData::F32(cast!(f32)),
            DataType::F64 => ArrayData::F64(values.to_vec()),
            DataType::Char => ArrayData::Char(cast!(u8)),
        }
    }

    /// `len` copies of `value` cast to `dtype`.
    pub fn filled(dtype: DataType, value: f64, len: usize) -> Self {
        Self::from_f64(dtype, &vec![value; len])
    }

    /// Little-endian byte image of the whole array.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            ArrayData::I8(v) => v.iter().map(|x| *x as u8).collect(),
            ArrayData::U8(v) | ArrayData::Char(v) => v.clone(),
            ArrayData::I16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            ArrayData::U16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            ArrayData::I32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            ArrayData::U32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            ArrayData::I64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            ArrayData::U64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            ArrayData::F32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            ArrayData::F64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }

    /// Inverse of [`to_le_bytes`](Self::to_le_bytes).
    pub fn from_le_bytes(dtype: DataType, bytes: &[u8]) -> anyhow::Result<Self> {
        if bytes.len() % dtype.size() != 0 {
            anyhow::bail!(
                "{} bytes is not a whole number of {} elements",
                bytes.len(),
                dtype
            );
        }
        Ok(match dtype {
            DataType::I8 => ArrayData::I8(bytes.iter().map(|b| *b as i8).collect()),
            DataType::U8 => ArrayData::U8(bytes.to_vec()),
            DataType::Char => ArrayData::Char(bytes.to_vec()),
            DataType::I16 => ArrayData::I16(decode_le!(bytes, i16)),
            DataType::U16 => ArrayData::U16(decode_le!(bytes, u16)),
            DataType::I32 => ArrayData::I32(decode_le!(bytes, i32)),
            DataType::U32 => ArrayData::U32(decode_le!(bytes, u32)),
            DataType::I64 => ArrayData::I64(decode_le!(bytes, i64)),
            DataType::U64 => ArrayData::U64(decode_le!(bytes, u64)),
            DataType::F32 => ArrayData::F32(decode_le!(bytes, f32)),
            DataType::F64 => ArrayData::F64(decode_le!(bytes, f64)),
        })
    }
}

/// On-disk (JSON) form of an [`ArrayData`]: type tag plus hex of the LE bytes.
/// Keeps NaN and infinite fill values lossless, which plain JSON numbers cannot.
#[derive(Serialize, Deserialize)]
struct EncodedArray {
    dtype: DataType,
    hex: String,
}

impl From<ArrayData> for EncodedArray {
    fn from(data: ArrayData) -> Self {
        Self {
            dtype: data.dtype(),
            hex: hex::encode(data.to_le_bytes()),
        }
    }
}

impl TryFrom<EncodedArray> for ArrayData {
    type Error = anyhow::Error;

    fn try_from(enc: EncodedArray) -> anyhow::Result<Self> {
        let bytes = hex::decode(&enc.hex)
            .map_err(|e| anyhow::anyhow!("bad hex payload for {} array: {}", enc.dtype, e))?;
        ArrayData::from_le_bytes(enc.dtype, &bytes)
    }
}

// ── Attributes ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrValue {
    Text(String),
    Values(ArrayData),
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            AttrValue::Values(_) => None,
        }
    }

    /// First numeric element, widened to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Values(v) => v.get_f64(0),
            AttrValue::Text(_) => None,
        }
    }

    /// All numeric elements, widened to f64. Empty for text.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            AttrValue::Values(v) => v.to_f64_vec(),
            AttrValue::Text(_) => Vec::new(),
        }
    }
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrValue::Text(s) => write!(f, "{s:?}"),
            AttrValue::Values(v) => {
                let parts: Vec<String> = v.to_f64_vec().iter().map(|x| x.to_string()).collect();
                write!(f, "{} ({})", parts.join(", "), v.dtype())
            }
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<ArrayData> for AttrValue {
    fn from(v: ArrayData) -> Self {
        AttrValue::Values(v)
    }
}

impl From<f64> for AttrValue {
    fn from(x: f64) -> Self {
        AttrValue::Values(ArrayData::F64(vec![x]))
    }
}

impl From<f32> for AttrValue {
    fn from(x: f32) -> Self {
        AttrValue::Values(ArrayData::F32(vec![x]))
    }
}

impl From<i32> for AttrValue {
    fn from(x: i32) -> Self {
        AttrValue::Values(ArrayData::I32(vec![x]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: AttrValue,
}

/// Insertion-ordered attribute map. Setting an existing name replaces the
/// value in place, so the original ordering survives a copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(Vec<Attribute>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.0.push(Attribute { name, value }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|a| a.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ── Dimensions and variables ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    /// Current length. For an unlimited dimension this is the number of
    /// records written so far.
    pub len: usize,
    pub unlimited: bool,
}

/// Declaration of a variable: everything but its values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDef {
    pub name: String,
    pub dtype: DataType,
    /// Dimension names, outermost first. `dims.len()` is the rank.
    pub dims: Vec<String>,
    pub attributes: Attributes,
    /// `None` means contiguous, unchunked storage.
    pub chunk_shape: Option<Vec<usize>>,
    /// `None` means stored uncompressed.
    pub compression_level: Option<u32>,
}

impl VariableDef {
    pub fn rank(&self) -> usize {
        self.dims.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_le_bytes_preserve_nan_and_type() {
        let data = ArrayData::F32(vec![1.5, f32::NAN, -0.0]);
        let back = ArrayData::from_le_bytes(DataType::F32, &data.to_le_bytes()).unwrap();
        assert_eq!(data.to_le_bytes(), back.to_le_bytes());
        assert_eq!(back.dtype(), DataType::F32);
    }

    #[test]
    fn test_from_le_bytes_rejects_partial_element() {
        let err = ArrayData::from_le_bytes(DataType::U32, &[1, 2, 3]).unwrap_err();
        assert!(err.to_string().contains("whole number"));
    }

    #[test]
    fn test_attribute_json_keeps_nan_fill() {
        let mut attrs = Attributes::new();
        attrs.set("_FillValue", ArrayData::F64(vec![f64::NAN]));
        attrs.set("units", "mm/day");
        let json = serde_json::to_string(&attrs).unwrap();
        let back: Attributes = serde_json::from_str(&json).unwrap();
        assert!(back.get("_FillValue").unwrap().as_f64().unwrap().is_nan());
        assert_eq!(back.get("units").unwrap().as_text(), Some("mm/day"));
    }

    #[test]
    fn test_array_json_is_hex_of_le_bytes() {
        let json = serde_json::to_string(&ArrayData::U16(vec![1, 0xfffe])).unwrap();
        assert_eq!(json, r#"{"dtype":"u16","hex":"0100feff"}"#);

        let back: ArrayData = serde_json::from_str(r#"{"dtype":"i32","hex":"ffffffff"}"#).unwrap();
        assert_eq!(back, ArrayData::I32(vec![-1]));

        assert!(serde_json::from_str::<ArrayData>(r#"{"dtype":"u16","hex":"01f"}"#).is_err());
        assert!(serde_json::from_str::<ArrayData>(r#"{"dtype":"u16","hex":"zz00"}"#).is_err());
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut attrs = Attributes::new();
        attrs.set("a", 1i32);
        attrs.set("b", 2i32);
        attrs.set("a", 3i32);
        let names: Vec<&str> = attrs.names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(attrs.get("a").unwrap().as_f64(), Some(3.0));
    }

    #[test]
    fn test_from_f64_saturates() {
        let data = ArrayData::from_f64(DataType::U16, &[-5.0, 70000.0, 12.0]);
        assert_eq!(data, ArrayData::U16(vec![0, u16::MAX, 12]));
    }
}
