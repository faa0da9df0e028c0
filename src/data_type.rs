//! Element data types and fill values.
//!
//! Each format version has its own data type string:
//! Zarr V2 prefixes a byte-order/kind character (`"|u1"`, `"<f4"`), Zarr V3 does not (`"u1"`, `"f4"`).
//! Elements are always stored little-endian in C order.

use std::fmt::Display;

use serde_json::Value;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

const ALL_DATA_TYPES: [DataType; 11] = [
    DataType::Bool,
    DataType::Int8,
    DataType::Int16,
    DataType::Int32,
    DataType::Int64,
    DataType::UInt8,
    DataType::UInt16,
    DataType::UInt32,
    DataType::UInt64,
    DataType::Float32,
    DataType::Float64,
];

impl DataType {
    /// Size of one element in bytes.
    pub fn size(&self) -> usize {
        match self {
            DataType::Bool | DataType::Int8 | DataType::UInt8 => 1,
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => 4,
            DataType::Int64 | DataType::UInt64 | DataType::Float64 => 8,
        }
    }

    /// The Zarr V3 data type string, e.g. `"u1"`.
    pub fn name_v3(&self) -> &'static str {
        match self {
            DataType::Bool => "b1",
            DataType::Int8 => "i1",
            DataType::Int16 => "i2",
            DataType::Int32 => "i4",
            DataType::Int64 => "i8",
            DataType::UInt8 => "u1",
            DataType::UInt16 => "u2",
            DataType::UInt32 => "u4",
            DataType::UInt64 => "u8",
            DataType::Float32 => "f4",
            DataType::Float64 => "f8",
        }
    }

    /// The Zarr V2 data type string, e.g. `"|u1"` or `"<f4"`.
    pub fn name_v2(&self) -> &'static str {
        match self {
            DataType::Bool => "|b1",
            DataType::Int8 => "|i1",
            DataType::Int16 => "<i2",
            DataType::Int32 => "<i4",
            DataType::Int64 => "<i8",
            DataType::UInt8 => "|u1",
            DataType::UInt16 => "<u2",
            DataType::UInt32 => "<u4",
            DataType::UInt64 => "<u8",
            DataType::Float32 => "<f4",
            DataType::Float64 => "<f8",
        }
    }

    fn long_name_v3(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::UInt8 => "uint8",
            DataType::UInt16 => "uint16",
            DataType::UInt32 => "uint32",
            DataType::UInt64 => "uint64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        }
    }

    /// Parse a Zarr V2 data type string.
    ///
    /// Multi-byte types must be little-endian; single-byte types accept any byte order character.
    pub fn from_v2(name: &str) -> Result<Self> {
        let unsupported = || Error::UnsupportedDataType(name.to_string());
        let (order, kind) = name.split_at_checked(1).ok_or_else(unsupported)?;
        let data_type = ALL_DATA_TYPES
            .into_iter()
            .find(|dt| dt.name_v3() == kind)
            .ok_or_else(unsupported)?;
        match (order, data_type.size()) {
            ("<", _) | ("|" | ">", 1) => Ok(data_type),
            _ => Err(unsupported()),
        }
    }

    pub fn from_v3(name: &str) -> Result<Self> {
        ALL_DATA_TYPES
            .into_iter()
            .find(|dt| dt.name_v3() == name || dt.long_name_v3() == name)
            .ok_or_else(|| Error::UnsupportedDataType(name.to_string()))
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.long_name_v3())
    }
}

/// The little-endian bytes of a single element used for unwritten regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillValue(Vec<u8>);

impl FillValue {
    /// A fill value from its little-endian element bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The all-zero fill value of `data_type`.
    pub fn zero(data_type: DataType) -> Self {
        Self(vec![0; data_type.size()])
    }

    pub fn from_element<T: Element>(value: T) -> Self {
        Self(T::to_bytes(&[value]))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Parse the JSON representation of a fill value of `data_type`.
    ///
    /// `null` is read as zero.
    pub fn from_json(data_type: DataType, value: &Value) -> std::result::Result<Self, String> {
        let invalid = || format!("fill value {value} is not valid for data type {data_type}");
        if value.is_null() {
            return Ok(Self::zero(data_type));
        }
        let bytes = match data_type {
            DataType::Bool => match value {
                Value::Bool(b) => vec![u8::from(*b)],
                Value::Number(n) if n.as_u64() == Some(0) || n.as_u64() == Some(1) => {
                    vec![n.as_u64().unwrap_or_default() as u8]
                }
                _ => return Err(invalid()),
            },
            DataType::Float32 => (json_to_f64(value).ok_or_else(invalid)? as f32)
                .to_le_bytes()
                .to_vec(),
            DataType::Float64 => json_to_f64(value).ok_or_else(invalid)?.to_le_bytes().to_vec(),
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
                let v = value.as_i64().ok_or_else(invalid)?;
                let bytes = v.to_le_bytes();
                let size = data_type.size();
                let min = if size == 8 { i64::MIN } else { -(1i64 << (size * 8 - 1)) };
                let max = if size == 8 { i64::MAX } else { (1i64 << (size * 8 - 1)) - 1 };
                if v < min || v > max {
                    return Err(invalid());
                }
                bytes[..size].to_vec()
            }
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
                let v = value.as_u64().ok_or_else(invalid)?;
                let size = data_type.size();
                if size < 8 && v >= 1u64 << (size * 8) {
                    return Err(invalid());
                }
                v.to_le_bytes()[..size].to_vec()
            }
        };
        Ok(Self(bytes))
    }

    /// The JSON representation of this fill value as `data_type`.
    pub fn to_json(&self, data_type: DataType) -> Value {
        let b = &self.0;
        match data_type {
            DataType::Bool => Value::Bool(b.first().is_some_and(|v| *v != 0)),
            DataType::Float32 | DataType::Float64 => {
                let v = if data_type == DataType::Float32 {
                    f64::from(f32::read_le(b))
                } else {
                    f64::read_le(b)
                };
                f64_to_json(v)
            }
            DataType::Int8 => Value::from(i8::read_le(b)),
            DataType::Int16 => Value::from(i16::read_le(b)),
            DataType::Int32 => Value::from(i32::read_le(b)),
            DataType::Int64 => Value::from(i64::read_le(b)),
            DataType::UInt8 => Value::from(u8::read_le(b)),
            DataType::UInt16 => Value::from(u16::read_le(b)),
            DataType::UInt32 => Value::from(u32::read_le(b)),
            DataType::UInt64 => Value::from(u64::read_le(b)),
        }
    }

    pub(crate) fn matches(&self, data_type: DataType) -> bool {
        self.0.len() == data_type.size()
    }
}

fn json_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

fn f64_to_json(v: f64) -> Value {
    if v.is_nan() {
        Value::from("NaN")
    } else if v.is_infinite() {
        Value::from(if v > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        Value::from(v)
    }
}

/// A Rust type holding one array element.
pub trait Element: Copy + Sized {
    const DATA_TYPE: DataType;

    /// Read one element from the start of little-endian `bytes`.
    fn read_le(bytes: &[u8]) -> Self;

    fn write_le(&self, out: &mut Vec<u8>);

    fn to_bytes(elements: &[Self]) -> Vec<u8> {
        let mut out = Vec::with_capacity(elements.len() * Self::DATA_TYPE.size());
        for e in elements {
            e.write_le(&mut out);
        }
        out
    }

    fn from_bytes(bytes: &[u8]) -> Vec<Self> {
        bytes
            .chunks_exact(Self::DATA_TYPE.size())
            .map(Self::read_le)
            .collect()
    }
}

macro_rules! impl_element {
    ($t:ty, $dt:expr) => {
        impl Element for $t {
            const DATA_TYPE: DataType = $dt;

            fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; size_of::<$t>()];
                let n = buf.len().min(bytes.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                <$t>::from_le_bytes(buf)
            }

            fn write_le(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        }
    };
}

impl_element!(i8, DataType::Int8);
impl_element!(i16, DataType::Int16);
impl_element!(i32, DataType::Int32);
impl_element!(i64, DataType::Int64);
impl_element!(u8, DataType::UInt8);
impl_element!(u16, DataType::UInt16);
impl_element!(u32, DataType::UInt32);
impl_element!(u64, DataType::UInt64);
impl_element!(f32, DataType::Float32);
impl_element!(f64, DataType::Float64);

impl Element for bool {
    const DATA_TYPE: DataType = DataType::Bool;

    fn read_le(bytes: &[u8]) -> Self {
        bytes.first().is_some_and(|b| *b != 0)
    }

    fn write_le(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self));
    }
}
