//! Property values and their order-preserving key encoding.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::primitives::bytes::{buf::Cursor, ord};
use crate::types::{GraphError, Result};

pub const TYPE_NULL: u8 = 0x00;
pub const TYPE_BOOL: u8 = 0x01;
pub const TYPE_INT: u8 = 0x02;
pub const TYPE_FLOAT: u8 = 0x03;
pub const TYPE_STR: u8 = 0x04;
pub const TYPE_BYTES: u8 = 0x05;
pub const TYPE_DATE: u8 = 0x06;
pub const TYPE_DATETIME: u8 = 0x07;

/// Property value with owned data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PropValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point number.
    Float(f64),
    /// Owned string.
    Str(String),
    /// Owned byte vector.
    Bytes(Vec<u8>),
    /// Date value represented as days since epoch.
    Date(i64),
    /// DateTime value represented as milliseconds since epoch.
    DateTime(i64),
}

/// Logical type of a property value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TypeTag {
    Null,
    Bool,
    Int,
    Float,
    String,
    Bytes,
    Date,
    DateTime,
}

impl PropValue {
    /// Returns the logical type of the value.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            PropValue::Null => TypeTag::Null,
            PropValue::Bool(_) => TypeTag::Bool,
            PropValue::Int(_) => TypeTag::Int,
            PropValue::Float(_) => TypeTag::Float,
            PropValue::Str(_) => TypeTag::String,
            PropValue::Bytes(_) => TypeTag::Bytes,
            PropValue::Date(_) => TypeTag::Date,
            PropValue::DateTime(_) => TypeTag::DateTime,
        }
    }
}

impl TypeTag {
    /// Whether range scans over encoded values of this type follow natural order.
    ///
    /// Null has no meaningful order and is only usable for equality.
    pub fn is_range_queryable(self) -> bool {
        !matches!(self, TypeTag::Null)
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => write!(f, "null"),
            PropValue::Bool(v) => write!(f, "{v}"),
            PropValue::Int(v) => write!(f, "{v}"),
            PropValue::Float(v) => write!(f, "{v}"),
            PropValue::Str(v) => write!(f, "{v}"),
            PropValue::Bytes(v) => write!(f, "bytes(len={})", v.len()),
            PropValue::Date(v) => write!(f, "date({v})"),
            PropValue::DateTime(v) => write!(f, "datetime({v})"),
        }
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

/// Appends the type-tagged, order-preserving encoding of `value`.
///
/// Two values of the same type compare the same way as their encodings,
/// and every encoding is self-delimiting.
pub fn put_value(dst: &mut Vec<u8>, value: &PropValue) -> Result<()> {
    match value {
        PropValue::Null => dst.push(TYPE_NULL),
        PropValue::Bool(v) => {
            dst.push(TYPE_BOOL);
            dst.push(u8::from(*v));
        }
        PropValue::Int(v) => {
            dst.push(TYPE_INT);
            ord::put_i64(dst, *v);
        }
        PropValue::Float(v) => {
            dst.push(TYPE_FLOAT);
            ord::put_f64(dst, *v)?;
        }
        PropValue::Str(s) => {
            dst.push(TYPE_STR);
            ord::put_str(dst, s);
        }
        PropValue::Bytes(b) => {
            dst.push(TYPE_BYTES);
            ord::put_escaped(dst, b);
        }
        PropValue::Date(v) => {
            dst.push(TYPE_DATE);
            ord::put_i64(dst, *v);
        }
        PropValue::DateTime(v) => {
            dst.push(TYPE_DATETIME);
            ord::put_i64(dst, *v);
        }
    }
    Ok(())
}

/// Encodes a single value into a fresh buffer.
pub fn encode_value(value: &PropValue) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(10);
    put_value(&mut out, value)?;
    Ok(out)
}

/// Reads one encoded value from the cursor.
pub fn read_value(cur: &mut Cursor<'_>) -> Result<PropValue> {
    let tag = cur.u8()?;
    let value = match tag {
        TYPE_NULL => PropValue::Null,
        TYPE_BOOL => match cur.u8()? {
            0 => PropValue::Bool(false),
            1 => PropValue::Bool(true),
            other => {
                return Err(GraphError::corruption(format!(
                    "invalid bool payload 0x{other:02x}"
                )))
            }
        },
        TYPE_INT => PropValue::Int(ord::get_i64(cur.take(8)?)?),
        TYPE_FLOAT => PropValue::Float(ord::get_f64(cur.take(8)?)?),
        TYPE_STR => PropValue::Str(cur.str()?),
        TYPE_BYTES => PropValue::Bytes(cur.escaped()?),
        TYPE_DATE => PropValue::Date(ord::get_i64(cur.take(8)?)?),
        TYPE_DATETIME => PropValue::DateTime(ord::get_i64(cur.take(8)?)?),
        other => {
            return Err(GraphError::corruption(format!(
                "unknown property type tag 0x{other:02x}"
            )))
        }
    };
    Ok(value)
}

/// Decodes a buffer holding exactly one encoded value.
pub fn decode_value(bytes: &[u8]) -> Result<PropValue> {
    let mut cur = Cursor::new(bytes);
    let value = read_value(&mut cur)?;
    if cur.remaining() != 0 {
        return Err(GraphError::corruption("trailing bytes after property value"));
    }
    Ok(value)
}

/// Validates and encodes a half-open `[from, to)` range.
///
/// Both bounds must share one range-queryable type; anything else would
/// silently span unrelated types in key order, so it is rejected.
pub fn encode_range(from: &PropValue, to: &PropValue) -> Result<(Vec<u8>, Vec<u8>)> {
    let ty = from.type_tag();
    if ty != to.type_tag() {
        return Err(GraphError::invalid(format!(
            "range bounds have different types ({ty:?} vs {:?})",
            to.type_tag()
        )));
    }
    if !ty.is_range_queryable() {
        return Err(GraphError::invalid(format!(
            "{ty:?} values cannot be range-queried"
        )));
    }
    Ok((encode_value(from)?, encode_value(to)?))
}
