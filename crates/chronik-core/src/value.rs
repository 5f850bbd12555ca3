//! The value model event state is expressed in.
//!
//! A [`Value`] is either one of the fixed wire primitives (null, bool,
//! integer, float, string, byte string, sequence, mapping) or a rich scalar
//! that needs a registered transcoding to cross the wire: identifiers,
//! decimals, timestamps, and open-ended [`Value::Custom`] extension values.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Keyed mapping of state field names to values.
///
/// Event state and snapshot state are both `StateMap`s. Keys beginning and
/// ending with an underscore (`_version_`, `_type_`, `_data_`) are reserved
/// for the codec layer.
pub type StateMap = BTreeMap<String, Value>;

/// A value representable in event state.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Raw byte string.
    Bytes(Vec<u8>),
    /// Ordered sequence of values.
    Seq(Vec<Value>),
    /// Keyed mapping of values.
    Map(StateMap),
    /// 128-bit identifier.
    Id(Uuid),
    /// Decimal number, carried as a string on the wire.
    Decimal(Decimal),
    /// Wall-clock timestamp with microsecond precision and offset.
    Timestamp(DateTime<FixedOffset>),
    /// An extension value handled by a registered transcoding.
    Custom {
        /// Wire tag of the transcoding that owns this value.
        tag: String,
        /// The body handed to that transcoding.
        value: Box<Value>,
    },
}

impl Value {
    /// Short name of the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::Seq(_) => "seq",
            Value::Map(_) => "map",
            Value::Id(_) => "id",
            Value::Decimal(_) => "decimal",
            Value::Timestamp(_) => "timestamp",
            Value::Custom { .. } => "custom",
        }
    }

    /// Borrow the string content, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Read a non-negative integer, if this is one.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int(n) if *n >= 0 => Some(*n as u64),
            _ => None,
        }
    }

    /// Borrow the identifier, if this is one.
    pub fn as_id(&self) -> Option<Uuid> {
        match self {
            Value::Id(id) => Some(*id),
            _ => None,
        }
    }

    /// Borrow the timestamp, if this is one.
    pub fn as_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Borrow the mapping, if this is one.
    pub fn as_map(&self) -> Option<&StateMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Id(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Seq(v.into_iter().map(Into::into).collect())
    }
}
