//! Self-describing transcoder for event state.
//!
//! The wire form is a JSON document. Plain primitives map directly; rich
//! scalars are written as a two-key mapping `{"_type_": tag, "_data_": body}`
//! and dispatched back through the registry on decode. The built-in
//! transcodings cover identifiers, decimals, timestamps and byte strings;
//! applications register additional [`Transcoding`]s for their own value
//! types.

use std::collections::HashMap;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, SecondsFormat};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use chronik_core::{StateMap, TranscodingError, Value};

/// Reserved key naming the transcoding of a tagged value.
pub const TYPE_KEY: &str = "_type_";
/// Reserved key carrying the encoded body of a tagged value.
pub const DATA_KEY: &str = "_data_";

/// A codec for one kind of rich value.
///
/// Each transcoding declares a unique wire tag, the values it handles on
/// encode, and how to rebuild the value from its wire body.
pub trait Transcoding: Send + Sync {
    /// Unique wire tag, e.g. `uuid_hex`.
    fn name(&self) -> &'static str;

    /// Whether this transcoding encodes the given value.
    fn handles(&self, value: &Value) -> bool;

    /// Encode the value into its plain wire body.
    fn encode(&self, value: &Value) -> Result<serde_json::Value, TranscodingError>;

    /// Rebuild the value from its wire body.
    fn decode(&self, data: &serde_json::Value) -> Result<Value, TranscodingError>;
}

/// Transcoder with a registry of transcodings, encoding to JSON bytes.
pub struct JsonTranscoder {
    ordered: Vec<Arc<dyn Transcoding>>,
    by_name: HashMap<&'static str, Arc<dyn Transcoding>>,
}

impl Default for JsonTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonTranscoder {
    /// Create a transcoder with the built-in transcodings registered.
    pub fn new() -> Self {
        let mut transcoder = Self::empty();
        transcoder.register(UuidAsHex);
        transcoder.register(DecimalAsStr);
        transcoder.register(DatetimeAsIso);
        transcoder.register(BytesAsBase64);
        transcoder
    }

    /// Create a transcoder with no transcodings registered.
    pub fn empty() -> Self {
        Self {
            ordered: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Register a transcoding. The last registration of a tag wins.
    pub fn register(&mut self, transcoding: impl Transcoding + 'static) -> &mut Self {
        let transcoding: Arc<dyn Transcoding> = Arc::new(transcoding);
        self.by_name.insert(transcoding.name(), transcoding.clone());
        self.ordered.push(transcoding);
        self
    }

    /// Encode a value into its wire document.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, TranscodingError> {
        let doc = self.to_json(value)?;
        serde_json::to_vec(&doc).map_err(|e| TranscodingError::Document(e.to_string()))
    }

    /// Decode a wire document back into a value.
    pub fn decode(&self, data: &[u8]) -> Result<Value, TranscodingError> {
        let doc: serde_json::Value =
            serde_json::from_slice(data).map_err(|e| TranscodingError::Document(e.to_string()))?;
        self.from_json(&doc)
    }

    fn to_json(&self, value: &Value) -> Result<serde_json::Value, TranscodingError> {
        match value {
            Value::Null => Ok(serde_json::Value::Null),
            Value::Bool(b) => Ok(json!(b)),
            Value::Int(n) => Ok(json!(n)),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| {
                    TranscodingError::Document(format!("non-finite float {f} is not representable"))
                }),
            Value::Str(s) => Ok(json!(s)),
            Value::Seq(items) => items
                .iter()
                .map(|item| self.to_json(item))
                .collect::<Result<Vec<_>, _>>()
                .map(serde_json::Value::Array),
            Value::Map(map) => {
                let mut object = serde_json::Map::with_capacity(map.len());
                for (key, item) in map {
                    object.insert(key.clone(), self.to_json(item)?);
                }
                Ok(serde_json::Value::Object(object))
            }
            Value::Custom { tag, value } => {
                let transcoding = self
                    .by_name
                    .get(tag.as_str())
                    .ok_or_else(|| TranscodingError::UnknownTag(tag.clone()))?;
                Ok(Self::tagged(transcoding.name(), transcoding.encode(value)?))
            }
            rich => {
                let transcoding = self
                    .ordered
                    .iter()
                    .find(|t| t.handles(rich))
                    .ok_or_else(|| TranscodingError::Unencodable(rich.kind()))?;
                Ok(Self::tagged(transcoding.name(), transcoding.encode(rich)?))
            }
        }
    }

    fn from_json(&self, doc: &serde_json::Value) -> Result<Value, TranscodingError> {
        match doc {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Value::Float(f))
                } else {
                    Err(TranscodingError::Document(format!(
                        "number {n} is out of range"
                    )))
                }
            }
            serde_json::Value::String(s) => Ok(Value::Str(s.clone())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| self.from_json(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Seq),
            serde_json::Value::Object(object) => {
                if object.len() == 2 {
                    if let (Some(serde_json::Value::String(tag)), Some(data)) =
                        (object.get(TYPE_KEY), object.get(DATA_KEY))
                    {
                        let transcoding = self
                            .by_name
                            .get(tag.as_str())
                            .ok_or_else(|| TranscodingError::UnknownTag(tag.clone()))?;
                        return transcoding.decode(data);
                    }
                }
                let mut map = StateMap::new();
                for (key, item) in object {
                    map.insert(key.clone(), self.from_json(item)?);
                }
                Ok(Value::Map(map))
            }
        }
    }

    fn tagged(name: &str, body: serde_json::Value) -> serde_json::Value {
        let mut object = serde_json::Map::with_capacity(2);
        object.insert(TYPE_KEY.to_owned(), serde_json::Value::String(name.to_owned()));
        object.insert(DATA_KEY.to_owned(), body);
        serde_json::Value::Object(object)
    }
}

//─────────────────────────────
//  Built-in transcodings
//─────────────────────────────

fn malformed(tag: &str, reason: impl ToString) -> TranscodingError {
    TranscodingError::Malformed {
        tag: tag.to_owned(),
        reason: reason.to_string(),
    }
}

fn expect_str<'a>(tag: &str, data: &'a serde_json::Value) -> Result<&'a str, TranscodingError> {
    data.as_str()
        .ok_or_else(|| malformed(tag, "body must be a string"))
}

/// 128-bit identifiers as 32 hex characters.
pub struct UuidAsHex;

impl Transcoding for UuidAsHex {
    fn name(&self) -> &'static str {
        "uuid_hex"
    }

    fn handles(&self, value: &Value) -> bool {
        matches!(value, Value::Id(_))
    }

    fn encode(&self, value: &Value) -> Result<serde_json::Value, TranscodingError> {
        match value {
            Value::Id(id) => Ok(json!(id.simple().to_string())),
            other => Err(malformed(self.name(), format!("cannot encode {}", other.kind()))),
        }
    }

    fn decode(&self, data: &serde_json::Value) -> Result<Value, TranscodingError> {
        let s = expect_str(self.name(), data)?;
        Uuid::parse_str(s)
            .map(Value::Id)
            .map_err(|e| malformed(self.name(), e))
    }
}

/// Decimal numbers as their canonical string form.
pub struct DecimalAsStr;

impl Transcoding for DecimalAsStr {
    fn name(&self) -> &'static str {
        "decimal_str"
    }

    fn handles(&self, value: &Value) -> bool {
        matches!(value, Value::Decimal(_))
    }

    fn encode(&self, value: &Value) -> Result<serde_json::Value, TranscodingError> {
        match value {
            Value::Decimal(d) => Ok(json!(d.to_string())),
            other => Err(malformed(self.name(), format!("cannot encode {}", other.kind()))),
        }
    }

    fn decode(&self, data: &serde_json::Value) -> Result<Value, TranscodingError> {
        let s = expect_str(self.name(), data)?;
        s.parse::<Decimal>()
            .map(Value::Decimal)
            .map_err(|e| malformed(self.name(), e))
    }
}

/// Timestamps as RFC 3339 with microsecond precision, offset preserved.
pub struct DatetimeAsIso;

impl Transcoding for DatetimeAsIso {
    fn name(&self) -> &'static str {
        "datetime_iso"
    }

    fn handles(&self, value: &Value) -> bool {
        matches!(value, Value::Timestamp(_))
    }

    fn encode(&self, value: &Value) -> Result<serde_json::Value, TranscodingError> {
        match value {
            Value::Timestamp(ts) => {
                Ok(json!(ts.to_rfc3339_opts(SecondsFormat::Micros, false)))
            }
            other => Err(malformed(self.name(), format!("cannot encode {}", other.kind()))),
        }
    }

    fn decode(&self, data: &serde_json::Value) -> Result<Value, TranscodingError> {
        let s = expect_str(self.name(), data)?;
        DateTime::parse_from_rfc3339(s)
            .map(Value::Timestamp)
            .map_err(|e| malformed(self.name(), e))
    }
}

/// Byte strings as base64, since JSON has no native bytes.
pub struct BytesAsBase64;

impl Transcoding for BytesAsBase64 {
    fn name(&self) -> &'static str {
        "bytes_base64"
    }

    fn handles(&self, value: &Value) -> bool {
        matches!(value, Value::Bytes(_))
    }

    fn encode(&self, value: &Value) -> Result<serde_json::Value, TranscodingError> {
        match value {
            Value::Bytes(b) => Ok(json!(BASE64.encode(b))),
            other => Err(malformed(self.name(), format!("cannot encode {}", other.kind()))),
        }
    }

    fn decode(&self, data: &serde_json::Value) -> Result<Value, TranscodingError> {
        let s = expect_str(self.name(), data)?;
        BASE64
            .decode(s)
            .map(Value::Bytes)
            .map_err(|e| malformed(self.name(), e))
    }
}
