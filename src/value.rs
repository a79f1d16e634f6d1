// Value: Arc-wrapped value type shared between concurrent evaluations
// Carries the three absence sentinels alongside the structured document types

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A structured value with O(1) clone semantics via Arc-wrapping.
///
/// Alongside the JSON-shaped variants there are two sentinels that never come
/// out of a parsed document:
///
/// - `Deleted` asks the enclosing container to drop this element.
/// - `Nothing` means no value could be located (missing field, missing
///   metadata key, out-of-range batch index). It is distinct from `Null`,
///   which is a value that was found and happens to be empty.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(Arc<str>),
    Bytes(Arc<[u8]>),
    Array(Arc<Vec<Value>>),
    Object(Arc<IndexMap<String, Value>>),

    Deleted,
    Nothing,
}

// ── Type checks ──────────────────────────────────────────────────────────────

impl Value {
    #[inline]
    pub fn is_deleted(&self) -> bool {
        matches!(self, Value::Deleted)
    }

    /// True for every flavour of "no usable value": `Null`, `Deleted` and `Nothing`.
    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Null | Value::Deleted | Value::Nothing)
    }

    #[inline]
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Name of the variant, used in failure messages and by the `type()` method.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Deleted => "deleted",
            Value::Nothing => "nothing",
        }
    }
}

// ── Extraction ───────────────────────────────────────────────────────────────

impl Value {
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => {
                let f = *n;
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                    Some(f as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Index into an object by key.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Index into an array by position.
    #[inline]
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            Value::Array(arr) => arr.get(index),
            _ => None,
        }
    }
}

// ── Constructors ─────────────────────────────────────────────────────────────

impl Value {
    #[inline]
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    #[inline]
    pub fn bytes(b: impl Into<Arc<[u8]>>) -> Self {
        Value::Bytes(b.into())
    }

    #[inline]
    pub fn array(v: Vec<Value>) -> Self {
        Value::Array(Arc::new(v))
    }

    #[inline]
    pub fn object(m: IndexMap<String, Value>) -> Self {
        Value::Object(Arc::new(m))
    }
}

// ── From impls ───────────────────────────────────────────────────────────────

impl From<bool> for Value {
    #[inline]
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    #[inline]
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<usize> for Value {
    #[inline]
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<f64> for Value {
    #[inline]
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    #[inline]
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

// ── PartialEq ────────────────────────────────────────────────────────────────

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Deleted, Value::Deleted) => true,
            (Value::Nothing, Value::Nothing) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

// ── Display ──────────────────────────────────────────────────────────────────

/// Textual rendering used by the string/byte entry points and `string()`.
///
/// Strings and bytes are written verbatim, scalars without quoting, and
/// containers in their canonical JSON encoding. Every sentinel renders as
/// `null`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            other => write_json(other, f),
        }
    }
}

fn write_json(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Null | Value::Deleted | Value::Nothing => write!(f, "null"),
        Value::Bool(b) => write!(f, "{}", b),
        Value::Number(n) => format_number(*n, f),
        Value::String(s) => write!(f, "\"{}\"", escape_json_string(s)),
        Value::Bytes(b) => write!(f, "\"{}\"", escape_json_string(&String::from_utf8_lossy(b))),
        Value::Array(arr) => {
            write!(f, "[")?;
            for (i, v) in arr.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write_json(v, f)?;
            }
            write!(f, "]")
        }
        Value::Object(map) => {
            write!(f, "{{")?;
            for (i, (k, v)) in map.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "\"{}\":", escape_json_string(k))?;
                write_json(v, f)?;
            }
            write!(f, "}}")
        }
    }
}

fn escape_json_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c < '\x20' => {
                result.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => result.push(c),
        }
    }
    result
}

fn format_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if !n.is_finite() {
        write!(f, "null")
    } else if n.fract() == 0.0 && n.abs() < 1e20 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{}", n)
    }
}

// ── Serialization ────────────────────────────────────────────────────────────

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null | Value::Deleted | Value::Nothing => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => {
                if n.is_nan() || n.is_infinite() {
                    serializer.serialize_none()
                } else if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n <= i64::MAX as f64 {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_str(&String::from_utf8_lossy(b)),
            Value::Array(arr) => {
                let mut seq = serializer.serialize_seq(Some(arr.len()))?;
                for v in arr.iter() {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            Value::Object(map) => {
                let mut m = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map.iter() {
                    m.serialize_entry(k, v)?;
                }
                m.end()
            }
        }
    }
}

// ── Deserialization (single-pass JSON→Value) ─────────────────────────────────

impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "any valid JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Number(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::string(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v.into()))
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut vec = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(elem) = seq.next_element()? {
            vec.push(elem);
        }
        Ok(Value::array(vec))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut m = IndexMap::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((k, v)) = map.next_entry()? {
            m.insert(k, v);
        }
        Ok(Value::object(m))
    }
}

// ── JSON I/O ─────────────────────────────────────────────────────────────────

impl Value {
    /// Parse a document into a Value tree. This is the structured-document
    /// parser consulted by every structured lookup.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

// ── value! macro ─────────────────────────────────────────────────────────────

/// Macro for constructing Value literals, similar to serde_json::json!
///
/// Usage:
///   value!(null)           → Value::Null
///   value!(true)           → Value::Bool(true)
///   value!(42)             → Value::Number(42.0)
///   value!("hello")        → Value::String(..)
///   value!([1, 2, 3])      → Value::Array(..)
///   value!({"k": v, ...})  → Value::Object(..)
///   value!(expr)           → Value::from(expr)
#[macro_export]
macro_rules! value {
    (null) => {
        $crate::value::Value::Null
    };

    (true) => {
        $crate::value::Value::Bool(true)
    };

    (false) => {
        $crate::value::Value::Bool(false)
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::value::Value::Array(std::sync::Arc::new(vec![ $( $crate::value!($elem) ),* ]))
    };

    ({ $($key:tt : $val:tt),* $(,)? }) => {
        {
            #[allow(unused_mut)]
            let mut map = indexmap::IndexMap::new();
            $(
                map.insert(($key).to_string(), $crate::value!($val));
            )*
            $crate::value::Value::Object(std::sync::Arc::new(map))
        }
    };

    ($other:expr) => {
        $crate::value::Value::from($other)
    };
}

// ── Tests ────────────────────────────────────────────────────────────────────
