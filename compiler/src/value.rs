use brine_proto_wire::UnknownFields;
use serde::ser::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;

/// This type holds dynamic protobuf data.
///
/// Values carry no schema of their own: a [MessageValue] keys its fields by
/// tag and the codec for its type decides how each one is written. Enum
/// values are kept as numbers so unknown values survive a round trip.
#[derive(Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Enum(i32),
    Message(MessageValue),
    /// Elements of a repeated field.
    List(Vec<Value>),
    /// Entries of a map field in insertion order. Keys are unique.
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// A convenience method to extract the value out of a [Bool](#variant.Bool).
    /// Returns `false` for other value kinds.
    pub fn as_bool(&self) -> bool {
        match *self {
            Value::Bool(value) => value,
            _ => false,
        }
    }

    /// Extracts any signed integer kind ([Int32](#variant.Int32),
    /// [Int64](#variant.Int64) or [Enum](#variant.Enum)). Returns `0` for
    /// other value kinds.
    pub fn as_i64(&self) -> i64 {
        match *self {
            Value::Int32(value) | Value::Enum(value) => i64::from(value),
            Value::Int64(value) => value,
            _ => 0,
        }
    }

    /// Extracts either unsigned integer kind. Returns `0` for other value
    /// kinds.
    pub fn as_u64(&self) -> u64 {
        match *self {
            Value::UInt32(value) => u64::from(value),
            Value::UInt64(value) => value,
            _ => 0,
        }
    }

    /// Extracts either floating point kind. Returns `0.0` for other value
    /// kinds.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::Float(value) => f64::from(value),
            Value::Double(value) => value,
            _ => 0.0,
        }
    }

    /// A convenience method to extract the value out of a [String](#variant.String).
    /// Returns `""` for other value kinds.
    pub fn as_str(&self) -> &str {
        match *self {
            Value::String(ref value) => value.as_str(),
            _ => "",
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match *self {
            Value::Bytes(ref value) => value.as_slice(),
            Value::String(ref value) => value.as_bytes(),
            _ => &[],
        }
    }

    pub fn as_message(&self) -> Option<&MessageValue> {
        match *self {
            Value::Message(ref value) => Some(value),
            _ => None,
        }
    }

    /// A convenience method to get the elements out of a [List](#variant.List).
    /// Returns an empty slice for other value kinds.
    pub fn as_list(&self) -> &[Value] {
        match *self {
            Value::List(ref values) => values.as_slice(),
            _ => &[],
        }
    }

    /// A convenience method to get the entries out of a [Map](#variant.Map).
    /// Returns an empty slice for other value kinds.
    pub fn as_map(&self) -> &[(Value, Value)] {
        match *self {
            Value::Map(ref entries) => entries.as_slice(),
            _ => &[],
        }
    }

    /// Looks up the value stored under `key` in a [Map](#variant.Map).
    pub fn map_get(&self, key: &Value) -> Option<&Value> {
        self.as_map().iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Number of elements of a [List](#variant.List) or entries of a
    /// [Map](#variant.Map). Returns `0` for other value kinds.
    pub fn len(&self) -> usize {
        match *self {
            Value::List(ref values) => values.len(),
            Value::Map(ref entries) => entries.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A convenience method to append to a [List](#variant.List). Does
    /// nothing for other value kinds.
    pub fn push(&mut self, value: Value) {
        if let Value::List(ref mut values) = *self {
            values.push(value);
        }
    }

    /// Inserts into a [Map](#variant.Map), replacing the value of an
    /// existing equal key. Does nothing for other value kinds.
    pub fn map_insert(&mut self, key: Value, value: Value) {
        if let Value::Map(ref mut entries) = *self {
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = value,
                None => entries.push((key, value)),
            }
        }
    }

    /// Whether this is the zero value of its kind, which implicit-presence
    /// fields never write. Negative zero floats are not zero.
    pub fn is_zero(&self) -> bool {
        match *self {
            Value::Bool(value) => !value,
            Value::Int32(value) | Value::Enum(value) => value == 0,
            Value::Int64(value) => value == 0,
            Value::UInt32(value) => value == 0,
            Value::UInt64(value) => value == 0,
            Value::Float(value) => value.to_bits() == 0,
            Value::Double(value) => value.to_bits() == 0,
            Value::String(ref value) => value.is_empty(),
            Value::Bytes(ref value) => value.is_empty(),
            Value::Message(_) => false,
            Value::List(ref values) => values.is_empty(),
            Value::Map(ref entries) => entries.is_empty(),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Value {
        Value::Int32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Value {
        Value::Int64(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Value {
        Value::UInt32(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Value {
        Value::UInt64(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Value {
        Value::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Value {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Value {
        Value::Bytes(value)
    }
}

impl From<MessageValue> for Value {
    fn from(value: MessageValue) -> Value {
        Value::Message(value)
    }
}

impl Index<usize> for Value {
    type Output = Value;

    /// A convenience method that adds support for `self[index]` expressions.
    /// It will panic if this value isn't a [List](#variant.List) or if the
    /// provided index is out of bounds.
    fn index(&self, index: usize) -> &Value {
        match *self {
            Value::List(ref values) => &values[index],
            _ => panic!("not a list"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            Value::Bool(value) => value.fmt(f),
            Value::Int32(value) => value.fmt(f),
            Value::Int64(value) => write!(f, "{}i64", value),
            Value::UInt32(value) => write!(f, "{}u32", value),
            Value::UInt64(value) => write!(f, "{}u64", value),
            Value::Float(value) => write!(f, "{:?}f32", value),
            Value::Double(value) => value.fmt(f),
            Value::String(ref value) => value.fmt(f),
            Value::Bytes(ref value) => write!(f, "b{:?}", value),
            Value::Enum(value) => write!(f, "enum({})", value),
            Value::Message(ref value) => value.fmt(f),
            Value::List(ref values) => values.fmt(f),
            Value::Map(ref entries) => f.debug_map().entries(entries.iter().map(|(k, v)| (k, v))).finish(),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Value::Bool(value) => serializer.serialize_bool(value),
            Value::Int32(value) | Value::Enum(value) => serializer.serialize_i32(value),
            Value::Int64(value) => serializer.serialize_i64(value),
            Value::UInt32(value) => serializer.serialize_u32(value),
            Value::UInt64(value) => serializer.serialize_u64(value),
            Value::Float(value) => serializer.serialize_f32(value),
            Value::Double(value) => serializer.serialize_f64(value),
            Value::String(ref value) => serializer.serialize_str(value),
            Value::Bytes(ref value) => value.serialize(serializer),
            Value::Message(ref value) => value.fields.serialize(serializer),
            Value::List(ref values) => values.serialize(serializer),
            Value::Map(ref entries) => entries.serialize(serializer),
        }
    }
}

/// A decoded (or to-be-encoded) message: field values keyed by tag, plus the
/// unknown fields read alongside them.
#[derive(Clone, PartialEq, Default)]
pub struct MessageValue {
    /// Fully-qualified message name, used to find the codec.
    pub type_name: String,
    pub fields:    BTreeMap<u32, Value>,
    pub unknown:   UnknownFields,
}

impl MessageValue {
    pub fn new(type_name: &str) -> MessageValue {
        MessageValue {
            type_name: type_name.to_owned(),
            fields:    BTreeMap::new(),
            unknown:   UnknownFields::new(),
        }
    }

    /// Builder-style [set](#method.set).
    pub fn with(mut self, tag: u32, value: impl Into<Value>) -> MessageValue {
        self.set(tag, value);
        self
    }

    pub fn set(&mut self, tag: u32, value: impl Into<Value>) {
        self.fields.insert(tag, value.into());
    }

    pub fn get(&self, tag: u32) -> Option<&Value> {
        self.fields.get(&tag)
    }

    pub fn remove(&mut self, tag: u32) -> Option<Value> {
        self.fields.remove(&tag)
    }

    pub fn has(&self, tag: u32) -> bool {
        self.fields.contains_key(&tag)
    }

    /// Whether no field (known or unknown) is set.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.unknown.is_empty()
    }
}

impl fmt::Debug for MessageValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{} {{", self.type_name)?;
        let mut first = true;
        for (tag, value) in &self.fields {
            if first {
                first = false;
            } else {
                write!(f, ",")?;
            }
            write!(f, " {}: {:?}", tag, value)?;
        }
        if !self.unknown.is_empty() {
            write!(f, " +{} unknown", self.unknown.len())?;
        }
        write!(f, " }}")
    }
}
