//! brine-proto
//!
//! This crate provides runtime support for working with Protocol Buffers data.
//!
//! - the wire primitives generated code is built on (`wire`)
//! - schema compilation and dynamic encode / decode, re-exported from the compiler
//! - helpers rendering decoded messages as JSON

use serde_json::{json, Map};

pub use brine_proto_compiler::{
    compile_schema, compile_schema_to_rust, compile_schema_with, CodecConfig, CodecError, CodecSet, DecodeLimits,
    Emitter, MessageValue, ProtoError, RustEmitter, SchemaSet, ValidationError, ValidationErrors, Value,
};
pub use brine_proto_wire as wire;

/// Decode `bytes` as a `message` and render it as pretty-printed JSON.
pub fn decode_to_json(codecs: &CodecSet, message: &str, bytes: &[u8]) -> Result<String, ProtoError> {
    let value = codecs.decode(message, bytes)?;
    Ok(serde_json::to_string_pretty(&message_to_json(codecs, &value))?)
}

/// A message as a JSON object keyed by field name. Fields the schema does
/// not know are listed under `"_unknown"` with their raw bytes.
pub fn message_to_json(codecs: &CodecSet, message: &MessageValue) -> serde_json::Value {
    let codec = codecs.get(&message.type_name);
    let mut object = Map::new();

    for (tag, value) in &message.fields {
        let name = codec
            .and_then(|c| c.step(*tag))
            .map(|step| step.field.clone())
            .unwrap_or_else(|| tag.to_string());
        object.insert(name, value_to_json(codecs, value));
    }

    if !message.unknown.is_empty() {
        let unknown = message
            .unknown
            .iter()
            .map(|field| json!({ "tag": field.tag, "wire_type": field.wire_type, "raw": field.raw() }))
            .collect();
        object.insert("_unknown".to_string(), serde_json::Value::Array(unknown));
    }

    serde_json::Value::Object(object)
}

/// Renders one dynamic value. Map keys become strings; bytes are an array
/// of numbers; non-finite floats become `null`.
pub fn value_to_json(codecs: &CodecSet, value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(v) => json!(v),
        Value::Int32(v) | Value::Enum(v) => json!(v),
        Value::Int64(v) => json!(v),
        Value::UInt32(v) => json!(v),
        Value::UInt64(v) => json!(v),
        Value::Float(v) => json!(f64::from(*v)),
        Value::Double(v) => json!(v),
        Value::String(v) => json!(v),
        Value::Bytes(v) => json!(v),
        Value::Message(message) => message_to_json(codecs, message),
        Value::List(values) => values.iter().map(|v| value_to_json(codecs, v)).collect(),
        Value::Map(entries) => {
            let object = entries
                .iter()
                .map(|(key, value)| {
                    let key = match value_to_json(codecs, key) {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (key, value_to_json(codecs, value))
                })
                .collect();
            serde_json::Value::Object(object)
        }
    }
}

pub mod error {
    pub use brine_proto_compiler::error::{CodecError, ProtoError, ValidationError, ValidationErrors};
}

pub mod schema {
    pub use brine_proto_compiler::types::{
        Cardinality, EnumSchema, FieldDescriptor, FieldType, MessageSchema, Reserved, SchemaSet,
    };
}
