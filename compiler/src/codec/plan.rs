use brine_proto_wire::{encode_varint, TagKey, WireType};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::registry::TypeRegistry;
use crate::type_system::map_entry_name;
use crate::types::{Cardinality, DefaultValue, FieldDescriptor, FieldType, MessageSchema};
use crate::utils::join_name;
use crate::value::{MessageValue, Value};

/// How a single scalar value is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scalar {
    Int32,
    Int64,
    UInt32,
    UInt64,
    SInt32,
    SInt64,
    Fixed32,
    Fixed64,
    SFixed32,
    SFixed64,
    Bool,
    Float,
    Double,
    String,
    Bytes,
    /// Sign-extended varint, like `int32`.
    Enum,
}

/// What a field type is made of, as far as planning goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape<'a> {
    Scalar(Scalar),
    Message(&'a str),
    Map,
}

impl<'a> Shape<'a> {
    fn of(field_type: &'a FieldType) -> Shape<'a> {
        let scalar = match field_type {
            FieldType::Int32 => Scalar::Int32,
            FieldType::Int64 => Scalar::Int64,
            FieldType::UInt32 => Scalar::UInt32,
            FieldType::UInt64 => Scalar::UInt64,
            FieldType::SInt32 => Scalar::SInt32,
            FieldType::SInt64 => Scalar::SInt64,
            FieldType::Fixed32 => Scalar::Fixed32,
            FieldType::Fixed64 => Scalar::Fixed64,
            FieldType::SFixed32 => Scalar::SFixed32,
            FieldType::SFixed64 => Scalar::SFixed64,
            FieldType::Bool => Scalar::Bool,
            FieldType::Float => Scalar::Float,
            FieldType::Double => Scalar::Double,
            FieldType::String => Scalar::String,
            FieldType::Bytes => Scalar::Bytes,
            FieldType::Enum(_) => Scalar::Enum,
            FieldType::Message(name) => return Shape::Message(name),
            FieldType::Map(..) => return Shape::Map,
        };
        Shape::Scalar(scalar)
    }
}

impl Scalar {
    pub fn of(field_type: &FieldType) -> Option<Scalar> {
        match Shape::of(field_type) {
            Shape::Scalar(scalar) => Some(scalar),
            Shape::Message(_) | Shape::Map => None,
        }
    }

    pub fn wire_type(self) -> WireType {
        match self {
            Scalar::Int32
            | Scalar::Int64
            | Scalar::UInt32
            | Scalar::UInt64
            | Scalar::SInt32
            | Scalar::SInt64
            | Scalar::Bool
            | Scalar::Enum => WireType::Varint,
            Scalar::Fixed64 | Scalar::SFixed64 | Scalar::Double => WireType::Fixed64,
            Scalar::Fixed32 | Scalar::SFixed32 | Scalar::Float => WireType::Fixed32,
            Scalar::String | Scalar::Bytes => WireType::LengthDelimited,
        }
    }

    pub fn is_packable(self) -> bool {
        self.wire_type() != WireType::LengthDelimited
    }

    /// The value an unset implicit-presence field reads as.
    pub fn zero_value(self) -> Value {
        match self {
            Scalar::Int32 | Scalar::SInt32 | Scalar::SFixed32 => Value::Int32(0),
            Scalar::Int64 | Scalar::SInt64 | Scalar::SFixed64 => Value::Int64(0),
            Scalar::UInt32 | Scalar::Fixed32 => Value::UInt32(0),
            Scalar::UInt64 | Scalar::Fixed64 => Value::UInt64(0),
            Scalar::Bool => Value::Bool(false),
            Scalar::Float => Value::Float(0.0),
            Scalar::Double => Value::Double(0.0),
            Scalar::String => Value::String(String::new()),
            Scalar::Bytes => Value::Bytes(vec![]),
            Scalar::Enum => Value::Enum(0),
        }
    }

    /// Converts a declared default into a value of this kind. Enum names
    /// are looked up in `enum_values`.
    fn default_value(self, default: &DefaultValue, enum_values: &[(String, i32)]) -> Option<Value> {
        let integer = match *default {
            DefaultValue::Int(v) => Some(i128::from(v)),
            DefaultValue::UInt(v) => Some(i128::from(v)),
            _ => None,
        };
        let value = match (self, default) {
            (Scalar::Bool, DefaultValue::Bool(v)) => Value::Bool(*v),
            (Scalar::Int32 | Scalar::SInt32 | Scalar::SFixed32, _) => Value::Int32(i32::try_from(integer?).ok()?),
            (Scalar::Int64 | Scalar::SInt64 | Scalar::SFixed64, _) => Value::Int64(i64::try_from(integer?).ok()?),
            (Scalar::UInt32 | Scalar::Fixed32, _) => Value::UInt32(u32::try_from(integer?).ok()?),
            (Scalar::UInt64 | Scalar::Fixed64, _) => Value::UInt64(u64::try_from(integer?).ok()?),
            (Scalar::Float, DefaultValue::Float(v)) => Value::Float(*v as f32),
            (Scalar::Double, DefaultValue::Float(v)) => Value::Double(*v),
            (Scalar::Float, _) => Value::Float(integer? as f32),
            (Scalar::Double, _) => Value::Double(integer? as f64),
            (Scalar::String, DefaultValue::Str(v)) => Value::String(v.clone()),
            (Scalar::Bytes, DefaultValue::Str(v)) => Value::Bytes(v.as_bytes().to_vec()),
            (Scalar::Enum, DefaultValue::Str(name)) => {
                Value::Enum(enum_values.iter().find(|(n, _)| n == name).map(|(_, number)| *number)?)
            }
            (Scalar::Enum, _) => Value::Enum(i32::try_from(integer?).ok()?),
            _ => return None,
        };
        Some(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Scalar::Int32 => "int32",
            Scalar::Int64 => "int64",
            Scalar::UInt32 => "uint32",
            Scalar::UInt64 => "uint64",
            Scalar::SInt32 => "sint32",
            Scalar::SInt64 => "sint64",
            Scalar::Fixed32 => "fixed32",
            Scalar::Fixed64 => "fixed64",
            Scalar::SFixed32 => "sfixed32",
            Scalar::SFixed64 => "sfixed64",
            Scalar::Bool => "bool",
            Scalar::Float => "float",
            Scalar::Double => "double",
            Scalar::String => "string",
            Scalar::Bytes => "bytes",
            Scalar::Enum => "enum",
        };
        f.write_str(name)
    }
}

/// When a field is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    /// Written unless it holds its zero value.
    Implicit,
    /// Written whenever it is set.
    Explicit,
    /// Written whenever it is set; at most one member of the group may be.
    Oneof(String),
    /// Each element is written; an empty list writes nothing.
    Repeated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EncodeOp {
    /// Key, then the value.
    Scalar { scalar: Scalar },
    /// Key and value for every element.
    RepeatedScalar { scalar: Scalar },
    /// One key and length prefix, then every element back to back.
    Packed { scalar: Scalar },
    /// Key, length prefix, then the encoded message.
    Message { type_name: String },
    RepeatedMessage { type_name: String },
    /// Every entry as an embedded message of the synthetic entry type.
    Map { entry: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodeStep {
    pub field:     String,
    pub tag:       u32,
    /// Wire type written in the key.
    pub wire_type: WireType,
    /// The varint tag key, precomputed.
    pub key:       Vec<u8>,
    pub presence:  Presence,
    pub op:        EncodeOp,
    /// Declared default of an explicit-presence field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default:   Option<Value>,
}

/// Field writes in declared order. Unknown fields are written after them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodeProcedure {
    pub steps: Vec<EncodeStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeOp {
    /// Replace the current value: the last occurrence wins.
    Assign { scalar: Scalar },
    /// Append each element read, from a single value or a packed run.
    Append { scalar: Scalar },
    /// Merge into the current value, field by field.
    MergeMessage { type_name: String },
    AppendMessage { type_name: String },
    /// Decode an entry and insert it, replacing an equal key.
    MapEntry { entry: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodeArm {
    pub field:          String,
    pub tag:            u32,
    /// Wire type of a single value.
    pub wire_type:      WireType,
    /// Whether a length-delimited packed run is accepted as well.
    pub accepts_packed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oneof:          Option<String>,
    pub op:             DecodeOp,
}

/// Dispatch table from tag to field handler. Tags without an arm are kept
/// as unknown fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodeProcedure {
    pub arms:   BTreeMap<u32, DecodeArm>,
    /// Oneof group name to member tags. Setting one member clears the rest.
    pub oneofs: BTreeMap<String, Vec<u32>>,
}

/// The encode and decode procedures for one message type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageCodec {
    pub message: String,
    pub encode:  EncodeProcedure,
    pub decode:  DecodeProcedure,
}

impl MessageCodec {
    pub fn step(&self, tag: u32) -> Option<&EncodeStep> {
        self.encode.steps.iter().find(|step| step.tag == tag)
    }

    /// What reading an unset field yields: the declared default if there is
    /// one, otherwise the zero value (an empty message, list or map for
    /// those kinds).
    pub fn default_value(&self, tag: u32) -> Option<Value> {
        let step = self.step(tag)?;
        if let Some(default) = &step.default {
            return Some(default.clone());
        }
        let value = match &step.op {
            EncodeOp::Scalar { scalar } => scalar.zero_value(),
            EncodeOp::Message { type_name } => Value::Message(MessageValue::new(type_name)),
            EncodeOp::RepeatedScalar { .. } | EncodeOp::Packed { .. } | EncodeOp::RepeatedMessage { .. } => {
                Value::List(vec![])
            }
            EncodeOp::Map { .. } => Value::Map(vec![]),
        };
        Some(value)
    }
}

/// Derives the codec for `schema`. References to enums declared outside
/// `schema` are not visible here, so their named defaults are dropped; use
/// [generate_in] to resolve them.
pub fn generate(schema: &MessageSchema) -> MessageCodec {
    generate_in(schema, &TypeRegistry::from_message(schema))
}

/// Derives the codec for `schema`, resolving enum defaults in `registry`.
/// The schema is expected to have passed validation.
pub fn generate_in(schema: &MessageSchema, registry: &TypeRegistry) -> MessageCodec {
    let mut steps = Vec::with_capacity(schema.fields.len());
    let mut arms = BTreeMap::new();

    for field in &schema.fields {
        let (encode, decode) = plan_field(schema, field);
        let wire_type = match encode {
            EncodeOp::Packed { .. } => WireType::LengthDelimited,
            _ => field.field_type.wire_type(),
        };
        let accepts_packed = matches!(decode, DecodeOp::Append { scalar } if scalar.is_packable());

        let presence = if field.is_repeated() {
            Presence::Repeated
        } else if let Some(group) = &field.oneof_group {
            Presence::Oneof(group.clone())
        } else if field.has_explicit_presence() {
            Presence::Explicit
        } else {
            Presence::Implicit
        };

        let default = match (&field.default_value, Scalar::of(&field.field_type)) {
            (Some(default), Some(scalar)) => scalar.default_value(default, &enum_values(&field.field_type, registry)),
            _ => None,
        };

        arms.insert(
            field.tag,
            DecodeArm {
                field: field.name.clone(),
                tag: field.tag,
                wire_type: field.field_type.wire_type(),
                accepts_packed,
                oneof: field.oneof_group.clone(),
                op: decode,
            },
        );
        steps.push(EncodeStep {
            field: field.name.clone(),
            tag: field.tag,
            wire_type,
            key: encode_varint(u64::from(TagKey::new(field.tag, wire_type).value())),
            presence,
            op: encode,
            default,
        });
    }

    let oneofs = schema
        .oneof_groups
        .iter()
        .map(|(group, tags)| (group.clone(), tags.iter().copied().collect()))
        .collect();

    MessageCodec {
        message: schema.name.clone(),
        encode:  EncodeProcedure { steps },
        decode:  DecodeProcedure { arms, oneofs },
    }
}

fn enum_values(field_type: &FieldType, registry: &TypeRegistry) -> Vec<(String, i32)> {
    match field_type {
        FieldType::Enum(name) => registry
            .enumeration(name)
            .map(|e| e.values.iter().map(|v| (v.name.clone(), v.number)).collect())
            .unwrap_or_default(),
        _ => vec![],
    }
}

fn plan_field(schema: &MessageSchema, field: &FieldDescriptor) -> (EncodeOp, DecodeOp) {
    match Shape::of(&field.field_type) {
        Shape::Map => {
            let entry = join_name(&schema.name, &map_entry_name(&field.name));
            (EncodeOp::Map { entry: entry.clone() }, DecodeOp::MapEntry { entry })
        }
        Shape::Message(type_name) if field.cardinality.is_repeated() => (
            EncodeOp::RepeatedMessage { type_name: type_name.to_owned() },
            DecodeOp::AppendMessage { type_name: type_name.to_owned() },
        ),
        Shape::Message(type_name) => (
            EncodeOp::Message { type_name: type_name.to_owned() },
            DecodeOp::MergeMessage { type_name: type_name.to_owned() },
        ),
        Shape::Scalar(scalar) => match field.cardinality {
            Cardinality::Packed if scalar.is_packable() => (EncodeOp::Packed { scalar }, DecodeOp::Append { scalar }),
            Cardinality::Packed | Cardinality::Repeated => {
                (EncodeOp::RepeatedScalar { scalar }, DecodeOp::Append { scalar })
            }
            Cardinality::Singular | Cardinality::Optional => (EncodeOp::Scalar { scalar }, DecodeOp::Assign { scalar }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EnumSchema;

    fn search_request() -> MessageSchema {
        MessageSchema::new("SearchRequest")
            .field(FieldDescriptor::new("query", 1, FieldType::String))
            .field(FieldDescriptor::new("page_number", 2, FieldType::Int32).optional())
            .field(FieldDescriptor::new("samples", 4, FieldType::Int32).packed())
            .field(FieldDescriptor::new("names", 5, FieldType::String).repeated())
            .field(FieldDescriptor::new("name", 6, FieldType::String).in_oneof("choice"))
            .field(FieldDescriptor::new("sub", 9, FieldType::Message("SearchRequest".into())).in_oneof("choice"))
            .field(FieldDescriptor::new(
                "counts",
                16,
                FieldType::Map(Box::new(FieldType::String), Box::new(FieldType::Int32)),
            ))
    }

    #[test]
    fn steps_follow_declared_order() {
        let codec = generate(&search_request());
        assert_eq!(codec.message, "SearchRequest");
        assert_eq!(
            codec.encode.steps.iter().map(|s| s.tag).collect::<Vec<_>>(),
            [1, 2, 4, 5, 6, 9, 16]
        );
        assert_eq!(codec.decode.arms.keys().copied().collect::<Vec<_>>(), [1, 2, 4, 5, 6, 9, 16]);
    }

    #[test]
    fn keys_and_wire_types() {
        let codec = generate(&search_request());
        let step = |tag| codec.step(tag).unwrap();

        assert_eq!(step(1).key, [0x0A]);
        assert_eq!(step(1).presence, Presence::Implicit);
        assert_eq!(step(2).key, [0x10]);
        assert_eq!(step(2).presence, Presence::Explicit);
        // packed runs are length-delimited
        assert_eq!(step(4).key, [0x22]);
        assert_eq!(step(4).op, EncodeOp::Packed { scalar: Scalar::Int32 });
        assert_eq!(step(5).op, EncodeOp::RepeatedScalar { scalar: Scalar::String });
        assert_eq!(step(9).presence, Presence::Oneof("choice".into()));
        assert_eq!(step(16).key, [0x82, 0x01]);
        assert_eq!(step(16).op, EncodeOp::Map { entry: "SearchRequest.CountsEntry".into() });
    }

    #[test]
    fn decode_arms() {
        let codec = generate(&search_request());
        let arm = |tag| &codec.decode.arms[&tag];

        assert_eq!(arm(4).wire_type, WireType::Varint);
        assert!(arm(4).accepts_packed);
        assert_eq!(arm(4).op, DecodeOp::Append { scalar: Scalar::Int32 });
        assert!(!arm(5).accepts_packed);
        assert_eq!(arm(6).oneof.as_deref(), Some("choice"));
        assert_eq!(arm(9).op, DecodeOp::MergeMessage { type_name: "SearchRequest".into() });
        assert_eq!(codec.decode.oneofs["choice"], [6, 9]);
    }

    #[test]
    fn unpacked_repeated_numbers_still_accept_packed_runs() {
        let schema = MessageSchema::new("M").field(FieldDescriptor::new("ids", 1, FieldType::Fixed32).repeated());
        let codec = generate(&schema);
        assert_eq!(codec.step(1).unwrap().key, [0x0D]);
        assert!(codec.decode.arms[&1].accepts_packed);
    }

    #[test]
    fn defaults() {
        let schema = MessageSchema::new("M")
            .nested_enum(EnumSchema::new("M.Color").value("RED", 0).value("BLUE", 3))
            .field(FieldDescriptor::new("color", 1, FieldType::Enum("M.Color".into())).optional().with_default(DefaultValue::Str("BLUE".into())))
            .field(FieldDescriptor::new("limit", 2, FieldType::UInt64).optional().with_default(DefaultValue::UInt(10)))
            .field(FieldDescriptor::new("ratio", 3, FieldType::Float).optional().with_default(DefaultValue::Int(2)))
            .field(FieldDescriptor::new("name", 4, FieldType::String))
            .field(FieldDescriptor::new("child", 5, FieldType::Message("M".into())).optional())
            .field(FieldDescriptor::new("tags", 6, FieldType::String).repeated());
        let codec = generate(&schema);

        assert_eq!(codec.default_value(1), Some(Value::Enum(3)));
        assert_eq!(codec.default_value(2), Some(Value::UInt64(10)));
        assert_eq!(codec.default_value(3), Some(Value::Float(2.0)));
        assert_eq!(codec.default_value(4), Some(Value::String(String::new())));
        assert_eq!(codec.default_value(5), Some(Value::Message(MessageValue::new("M"))));
        assert_eq!(codec.default_value(6), Some(Value::List(vec![])));
        assert_eq!(codec.default_value(7), None);
    }

    #[test]
    fn every_field_type_plans_by_shape() {
        let scalars = [
            (FieldType::Int32, Scalar::Int32),
            (FieldType::SInt64, Scalar::SInt64),
            (FieldType::Fixed32, Scalar::Fixed32),
            (FieldType::SFixed64, Scalar::SFixed64),
            (FieldType::Double, Scalar::Double),
            (FieldType::Bytes, Scalar::Bytes),
            (FieldType::Enum("M.Kind".into()), Scalar::Enum),
        ];
        for (field_type, scalar) in scalars {
            assert_eq!(Shape::of(&field_type), Shape::Scalar(scalar));
            let field = FieldDescriptor::new("x", 1, field_type);
            assert_eq!(plan_field(&MessageSchema::new("M"), &field).0, EncodeOp::Scalar { scalar });
        }

        let message = FieldType::Message("M".into());
        assert_eq!(Shape::of(&message), Shape::Message("M"));
        assert_eq!(Scalar::of(&message), None);
        let map = FieldType::Map(Box::new(FieldType::String), Box::new(FieldType::Bytes));
        assert_eq!(Shape::of(&map), Shape::Map);
        assert_eq!(Scalar::of(&map), None);

        // a packed label on bytes falls back to one record per element
        let field = FieldDescriptor::new("x", 1, FieldType::Bytes).packed();
        assert_eq!(
            plan_field(&MessageSchema::new("M"), &field),
            (EncodeOp::RepeatedScalar { scalar: Scalar::Bytes }, DecodeOp::Append { scalar: Scalar::Bytes })
        );
    }

    #[test]
    fn plan_serializes() {
        let codec = generate(&MessageSchema::new("M").field(FieldDescriptor::new("id", 1, FieldType::SInt64)));
        let json = serde_json::to_value(&codec).unwrap();
        assert_eq!(json["encode"]["steps"][0]["op"]["kind"], "scalar");
        assert_eq!(json["encode"]["steps"][0]["op"]["scalar"], "sint64");
        assert_eq!(json["encode"]["steps"][0]["wire_type"], "VARINT");
        assert_eq!(json["decode"]["arms"]["1"]["op"]["kind"], "assign");
    }
}
