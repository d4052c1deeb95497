use brine_proto_wire::{ByteBuffer, TagKey, UnknownField, WireError, WireType};
use tracing::{debug, trace};

use super::plan::{DecodeArm, DecodeOp, MessageCodec, Scalar};
use super::CodecSet;
use crate::error::CodecError;
use crate::value::{MessageValue, Value};

impl CodecSet {
    /// Decodes `bytes` as a message of type `message`.
    ///
    /// Fields may arrive in any order and more than once: scalars keep the
    /// last value, embedded messages merge, repeated fields append (from
    /// packed and unpacked records alike) and map entries replace equal
    /// keys. Unknown tags are kept verbatim. Any failure discards the whole
    /// result.
    pub fn decode(&self, message: &str, bytes: &[u8]) -> Result<MessageValue, CodecError> {
        let limits = self.limits;
        if bytes.len() > limits.max_message_size {
            return Err(WireError::LimitExceeded {
                offset: 0,
                what:   "message size",
                limit:  limits.max_message_size,
                actual: bytes.len(),
            }
            .into());
        }
        debug!(type_name = message, len = bytes.len(), "decoding message");
        self.decode_message(message, &mut ByteBuffer::new(bytes), 0)
    }

    fn decode_message(&self, message: &str, bb: &mut ByteBuffer, depth: usize) -> Result<MessageValue, CodecError> {
        if depth > self.limits.max_depth {
            return Err(WireError::LimitExceeded {
                offset: bb.offset(),
                what:   "nesting depth",
                limit:  self.limits.max_depth,
                actual: depth,
            }
            .into());
        }

        let codec = self.codec(message)?;
        let mut value = MessageValue::new(&codec.message);
        while !bb.is_empty() {
            let start = bb.index();
            let key_offset = bb.offset();
            let key = bb.read_tag_key()?;
            match codec.decode.arms.get(&key.tag) {
                Some(arm) => self.decode_field(codec, arm, key, key_offset, bb, &mut value, depth)?,
                None => {
                    trace!(type_name = message, tag = key.tag, "keeping unknown field");
                    let field = UnknownField::read(bb, start, key.tag, key.wire_type, self.limits.max_length)?;
                    value.unknown.push(field);
                }
            }
        }
        Ok(value)
    }

    #[allow(clippy::too_many_arguments)]
    fn decode_field(
        &self,
        codec: &MessageCodec,
        arm: &DecodeArm,
        key: TagKey,
        key_offset: usize,
        bb: &mut ByteBuffer,
        message: &mut MessageValue,
        depth: usize,
    ) -> Result<(), CodecError> {
        let max_length = self.limits.max_length;
        let packed_run = arm.accepts_packed && key.wire_type == WireType::LengthDelimited;
        if key.wire_type != arm.wire_type && !packed_run {
            return Err(CodecError::WireTypeMismatch {
                offset:   key_offset,
                message:  codec.message.clone(),
                field:    arm.field.clone(),
                tag:      arm.tag,
                expected: arm.wire_type,
                actual:   key.wire_type,
            });
        }

        match &arm.op {
            DecodeOp::Assign { scalar } => {
                let value = read_scalar(bb, *scalar, max_length)?;
                clear_oneof(codec, arm, message);
                message.fields.insert(arm.tag, value);
            }

            DecodeOp::Append { scalar } => {
                let mut values = vec![];
                if packed_run {
                    let mut run = bb.sub_buffer(max_length)?;
                    while !run.is_empty() {
                        values.push(read_scalar(&mut run, *scalar, max_length)?);
                    }
                } else {
                    values.push(read_scalar(bb, *scalar, max_length)?);
                }
                match message.fields.get_mut(&arm.tag) {
                    Some(Value::List(existing)) => existing.extend(values),
                    _ => {
                        message.fields.insert(arm.tag, Value::List(values));
                    }
                }
            }

            DecodeOp::MergeMessage { type_name } => {
                let mut nested = bb.sub_buffer(max_length)?;
                let decoded = self.decode_message(type_name, &mut nested, depth + 1)?;
                clear_oneof(codec, arm, message);
                let merged = match message.fields.remove(&arm.tag) {
                    Some(Value::Message(mut existing)) => {
                        self.merge(&mut existing, decoded)?;
                        existing
                    }
                    _ => decoded,
                };
                message.fields.insert(arm.tag, Value::Message(merged));
            }

            DecodeOp::AppendMessage { type_name } => {
                let mut nested = bb.sub_buffer(max_length)?;
                let decoded = Value::Message(self.decode_message(type_name, &mut nested, depth + 1)?);
                match message.fields.get_mut(&arm.tag) {
                    Some(Value::List(existing)) => existing.push(decoded),
                    _ => {
                        message.fields.insert(arm.tag, Value::List(vec![decoded]));
                    }
                }
            }

            DecodeOp::MapEntry { entry } => {
                let entry_codec = self.codec(entry)?;
                let mut nested = bb.sub_buffer(max_length)?;
                let mut decoded = self.decode_message(entry, &mut nested, depth + 1)?;
                let key = decoded.fields.remove(&1).or_else(|| entry_codec.default_value(1));
                let value = decoded.fields.remove(&2).or_else(|| entry_codec.default_value(2));
                let (Some(key), Some(value)) = (key, value) else {
                    return Err(CodecError::UnknownMessage(entry.clone()));
                };
                match message.fields.get_mut(&arm.tag) {
                    Some(map @ Value::Map(_)) => map.map_insert(key, value),
                    _ => {
                        message.fields.insert(arm.tag, Value::Map(vec![(key, value)]));
                    }
                }
            }
        }
        Ok(())
    }

    /// Merges `source` into `target` the way a second occurrence of an
    /// embedded message on the wire would. On error `target` is left as it
    /// was.
    pub fn merge(&self, target: &mut MessageValue, source: MessageValue) -> Result<(), CodecError> {
        let mut merged = target.clone();
        self.merge_into(&mut merged, source)?;
        *target = merged;
        Ok(())
    }

    fn merge_into(&self, target: &mut MessageValue, source: MessageValue) -> Result<(), CodecError> {
        let codec = self.codec(&target.type_name)?;
        for (tag, value) in source.fields {
            if let Some(arm) = codec.decode.arms.get(&tag) {
                clear_oneof(codec, arm, target);
            }
            let merged = match (target.fields.remove(&tag), value) {
                (Some(Value::List(mut existing)), Value::List(more)) => {
                    existing.extend(more);
                    Value::List(existing)
                }
                (Some(mut map @ Value::Map(_)), Value::Map(more)) => {
                    for (key, value) in more {
                        map.map_insert(key, value);
                    }
                    map
                }
                (Some(Value::Message(mut existing)), Value::Message(more)) => {
                    self.merge_into(&mut existing, more)?;
                    Value::Message(existing)
                }
                (_, value) => value,
            };
            target.fields.insert(tag, merged);
        }
        target.unknown.extend(source.unknown);
        Ok(())
    }
}

/// Clears the other members of the oneof group `arm` belongs to.
fn clear_oneof(codec: &MessageCodec, arm: &DecodeArm, message: &mut MessageValue) {
    let Some(members) = arm.oneof.as_ref().and_then(|group| codec.decode.oneofs.get(group)) else {
        return;
    };
    for tag in members {
        if *tag != arm.tag {
            message.fields.remove(tag);
        }
    }
}

/// Reads one scalar value (no key). `int32`, `uint32` and enum varints keep
/// their low 32 bits; any non-zero varint is a true `bool`.
pub(crate) fn read_scalar(bb: &mut ByteBuffer, scalar: Scalar, max_length: usize) -> Result<Value, WireError> {
    let value = match scalar {
        Scalar::Int32 => Value::Int32(bb.read_varint32()? as i32),
        Scalar::Int64 => Value::Int64(bb.read_varint()? as i64),
        Scalar::UInt32 => Value::UInt32(bb.read_varint32()?),
        Scalar::UInt64 => Value::UInt64(bb.read_varint()?),
        Scalar::SInt32 => Value::Int32(bb.read_zigzag32()?),
        Scalar::SInt64 => Value::Int64(bb.read_zigzag64()?),
        Scalar::Fixed32 => Value::UInt32(bb.read_fixed32()?),
        Scalar::Fixed64 => Value::UInt64(bb.read_fixed64()?),
        Scalar::SFixed32 => Value::Int32(bb.read_fixed32()? as i32),
        Scalar::SFixed64 => Value::Int64(bb.read_fixed64()? as i64),
        Scalar::Bool => Value::Bool(bb.read_bool()?),
        Scalar::Float => Value::Float(bb.read_float()?),
        Scalar::Double => Value::Double(bb.read_double()?),
        Scalar::String => Value::String(bb.read_string(max_length)?.to_owned()),
        Scalar::Bytes => Value::Bytes(bb.read_length_delimited(max_length)?.to_vec()),
        Scalar::Enum => Value::Enum(bb.read_varint32()? as i32),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecodeLimits;
    use crate::types::{FieldDescriptor, FieldType, MessageSchema};

    fn codecs() -> CodecSet {
        CodecSet::for_message(
            &MessageSchema::new("Test")
                .field(FieldDescriptor::new("a", 1, FieldType::Int32))
                .field(FieldDescriptor::new("b", 2, FieldType::String))
                .field(FieldDescriptor::new("c", 3, FieldType::Message("Test".into())).optional())
                .field(FieldDescriptor::new("d", 4, FieldType::Int32).repeated())
                .field(FieldDescriptor::new("e", 5, FieldType::Bool))
                .field(FieldDescriptor::new("f", 6, FieldType::String).in_oneof("pick"))
                .field(FieldDescriptor::new("g", 7, FieldType::Int64).in_oneof("pick"))
                .field(FieldDescriptor::new(
                    "h",
                    8,
                    FieldType::Map(Box::new(FieldType::String), Box::new(FieldType::Int32)),
                ))
                .field(FieldDescriptor::new("k", 9, FieldType::Enum("Test.Kind".into())))
                .field(FieldDescriptor::new("l", 10, FieldType::Message("Test".into())).repeated())
                .nested_enum(crate::types::EnumSchema::new("Test.Kind").value("NONE", 0)),
        )
    }

    #[test]
    fn decodes_the_classic_examples() {
        let codecs = codecs();
        let decoded = codecs.decode("Test", &[0x08, 0x96, 0x01]).unwrap();
        assert_eq!(decoded, MessageValue::new("Test").with(1, 150));

        let decoded = codecs.decode("Test", &[0x12, 0x07, 0x74, 0x65, 0x73, 0x74, 0x69, 0x6e, 0x67]).unwrap();
        assert_eq!(decoded.get(2), Some(&Value::from("testing")));
    }

    #[test]
    fn last_scalar_wins() {
        let decoded = codecs().decode("Test", &[0x08, 0x01, 0x08, 0x02]).unwrap();
        assert_eq!(decoded.get(1), Some(&Value::Int32(2)));
    }

    #[test]
    fn packed_and_unpacked_records_both_append() {
        let codecs = codecs();
        // unpacked 1, packed [2, 3], unpacked 4
        let decoded = codecs.decode("Test", &[0x20, 0x01, 0x22, 0x02, 0x02, 0x03, 0x20, 0x04]).unwrap();
        assert_eq!(
            decoded.get(4),
            Some(&Value::List(vec![1.into(), 2.into(), 3.into(), 4.into()]))
        );
    }

    #[test]
    fn embedded_messages_merge() {
        let codecs = codecs();
        // c = { a: 1 }, then c = { b: "x" }
        let decoded = codecs
            .decode("Test", &[0x1a, 0x02, 0x08, 0x01, 0x1a, 0x03, 0x12, 0x01, b'x'])
            .unwrap();
        assert_eq!(
            decoded.get(3),
            Some(&Value::Message(MessageValue::new("Test").with(1, 1).with(2, "x")))
        );

        let decoded = codecs.decode("Test", &[0x52, 0x02, 0x08, 0x01, 0x52, 0x00]).unwrap();
        assert_eq!(decoded.get(10).map(Value::len), Some(2));
    }

    #[test]
    fn failed_merge_leaves_the_target_alone() {
        let codecs = codecs();
        let mut target = MessageValue::new("Test")
            .with(2, "kept")
            .with(3, Value::Message(MessageValue::new("Missing").with(1, 1)));
        let before = target.clone();
        // tag 1 merges before tag 3 reaches the undeclared nested type
        let source = MessageValue::new("Test")
            .with(1, 9)
            .with(3, Value::Message(MessageValue::new("Missing").with(1, 2)));

        assert_eq!(
            codecs.merge(&mut target, source),
            Err(CodecError::UnknownMessage("Missing".into()))
        );
        assert_eq!(target, before);

        codecs.merge(&mut target, MessageValue::new("Test").with(1, 9)).unwrap();
        assert_eq!(target.get(1), Some(&Value::Int32(9)));
        assert_eq!(target.get(2), Some(&Value::from("kept")));
    }

    #[test]
    fn oneof_last_member_wins() {
        let codecs = codecs();
        let decoded = codecs.decode("Test", &[0x32, 0x01, b'x', 0x38, 0x05]).unwrap();
        assert_eq!(decoded.get(6), None);
        assert_eq!(decoded.get(7), Some(&Value::Int64(5)));

        let decoded = codecs.decode("Test", &[0x38, 0x05, 0x32, 0x01, b'x']).unwrap();
        assert_eq!(decoded.get(6), Some(&Value::from("x")));
        assert_eq!(decoded.get(7), None);
    }

    #[test]
    fn map_entries_replace_equal_keys_and_default_missing_parts() {
        let codecs = codecs();
        let decoded = codecs
            .decode(
                "Test",
                &[
                    0x42, 0x05, 0x0A, 0x01, b'a', 0x10, 0x01, // a -> 1
                    0x42, 0x03, 0x0A, 0x01, b'b', // b -> (missing) 0
                    0x42, 0x05, 0x0A, 0x01, b'a', 0x10, 0x07, // a -> 7
                ],
            )
            .unwrap();
        assert_eq!(
            decoded.get(8),
            Some(&Value::Map(vec![("a".into(), 7.into()), ("b".into(), 0.into())]))
        );
    }

    #[test]
    fn narrowing_and_open_enums() {
        let codecs = codecs();
        // a = 2^32 + 5 truncates to 5, e = 2 is true, k = 42 is kept
        let decoded = codecs
            .decode("Test", &[0x08, 0x85, 0x80, 0x80, 0x80, 0x10, 0x28, 0x02, 0x48, 0x2A])
            .unwrap();
        assert_eq!(decoded.get(1), Some(&Value::Int32(5)));
        assert_eq!(decoded.get(5), Some(&Value::Bool(true)));
        assert_eq!(decoded.get(9), Some(&Value::Enum(42)));

        // negative int32 travels as ten bytes
        let decoded = codecs
            .decode("Test", &[0x08, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01])
            .unwrap();
        assert_eq!(decoded.get(1), Some(&Value::Int32(-1)));
    }

    #[test]
    fn unknown_fields_are_kept() {
        let codecs = codecs();
        // tag 15 varint, tag 16 length-delimited, tag 17 fixed32
        let input = [0x08, 0x01, 0x78, 0x05, 0x82, 0x01, 0x01, 0xFF, 0x8D, 0x01, 1, 2, 3, 4];
        let decoded = codecs.decode("Test", &input).unwrap();
        assert_eq!(decoded.get(1), Some(&Value::Int32(1)));
        assert_eq!(decoded.unknown.iter().map(|f| f.tag).collect::<Vec<_>>(), [15, 16, 17]);
        assert_eq!(codecs.encode(&decoded).unwrap(), input);
    }

    #[test]
    fn wire_type_mismatch() {
        let codecs = codecs();
        assert_eq!(
            codecs.decode("Test", &[0x08, 0x01, 0x0D, 1, 2, 3, 4]),
            Err(CodecError::WireTypeMismatch {
                offset:   2,
                message:  "Test".into(),
                field:    "a".into(),
                tag:      1,
                expected: WireType::Varint,
                actual:   WireType::Fixed32,
            })
        );
        // a LEN record is only a packed run for repeated numbers
        assert!(matches!(
            codecs.decode("Test", &[0x0A, 0x01, 0x01]),
            Err(CodecError::WireTypeMismatch { offset: 0, .. })
        ));
    }

    #[test]
    fn malformed_input() {
        let codecs = codecs();
        let decode = |bytes: &[u8]| codecs.decode("Test", bytes);

        assert_eq!(
            decode(&[0x08, 0x80]),
            Err(CodecError::Malformed(WireError::MalformedVarint { offset: 1 }))
        );
        assert_eq!(
            decode(&[0x12, 0x05, b'a']),
            Err(CodecError::Malformed(WireError::Truncated { offset: 2, needed: 5, remaining: 1 }))
        );
        assert_eq!(
            decode(&[0x12, 0x02, 0xC3, 0x28]),
            Err(CodecError::Malformed(WireError::InvalidUtf8 { offset: 2 }))
        );
        assert_eq!(
            decode(&[0x0B, 0x0C]),
            Err(CodecError::Malformed(WireError::UnsupportedWireType { offset: 0, wire_type: 3 }))
        );
        assert_eq!(decode(&[0x00]), Err(CodecError::Malformed(WireError::InvalidTag { offset: 0, key: 0 })));
        // errors inside embedded messages report absolute offsets
        assert_eq!(
            decode(&[0x08, 0x01, 0x1a, 0x02, 0x08, 0x80]),
            Err(CodecError::Malformed(WireError::MalformedVarint { offset: 5 }))
        );
        assert_eq!(decode(&[]), Ok(MessageValue::new("Test")));
    }

    #[test]
    fn limits() {
        let codecs = codecs().with_limits(DecodeLimits { max_message_size: 4, max_length: 2, max_depth: 1 });
        assert!(matches!(
            codecs.decode("Test", &[0; 5]),
            Err(CodecError::Malformed(WireError::LimitExceeded { what: "message size", .. }))
        ));
        assert!(matches!(
            codecs.decode("Test", &[0x12, 0x03, b'a', b'b']),
            Err(CodecError::Malformed(WireError::LimitExceeded { what: "length prefix", offset: 1, .. }))
        ));
        // c { c { } } nests two deep
        assert!(matches!(
            codecs.decode("Test", &[0x1a, 0x02, 0x1a, 0x00]),
            Err(CodecError::Malformed(WireError::LimitExceeded { what: "nesting depth", .. }))
        ));
        assert!(codecs.decode("Test", &[0x1a, 0x00]).is_ok());
    }
}
