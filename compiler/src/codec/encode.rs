use brine_proto_wire::ByteBufferMut;
use std::collections::HashSet;

use super::plan::{EncodeOp, EncodeStep, MessageCodec, Presence, Scalar};
use super::CodecSet;
use crate::error::CodecError;
use crate::value::{MessageValue, Value};

impl CodecSet {
    /// Encodes `message` with the codec of its type. Known fields are written
    /// in declared order, then the retained unknown fields verbatim.
    pub fn encode(&self, message: &MessageValue) -> Result<Vec<u8>, CodecError> {
        let mut bb = ByteBufferMut::new();
        self.encode_to(message, &mut bb)?;
        Ok(bb.data())
    }

    /// Like [encode](#method.encode), appending to `bb`.
    pub fn encode_to(&self, message: &MessageValue, bb: &mut ByteBufferMut) -> Result<(), CodecError> {
        let codec = self.codec(&message.type_name)?;
        if let Some(&tag) = message.fields.keys().find(|tag| !codec.decode.arms.contains_key(tag)) {
            return Err(CodecError::UnknownField { message: codec.message.clone(), tag });
        }
        self.encode_fields(codec, |tag| message.fields.get(&tag), bb)?;
        message.unknown.write_to(bb);
        Ok(())
    }

    fn encode_fields<'v>(
        &self,
        codec: &MessageCodec,
        lookup: impl Fn(u32) -> Option<&'v Value>,
        bb: &mut ByteBufferMut,
    ) -> Result<(), CodecError> {
        let mut groups_set = HashSet::new();
        for step in &codec.encode.steps {
            let Some(value) = lookup(step.tag) else {
                continue;
            };
            match &step.presence {
                Presence::Implicit if value.is_zero() => continue,
                Presence::Oneof(group) if !groups_set.insert(group.as_str()) => {
                    return Err(CodecError::OneofConflict { message: codec.message.clone(), group: group.clone() });
                }
                _ => {}
            }
            self.encode_step(codec, step, value, bb)?;
        }
        Ok(())
    }

    fn encode_step(
        &self,
        codec: &MessageCodec,
        step: &EncodeStep,
        value: &Value,
        bb: &mut ByteBufferMut,
    ) -> Result<(), CodecError> {
        let mismatch = |expected: String| CodecError::ValueMismatch {
            message: codec.message.clone(),
            field: step.field.clone(),
            expected,
        };

        match &step.op {
            EncodeOp::Scalar { scalar } => {
                bb.write_bytes(&step.key);
                if !write_scalar(bb, *scalar, value) {
                    return Err(mismatch(scalar.to_string()));
                }
            }

            EncodeOp::RepeatedScalar { scalar } => {
                let Value::List(values) = value else {
                    return Err(mismatch(format!("a list of {}", scalar)));
                };
                for element in values {
                    bb.write_bytes(&step.key);
                    if !write_scalar(bb, *scalar, element) {
                        return Err(mismatch(scalar.to_string()));
                    }
                }
            }

            EncodeOp::Packed { scalar } => {
                let Value::List(values) = value else {
                    return Err(mismatch(format!("a list of {}", scalar)));
                };
                if values.is_empty() {
                    return Ok(());
                }
                let mut packed = ByteBufferMut::new();
                for element in values {
                    if !write_scalar(&mut packed, *scalar, element) {
                        return Err(mismatch(scalar.to_string()));
                    }
                }
                bb.write_bytes(&step.key);
                bb.write_length_delimited(packed.as_slice());
            }

            EncodeOp::Message { type_name } => {
                let nested = self.encode_nested(type_name, value).ok_or_else(|| mismatch(type_name.clone()))??;
                bb.write_bytes(&step.key);
                bb.write_length_delimited(&nested);
            }

            EncodeOp::RepeatedMessage { type_name } => {
                let Value::List(values) = value else {
                    return Err(mismatch(format!("a list of {}", type_name)));
                };
                for element in values {
                    let nested = self.encode_nested(type_name, element).ok_or_else(|| mismatch(type_name.clone()))??;
                    bb.write_bytes(&step.key);
                    bb.write_length_delimited(&nested);
                }
            }

            EncodeOp::Map { entry } => {
                let Value::Map(entries) = value else {
                    return Err(mismatch("a map".to_owned()));
                };
                let entry_codec = self.codec(entry)?;
                for (key, value) in entries {
                    let mut nested = ByteBufferMut::new();
                    self.encode_fields(
                        entry_codec,
                        |tag| match tag {
                            1 => Some(key),
                            2 => Some(value),
                            _ => None,
                        },
                        &mut nested,
                    )?;
                    bb.write_bytes(&step.key);
                    bb.write_length_delimited(nested.as_slice());
                }
            }
        }
        Ok(())
    }

    /// Encodes an embedded message. Returns `None` when `value` is not a
    /// message of type `type_name`.
    fn encode_nested(&self, type_name: &str, value: &Value) -> Option<Result<Vec<u8>, CodecError>> {
        match value {
            Value::Message(message) if message.type_name == type_name => Some(self.encode(message)),
            _ => None,
        }
    }
}

/// Writes one scalar without a key. Returns `false`, having written
/// nothing, when `value` is not of the kind `scalar` expects.
pub(crate) fn write_scalar(bb: &mut ByteBufferMut, scalar: Scalar, value: &Value) -> bool {
    match (scalar, value) {
        (Scalar::Int32, Value::Int32(v)) | (Scalar::Enum, Value::Enum(v)) => bb.write_int32(*v),
        (Scalar::Int64, Value::Int64(v)) => bb.write_int64(*v),
        (Scalar::UInt32, Value::UInt32(v)) => bb.write_varint(u64::from(*v)),
        (Scalar::UInt64, Value::UInt64(v)) => bb.write_varint(*v),
        (Scalar::SInt32, Value::Int32(v)) => bb.write_zigzag32(*v),
        (Scalar::SInt64, Value::Int64(v)) => bb.write_zigzag64(*v),
        (Scalar::Fixed32, Value::UInt32(v)) => bb.write_fixed32(*v),
        (Scalar::Fixed64, Value::UInt64(v)) => bb.write_fixed64(*v),
        (Scalar::SFixed32, Value::Int32(v)) => bb.write_fixed32(*v as u32),
        (Scalar::SFixed64, Value::Int64(v)) => bb.write_fixed64(*v as u64),
        (Scalar::Bool, Value::Bool(v)) => bb.write_bool(*v),
        (Scalar::Float, Value::Float(v)) => bb.write_float(*v),
        (Scalar::Double, Value::Double(v)) => bb.write_double(*v),
        (Scalar::String, Value::String(v)) => bb.write_string(v),
        (Scalar::Bytes, Value::Bytes(v)) => bb.write_length_delimited(v),
        _ => return false,
    }
    true
}
