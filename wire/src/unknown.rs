use crate::bb::{ByteBuffer, ByteBufferMut};
use crate::error::WireError;
use crate::wire_type::WireType;

/// A field whose number the schema does not know. The raw bytes, tag key
/// included, are kept exactly as read so re-encoding reproduces them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField {
    pub tag:       u32,
    pub wire_type: WireType,
    raw:           Vec<u8>,
}

impl UnknownField {
    /// Reads the value that follows an already consumed tag key. `start` is
    /// the buffer index at which that key began.
    pub fn read(
        bb: &mut ByteBuffer,
        start: usize,
        tag: u32,
        wire_type: WireType,
        max_length: usize,
    ) -> Result<UnknownField, WireError> {
        bb.skip_value(wire_type, max_length)?;
        Ok(UnknownField {
            tag,
            wire_type,
            raw: bb.consumed_since(start).to_vec(),
        })
    }

    /// Tag key plus value bytes.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

/// Unknown fields of one message, in the order they were read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnknownFields {
    fields: Vec<UnknownField>,
}

impl UnknownFields {
    pub fn new() -> UnknownFields {
        UnknownFields { fields: vec![] }
    }

    pub fn push(&mut self, field: UnknownField) {
        self.fields.push(field);
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnknownField> {
        self.fields.iter()
    }

    /// Appends the fields of `other`, as happens when a message is merged.
    pub fn extend(&mut self, other: UnknownFields) {
        self.fields.extend(other.fields);
    }

    /// Writes every retained field back verbatim.
    pub fn write_to(&self, bb: &mut ByteBufferMut) {
        for field in &self.fields {
            bb.write_bytes(&field.raw);
        }
    }
}
