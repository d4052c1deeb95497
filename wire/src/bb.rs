use crate::error::WireError;
use crate::varint::{decode_varint_at, zigzag_decode, zigzag_decode32, zigzag_encode, zigzag_encode32};
use crate::wire_type::{TagKey, WireType, MAX_TAG};

/// A protobuf byte buffer meant for reading.
///
/// Every failure reports the absolute offset of the read that failed, so a
/// buffer created for an embedded message with [ByteBuffer::sub_buffer]
/// still reports positions relative to the outermost input.
///
/// Example usage:
///
/// ```
/// let mut bb = brine_proto_wire::ByteBuffer::new(&[0x08, 0x96, 0x01]);
/// let key = bb.read_tag_key().unwrap();
/// assert_eq!(key.tag, 1);
/// assert_eq!(bb.read_varint(), Ok(150));
/// assert!(bb.is_empty());
/// ```
///
pub struct ByteBuffer<'a> {
    data:  &'a [u8],
    index: usize,
    base:  usize,
}

impl<'a> ByteBuffer<'a> {
    /// Create a new ByteBuffer that wraps the provided byte slice. The lifetime
    /// of the returned ByteBuffer must not outlive the lifetime of the byte
    /// slice.
    pub fn new(data: &'a [u8]) -> ByteBuffer<'a> {
        ByteBuffer { data, index: 0, base: 0 }
    }

    /// Like [ByteBuffer::new], for a slice that starts `base` bytes into the
    /// enclosing input.
    pub fn with_base(data: &'a [u8], base: usize) -> ByteBuffer<'a> {
        ByteBuffer { data, index: 0, base }
    }

    /// Retrieves the underlying byte slice.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Retrieves the current index into the underlying byte slice. This starts
    /// off as 0 and ends up as `self.data().len()` when everything has been
    /// read.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Absolute offset of the next read within the outermost input.
    pub fn offset(&self) -> usize {
        self.base + self.index
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.index
    }

    pub fn is_empty(&self) -> bool {
        self.index >= self.data.len()
    }

    /// Bytes consumed since `start`, an earlier value of [ByteBuffer::index].
    pub fn consumed_since(&self, start: usize) -> &'a [u8] {
        &self.data[start..self.index]
    }

    /// Try to read a byte starting at the current index.
    pub fn read_byte(&mut self) -> Result<u8, WireError> {
        let bytes = self.read_bytes(1)?;
        Ok(bytes[0])
    }

    /// Try to read `len` raw bytes starting at the current index.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        if len > self.remaining() {
            return Err(WireError::Truncated {
                offset:    self.offset(),
                needed:    len,
                remaining: self.remaining(),
            });
        }

        let value = &self.data[self.index..self.index + len];
        self.index += len;
        Ok(value)
    }

    /// Try to read a varint of up to ten bytes.
    pub fn read_varint(&mut self) -> Result<u64, WireError> {
        let (value, len) = decode_varint_at(&self.data[self.index..], self.offset())?;
        self.index += len;
        Ok(value)
    }

    /// Reads a varint and keeps its low 32 bits, as `int32`, `uint32` and
    /// enum fields require.
    pub fn read_varint32(&mut self) -> Result<u32, WireError> {
        Ok(self.read_varint()? as u32)
    }

    /// Reads a zigzag-encoded `sint64`.
    pub fn read_zigzag64(&mut self) -> Result<i64, WireError> {
        Ok(zigzag_decode(self.read_varint()?))
    }

    /// Reads a zigzag-encoded `sint32`.
    pub fn read_zigzag32(&mut self) -> Result<i32, WireError> {
        Ok(zigzag_decode32(self.read_varint32()?))
    }

    /// Any non-zero varint reads as `true`.
    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        Ok(self.read_varint()? != 0)
    }

    /// Four bytes, little-endian.
    pub fn read_fixed32(&mut self) -> Result<u32, WireError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Eight bytes, little-endian.
    pub fn read_fixed64(&mut self) -> Result<u64, WireError> {
        let bytes = self.read_bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    pub fn read_float(&mut self) -> Result<f32, WireError> {
        Ok(f32::from_bits(self.read_fixed32()?))
    }

    pub fn read_double(&mut self) -> Result<f64, WireError> {
        Ok(f64::from_bits(self.read_fixed64()?))
    }

    /// Reads a varint length followed by that many bytes. A length larger
    /// than `max_length` fails before any payload is touched.
    pub fn read_length_delimited(&mut self, max_length: usize) -> Result<&'a [u8], WireError> {
        let offset = self.offset();
        let len = self.read_varint()?;
        if len > max_length as u64 {
            return Err(WireError::LimitExceeded {
                offset,
                what:   "length prefix",
                limit:  max_length,
                actual: usize::try_from(len).unwrap_or(usize::MAX),
            });
        }
        self.read_bytes(len as usize)
    }

    /// Reads a length-delimited payload as a buffer of its own that keeps
    /// reporting absolute offsets.
    pub fn sub_buffer(&mut self, max_length: usize) -> Result<ByteBuffer<'a>, WireError> {
        let payload = self.read_length_delimited(max_length)?;
        Ok(ByteBuffer::with_base(payload, self.offset() - payload.len()))
    }

    /// Reads a length-delimited UTF-8 string. The result aliases the
    /// underlying memory.
    pub fn read_string(&mut self, max_length: usize) -> Result<&'a str, WireError> {
        let payload = self.read_length_delimited(max_length)?;
        let offset = self.offset() - payload.len();
        std::str::from_utf8(payload).map_err(|_| WireError::InvalidUtf8 { offset })
    }

    /// Reads a field header. Field number 0, numbers beyond `2^29 - 1` and
    /// the group wire types are rejected.
    pub fn read_tag_key(&mut self) -> Result<TagKey, WireError> {
        let offset = self.offset();
        let key = self.read_varint()?;
        let (tag, wire_id) = TagKey::split(key);

        if tag == 0 || tag > u64::from(MAX_TAG) {
            return Err(WireError::InvalidTag { offset, key });
        }

        match WireType::from_id(wire_id) {
            Some(wire_type) => Ok(TagKey::new(tag as u32, wire_type)),
            None => Err(WireError::UnsupportedWireType { offset, wire_type: wire_id }),
        }
    }

    /// Skips over one value of the given wire type and returns the skipped
    /// bytes (without the tag key).
    pub fn skip_value(&mut self, wire_type: WireType, max_length: usize) -> Result<&'a [u8], WireError> {
        let start = self.index;
        match wire_type {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::Fixed64 => {
                self.read_bytes(8)?;
            }
            WireType::LengthDelimited => {
                self.read_length_delimited(max_length)?;
            }
            WireType::Fixed32 => {
                self.read_bytes(4)?;
            }
        }
        Ok(self.consumed_since(start))
    }
}

#[test]
fn read_byte() {
    let read = |bytes| ByteBuffer::new(bytes).read_byte();
    assert_eq!(
        read(&[]),
        Err(WireError::Truncated { offset: 0, needed: 1, remaining: 0 })
    );
    assert_eq!(read(&[0]), Ok(0));
    assert_eq!(read(&[255]), Ok(255));
}

#[test]
fn read_bytes() {
    let read = |bytes, len| ByteBuffer::new(bytes).read_bytes(len);
    assert_eq!(read(&[], 0), Ok(vec![].as_slice()));
    assert!(read(&[], 1).is_err());
    assert_eq!(read(&[0], 1), Ok(vec![0].as_slice()));
    assert!(read(&[0], 2).is_err());

    let mut bb = ByteBuffer::new(&[1, 2, 3, 4, 5]);
    assert_eq!(bb.read_bytes(3), Ok(vec![1, 2, 3].as_slice()));
    assert_eq!(bb.read_bytes(2), Ok(vec![4, 5].as_slice()));
    assert_eq!(
        bb.read_bytes(1),
        Err(WireError::Truncated { offset: 5, needed: 1, remaining: 0 })
    );
}

#[test]
fn read_varint() {
    let read = |bytes| ByteBuffer::new(bytes).read_varint();
    assert_eq!(read(&[0]), Ok(0));
    assert_eq!(read(&[127]), Ok(127));
    assert_eq!(read(&[128, 1]), Ok(128));
    assert_eq!(read(&[128]), Err(WireError::MalformedVarint { offset: 0 }));

    let mut bb = ByteBuffer::with_base(&[0x96, 0x01, 0x80], 40);
    assert_eq!(bb.read_varint(), Ok(150));
    assert_eq!(bb.read_varint(), Err(WireError::MalformedVarint { offset: 42 }));
}

#[test]
fn read_varint32_truncates() {
    let mut bb = ByteBuffer::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
    assert_eq!(bb.read_varint32().map(|v| v as i32), Ok(-1));
}

#[test]
fn read_zigzag() {
    let read = |bytes| ByteBuffer::new(bytes).read_zigzag64();
    assert_eq!(read(&[0]), Ok(0));
    assert_eq!(read(&[1]), Ok(-1));
    assert_eq!(read(&[2]), Ok(1));
    assert_eq!(read(&[3]), Ok(-2));
    assert_eq!(ByteBuffer::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]).read_zigzag32(), Ok(i32::MIN));
}

#[test]
fn read_bool() {
    let read = |bytes| ByteBuffer::new(bytes).read_bool();
    assert_eq!(read(&[0]), Ok(false));
    assert_eq!(read(&[1]), Ok(true));
    assert_eq!(read(&[2]), Ok(true));
    assert!(read(&[]).is_err());
}

#[test]
fn read_fixed() {
    assert_eq!(ByteBuffer::new(&[1, 0, 0, 0]).read_fixed32(), Ok(1));
    assert_eq!(ByteBuffer::new(&[0x78, 0x56, 0x34, 0x12]).read_fixed32(), Ok(0x1234_5678));
    assert_eq!(ByteBuffer::new(&[1, 0, 0, 0, 0, 0, 0, 0x80]).read_fixed64(), Ok(0x8000_0000_0000_0001));
    assert_eq!(ByteBuffer::new(&[0, 0, 0x80, 0x3F]).read_float(), Ok(1.0));
    assert_eq!(ByteBuffer::new(&[0, 0, 0, 0, 0, 0, 0xF0, 0xBF]).read_double(), Ok(-1.0));
    assert_eq!(
        ByteBuffer::new(&[1, 2, 3]).read_fixed32(),
        Err(WireError::Truncated { offset: 0, needed: 4, remaining: 3 })
    );
}

#[test]
fn read_length_delimited() {
    let mut bb = ByteBuffer::new(&[3, b'a', b'b', b'c', 2, b'x']);
    assert_eq!(bb.read_length_delimited(usize::MAX), Ok(b"abc".as_slice()));
    assert_eq!(
        bb.read_length_delimited(usize::MAX),
        Err(WireError::Truncated { offset: 5, needed: 2, remaining: 1 })
    );

    let mut bb = ByteBuffer::new(&[5, 0, 0, 0, 0, 0]);
    assert_eq!(
        bb.read_length_delimited(4),
        Err(WireError::LimitExceeded { offset: 0, what: "length prefix", limit: 4, actual: 5 })
    );
}

#[test]
fn read_string() {
    let read = |bytes| ByteBuffer::new(bytes).read_string(usize::MAX);
    assert_eq!(read(&[0]), Ok(""));
    assert_eq!(read(&[3, 97, 98, 99]), Ok("abc"));
    assert_eq!(read(&[4, 240, 159, 141, 149]), Ok("🍕"));
    assert_eq!(read(&[2, 0xC3, 0x28]), Err(WireError::InvalidUtf8 { offset: 1 }));
}

#[test]
fn read_tag_key() {
    let read = |bytes| ByteBuffer::new(bytes).read_tag_key();
    assert_eq!(read(&[0x08]), Ok(TagKey::new(1, WireType::Varint)));
    assert_eq!(read(&[0x12]), Ok(TagKey::new(2, WireType::LengthDelimited)));
    assert_eq!(read(&[0x00]), Err(WireError::InvalidTag { offset: 0, key: 0 }));
    assert_eq!(read(&[0x0B]), Err(WireError::UnsupportedWireType { offset: 0, wire_type: 3 }));
    assert_eq!(read(&[0x0F]), Err(WireError::UnsupportedWireType { offset: 0, wire_type: 7 }));
    assert_eq!(
        read(&[0xF8, 0xFF, 0xFF, 0xFF, 0x1F]),
        Err(WireError::InvalidTag { offset: 0, key: 0x1_FFFF_FFF8 })
    );
}

#[test]
fn sub_buffer_keeps_absolute_offsets() {
    let mut bb = ByteBuffer::new(&[0x0A, 0x02, 0x80, 0x80]);
    bb.read_tag_key().unwrap();
    let mut inner = bb.sub_buffer(usize::MAX).unwrap();
    assert_eq!(inner.offset(), 2);
    assert_eq!(inner.read_varint(), Err(WireError::MalformedVarint { offset: 2 }));
    assert!(bb.is_empty());
}

#[test]
fn skip_value() {
    let mut bb = ByteBuffer::new(&[0x96, 0x01, 1, 2, 3, 4, 2, 9, 9, 1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(bb.skip_value(WireType::Varint, usize::MAX), Ok([0x96, 0x01].as_slice()));
    assert_eq!(bb.skip_value(WireType::Fixed32, usize::MAX), Ok([1, 2, 3, 4].as_slice()));
    assert_eq!(bb.skip_value(WireType::LengthDelimited, usize::MAX), Ok([2, 9, 9].as_slice()));
    assert_eq!(bb.skip_value(WireType::Fixed64, usize::MAX), Ok([1, 2, 3, 4, 5, 6, 7, 8].as_slice()));
    assert!(bb.is_empty());
}

/// A protobuf byte buffer meant for writing.
///
/// Example usage:
///
/// ```
/// use brine_proto_wire::WireType;
///
/// let mut bb = brine_proto_wire::ByteBufferMut::new();
/// bb.write_tag(1, WireType::Varint);
/// bb.write_varint(150);
/// assert_eq!(bb.data(), [0x08, 0x96, 0x01]);
/// ```
///
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ByteBufferMut {
    data: Vec<u8>,
}

impl ByteBufferMut {
    /// Creates an empty ByteBufferMut ready for writing.
    pub fn new() -> ByteBufferMut {
        ByteBufferMut { data: vec![] }
    }

    /// Consumes this buffer and returns the underlying backing store. Use this
    /// to get the data out when you're done writing to the buffer.
    pub fn data(self) -> Vec<u8> {
        self.data
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write a byte to the end of the buffer.
    pub fn write_byte(&mut self, value: u8) {
        self.data.push(value);
    }

    /// Write a raw byte slice to the end of the buffer.
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.data.extend_from_slice(value);
    }

    pub fn write_varint(&mut self, value: u64) {
        crate::varint::write_varint(&mut self.data, value);
    }

    /// `int32` and enum values are sign-extended to 64 bits, so negative
    /// values always take ten bytes.
    pub fn write_int32(&mut self, value: i32) {
        self.write_varint(i64::from(value) as u64);
    }

    pub fn write_int64(&mut self, value: i64) {
        self.write_varint(value as u64);
    }

    pub fn write_zigzag32(&mut self, value: i32) {
        self.write_varint(u64::from(zigzag_encode32(value)));
    }

    pub fn write_zigzag64(&mut self, value: i64) {
        self.write_varint(zigzag_encode(value));
    }

    pub fn write_bool(&mut self, value: bool) {
        self.data.push(u8::from(value));
    }

    pub fn write_fixed32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, value: u64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_float(&mut self, value: f32) {
        self.write_fixed32(value.to_bits());
    }

    pub fn write_double(&mut self, value: f64) {
        self.write_fixed64(value.to_bits());
    }

    /// Writes the varint tag key for `tag` and `wire_type`.
    pub fn write_tag(&mut self, tag: u32, wire_type: WireType) {
        self.write_varint(u64::from(TagKey::new(tag, wire_type).value()));
    }

    /// Writes a varint length prefix followed by `value`.
    pub fn write_length_delimited(&mut self, value: &[u8]) {
        self.write_varint(value.len() as u64);
        self.write_bytes(value);
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_length_delimited(value.as_bytes());
    }
}

#[cfg(test)]
fn write_once(cb: fn(&mut ByteBufferMut)) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();
    cb(&mut bb);
    bb.data()
}

#[test]
fn write_varint() {
    assert_eq!(write_once(|bb| bb.write_varint(0)), [0]);
    assert_eq!(write_once(|bb| bb.write_varint(1)), [1]);
    assert_eq!(write_once(|bb| bb.write_varint(127)), [127]);
    assert_eq!(write_once(|bb| bb.write_varint(128)), [128, 1]);
    assert_eq!(write_once(|bb| bb.write_varint(150)), [0x96, 0x01]);
    assert_eq!(write_once(|bb| bb.write_varint(4294967295)), [255, 255, 255, 255, 15]);
    assert_eq!(write_once(|bb| bb.write_varint(u64::MAX)).len(), 10);
}

#[test]
fn write_int32() {
    assert_eq!(write_once(|bb| bb.write_int32(0)), [0]);
    assert_eq!(write_once(|bb| bb.write_int32(1)), [1]);
    assert_eq!(
        write_once(|bb| bb.write_int32(-1)),
        [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]
    );
    assert_eq!(write_once(|bb| bb.write_int32(i32::MIN)).len(), 10);
    assert_eq!(write_once(|bb| bb.write_int64(-1)).len(), 10);
}

#[test]
fn write_zigzag() {
    assert_eq!(write_once(|bb| bb.write_zigzag32(0)), [0]);
    assert_eq!(write_once(|bb| bb.write_zigzag32(-1)), [1]);
    assert_eq!(write_once(|bb| bb.write_zigzag32(1)), [2]);
    assert_eq!(write_once(|bb| bb.write_zigzag32(-64)), [127]);
    assert_eq!(write_once(|bb| bb.write_zigzag32(64)), [128, 1]);
    assert_eq!(write_once(|bb| bb.write_zigzag32(i32::MIN)), [255, 255, 255, 255, 15]);
    assert_eq!(write_once(|bb| bb.write_zigzag64(-2)), [3]);
    assert_eq!(write_once(|bb| bb.write_zigzag64(i64::MIN)).len(), 10);
}

#[test]
fn write_fixed() {
    assert_eq!(write_once(|bb| bb.write_fixed32(1)), [1, 0, 0, 0]);
    assert_eq!(write_once(|bb| bb.write_fixed64(0x8000_0000_0000_0001)), [1, 0, 0, 0, 0, 0, 0, 0x80]);
    assert_eq!(write_once(|bb| bb.write_float(1.0)), [0, 0, 0x80, 0x3F]);
    assert_eq!(write_once(|bb| bb.write_double(-1.0)), [0, 0, 0, 0, 0, 0, 0xF0, 0xBF]);
}

#[test]
fn write_tag_and_length_delimited() {
    assert_eq!(write_once(|bb| bb.write_tag(1, WireType::Varint)), [0x08]);
    assert_eq!(write_once(|bb| bb.write_tag(16, WireType::LengthDelimited)), [0x82, 0x01]);
    assert_eq!(write_once(|bb| bb.write_string("abc")), [3, 97, 98, 99]);
    assert_eq!(write_once(|bb| bb.write_string("")), [0]);
    assert_eq!(write_once(|bb| bb.write_length_delimited(&[0xFF; 2])), [2, 0xFF, 0xFF]);
}

#[test]
fn write_sequence() {
    let mut bb = ByteBufferMut::new();
    bb.write_tag(1, WireType::Varint);
    bb.write_varint(150);
    bb.write_tag(2, WireType::LengthDelimited);
    bb.write_string("testing");
    assert_eq!(
        bb.data(),
        [0x08, 0x96, 0x01, 0x12, 0x07, 0x74, 0x65, 0x73, 0x74, 0x69, 0x6e, 0x67]
    );
}
