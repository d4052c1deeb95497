//! Base-128 varints and zigzag mapping.
//!
//! ```
//! use brine_proto_wire::varint::{decode_varint, encode_varint, zigzag_encode};
//!
//! assert_eq!(encode_varint(300), [0xAC, 0x02]);
//! assert_eq!(decode_varint(&[0xAC, 0x02]), Ok((300, 2)));
//! assert_eq!(zigzag_encode(-1), 1);
//! ```

use crate::error::WireError;

/// Longest legal varint: ten groups of seven bits cover 64 bits.
pub const MAX_VARINT_LEN: usize = 10;

/// Encodes `value` as a 1 to 10 byte varint.
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(varint_len(value));
    write_varint(&mut out, value);
    out
}

/// Appends the varint encoding of `value` to `out`.
pub fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;

        if value == 0 {
            out.push(byte);
            return;
        }

        out.push(byte | 0x80);
    }
}

/// Decodes a varint from the start of `data`, returning the value and the
/// number of bytes consumed.
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize), WireError> {
    decode_varint_at(data, 0)
}

/// Same as [decode_varint] but reports errors relative to `offset`, the
/// absolute position of `data[0]` in the enclosing input. The tenth byte
/// carries only bit 63, so anything above `0x01` there is malformed.
pub fn decode_varint_at(data: &[u8], offset: usize) -> Result<(u64, usize), WireError> {
    let mut result: u64 = 0;

    for (i, &byte) in data.iter().take(MAX_VARINT_LEN).enumerate() {
        if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
            break;
        }
        result |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    // Ten continuation bytes, an overflowing tenth byte, or the input ran out first.
    Err(WireError::MalformedVarint { offset })
}

/// Number of bytes [encode_varint] produces for `value`.
pub const fn varint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    (bits + 6) / 7
}

/// Maps a signed value onto an unsigned one so that small magnitudes stay
/// short: 0 → 0, -1 → 1, 1 → 2, -2 → 3, ...
pub const fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Inverse of [zigzag_encode].
pub const fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// 32-bit flavour used by `sint32`.
pub const fn zigzag_encode32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

/// Inverse of [zigzag_encode32].
pub const fn zigzag_decode32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}
