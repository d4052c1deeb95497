use serde::Serialize;
use std::fmt;
use std::ops::RangeInclusive;

/// Number of low bits of a tag key holding the wire type.
pub const TAG_TYPE_BITS: u32 = 3;
const TAG_TYPE_MASK: u64 = (1 << TAG_TYPE_BITS) - 1;

/// Smallest legal field number.
pub const MIN_TAG: u32 = 1;

/// Largest legal field number, `2^29 - 1`.
pub const MAX_TAG: u32 = (1 << 29) - 1;

/// Field numbers reserved for the protobuf implementation itself.
pub const IMPLEMENTATION_RESERVED_TAGS: RangeInclusive<u32> = 19_000..=19_999;

/// On-wire framing kinds. Groups (3 and 4) are deliberately absent: they
/// are rejected as unsupported when seen on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireType {
    Varint          = 0,
    Fixed64         = 1,
    LengthDelimited = 2,
    Fixed32         = 5,
}

impl WireType {
    /// Numeric identifier written into the low bits of the tag key.
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Maps a raw wire type id back to a [WireType]. Returns `None` for the
    /// group markers and the unassigned ids 6 and 7.
    pub const fn from_id(id: u8) -> Option<WireType> {
        match id {
            0 => Some(WireType::Varint),
            1 => Some(WireType::Fixed64),
            2 => Some(WireType::LengthDelimited),
            5 => Some(WireType::Fixed32),
            _ => None,
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            WireType::Varint => "VARINT",
            WireType::Fixed64 => "FIXED64",
            WireType::LengthDelimited => "LENGTH_DELIMITED",
            WireType::Fixed32 => "FIXED32",
        };
        f.write_str(name)
    }
}

/// Whether `tag` may be used as a field number.
pub fn is_valid_tag(tag: u32) -> bool {
    (MIN_TAG..=MAX_TAG).contains(&tag) && !IMPLEMENTATION_RESERVED_TAGS.contains(&tag)
}

/// A decoded tag key: field number plus wire type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TagKey {
    pub tag:       u32,
    pub wire_type: WireType,
}

impl TagKey {
    pub const fn new(tag: u32, wire_type: WireType) -> TagKey {
        TagKey { tag, wire_type }
    }

    /// `(tag << 3) | wire_type`, the value written as the field header.
    pub const fn value(self) -> u32 {
        (self.tag << TAG_TYPE_BITS) | self.wire_type as u32
    }

    /// Splits a raw key into its parts. The raw wire type id is returned on
    /// its own so callers can report unsupported ones with context.
    pub fn split(key: u64) -> (u64, u8) {
        (key >> TAG_TYPE_BITS, (key & TAG_TYPE_MASK) as u8)
    }
}
