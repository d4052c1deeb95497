//! Helper routines for reading and writing the Protocol Buffers binary wire
//! format. The compiler's codec interpreter and the Rust source it emits
//! are both built on these primitives.
//!
//! ```
//! use brine_proto_wire::*;
//!
//! let mut out = ByteBufferMut::new();
//! out.write_tag(1, WireType::Varint);
//! out.write_zigzag64(-2);
//! let bytes = out.data();
//! assert_eq!(bytes, [0x08, 0x03]);
//!
//! let mut bb = ByteBuffer::new(&bytes);
//! assert_eq!(bb.read_tag_key(), Ok(TagKey::new(1, WireType::Varint)));
//! assert_eq!(bb.read_zigzag64(), Ok(-2));
//! ```

pub mod bb;
pub mod error;
pub mod unknown;
pub mod varint;
pub mod wire_type;

pub use bb::*;
pub use error::WireError;
pub use unknown::{UnknownField, UnknownFields};
pub use varint::{decode_varint, encode_varint, zigzag_decode, zigzag_encode};
pub use wire_type::*;
