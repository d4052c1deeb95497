use thiserror::Error;

/// Malformed wire data. Every variant carries the absolute byte offset at
/// which the failing read started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("malformed varint at offset {offset}")]
    MalformedVarint { offset: usize },

    #[error("truncated input at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        offset:    usize,
        needed:    usize,
        remaining: usize,
    },

    #[error("{what} of {actual} at offset {offset} exceeds the limit of {limit}")]
    LimitExceeded {
        offset: usize,
        what:   &'static str,
        limit:  usize,
        actual: usize,
    },

    #[error("invalid tag key {key} at offset {offset}")]
    InvalidTag { offset: usize, key: u64 },

    #[error("unsupported wire type {wire_type} at offset {offset}")]
    UnsupportedWireType { offset: usize, wire_type: u8 },

    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: usize },
}

impl WireError {
    /// Byte offset the error refers to.
    pub fn offset(&self) -> usize {
        match *self {
            WireError::MalformedVarint { offset }
            | WireError::Truncated { offset, .. }
            | WireError::LimitExceeded { offset, .. }
            | WireError::InvalidTag { offset, .. }
            | WireError::UnsupportedWireType { offset, .. }
            | WireError::InvalidUtf8 { offset } => offset,
        }
    }
}
