use brine_proto_wire::{WireError, WireType};
use std::fmt;
use thiserror::Error;

use crate::utils::quote;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("field {} of {}: unsupported type {}", quote(.field), quote(.scope), quote(.token))]
    UnsupportedType {
        scope: String,
        field: String,
        token: String,
    },

    #[error("schema is invalid:\n{0}")]
    Schema(#[from] ValidationErrors),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// One rule broken by a schema. Validation collects every one it finds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("field {} of {} uses tag {tag}, outside [1, 536870911]", quote(.field), quote(.message))]
    TagOutOfRange { message: String, field: String, tag: u32 },

    #[error(
        "field {} of {} uses tag {tag}, which lies in the implementation-reserved range [19000, 19999]",
        quote(.field),
        quote(.message)
    )]
    TagInReservedRange { message: String, field: String, tag: u32 },

    #[error("tag {tag} of {} is used by both {} and {}", quote(.message), quote(.first), quote(.second))]
    DuplicateTag {
        message: String,
        tag:     u32,
        first:   String,
        second:  String,
    },

    #[error("field name {} is used twice in {}", quote(.field), quote(.message))]
    DuplicateFieldName { message: String, field: String },

    #[error("field {} of {} uses reserved tag {tag}", quote(.field), quote(.message))]
    ReservedTag { message: String, field: String, tag: u32 },

    #[error("field name {} is reserved in {}", quote(.field), quote(.message))]
    ReservedName { message: String, field: String },

    #[error("{} is not a valid identifier in {}", quote(.name), quote(.scope))]
    InvalidName { scope: String, name: String },

    #[error("name {} is declared twice in {}", quote(.name), quote(.scope))]
    DuplicateNestedName { scope: String, name: String },

    #[error("field {} of {} cannot be packed: {field_type} is not a numeric scalar or enum", quote(.field), quote(.message))]
    PackedNotScalar {
        message:    String,
        field:      String,
        field_type: String,
    },

    #[error("map field {} of {} has key type {key_type}, which cannot key a map", quote(.field), quote(.message))]
    InvalidMapKey {
        message:  String,
        field:    String,
        key_type: String,
    },

    #[error("map field {} of {} has a map as its value type", quote(.field), quote(.message))]
    InvalidMapValue { message: String, field: String },

    #[error("map field {} of {} must be singular", quote(.field), quote(.message))]
    MapCardinality { message: String, field: String },

    #[error("oneof {} of {} has no members", quote(.group), quote(.message))]
    EmptyOneof { message: String, group: String },

    #[error("oneof {} of {} lists tag {tag}, which no field uses", quote(.group), quote(.message))]
    OneofUnknownMember { message: String, group: String, tag: u32 },

    #[error("field {} of {} disagrees with the oneof table about its group", quote(.field), quote(.message))]
    OneofConflict { message: String, field: String },

    #[error("field {} of {} is in a oneof but is not singular", quote(.field), quote(.message))]
    OneofMemberCardinality { message: String, field: String },

    #[error("field {} of {} refers to unknown type {}", quote(.field), quote(.message), quote(.type_name))]
    UnresolvedType {
        message:   String,
        field:     String,
        type_name: String,
    },

    #[error("field {} of {} has a default value but no explicit presence", quote(.field), quote(.message))]
    DefaultRequiresPresence { message: String, field: String },

    #[error("default value of field {} of {} does not fit type {field_type}", quote(.field), quote(.message))]
    DefaultTypeMismatch {
        message:    String,
        field:      String,
        field_type: String,
    },

    #[error("enum {} has no values", quote(.name))]
    EmptyEnum { name: String },

    #[error("first value {} of enum {} is {number}, not 0", quote(.value), quote(.name))]
    EnumFirstValueNotZero { name: String, value: String, number: i32 },

    #[error("enum {} gives number {number} to both {} and {} without allowing aliases", quote(.name), quote(.first), quote(.second))]
    DuplicateEnumNumber {
        name:   String,
        number: i32,
        first:  String,
        second: String,
    },

    #[error("enum {} declares value {} twice", quote(.name), quote(.value))]
    DuplicateEnumName { name: String, value: String },

    #[error("value {} of enum {} is reserved", quote(.value), quote(.name))]
    ReservedEnumValue { name: String, value: String },

    #[error("messages nest each other without end: {}", .path.join(" -> "))]
    UnresolvableCycle { path: Vec<String> },
}

impl ValidationError {
    /// Whether this is a cycle of mandatory embeddings rather than a
    /// problem with a single definition.
    pub fn is_cycle(&self) -> bool {
        matches!(self, ValidationError::UnresolvableCycle { .. })
    }
}

/// Every rule a schema breaks, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<ValidationError> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error(transparent)]
    Malformed(#[from] WireError),

    #[error(
        "at offset {offset}: field {} (tag {tag}) of {} expects wire type {expected}, found {actual}",
        quote(.field),
        quote(.message)
    )]
    WireTypeMismatch {
        offset:   usize,
        message:  String,
        field:    String,
        tag:      u32,
        expected: WireType,
        actual:   WireType,
    },

    #[error("no codec for message type {}", quote(.0))]
    UnknownMessage(String),

    #[error("{} has no field with tag {tag}", quote(.message))]
    UnknownField { message: String, tag: u32 },

    #[error("value of field {} of {} is not {expected}", quote(.field), quote(.message))]
    ValueMismatch {
        message:  String,
        field:    String,
        expected: String,
    },

    #[error("more than one member of oneof {} is set on {}", quote(.group), quote(.message))]
    OneofConflict { message: String, group: String },
}

impl CodecError {
    /// Input offset of a decoding failure, when there is one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            CodecError::Malformed(error) => Some(error.offset()),
            CodecError::WireTypeMismatch { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}
