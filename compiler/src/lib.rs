//! brine-proto-compiler
//!
//! This crate implements:
//!  1) The type system (scalar tokens, wire types, `map<K, V>` expansion),
//!  2) The schema model and a JSON declaration intake (`decl`),
//!  3) A schema validator that reports every broken rule at once,
//!  4) Wire codec generation (`generate` → `MessageCodec`) and a `CodecSet`
//!     that encodes and decodes dynamic `MessageValue`s,
//!  5) Rust code generation (`compile_schema_to_rust` → `String`),
//!  6) Error types (`ProtoError`, `ValidationError`, `CodecError`).

pub mod codec;
pub mod compiler;
pub mod config;
pub mod decl;
pub mod error;
pub mod gen_rust;
pub mod registry;
pub mod traits;
pub mod type_system;
pub mod types;
pub mod utils;
pub mod value;
pub mod verifier;

pub use codec::{generate, CodecSet, MessageCodec};
pub use compiler::{build_schema, compile_schema, compile_schema_with};
pub use config::{CodecConfig, DecodeLimits};
pub use error::{CodecError, ProtoError, ValidationError, ValidationErrors};
pub use gen_rust::{compile_schema_to_rust, RustEmitter};
pub use traits::Emitter;
pub use type_system::resolve_type;
pub use types::{Cardinality, EnumSchema, FieldDescriptor, FieldType, MessageSchema, SchemaSet};
pub use value::{MessageValue, Value};
pub use verifier::{validate, validate_set};
