//! Wire codecs derived from message schemas.
//!
//! [generate] turns one [MessageSchema] into a [MessageCodec]: an encode
//! procedure (field writes in declared order) and a decode procedure (a
//! dispatch table keyed by tag). A [CodecSet] holds the codecs of every
//! message a schema declares, map entries included, and interprets them
//! against [MessageValue](crate::value::MessageValue)s.

mod decode;
mod encode;
pub mod plan;

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

pub use plan::{
    generate, generate_in, DecodeArm, DecodeOp, DecodeProcedure, EncodeOp, EncodeProcedure, EncodeStep, MessageCodec,
    Presence, Scalar,
};

use crate::config::{CodecConfig, DecodeLimits};
use crate::error::CodecError;
use crate::registry::TypeRegistry;
use crate::type_system::map_entries;
use crate::types::{MessageSchema, SchemaSet};

#[derive(Debug, Clone, Default, Serialize)]
pub struct CodecSet {
    codecs: BTreeMap<String, MessageCodec>,
    #[serde(skip)]
    limits: DecodeLimits,
}

impl CodecSet {
    pub fn new() -> CodecSet {
        CodecSet::default()
    }

    /// Codecs for every message of `set` and the entries of its map fields.
    pub fn generate(set: &SchemaSet) -> CodecSet {
        let registry = TypeRegistry::from_set(set);
        let mut codecs = CodecSet::new();
        for message in registry.messages() {
            codecs.add_message(message, &registry);
        }
        debug!(count = codecs.codecs.len(), "generated message codecs");
        codecs
    }

    /// Codecs for `schema`, the messages nested in it and their map entries.
    pub fn for_message(schema: &MessageSchema) -> CodecSet {
        let registry = TypeRegistry::from_message(schema);
        let mut codecs = CodecSet::new();
        for message in registry.messages() {
            codecs.add_message(message, &registry);
        }
        codecs
    }

    fn add_message(&mut self, message: &MessageSchema, registry: &TypeRegistry) {
        self.insert(generate_in(message, registry));
        for entry in map_entries(message) {
            self.add_message(&entry, registry);
        }
    }

    pub fn insert(&mut self, codec: MessageCodec) {
        self.codecs.insert(codec.message.clone(), codec);
    }

    pub fn with_limits(mut self, limits: DecodeLimits) -> CodecSet {
        self.limits = limits;
        self
    }

    pub fn with_config(self, config: &CodecConfig) -> CodecSet {
        self.with_limits(config.limits)
    }

    pub fn limits(&self) -> DecodeLimits {
        self.limits
    }

    pub fn get(&self, message: &str) -> Option<&MessageCodec> {
        self.codecs.get(message)
    }

    /// Codecs in message name order.
    pub fn iter(&self) -> impl Iterator<Item = &MessageCodec> {
        self.codecs.values()
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    fn codec(&self, message: &str) -> Result<&MessageCodec, CodecError> {
        self.get(message).ok_or_else(|| CodecError::UnknownMessage(message.to_owned()))
    }
}
