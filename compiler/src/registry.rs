use std::collections::BTreeMap;

use crate::types::{EnumSchema, MessageSchema, SchemaSet};

/// Index of every message and enum reachable from a set of roots, keyed by
/// fully-qualified name. Borrows the schemas it indexes; the first
/// declaration of a name wins.
#[derive(Debug, Default)]
pub struct TypeRegistry<'a> {
    messages: BTreeMap<&'a str, &'a MessageSchema>,
    enums:    BTreeMap<&'a str, &'a EnumSchema>,
}

impl<'a> TypeRegistry<'a> {
    pub fn from_set(set: &'a SchemaSet) -> TypeRegistry<'a> {
        let mut registry = TypeRegistry::default();
        for message in &set.messages {
            registry.add_message(message);
        }
        for enumeration in &set.enums {
            registry.add_enum(enumeration);
        }
        registry
    }

    /// A registry holding `message` and the types nested inside it.
    pub fn from_message(message: &'a MessageSchema) -> TypeRegistry<'a> {
        let mut registry = TypeRegistry::default();
        registry.add_message(message);
        registry
    }

    fn add_message(&mut self, message: &'a MessageSchema) {
        self.messages.entry(&message.name).or_insert(message);
        for nested in &message.nested_messages {
            self.add_message(nested);
        }
        for enumeration in &message.nested_enums {
            self.add_enum(enumeration);
        }
    }

    fn add_enum(&mut self, enumeration: &'a EnumSchema) {
        self.enums.entry(&enumeration.name).or_insert(enumeration);
    }

    pub fn message(&self, name: &str) -> Option<&'a MessageSchema> {
        self.messages.get(name).copied()
    }

    pub fn enumeration(&self, name: &str) -> Option<&'a EnumSchema> {
        self.enums.get(name).copied()
    }

    /// Messages in name order.
    pub fn messages(&self) -> impl Iterator<Item = &'a MessageSchema> + '_ {
        self.messages.values().copied()
    }

    /// Enums in name order.
    pub fn enums(&self) -> impl Iterator<Item = &'a EnumSchema> + '_ {
        self.enums.values().copied()
    }
}
