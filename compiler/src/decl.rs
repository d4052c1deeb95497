//! Declarative schema input, read from JSON.
//!
//! ```json
//! {
//!   "package": "acme",
//!   "messages": [{
//!     "name": "SearchRequest",
//!     "fields": [
//!       { "name": "query", "number": 1, "type": "string" },
//!       { "name": "page", "number": 2, "type": "int32", "label": "optional", "default": 1 },
//!       { "name": "ids", "number": 3, "type": "int64", "label": "packed" }
//!     ]
//!   }]
//! }
//! ```

use serde::Deserialize;

use crate::types::{Cardinality, DefaultValue};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileDeclaration {
    #[serde(default)]
    pub package:  Option<String>,
    #[serde(default)]
    pub messages: Vec<MessageDeclaration>,
    #[serde(default)]
    pub enums:    Vec<EnumDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageDeclaration {
    pub name:     String,
    #[serde(default)]
    pub fields:   Vec<FieldDeclaration>,
    #[serde(default)]
    pub messages: Vec<MessageDeclaration>,
    #[serde(default)]
    pub enums:    Vec<EnumDeclaration>,
    /// Oneof groups; fields join one by naming it.
    #[serde(default)]
    pub oneofs:   Vec<String>,
    #[serde(default)]
    pub reserved: ReservedDeclaration,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDeclaration {
    pub name:       String,
    pub number:     u32,
    /// A scalar token, `map<K, V>`, or the name of a message or enum.
    #[serde(rename = "type")]
    pub type_:      String,
    #[serde(default)]
    pub label:      Cardinality,
    #[serde(default)]
    pub oneof:      Option<String>,
    #[serde(default)]
    pub default:    Option<DefaultValue>,
    #[serde(default)]
    pub deprecated: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumDeclaration {
    pub name:        String,
    #[serde(default)]
    pub values:      Vec<EnumValueDeclaration>,
    #[serde(default = "allow_alias_default")]
    pub allow_alias: bool,
    #[serde(default)]
    pub reserved:    ReservedDeclaration,
}

fn allow_alias_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumValueDeclaration {
    pub name:   String,
    pub number: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReservedDeclaration {
    #[serde(default)]
    pub names:   Vec<String>,
    #[serde(default)]
    pub numbers: Vec<i64>,
    /// Inclusive `[start, end]` pairs.
    #[serde(default)]
    pub ranges:  Vec<(i64, i64)>,
}

impl FileDeclaration {
    pub fn from_json(text: &str) -> Result<FileDeclaration, serde_json::Error> {
        serde_json::from_str(text)
    }
}
