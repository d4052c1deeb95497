use brine_proto_wire::WireType;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;

use crate::types::{FieldDescriptor, FieldType, MessageSchema};
use crate::utils::{join_name, quote, to_pascal_case};

lazy_static! {
    static ref MAP_TOKEN: Regex =
        Regex::new(r"^map\s*<\s*([A-Za-z_][A-Za-z0-9_]*)\s*,\s*(\.?[A-Za-z_][A-Za-z0-9_.]*)\s*>$").unwrap();
    static ref TYPE_REFERENCE: Regex =
        Regex::new(r"^\.?[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();
}

/// Tokens of the built-in scalar types.
pub const SCALAR_TOKENS: [&str; 15] = [
    "int32", "int64", "uint32", "uint64", "sint32", "sint64", "fixed32", "fixed64", "sfixed32",
    "sfixed64", "bool", "float", "double", "string", "bytes",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("unsupported type {}", quote(.0))]
    Unsupported(String),
}

/// What a fully-qualified type name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Message,
    Enum,
}

/// Maps a scalar type token to its [FieldType].
pub fn scalar_type(token: &str) -> Option<FieldType> {
    let field_type = match token {
        "int32" => FieldType::Int32,
        "int64" => FieldType::Int64,
        "uint32" => FieldType::UInt32,
        "uint64" => FieldType::UInt64,
        "sint32" => FieldType::SInt32,
        "sint64" => FieldType::SInt64,
        "fixed32" => FieldType::Fixed32,
        "fixed64" => FieldType::Fixed64,
        "sfixed32" => FieldType::SFixed32,
        "sfixed64" => FieldType::SFixed64,
        "bool" => FieldType::Bool,
        "float" => FieldType::Float,
        "double" => FieldType::Double,
        "string" => FieldType::String,
        "bytes" => FieldType::Bytes,
        _ => return None,
    };
    Some(field_type)
}

/// Resolves a declared type token seen inside `scope` (the full name of the
/// enclosing message, or the package for top-level declarations).
///
/// Scalars and `map<K, V>` are recognized directly. Other tokens are looked
/// up in `known` the way protobuf scoping works: first relative to `scope`,
/// then to each enclosing scope, then at the root. A leading dot makes the
/// name absolute.
pub fn resolve_type(token: &str, scope: &str, known: &HashMap<String, TypeKind>) -> Result<FieldType, TypeError> {
    let token = token.trim();
    if let Some(field_type) = scalar_type(token) {
        return Ok(field_type);
    }

    if let Some(captures) = MAP_TOKEN.captures(token) {
        let key = resolve_type(&captures[1], scope, known)?;
        let value = resolve_type(&captures[2], scope, known)?;
        return Ok(FieldType::Map(Box::new(key), Box::new(value)));
    }

    if !TYPE_REFERENCE.is_match(token) {
        return Err(TypeError::Unsupported(token.to_owned()));
    }

    let full_name = match token.strip_prefix('.') {
        Some(absolute) => known.contains_key(absolute).then(|| absolute.to_owned()),
        None => lookup_in_scope(token, scope, known),
    };

    match full_name.as_ref().and_then(|name| known.get(name).map(|kind| (name, kind))) {
        Some((name, TypeKind::Message)) => Ok(FieldType::Message(name.clone())),
        Some((name, TypeKind::Enum)) => Ok(FieldType::Enum(name.clone())),
        None => Err(TypeError::Unsupported(token.to_owned())),
    }
}

fn lookup_in_scope(token: &str, scope: &str, known: &HashMap<String, TypeKind>) -> Option<String> {
    let mut scope = scope;
    loop {
        let candidate = join_name(scope, token);
        if known.contains_key(&candidate) {
            return Some(candidate);
        }
        if scope.is_empty() {
            return None;
        }
        scope = match scope.rfind('.') {
            Some(index) => &scope[..index],
            None => "",
        };
    }
}

impl FieldType {
    /// Wire type a single value of this type is written with. Messages,
    /// maps and text are length-delimited; enums travel as varints.
    pub fn wire_type(&self) -> WireType {
        match self {
            FieldType::Int32
            | FieldType::Int64
            | FieldType::UInt32
            | FieldType::UInt64
            | FieldType::SInt32
            | FieldType::SInt64
            | FieldType::Bool
            | FieldType::Enum(_) => WireType::Varint,
            FieldType::Fixed64 | FieldType::SFixed64 | FieldType::Double => WireType::Fixed64,
            FieldType::Fixed32 | FieldType::SFixed32 | FieldType::Float => WireType::Fixed32,
            FieldType::String | FieldType::Bytes | FieldType::Message(_) | FieldType::Map(..) => {
                WireType::LengthDelimited
            }
        }
    }

    /// Numeric scalars, bools and enums may share a packed record.
    pub fn is_packable(&self) -> bool {
        self.wire_type() != WireType::LengthDelimited
    }

    /// Integral and string scalars may key a map; floating point, bytes,
    /// enums and messages may not.
    pub fn is_valid_map_key(&self) -> bool {
        !matches!(
            self,
            FieldType::Float
                | FieldType::Double
                | FieldType::Bytes
                | FieldType::Enum(_)
                | FieldType::Message(_)
                | FieldType::Map(..)
        )
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, FieldType::Enum(_) | FieldType::Message(_) | FieldType::Map(..))
    }
}

/// Name of the synthetic entry message behind a map field: `tags` becomes
/// `TagsEntry`.
pub fn map_entry_name(field_name: &str) -> String {
    format!("{}Entry", to_pascal_case(field_name))
}

/// Expands a map field into the nested message it is encoded as: key at
/// tag 1, value at tag 2, each written as a singular field.
pub fn map_entry(message: &MessageSchema, field: &FieldDescriptor) -> Option<MessageSchema> {
    let FieldType::Map(key, value) = &field.field_type else {
        return None;
    };
    Some(
        MessageSchema::new(&join_name(&message.name, &map_entry_name(&field.name)))
            .field(FieldDescriptor::new("key", 1, (**key).clone()))
            .field(FieldDescriptor::new("value", 2, (**value).clone())),
    )
}

/// All map entry messages implied by the fields of `message`.
pub fn map_entries(message: &MessageSchema) -> Vec<MessageSchema> {
    message.fields.iter().filter_map(|field| map_entry(message, field)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> HashMap<String, TypeKind> {
        HashMap::from([
            ("acme.Person".to_owned(), TypeKind::Message),
            ("acme.Person.PhoneType".to_owned(), TypeKind::Enum),
            ("acme.Person.Address".to_owned(), TypeKind::Message),
            ("acme.Address".to_owned(), TypeKind::Message),
            ("acme.Corpus".to_owned(), TypeKind::Enum),
        ])
    }

    #[test]
    fn scalar_tokens_map_to_wire_types() {
        let expect = [
            ("int32", WireType::Varint),
            ("int64", WireType::Varint),
            ("uint32", WireType::Varint),
            ("uint64", WireType::Varint),
            ("sint32", WireType::Varint),
            ("sint64", WireType::Varint),
            ("bool", WireType::Varint),
            ("fixed32", WireType::Fixed32),
            ("sfixed32", WireType::Fixed32),
            ("float", WireType::Fixed32),
            ("fixed64", WireType::Fixed64),
            ("sfixed64", WireType::Fixed64),
            ("double", WireType::Fixed64),
            ("string", WireType::LengthDelimited),
            ("bytes", WireType::LengthDelimited),
        ];
        for (token, wire_type) in expect {
            let field_type = resolve_type(token, "", &HashMap::new()).unwrap();
            assert_eq!(field_type.to_string(), token);
            assert_eq!(field_type.wire_type(), wire_type, "{}", token);
        }
        assert_eq!(SCALAR_TOKENS.len(), expect.len());
    }

    #[test]
    fn references_resolve_through_scopes() {
        let known = known();
        assert_eq!(
            resolve_type("PhoneType", "acme.Person", &known),
            Ok(FieldType::Enum("acme.Person.PhoneType".into()))
        );
        // the innermost scope wins
        assert_eq!(
            resolve_type("Address", "acme.Person", &known),
            Ok(FieldType::Message("acme.Person.Address".into()))
        );
        assert_eq!(
            resolve_type(".acme.Address", "acme.Person", &known),
            Ok(FieldType::Message("acme.Address".into()))
        );
        assert_eq!(resolve_type("Corpus", "acme.Person", &known), Ok(FieldType::Enum("acme.Corpus".into())));
        assert_eq!(
            resolve_type("acme.Corpus", "", &known),
            Ok(FieldType::Enum("acme.Corpus".into()))
        );
        assert_eq!(resolve_type(".Corpus", "acme", &known), Err(TypeError::Unsupported(".Corpus".into())));
    }

    #[test]
    fn enum_fields_use_varint() {
        let field_type = resolve_type("Corpus", "acme", &known()).unwrap();
        assert_eq!(field_type.wire_type(), WireType::Varint);
        assert!(field_type.is_packable());
    }

    #[test]
    fn map_tokens() {
        let field_type = resolve_type("map<string, Address>", "acme.Person", &known()).unwrap();
        assert_eq!(
            field_type,
            FieldType::Map(Box::new(FieldType::String), Box::new(FieldType::Message("acme.Person.Address".into())))
        );
        assert_eq!(field_type.wire_type(), WireType::LengthDelimited);
        assert!(!field_type.is_packable());
    }

    #[test]
    fn unknown_tokens_are_unsupported() {
        let known = known();
        for token in ["int", "uint8", "Missing", "map<string>", "group", "a..b", "repeated int32"] {
            assert_eq!(resolve_type(token, "acme", &known), Err(TypeError::Unsupported(token.into())));
        }
        assert_eq!(
            TypeError::Unsupported("int".into()).to_string(),
            "unsupported type \"int\""
        );
    }

    #[test]
    fn map_keys() {
        assert!(FieldType::String.is_valid_map_key());
        assert!(FieldType::SFixed64.is_valid_map_key());
        assert!(FieldType::Bool.is_valid_map_key());
        assert!(!FieldType::Float.is_valid_map_key());
        assert!(!FieldType::Bytes.is_valid_map_key());
        assert!(!FieldType::Enum("E".into()).is_valid_map_key());
        assert!(!FieldType::Message("M".into()).is_valid_map_key());
    }

    #[test]
    fn map_entry_expansion() {
        let message = MessageSchema::new("acme.Person").field(FieldDescriptor::new(
            "phone_numbers",
            5,
            FieldType::Map(Box::new(FieldType::String), Box::new(FieldType::Int64)),
        ));
        let entries = map_entries(&message);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.name, "acme.Person.PhoneNumbersEntry");
        assert_eq!(entry.fields[0].tag, 1);
        assert_eq!(entry.fields[0].field_type, FieldType::String);
        assert_eq!(entry.fields[1].tag, 2);
        assert_eq!(entry.fields[1].field_type, FieldType::Int64);
    }
}
