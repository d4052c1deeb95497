use std::collections::HashMap;
use tracing::debug;

use crate::{
    codec::CodecSet,
    config::CodecConfig,
    decl::{EnumDeclaration, FieldDeclaration, FileDeclaration, MessageDeclaration, ReservedDeclaration},
    error::ProtoError,
    type_system::{resolve_type, TypeError, TypeKind},
    types::{EnumSchema, FieldDescriptor, MessageSchema, Reserved, SchemaSet},
    utils::join_name,
    verifier::validate_set,
};

/// Compile a JSON schema declaration into `(SchemaSet, CodecSet)`.
/// Returns `Err(ProtoError)` if reading, type resolution or validation fails.
pub fn compile_schema(text: &str) -> Result<(SchemaSet, CodecSet), ProtoError> {
    compile_schema_with(text, &CodecConfig::default())
}

/// Like [compile_schema], with the decode limits of `config` applied to the
/// generated codecs.
pub fn compile_schema_with(text: &str, config: &CodecConfig) -> Result<(SchemaSet, CodecSet), ProtoError> {
    let file = FileDeclaration::from_json(text)?;
    let schema = build_schema(&file)?;
    validate_set(&schema)?;
    let codecs = CodecSet::generate(&schema).with_config(config);
    Ok((schema, codecs))
}

/// Resolve declarations into the schema model. Type tokens are looked up
/// from the scope of the message declaring the field outward.
///
/// Only type resolution can fail here; every other rule is left to the
/// validator so that all violations are reported together.
pub fn build_schema(file: &FileDeclaration) -> Result<SchemaSet, ProtoError> {
    let package = file.package.clone().unwrap_or_default();

    // First pass: every declared type name
    let mut known = HashMap::new();
    for message in &file.messages {
        collect_message(&package, message, &mut known);
    }
    for enumeration in &file.enums {
        known.insert(join_name(&package, &enumeration.name), TypeKind::Enum);
    }

    // Second pass: build the model
    let mut set = SchemaSet::new();
    set.package = file.package.clone();
    for message in &file.messages {
        set.messages.push(build_message(&package, message, &known)?);
    }
    for enumeration in &file.enums {
        set.enums.push(build_enum(&package, enumeration));
    }

    debug!(
        package = package.as_str(),
        messages = set.messages.len(),
        enums = set.enums.len(),
        types = known.len(),
        "built schema set"
    );
    Ok(set)
}

fn collect_message(scope: &str, message: &MessageDeclaration, known: &mut HashMap<String, TypeKind>) {
    let name = join_name(scope, &message.name);
    for nested in &message.messages {
        collect_message(&name, nested, known);
    }
    for enumeration in &message.enums {
        known.insert(join_name(&name, &enumeration.name), TypeKind::Enum);
    }
    known.insert(name, TypeKind::Message);
}

fn build_message(
    scope: &str,
    declaration: &MessageDeclaration,
    known: &HashMap<String, TypeKind>,
) -> Result<MessageSchema, ProtoError> {
    let name = join_name(scope, &declaration.name);
    let mut message = MessageSchema::new(&name).reserved(build_reserved(&declaration.reserved));

    // Declared groups exist even when no field joins them
    for group in &declaration.oneofs {
        message = message.oneof(group, &[]);
    }
    for field in &declaration.fields {
        message = message.field(build_field(&name, field, known)?);
    }
    for nested in &declaration.messages {
        message = message.nested_message(build_message(&name, nested, known)?);
    }
    for enumeration in &declaration.enums {
        message = message.nested_enum(build_enum(&name, enumeration));
    }
    Ok(message)
}

fn build_field(
    scope: &str,
    declaration: &FieldDeclaration,
    known: &HashMap<String, TypeKind>,
) -> Result<FieldDescriptor, ProtoError> {
    let field_type = resolve_type(&declaration.type_, scope, known).map_err(|e| match e {
        TypeError::Unsupported(token) => ProtoError::UnsupportedType {
            scope: scope.to_owned(),
            field: declaration.name.clone(),
            token,
        },
    })?;

    let mut field = FieldDescriptor::new(&declaration.name, declaration.number, field_type)
        .with_cardinality(declaration.label);
    field.oneof_group = declaration.oneof.clone();
    field.default_value = declaration.default.clone();
    field.deprecated = declaration.deprecated;
    Ok(field)
}

fn build_enum(scope: &str, declaration: &EnumDeclaration) -> EnumSchema {
    let mut enumeration = EnumSchema::new(&join_name(scope, &declaration.name))
        .allow_alias(declaration.allow_alias)
        .reserved(build_reserved(&declaration.reserved));
    for value in &declaration.values {
        enumeration = enumeration.value(&value.name, value.number);
    }
    enumeration
}

fn build_reserved(declaration: &ReservedDeclaration) -> Reserved {
    let mut reserved = Reserved::default();
    for name in &declaration.names {
        reserved = reserved.name(name);
    }
    for &number in &declaration.numbers {
        reserved = reserved.number(number);
    }
    for &(start, end) in &declaration.ranges {
        reserved = reserved.range(start, end);
    }
    reserved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::types::{Cardinality, FieldType};
    use crate::value::MessageValue;

    const PERSON: &str = r#"{
        "package": "acme",
        "messages": [{
            "name": "Person",
            "fields": [
                { "name": "name", "number": 1, "type": "string" },
                { "name": "id", "number": 2, "type": "int32" },
                { "name": "phones", "number": 4, "type": "PhoneNumber", "label": "repeated" },
                { "name": "kind", "number": 5, "type": "PhoneType", "label": "optional", "default": "HOME" },
                { "name": "tags", "number": 6, "type": "map<string, int32>" },
                { "name": "email", "number": 7, "type": "string", "oneof": "contact" },
                { "name": "pager", "number": 8, "type": "uint64", "oneof": "contact" }
            ],
            "messages": [{
                "name": "PhoneNumber",
                "fields": [
                    { "name": "number", "number": 1, "type": "string" },
                    { "name": "type", "number": 2, "type": "PhoneType" }
                ]
            }],
            "enums": [{
                "name": "PhoneType",
                "values": [{ "name": "MOBILE", "number": 0 }, { "name": "HOME", "number": 1 }]
            }],
            "oneofs": ["contact"],
            "reserved": { "numbers": [3], "names": ["nickname"] }
        }]
    }"#;

    #[test]
    fn compiles_a_schema() {
        let (schema, codecs) = compile_schema(PERSON).unwrap();
        assert_eq!(schema.package.as_deref(), Some("acme"));

        let person = &schema.messages[0];
        assert_eq!(person.name, "acme.Person");
        assert_eq!(
            person.field_by_name("phones").map(|f| &f.field_type),
            Some(&FieldType::Message("acme.Person.PhoneNumber".into()))
        );
        assert_eq!(
            person.nested_messages[0].field_by_name("type").map(|f| &f.field_type),
            Some(&FieldType::Enum("acme.Person.PhoneType".into()))
        );
        assert_eq!(person.field_by_tag(5).map(|f| f.cardinality), Some(Cardinality::Optional));
        assert!(person.reserved.contains_number(3));

        let names: Vec<&str> = codecs.iter().map(|c| c.message.as_str()).collect();
        assert_eq!(names, ["acme.Person", "acme.Person.PhoneNumber", "acme.Person.TagsEntry"]);

        let bytes = codecs
            .encode(&MessageValue::new("acme.Person").with(1, "Ada").with(2, 7))
            .unwrap();
        assert_eq!(bytes, [0x0A, 0x03, b'A', b'd', b'a', 0x10, 0x07]);
    }

    #[test]
    fn unsupported_type_token() {
        let result = compile_schema(
            r#"{ "messages": [{ "name": "M", "fields": [{ "name": "x", "number": 1, "type": "int128" }] }] }"#,
        );
        match result {
            Err(ProtoError::UnsupportedType { scope, field, token }) => {
                assert_eq!(scope, "M");
                assert_eq!(field, "x");
                assert_eq!(token, "int128");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn scoping_prefers_the_innermost_declaration() {
        let file = FileDeclaration::from_json(
            r#"{
                "package": "p",
                "messages": [
                    { "name": "Item" },
                    {
                        "name": "Outer",
                        "messages": [{ "name": "Item" }],
                        "fields": [
                            { "name": "inner", "number": 1, "type": "Item" },
                            { "name": "outer", "number": 2, "type": ".p.Item" }
                        ]
                    }
                ]
            }"#,
        )
        .unwrap();
        let schema = build_schema(&file).unwrap();
        let outer = &schema.messages[1];
        assert_eq!(outer.fields[0].field_type, FieldType::Message("p.Outer.Item".into()));
        assert_eq!(outer.fields[1].field_type, FieldType::Message("p.Item".into()));
    }

    #[test]
    fn validation_errors_are_reported_together() {
        let result = compile_schema(
            r#"{ "messages": [{ "name": "M", "fields": [
                { "name": "a", "number": 0, "type": "int32" },
                { "name": "b", "number": 19500, "type": "int32" },
                { "name": "c", "number": 3, "type": "string", "label": "packed" }
            ] }] }"#,
        );
        let Err(ProtoError::Schema(errors)) = result else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors.0[0], ValidationError::TagOutOfRange { tag: 0, .. }));
        assert!(matches!(errors.0[1], ValidationError::TagInReservedRange { tag: 19500, .. }));
        assert!(matches!(errors.0[2], ValidationError::PackedNotScalar { .. }));
    }

    #[test]
    fn applies_decode_limits() {
        let config = CodecConfig::from_json(r#"{ "limits": { "max_message_size": 4 } }"#).unwrap();
        let (_, codecs) = compile_schema_with(PERSON, &config).unwrap();
        assert_eq!(codecs.limits().max_message_size, 4);
        assert!(codecs.decode("acme.Person", &[0x10, 0x01, 0x10, 0x02, 0x10, 0x03]).is_err());
    }
}
