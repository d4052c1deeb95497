use brine_proto_wire::{IMPLEMENTATION_RESERVED_TAGS, MAX_TAG, MIN_TAG};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

use crate::error::{ValidationError, ValidationErrors};
use crate::registry::TypeRegistry;
use crate::type_system::{map_entry, map_entry_name};
use crate::types::{Cardinality, DefaultValue, EnumSchema, FieldDescriptor, FieldType, MessageSchema, SchemaSet};

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Checks one message and everything nested in it. References to types
/// outside `schema` are reported as unresolved; use [validate_set] to check
/// messages that refer to each other.
pub fn validate(schema: &MessageSchema) -> Result<(), ValidationErrors> {
    let registry = TypeRegistry::from_message(schema);
    let mut verifier = Verifier::new(&registry);
    verifier.check_message(schema);
    verifier.check_cycles();
    verifier.finish()
}

/// Checks every type of `set`, resolving references across the whole set.
pub fn validate_set(set: &SchemaSet) -> Result<(), ValidationErrors> {
    let registry = TypeRegistry::from_set(set);
    let mut verifier = Verifier::new(&registry);

    let scope = set.package.as_deref().unwrap_or("");
    verifier.check_unique_names(
        scope,
        set.messages.iter().map(|m| m.simple_name().to_owned()).chain(set.enums.iter().map(|e| e.simple_name().to_owned())),
    );
    for message in &set.messages {
        verifier.check_message(message);
    }
    for enumeration in &set.enums {
        verifier.check_enum(enumeration);
    }
    verifier.check_cycles();
    verifier.finish()
}

struct Verifier<'r, 'a> {
    registry: &'r TypeRegistry<'a>,
    errors:   Vec<ValidationError>,
}

impl<'r, 'a> Verifier<'r, 'a> {
    fn new(registry: &'r TypeRegistry<'a>) -> Verifier<'r, 'a> {
        Verifier { registry, errors: vec![] }
    }

    fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            debug!(count = self.errors.len(), "schema validation failed");
            Err(ValidationErrors(self.errors))
        }
    }

    fn report(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    fn check_identifier(&mut self, scope: &str, name: &str) {
        if !IDENTIFIER.is_match(name) {
            self.report(ValidationError::InvalidName { scope: scope.to_owned(), name: name.to_owned() });
        }
    }

    fn check_unique_names(&mut self, scope: &str, names: impl Iterator<Item = String>) {
        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name.clone()) {
                self.report(ValidationError::DuplicateNestedName { scope: scope.to_owned(), name });
            }
        }
    }

    fn check_message(&mut self, message: &MessageSchema) {
        self.check_identifier(&message.name, message.simple_name());

        let mut by_tag: HashMap<u32, &str> = HashMap::new();
        let mut names = HashSet::new();
        for field in &message.fields {
            if let Some(first) = by_tag.insert(field.tag, &field.name) {
                self.report(ValidationError::DuplicateTag {
                    message: message.name.clone(),
                    tag:     field.tag,
                    first:   first.to_owned(),
                    second:  field.name.clone(),
                });
            }
            if !names.insert(field.name.as_str()) {
                self.report(ValidationError::DuplicateFieldName {
                    message: message.name.clone(),
                    field:   field.name.clone(),
                });
            }
            self.check_field(message, field);
        }

        self.check_oneofs(message);

        let entries: Vec<MessageSchema> =
            message.fields.iter().filter_map(|field| map_entry(message, field)).collect();
        self.check_unique_names(
            &message.name,
            message
                .nested_messages
                .iter()
                .map(|m| m.simple_name().to_owned())
                .chain(message.nested_enums.iter().map(|e| e.simple_name().to_owned()))
                .chain(message.fields.iter().filter(|f| f.is_map()).map(|f| map_entry_name(&f.name))),
        );

        for entry in &entries {
            self.check_message(entry);
        }
        for nested in &message.nested_enums {
            self.check_enum(nested);
        }
        for nested in &message.nested_messages {
            self.check_message(nested);
        }
    }

    fn check_field(&mut self, message: &MessageSchema, field: &FieldDescriptor) {
        let message_name = || message.name.clone();
        let field_name = || field.name.clone();

        self.check_identifier(&message.name, &field.name);

        if field.tag < MIN_TAG || field.tag > MAX_TAG {
            self.report(ValidationError::TagOutOfRange { message: message_name(), field: field_name(), tag: field.tag });
        } else if IMPLEMENTATION_RESERVED_TAGS.contains(&field.tag) {
            self.report(ValidationError::TagInReservedRange {
                message: message_name(),
                field:   field_name(),
                tag:     field.tag,
            });
        }

        if message.reserved.contains_number(i64::from(field.tag)) {
            self.report(ValidationError::ReservedTag { message: message_name(), field: field_name(), tag: field.tag });
        }
        if message.reserved.contains_name(&field.name) {
            self.report(ValidationError::ReservedName { message: message_name(), field: field_name() });
        }

        match &field.field_type {
            FieldType::Map(key, value) => {
                if field.cardinality != Cardinality::Singular {
                    self.report(ValidationError::MapCardinality { message: message_name(), field: field_name() });
                }
                if !key.is_valid_map_key() {
                    self.report(ValidationError::InvalidMapKey {
                        message:  message_name(),
                        field:    field_name(),
                        key_type: key.to_string(),
                    });
                }
                if matches!(**value, FieldType::Map(..)) {
                    self.report(ValidationError::InvalidMapValue { message: message_name(), field: field_name() });
                }
            }
            field_type => self.check_reference(message, field, field_type),
        }

        if field.cardinality == Cardinality::Packed && !field.field_type.is_packable() {
            self.report(ValidationError::PackedNotScalar {
                message:    message_name(),
                field:      field_name(),
                field_type: field.field_type.to_string(),
            });
        }

        if field.oneof_group.is_some() && (field.cardinality != Cardinality::Singular || field.is_map()) {
            self.report(ValidationError::OneofMemberCardinality { message: message_name(), field: field_name() });
        }

        if let Some(default) = &field.default_value {
            if field.cardinality != Cardinality::Optional {
                self.report(ValidationError::DefaultRequiresPresence { message: message_name(), field: field_name() });
            } else if !self.default_fits(&field.field_type, default) {
                self.report(ValidationError::DefaultTypeMismatch {
                    message:    message_name(),
                    field:      field_name(),
                    field_type: field.field_type.to_string(),
                });
            }
        }
    }

    fn check_reference(&mut self, message: &MessageSchema, field: &FieldDescriptor, field_type: &FieldType) {
        let resolved = match field_type {
            FieldType::Enum(name) => self.registry.enumeration(name).is_some(),
            FieldType::Message(name) => self.registry.message(name).is_some(),
            _ => true,
        };
        if !resolved {
            self.report(ValidationError::UnresolvedType {
                message:   message.name.clone(),
                field:     field.name.clone(),
                type_name: field_type.to_string(),
            });
        }
    }

    fn default_fits(&self, field_type: &FieldType, default: &DefaultValue) -> bool {
        fn integer(default: &DefaultValue) -> Option<i128> {
            match default {
                DefaultValue::Int(v) => Some(i128::from(*v)),
                DefaultValue::UInt(v) => Some(i128::from(*v)),
                _ => None,
            }
        }
        let within = |min: i128, max: i128| integer(default).is_some_and(|v| min <= v && v <= max);

        match field_type {
            FieldType::Bool => matches!(default, DefaultValue::Bool(_)),
            FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32 => {
                within(i128::from(i32::MIN), i128::from(i32::MAX))
            }
            FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64 => {
                within(i128::from(i64::MIN), i128::from(i64::MAX))
            }
            FieldType::UInt32 | FieldType::Fixed32 => within(0, i128::from(u32::MAX)),
            FieldType::UInt64 | FieldType::Fixed64 => within(0, i128::from(u64::MAX)),
            FieldType::Float | FieldType::Double => {
                matches!(default, DefaultValue::Float(_) | DefaultValue::Int(_) | DefaultValue::UInt(_))
            }
            FieldType::String | FieldType::Bytes => matches!(default, DefaultValue::Str(_)),
            FieldType::Enum(name) => match (default, self.registry.enumeration(name)) {
                (DefaultValue::Str(value), Some(enumeration)) => enumeration.value_by_name(value).is_some(),
                (DefaultValue::Str(_), None) => true,
                _ => within(i128::from(i32::MIN), i128::from(i32::MAX)),
            },
            FieldType::Message(_) | FieldType::Map(..) => false,
        }
    }

    fn check_oneofs(&mut self, message: &MessageSchema) {
        let mut claimed: HashSet<u32> = HashSet::new();
        for (group, tags) in &message.oneof_groups {
            if tags.is_empty() {
                self.report(ValidationError::EmptyOneof { message: message.name.clone(), group: group.clone() });
            }
            for &tag in tags {
                let Some(field) = message.field_by_tag(tag) else {
                    self.report(ValidationError::OneofUnknownMember {
                        message: message.name.clone(),
                        group: group.clone(),
                        tag,
                    });
                    continue;
                };
                let first_claim = claimed.insert(tag);
                if field.oneof_group.as_ref() != Some(group) || !first_claim {
                    self.report(ValidationError::OneofConflict {
                        message: message.name.clone(),
                        field:   field.name.clone(),
                    });
                }
            }
        }

        // fields naming a group that does not list them
        for field in &message.fields {
            if let Some(group) = &field.oneof_group {
                let listed = message.oneof_groups.get(group).is_some_and(|tags| tags.contains(&field.tag));
                if !listed {
                    self.report(ValidationError::OneofConflict {
                        message: message.name.clone(),
                        field:   field.name.clone(),
                    });
                }
            }
        }
    }

    fn check_enum(&mut self, enumeration: &EnumSchema) {
        let name = || enumeration.name.clone();
        self.check_identifier(&enumeration.name, enumeration.simple_name());

        match enumeration.values.first() {
            None => self.report(ValidationError::EmptyEnum { name: name() }),
            Some(first) if first.number != 0 => self.report(ValidationError::EnumFirstValueNotZero {
                name:   name(),
                value:  first.name.clone(),
                number: first.number,
            }),
            Some(_) => {}
        }

        let mut names = HashSet::new();
        let mut numbers: HashMap<i32, &str> = HashMap::new();
        for value in &enumeration.values {
            self.check_identifier(&enumeration.name, &value.name);
            if !names.insert(value.name.as_str()) {
                self.report(ValidationError::DuplicateEnumName { name: name(), value: value.name.clone() });
            }
            match numbers.get(&value.number) {
                Some(first) if !enumeration.allow_alias => self.report(ValidationError::DuplicateEnumNumber {
                    name:   name(),
                    number: value.number,
                    first:  (*first).to_owned(),
                    second: value.name.clone(),
                }),
                Some(_) => {}
                None => {
                    numbers.insert(value.number, &value.name);
                }
            }
            if enumeration.reserved.contains_name(&value.name)
                || enumeration.reserved.contains_number(i64::from(value.number))
            {
                self.report(ValidationError::ReservedEnumValue { name: name(), value: value.name.clone() });
            }
        }
    }

    /// Looks for messages that must contain themselves. Only singular,
    /// non-oneof message fields are mandatory edges: a repeated field, a
    /// map or a oneof member can always be left empty.
    fn check_cycles(&mut self) {
        let mut state: HashMap<&str, u8> = HashMap::new();
        let mut stack: Vec<&str> = vec![];
        let mut cycles: Vec<Vec<String>> = vec![];

        fn visit<'a>(
            name: &'a str,
            registry: &TypeRegistry<'a>,
            state: &mut HashMap<&'a str, u8>,
            stack: &mut Vec<&'a str>,
            cycles: &mut Vec<Vec<String>>,
        ) {
            let Some(message) = registry.message(name) else {
                return;
            };
            match state.get(name) {
                Some(1) => {
                    let start = stack.iter().position(|n| *n == name).unwrap_or(0);
                    let mut path: Vec<String> = stack[start..].iter().map(|n| (*n).to_owned()).collect();
                    path.push(name.to_owned());
                    cycles.push(path);
                    return;
                }
                Some(_) => return,
                None => {}
            }

            state.insert(name, 1);
            stack.push(name);
            for field in &message.fields {
                if field.cardinality != Cardinality::Singular || field.oneof_group.is_some() {
                    continue;
                }
                if let FieldType::Message(target) = &field.field_type {
                    visit(target, registry, state, stack, cycles);
                }
            }
            stack.pop();
            state.insert(name, 2);
        }

        let names: BTreeSet<&str> = self.registry.messages().map(|m| m.name.as_str()).collect();
        for name in names {
            visit(name, self.registry, &mut state, &mut stack, &mut cycles);
        }

        for path in cycles {
            self.report(ValidationError::UnresolvableCycle { path });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnumSchema, Reserved};

    fn int32(name: &str, tag: u32) -> FieldDescriptor {
        FieldDescriptor::new(name, tag, FieldType::Int32)
    }

    fn errors(schema: &MessageSchema) -> Vec<ValidationError> {
        validate(schema).err().map(ValidationErrors::into_inner).unwrap_or_default()
    }

    #[test]
    fn valid_message() {
        let schema = MessageSchema::new("SearchRequest")
            .field(FieldDescriptor::new("query", 1, FieldType::String))
            .field(int32("page_number", 2).optional())
            .field(int32("samples", 3).packed())
            .field(FieldDescriptor::new("name", 4, FieldType::String).in_oneof("choice"))
            .field(int32("id", 5).in_oneof("choice"))
            .field(FieldDescriptor::new(
                "counts",
                6,
                FieldType::Map(Box::new(FieldType::String), Box::new(FieldType::Int32)),
            ))
            .field(int32("limit", 7).optional().with_default(DefaultValue::UInt(10)));
        assert_eq!(validate(&schema), Ok(()));
    }

    #[test]
    fn tag_boundaries() {
        let schema = MessageSchema::new("M")
            .field(int32("a", 1))
            .field(int32("b", 18_999))
            .field(int32("c", 20_000))
            .field(int32("d", 536_870_911));
        assert_eq!(validate(&schema), Ok(()));

        let schema = MessageSchema::new("M")
            .field(int32("zero", 0))
            .field(int32("low", 19_000))
            .field(int32("high", 19_999))
            .field(int32("big", 536_870_912));
        assert_eq!(
            errors(&schema),
            [
                ValidationError::TagOutOfRange { message: "M".into(), field: "zero".into(), tag: 0 },
                ValidationError::TagInReservedRange { message: "M".into(), field: "low".into(), tag: 19_000 },
                ValidationError::TagInReservedRange { message: "M".into(), field: "high".into(), tag: 19_999 },
                ValidationError::TagOutOfRange { message: "M".into(), field: "big".into(), tag: 536_870_912 },
            ]
        );
    }

    #[test]
    fn all_errors_are_collected() {
        let schema = MessageSchema::new("M")
            .field(int32("a", 1))
            .field(int32("b", 1))
            .field(FieldDescriptor::new("c", 0, FieldType::String).packed());
        let errors = errors(&schema);
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::DuplicateTag {
            message: "M".into(),
            tag:     1,
            first:   "a".into(),
            second:  "b".into(),
        }));
        assert!(errors.contains(&ValidationError::TagOutOfRange { message: "M".into(), field: "c".into(), tag: 0 }));
        assert!(errors.contains(&ValidationError::PackedNotScalar {
            message:    "M".into(),
            field:      "c".into(),
            field_type: "string".into(),
        }));
    }

    #[test]
    fn duplicate_names_and_reserved() {
        let schema = MessageSchema::new("M")
            .field(int32("a", 1))
            .field(int32("a", 2))
            .field(int32("old", 3))
            .field(int32("c", 10))
            .reserved(Reserved::default().name("old").range(9, 11));
        assert_eq!(
            errors(&schema),
            [
                ValidationError::DuplicateFieldName { message: "M".into(), field: "a".into() },
                ValidationError::ReservedName { message: "M".into(), field: "old".into() },
                ValidationError::ReservedTag { message: "M".into(), field: "c".into(), tag: 10 },
            ]
        );
    }

    #[test]
    fn invalid_identifiers() {
        let schema = MessageSchema::new("M").field(int32("2fast", 1)).field(int32("ok_name", 2));
        assert_eq!(
            errors(&schema),
            [ValidationError::InvalidName { scope: "M".into(), name: "2fast".into() }]
        );
    }

    #[test]
    fn packed_string_is_rejected_but_packed_enum_is_fine() {
        let schema = MessageSchema::new("M")
            .nested_enum(EnumSchema::new("M.Kind").value("NONE", 0))
            .field(FieldDescriptor::new("kinds", 1, FieldType::Enum("M.Kind".into())).packed())
            .field(FieldDescriptor::new("names", 2, FieldType::String).packed());
        assert_eq!(
            errors(&schema),
            [ValidationError::PackedNotScalar {
                message:    "M".into(),
                field:      "names".into(),
                field_type: "string".into(),
            }]
        );
    }

    #[test]
    fn oneof_rules() {
        let schema = MessageSchema::new("M")
            .field(int32("a", 1).in_oneof("choice"))
            .field(int32("b", 2).repeated().in_oneof("choice"))
            .field(int32("c", 3).in_oneof("other"))
            .oneof("choice", &[3, 7])
            .oneof("empty", &[]);
        let errors = errors(&schema);
        assert!(errors.contains(&ValidationError::OneofMemberCardinality { message: "M".into(), field: "b".into() }));
        assert!(errors.contains(&ValidationError::EmptyOneof { message: "M".into(), group: "empty".into() }));
        assert!(errors.contains(&ValidationError::OneofUnknownMember {
            message: "M".into(),
            group:   "choice".into(),
            tag:     7,
        }));
        // tag 3 declares "other" but "choice" lists it too
        assert!(errors.contains(&ValidationError::OneofConflict { message: "M".into(), field: "c".into() }));
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn field_naming_unlisted_group() {
        let mut schema = MessageSchema::new("M").field(int32("a", 1).in_oneof("choice"));
        schema.oneof_groups.clear();
        assert_eq!(
            errors(&schema),
            [ValidationError::OneofConflict { message: "M".into(), field: "a".into() }]
        );
    }

    #[test]
    fn map_rules() {
        let map = |key: FieldType, value: FieldType| FieldType::Map(Box::new(key), Box::new(value));
        let schema = MessageSchema::new("M")
            .field(FieldDescriptor::new("by_float", 1, map(FieldType::Float, FieldType::Int32)))
            .field(FieldDescriptor::new("nested", 2, map(FieldType::String, map(FieldType::String, FieldType::Int32))))
            .field(FieldDescriptor::new("listed", 3, map(FieldType::Int64, FieldType::Bytes)).repeated())
            .field(FieldDescriptor::new("dangling", 4, map(FieldType::String, FieldType::Message("Nope".into()))));
        let errors = errors(&schema);
        assert!(errors.contains(&ValidationError::InvalidMapKey {
            message:  "M".into(),
            field:    "by_float".into(),
            key_type: "float".into(),
        }));
        assert!(errors.contains(&ValidationError::InvalidMapValue { message: "M".into(), field: "nested".into() }));
        assert!(errors.contains(&ValidationError::MapCardinality { message: "M".into(), field: "listed".into() }));
        // the synthetic entry is validated like any nested message
        assert!(errors.contains(&ValidationError::UnresolvedType {
            message:   "M.DanglingEntry".into(),
            field:     "value".into(),
            type_name: "Nope".into(),
        }));
    }

    #[test]
    fn map_entry_name_clash() {
        let schema = MessageSchema::new("M")
            .nested_message(MessageSchema::new("M.TagsEntry"))
            .field(FieldDescriptor::new(
                "tags",
                1,
                FieldType::Map(Box::new(FieldType::String), Box::new(FieldType::String)),
            ));
        assert_eq!(
            errors(&schema),
            [ValidationError::DuplicateNestedName { scope: "M".into(), name: "TagsEntry".into() }]
        );
    }

    #[test]
    fn defaults() {
        let schema = MessageSchema::new("M")
            .nested_enum(EnumSchema::new("M.Color").value("RED", 0).value("BLUE", 1))
            .field(int32("implicit", 1).with_default(DefaultValue::UInt(3)))
            .field(int32("too_big", 2).optional().with_default(DefaultValue::UInt(1 << 40)))
            .field(FieldDescriptor::new("color", 3, FieldType::Enum("M.Color".into())).optional().with_default(DefaultValue::Str("BLUE".into())))
            .field(FieldDescriptor::new("hue", 4, FieldType::Enum("M.Color".into())).optional().with_default(DefaultValue::Str("GREEN".into())))
            .field(FieldDescriptor::new("ratio", 5, FieldType::Double).optional().with_default(DefaultValue::Int(-2)))
            .field(FieldDescriptor::new("flag", 6, FieldType::Bool).optional().with_default(DefaultValue::UInt(1)));
        assert_eq!(
            errors(&schema),
            [
                ValidationError::DefaultRequiresPresence { message: "M".into(), field: "implicit".into() },
                ValidationError::DefaultTypeMismatch {
                    message:    "M".into(),
                    field:      "too_big".into(),
                    field_type: "int32".into(),
                },
                ValidationError::DefaultTypeMismatch {
                    message:    "M".into(),
                    field:      "hue".into(),
                    field_type: "M.Color".into(),
                },
                ValidationError::DefaultTypeMismatch {
                    message:    "M".into(),
                    field:      "flag".into(),
                    field_type: "bool".into(),
                },
            ]
        );
    }

    #[test]
    fn enum_rules() {
        let schema = MessageSchema::new("M")
            .nested_enum(EnumSchema::new("M.Empty"))
            .nested_enum(EnumSchema::new("M.NoZero").value("ONE", 1))
            .nested_enum(EnumSchema::new("M.Strict").allow_alias(false).value("A", 0).value("B", 0))
            .nested_enum(EnumSchema::new("M.Aliased").value("A", 0).value("B", 0))
            .nested_enum(EnumSchema::new("M.Twice").value("A", 0).value("A", 1))
            .nested_enum(
                EnumSchema::new("M.Reserved")
                    .value("A", 0)
                    .value("OLD", 1)
                    .value("C", 5)
                    .reserved(Reserved::default().name("OLD").range(4, 6)),
            );
        assert_eq!(
            errors(&schema),
            [
                ValidationError::EmptyEnum { name: "M.Empty".into() },
                ValidationError::EnumFirstValueNotZero { name: "M.NoZero".into(), value: "ONE".into(), number: 1 },
                ValidationError::DuplicateEnumNumber {
                    name:   "M.Strict".into(),
                    number: 0,
                    first:  "A".into(),
                    second: "B".into(),
                },
                ValidationError::DuplicateEnumName { name: "M.Twice".into(), value: "A".into() },
                ValidationError::ReservedEnumValue { name: "M.Reserved".into(), value: "OLD".into() },
                ValidationError::ReservedEnumValue { name: "M.Reserved".into(), value: "C".into() },
            ]
        );
    }

    #[test]
    fn self_embedding_is_a_cycle() {
        let schema = MessageSchema::new("Node").field(FieldDescriptor::new("next", 1, FieldType::Message("Node".into())));
        let errors = errors(&schema);
        assert_eq!(errors, [ValidationError::UnresolvableCycle { path: vec!["Node".into(), "Node".into()] }]);
        assert!(errors[0].is_cycle());
    }

    #[test]
    fn optional_repeated_and_oneof_edges_break_cycles() {
        let node = |field: FieldDescriptor| validate(&MessageSchema::new("Node").field(field));
        let next = || FieldDescriptor::new("next", 1, FieldType::Message("Node".into()));
        assert_eq!(node(next().optional()), Ok(()));
        assert_eq!(node(next().repeated()), Ok(()));
        assert_eq!(node(next().in_oneof("link")), Ok(()));
        assert_eq!(
            node(FieldDescriptor::new(
                "children",
                1,
                FieldType::Map(Box::new(FieldType::String), Box::new(FieldType::Message("Node".into())))
            )),
            Ok(())
        );
    }

    #[test]
    fn cycles_across_messages() {
        let set = SchemaSet::new()
            .message(MessageSchema::new("A").field(FieldDescriptor::new("b", 1, FieldType::Message("B".into()))))
            .message(MessageSchema::new("B").field(FieldDescriptor::new("a", 1, FieldType::Message("A".into()))))
            .message(MessageSchema::new("C").field(FieldDescriptor::new("a", 1, FieldType::Message("A".into()))));
        let errors = validate_set(&set).unwrap_err().into_inner();
        assert_eq!(
            errors,
            [ValidationError::UnresolvableCycle { path: vec!["A".into(), "B".into(), "A".into()] }]
        );
    }

    #[test]
    fn set_level_checks() {
        let set = SchemaSet {
            package:  Some("acme".into()),
            messages: vec![
                MessageSchema::new("acme.Thing").field(FieldDescriptor::new("kind", 1, FieldType::Enum("acme.Kind".into()))),
                MessageSchema::new("acme.Thing"),
            ],
            enums:    vec![EnumSchema::new("acme.Kind").value("NONE", 0)],
        };
        assert_eq!(
            validate_set(&set).unwrap_err().into_inner(),
            [ValidationError::DuplicateNestedName { scope: "acme".into(), name: "Thing".into() }]
        );
    }

    #[test]
    fn unresolved_reference_outside_message() {
        let schema = MessageSchema::new("M").field(FieldDescriptor::new("other", 1, FieldType::Message("Other".into())));
        assert_eq!(
            errors(&schema),
            [ValidationError::UnresolvedType { message: "M".into(), field: "other".into(), type_name: "Other".into() }]
        );
    }
}
