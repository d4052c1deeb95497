use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::utils::simple_name;

/// Declared type of a field. References to enums and messages hold the
/// fully-qualified name of the target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int32,
    Int64,
    UInt32,
    UInt64,
    SInt32,
    SInt64,
    Fixed32,
    Fixed64,
    SFixed32,
    SFixed64,
    Bool,
    Float,
    Double,
    String,
    Bytes,
    Enum(String),
    Message(String),
    Map(Box<FieldType>, Box<FieldType>),
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldType::Int32 => f.write_str("int32"),
            FieldType::Int64 => f.write_str("int64"),
            FieldType::UInt32 => f.write_str("uint32"),
            FieldType::UInt64 => f.write_str("uint64"),
            FieldType::SInt32 => f.write_str("sint32"),
            FieldType::SInt64 => f.write_str("sint64"),
            FieldType::Fixed32 => f.write_str("fixed32"),
            FieldType::Fixed64 => f.write_str("fixed64"),
            FieldType::SFixed32 => f.write_str("sfixed32"),
            FieldType::SFixed64 => f.write_str("sfixed64"),
            FieldType::Bool => f.write_str("bool"),
            FieldType::Float => f.write_str("float"),
            FieldType::Double => f.write_str("double"),
            FieldType::String => f.write_str("string"),
            FieldType::Bytes => f.write_str("bytes"),
            FieldType::Enum(name) | FieldType::Message(name) => f.write_str(name),
            FieldType::Map(key, value) => write!(f, "map<{}, {}>", key, value),
        }
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// How many values a field carries and whether its presence is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// One value, implicit presence: the zero value is never written.
    #[default]
    Singular,
    /// One value with explicit presence.
    Optional,
    /// Zero or more values, one key per element.
    Repeated,
    /// Zero or more values sharing one length-delimited record.
    Packed,
}

impl Cardinality {
    pub fn is_repeated(self) -> bool {
        matches!(self, Cardinality::Repeated | Cardinality::Packed)
    }
}

/// A literal default for a field with explicit presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Bool(bool),
    UInt(u64),
    Int(i64),
    Float(f64),
    /// Text for `string` and `bytes`, or the name of an enum value.
    Str(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name:          String,
    pub tag:           u32,
    pub field_type:    FieldType,
    pub cardinality:   Cardinality,
    pub oneof_group:   Option<String>,
    pub default_value: Option<DefaultValue>,
    pub deprecated:    bool,
}

impl FieldDescriptor {
    pub fn new(name: &str, tag: u32, field_type: FieldType) -> FieldDescriptor {
        FieldDescriptor {
            name: name.to_owned(),
            tag,
            field_type,
            cardinality: Cardinality::Singular,
            oneof_group: None,
            default_value: None,
            deprecated: false,
        }
    }

    pub fn with_cardinality(mut self, cardinality: Cardinality) -> FieldDescriptor {
        self.cardinality = cardinality;
        self
    }

    pub fn optional(self) -> FieldDescriptor {
        self.with_cardinality(Cardinality::Optional)
    }

    pub fn repeated(self) -> FieldDescriptor {
        self.with_cardinality(Cardinality::Repeated)
    }

    pub fn packed(self) -> FieldDescriptor {
        self.with_cardinality(Cardinality::Packed)
    }

    pub fn in_oneof(mut self, group: &str) -> FieldDescriptor {
        self.oneof_group = Some(group.to_owned());
        self
    }

    pub fn with_default(mut self, value: DefaultValue) -> FieldDescriptor {
        self.default_value = Some(value);
        self
    }

    pub fn deprecated(mut self) -> FieldDescriptor {
        self.deprecated = true;
        self
    }

    pub fn is_map(&self) -> bool {
        matches!(self.field_type, FieldType::Map(..))
    }

    /// Whether the field holds a list of values (maps included).
    pub fn is_repeated(&self) -> bool {
        self.cardinality.is_repeated() || self.is_map()
    }

    /// Whether an unset field can be told apart from one holding its zero
    /// value.
    pub fn has_explicit_presence(&self) -> bool {
        if self.is_repeated() {
            return false;
        }
        self.cardinality == Cardinality::Optional
            || self.oneof_group.is_some()
            || matches!(self.field_type, FieldType::Message(_))
    }
}

/// An inclusive range of reserved numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReservedRange {
    pub start: i64,
    pub end:   i64,
}

/// Field numbers (or enum numbers) and names that may not be used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reserved {
    pub names:  BTreeSet<String>,
    pub ranges: Vec<ReservedRange>,
}

impl Reserved {
    pub fn name(mut self, name: &str) -> Reserved {
        self.names.insert(name.to_owned());
        self
    }

    pub fn number(self, number: i64) -> Reserved {
        self.range(number, number)
    }

    pub fn range(mut self, start: i64, end: i64) -> Reserved {
        self.ranges.push(ReservedRange { start, end });
        self
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn contains_number(&self, number: i64) -> bool {
        self.ranges.iter().any(|r| r.start <= number && number <= r.end)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.ranges.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumValue {
    pub name:   String,
    pub number: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumSchema {
    /// Fully-qualified name.
    pub name:        String,
    pub values:      Vec<EnumValue>,
    /// Lets several names share one number. Enums are open, so this only
    /// governs what the validator accepts.
    pub allow_alias: bool,
    pub reserved:    Reserved,
}

impl EnumSchema {
    pub fn new(name: &str) -> EnumSchema {
        EnumSchema {
            name: name.to_owned(),
            values: vec![],
            allow_alias: true,
            reserved: Reserved::default(),
        }
    }

    pub fn value(mut self, name: &str, number: i32) -> EnumSchema {
        self.values.push(EnumValue { name: name.to_owned(), number });
        self
    }

    pub fn allow_alias(mut self, allow_alias: bool) -> EnumSchema {
        self.allow_alias = allow_alias;
        self
    }

    pub fn reserved(mut self, reserved: Reserved) -> EnumSchema {
        self.reserved = reserved;
        self
    }

    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    pub fn value_by_name(&self, name: &str) -> Option<&EnumValue> {
        self.values.iter().find(|v| v.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageSchema {
    /// Fully-qualified name.
    pub name:            String,
    pub fields:          Vec<FieldDescriptor>,
    pub nested_enums:    Vec<EnumSchema>,
    pub nested_messages: Vec<MessageSchema>,
    /// Group name to member tags.
    pub oneof_groups:    BTreeMap<String, BTreeSet<u32>>,
    pub reserved:        Reserved,
}

impl MessageSchema {
    pub fn new(name: &str) -> MessageSchema {
        MessageSchema {
            name: name.to_owned(),
            fields: vec![],
            nested_enums: vec![],
            nested_messages: vec![],
            oneof_groups: BTreeMap::new(),
            reserved: Reserved::default(),
        }
    }

    /// Adds a field, registering it with its oneof group if it names one.
    pub fn field(mut self, field: FieldDescriptor) -> MessageSchema {
        if let Some(group) = &field.oneof_group {
            self.oneof_groups.entry(group.clone()).or_default().insert(field.tag);
        }
        self.fields.push(field);
        self
    }

    /// Declares a oneof group with the given member tags.
    pub fn oneof(mut self, group: &str, tags: &[u32]) -> MessageSchema {
        self.oneof_groups.entry(group.to_owned()).or_default().extend(tags);
        self
    }

    pub fn nested_message(mut self, message: MessageSchema) -> MessageSchema {
        self.nested_messages.push(message);
        self
    }

    pub fn nested_enum(mut self, nested: EnumSchema) -> MessageSchema {
        self.nested_enums.push(nested);
        self
    }

    pub fn reserved(mut self, reserved: Reserved) -> MessageSchema {
        self.reserved = reserved;
        self
    }

    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    pub fn field_by_tag(&self, tag: u32) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.tag == tag)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Every top-level type of one schema file. Nested types are owned by
/// their enclosing message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaSet {
    pub package:  Option<String>,
    pub messages: Vec<MessageSchema>,
    pub enums:    Vec<EnumSchema>,
}

impl SchemaSet {
    pub fn new() -> SchemaSet {
        SchemaSet::default()
    }

    pub fn message(mut self, message: MessageSchema) -> SchemaSet {
        self.messages.push(message);
        self
    }

    pub fn enumeration(mut self, enumeration: EnumSchema) -> SchemaSet {
        self.enums.push(enumeration);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_tokens() {
        assert_eq!(FieldType::SFixed64.to_string(), "sfixed64");
        assert_eq!(FieldType::Message("acme.Person".into()).to_string(), "acme.Person");
        assert_eq!(
            FieldType::Map(Box::new(FieldType::String), Box::new(FieldType::Int32)).to_string(),
            "map<string, int32>"
        );
        assert_eq!(serde_json::to_string(&FieldType::Bytes).unwrap(), "\"bytes\"");
    }

    #[test]
    fn presence() {
        let scalar = FieldDescriptor::new("id", 1, FieldType::Int32);
        assert!(!scalar.has_explicit_presence());
        assert!(scalar.clone().optional().has_explicit_presence());
        assert!(scalar.clone().in_oneof("kind").has_explicit_presence());
        assert!(!scalar.repeated().has_explicit_presence());
        assert!(FieldDescriptor::new("child", 2, FieldType::Message("Child".into())).has_explicit_presence());
    }

    #[test]
    fn oneof_membership_follows_fields() {
        let message = MessageSchema::new("Sample")
            .field(FieldDescriptor::new("name", 4, FieldType::String).in_oneof("test_oneof"))
            .field(FieldDescriptor::new("sub", 9, FieldType::Int32).in_oneof("test_oneof"));
        assert_eq!(message.oneof_groups["test_oneof"], BTreeSet::from([4, 9]));
        assert_eq!(message.field_by_tag(9).map(|f| f.name.as_str()), Some("sub"));
    }

    #[test]
    fn reserved_ranges_are_inclusive() {
        let reserved = Reserved::default().number(2).range(9, 11).name("foo");
        assert!(reserved.contains_number(2));
        assert!(reserved.contains_number(9));
        assert!(reserved.contains_number(11));
        assert!(!reserved.contains_number(12));
        assert!(reserved.contains_name("foo"));
        assert!(!reserved.contains_name("bar"));
    }

    #[test]
    fn default_literals() {
        let parse = |text| serde_json::from_str::<DefaultValue>(text).unwrap();
        assert_eq!(parse("true"), DefaultValue::Bool(true));
        assert_eq!(parse("7"), DefaultValue::UInt(7));
        assert_eq!(parse("-7"), DefaultValue::Int(-7));
        assert_eq!(parse("1.5"), DefaultValue::Float(1.5));
        assert_eq!(parse("\"RED\""), DefaultValue::Str("RED".into()));
    }
}
