//! Rust source generation.
//!
//! Every message becomes a struct deriving `Default` with an `encode` /
//! `decode` pair built on `brine-proto-wire`, and every enum a `#[repr(i32)]`
//! enum. Nested names are flattened: `acme.Person.PhoneNumber` in package
//! `acme` becomes `PersonPhoneNumber`. Field representation:
//!
//! - enum fields hold the raw `i32` (enums are open);
//! - `optional` fields are `Option<T>`, singular messages `Option<Box<T>>`;
//! - repeated fields are `Vec<T>`, maps `Vec<(K, V)>` in wire order;
//! - each oneof group is one `Option` of a generated enum;
//! - fields the schema does not know are kept in `unknown_fields`.
//!
//! Keywords, prelude names and any two items that would land on the same
//! identifier get trailing underscores until they are distinct.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::codec::{CodecSet, EncodeOp, MessageCodec, Presence, Scalar};
use crate::registry::TypeRegistry;
use crate::traits::Emitter;
use crate::types::{Cardinality, EnumSchema, FieldDescriptor, FieldType, MessageSchema, SchemaSet};
use crate::utils::{to_pascal_case, to_snake_case};
use crate::value::Value;

use brine_proto_wire::WireType;

/// Strict and reserved Rust keywords, plus `_`.
const RUST_KEYWORDS: &[&str] = &[
    "_", "abstract", "as", "async", "await", "become", "box", "break", "const", "continue",
    "crate", "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen",
    "if", "impl", "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override",
    "priv", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait",
    "true", "try", "type", "typeof", "unsafe", "unsized", "use", "virtual", "where", "while",
    "yield",
];

/// Type names the generated module imports or takes from the prelude.
const RESERVED_TYPES: &[&str] = &[
    "ByteBuffer", "ByteBufferMut", "UnknownField", "UnknownFields", "WireError", "WireType",
    "Box", "Default", "Err", "From", "None", "Ok", "Option", "Result", "Some", "String", "Vec",
];

/// Methods every generated struct has, inherent or derived.
const RESERVED_METHODS: &[&str] = &[
    "encode", "encode_to", "decode", "decode_from", "merge_from", "merge_at",
    "default", "clone", "eq", "ne", "fmt",
];

/// Emits Rust source through [compile_schema_to_rust].
#[derive(Debug, Clone, Copy, Default)]
pub struct RustEmitter;

impl Emitter for RustEmitter {
    fn emit(&self, schema: &SchemaSet, codecs: &CodecSet) -> String {
        compile_schema_to_rust(schema, codecs)
    }
}

/// Escapes Rust reserved keywords by suffixing with an underscore. Names
/// that are empty or start with a digit get a leading underscore first.
fn escape_rust_keyword(s: &str) -> String {
    let s = if s.is_empty() || s.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", s)
    } else {
        s.to_string()
    };
    if RUST_KEYWORDS.contains(&s.as_str()) {
        format!("{}_", s)
    } else {
        s
    }
}

/// Rust name of a message or enum: the path below the package, each
/// component in PascalCase.
fn rust_type_name(full_name: &str, package: &str) -> String {
    let local = match full_name.strip_prefix(package) {
        Some(rest) if !package.is_empty() && rest.starts_with('.') => &rest[1..],
        _ => full_name,
    };
    escape_rust_keyword(&local.split('.').map(to_pascal_case).collect::<String>())
}

fn field_ident(name: &str) -> String {
    escape_rust_keyword(&to_snake_case(name))
}

fn variant_ident(name: &str) -> String {
    escape_rust_keyword(&to_pascal_case(name))
}

/// Identifiers taken within one namespace. A name already taken gets
/// underscores appended until it is free.
#[derive(Debug, Default)]
struct Scope {
    taken: HashSet<String>,
}

impl Scope {
    fn with_reserved(reserved: &[&str]) -> Scope {
        Scope { taken: reserved.iter().map(|name| name.to_string()).collect() }
    }

    fn claim(&mut self, mut ident: String) -> String {
        while !self.taken.insert(ident.clone()) {
            ident.push('_');
        }
        ident
    }
}

/// Oneof groups in the order their first member is declared.
fn oneof_groups(message: &MessageSchema) -> Vec<&str> {
    let mut groups: Vec<&str> = Vec::new();
    for group in message.fields.iter().filter_map(|f| f.oneof_group.as_deref()) {
        if !groups.contains(&group) {
            groups.push(group);
        }
    }
    groups
}

/// Module-level names: every message and enum, then every oneof enum,
/// each unique. Names outside the registry keep their plain form.
#[derive(Debug)]
struct Names {
    package: String,
    types:   HashMap<String, String>,
    oneofs:  HashMap<(String, String), String>,
}

impl Names {
    fn new(registry: &TypeRegistry, package: &str) -> Names {
        let mut scope = Scope::with_reserved(RESERVED_TYPES);
        let mut types = HashMap::new();
        let full_names = registry.messages().map(|m| &m.name).chain(registry.enums().map(|e| &e.name));
        for full_name in full_names {
            types.insert(full_name.clone(), scope.claim(rust_type_name(full_name, package)));
        }

        let mut names = Names { package: package.to_string(), types, oneofs: HashMap::new() };
        for message in registry.messages() {
            for group in oneof_groups(message) {
                let enum_name = scope.claim(names.plain_oneof_type(&message.name, group));
                names.oneofs.insert((message.name.clone(), group.to_string()), enum_name);
            }
        }
        names
    }

    fn type_name(&self, full_name: &str) -> String {
        match self.types.get(full_name) {
            Some(name) => name.clone(),
            None => rust_type_name(full_name, &self.package),
        }
    }

    fn plain_oneof_type(&self, message: &str, group: &str) -> String {
        escape_rust_keyword(&format!("{}{}", self.type_name(message), to_pascal_case(group)))
    }

    /// Name of the enum standing for `group` in `message`.
    fn oneof_type(&self, message: &str, group: &str) -> String {
        match self.oneofs.get(&(message.to_string(), group.to_string())) {
            Some(name) => name.clone(),
            None => self.plain_oneof_type(message, group),
        }
    }
}

/// Rust names for one schema field.
#[derive(Debug)]
struct Member {
    /// Struct field holding the value: the field itself, or its oneof group.
    ident:   String,
    /// Variant in the group's enum, for oneof members.
    variant: Option<String>,
    /// Accessor returning the declared default.
    getter:  Option<String>,
}

/// Struct-level names, keyed by tag. `unknown_fields` and the generated
/// methods are never handed out.
#[derive(Debug)]
struct Members {
    by_tag: HashMap<u32, Member>,
}

impl Members {
    fn new(message: &MessageSchema) -> Members {
        let mut fields = Scope::with_reserved(&["unknown_fields"]);
        let mut methods = Scope::with_reserved(RESERVED_METHODS);
        let mut groups: HashMap<&str, String> = HashMap::new();
        let mut variants: HashMap<&str, Scope> = HashMap::new();
        let mut by_tag = HashMap::new();

        for field in &message.fields {
            let member = match field.oneof_group.as_deref() {
                Some(group) => {
                    let ident = groups.entry(group).or_insert_with(|| fields.claim(field_ident(group))).clone();
                    let variant = variants.entry(group).or_default().claim(variant_ident(&field.name));
                    Member { ident, variant: Some(variant), getter: None }
                }
                None => {
                    let ident = fields.claim(field_ident(&field.name));
                    let getter = field.default_value.as_ref().map(|_| methods.claim(ident.clone()));
                    Member { ident, variant: None, getter }
                }
            };
            by_tag.insert(field.tag, member);
        }
        Members { by_tag }
    }

    fn get(&self, tag: u32) -> Option<&Member> {
        self.by_tag.get(&tag)
    }
}

fn scalar_rust_type(scalar: Scalar) -> &'static str {
    match scalar {
        Scalar::Int32 | Scalar::SInt32 | Scalar::SFixed32 | Scalar::Enum => "i32",
        Scalar::Int64 | Scalar::SInt64 | Scalar::SFixed64 => "i64",
        Scalar::UInt32 | Scalar::Fixed32 => "u32",
        Scalar::UInt64 | Scalar::Fixed64 => "u64",
        Scalar::Bool => "bool",
        Scalar::Float => "f32",
        Scalar::Double => "f64",
        Scalar::String => "String",
        Scalar::Bytes => "Vec<u8>",
    }
}

fn is_copy(scalar: Scalar) -> bool {
    !matches!(scalar, Scalar::String | Scalar::Bytes)
}

/// Type of one element of a field: a scalar, `i32` for enums, or the
/// generated struct for messages.
fn element_type(field_type: &FieldType, names: &Names) -> String {
    match field_type {
        FieldType::Message(name) => names.type_name(name),
        FieldType::Map(key, value) => format!("({}, {})", element_type(key, names), element_type(value, names)),
        other => Scalar::of(other).map(scalar_rust_type).unwrap_or("()").to_string(),
    }
}

fn field_rust_type(field: &FieldDescriptor, names: &Names) -> String {
    let element = element_type(&field.field_type, names);
    if field.is_repeated() {
        format!("Vec<{}>", element)
    } else if matches!(field.field_type, FieldType::Message(_)) {
        format!("Option<Box<{}>>", element)
    } else if field.cardinality == Cardinality::Optional {
        format!("Option<{}>", element)
    } else {
        element
    }
}

fn wire_type_path(wire_type: WireType) -> &'static str {
    match wire_type {
        WireType::Varint => "WireType::Varint",
        WireType::Fixed64 => "WireType::Fixed64",
        WireType::LengthDelimited => "WireType::LengthDelimited",
        WireType::Fixed32 => "WireType::Fixed32",
    }
}

fn key_literal(key: &[u8]) -> String {
    let bytes: Vec<String> = key.iter().map(|b| format!("0x{:02X}", b)).collect();
    format!("&[{}]", bytes.join(", "))
}

/// `place` names a value; `*value` style places are already references.
fn borrow(place: &str) -> String {
    match place.strip_prefix('*') {
        Some(reference) => reference.to_string(),
        None => format!("&{}", place),
    }
}

/// Method receiver for `place`, relying on auto-deref.
fn receiver(place: &str) -> &str {
    place.strip_prefix('*').unwrap_or(place)
}

/// Condition under which an implicit-presence value is written.
fn is_nonzero(scalar: Scalar, place: &str) -> String {
    match scalar {
        Scalar::Bool => place.to_string(),
        Scalar::Float | Scalar::Double => format!("{}.to_bits() != 0", receiver(place)),
        Scalar::String | Scalar::Bytes => format!("!{}.is_empty()", receiver(place)),
        _ => format!("{} != 0", place),
    }
}

/// Statement writing the value at `place` to `buffer`, without a key.
fn write_scalar(buffer: &str, scalar: Scalar, place: &str) -> String {
    let call = match scalar {
        Scalar::Int32 | Scalar::Enum => format!("write_int32({})", place),
        Scalar::Int64 => format!("write_int64({})", place),
        Scalar::UInt32 => format!("write_varint(u64::from({}))", place),
        Scalar::UInt64 => format!("write_varint({})", place),
        Scalar::SInt32 => format!("write_zigzag32({})", place),
        Scalar::SInt64 => format!("write_zigzag64({})", place),
        Scalar::Fixed32 => format!("write_fixed32({})", place),
        Scalar::Fixed64 => format!("write_fixed64({})", place),
        Scalar::SFixed32 => format!("write_fixed32({} as u32)", place),
        Scalar::SFixed64 => format!("write_fixed64({} as u64)", place),
        Scalar::Bool => format!("write_bool({})", place),
        Scalar::Float => format!("write_float({})", place),
        Scalar::Double => format!("write_double({})", place),
        Scalar::String => format!("write_string({})", borrow(place)),
        Scalar::Bytes => format!("write_length_delimited({})", borrow(place)),
    };
    format!("{}.{};", buffer, call)
}

/// Expression reading one value from `buffer`.
fn read_scalar(buffer: &str, scalar: Scalar) -> String {
    match scalar {
        Scalar::Int32 | Scalar::Enum => format!("{}.read_varint32()? as i32", buffer),
        Scalar::Int64 => format!("{}.read_varint()? as i64", buffer),
        Scalar::UInt32 => format!("{}.read_varint32()?", buffer),
        Scalar::UInt64 => format!("{}.read_varint()?", buffer),
        Scalar::SInt32 => format!("{}.read_zigzag32()?", buffer),
        Scalar::SInt64 => format!("{}.read_zigzag64()?", buffer),
        Scalar::Fixed32 => format!("{}.read_fixed32()?", buffer),
        Scalar::Fixed64 => format!("{}.read_fixed64()?", buffer),
        Scalar::SFixed32 => format!("{}.read_fixed32()? as i32", buffer),
        Scalar::SFixed64 => format!("{}.read_fixed64()? as i64", buffer),
        Scalar::Bool => format!("{}.read_bool()?", buffer),
        Scalar::Float => format!("{}.read_float()?", buffer),
        Scalar::Double => format!("{}.read_double()?", buffer),
        Scalar::String => format!("{}.read_string(MAX_LENGTH)?.to_owned()", buffer),
        Scalar::Bytes => format!("{}.read_length_delimited(MAX_LENGTH)?.to_vec()", buffer),
    }
}

fn float_literal(value: f64, type_name: &str) -> String {
    if value.is_nan() {
        format!("{}::NAN", type_name)
    } else if value.is_infinite() {
        let constant = if value > 0.0 { "INFINITY" } else { "NEG_INFINITY" };
        format!("{}::{}", type_name, constant)
    } else {
        format!("{:?}", value)
    }
}

/// Rust literal for a resolved default value.
fn literal(value: &Value) -> Option<String> {
    let literal = match value {
        Value::Bool(v) => v.to_string(),
        Value::Int32(v) | Value::Enum(v) => v.to_string(),
        Value::Int64(v) => v.to_string(),
        Value::UInt32(v) => v.to_string(),
        Value::UInt64(v) => v.to_string(),
        Value::Float(v) => float_literal(f64::from(*v), "f32"),
        Value::Double(v) => float_literal(*v, "f64"),
        Value::String(v) => format!("{:?}", v),
        Value::Bytes(v) => format!("&{:?}", v),
        _ => return None,
    };
    Some(literal)
}

/// Compiles the entire schema into Rust type definitions with wire codecs,
/// as a string. Decode limits are taken from `codecs`.
pub fn compile_schema_to_rust(schema: &SchemaSet, codecs: &CodecSet) -> String {
    let registry = TypeRegistry::from_set(schema);
    let names = Names::new(&registry, schema.package.as_deref().unwrap_or_default());
    let mut rust_code: Vec<String> = Vec::new();

    rust_code.push("// Generated by brine-proto. Do not edit.".to_string());
    rust_code.push("".to_string());

    // Start module
    if let Some(name) = &schema.package {
        rust_code.push(format!("pub mod {} {{", field_ident(&name.replace('.', "_"))));
        rust_code.push("".to_string());
    }

    rust_code.push(
        "use brine_proto_wire::{ByteBuffer, ByteBufferMut, UnknownField, UnknownFields, WireError, WireType};"
            .to_string(),
    );
    rust_code.push("".to_string());

    let limits = codecs.limits();
    rust_code.push(format!("const MAX_LENGTH: usize = {};", limits.max_length));
    rust_code.push(format!("const MAX_DEPTH: usize = {};", limits.max_depth));
    rust_code.push("".to_string());

    for enumeration in registry.enums() {
        rust_code.push(generate_enum(enumeration, &names));
    }

    for message in registry.messages() {
        if let Some(codec) = codecs.get(&message.name) {
            rust_code.push(generate_struct(message, codec, codecs, &names));
        }
    }

    if schema.package.is_some() {
        rust_code.push("}".to_string());
    }

    rust_code.join("\n")
}

/// Generates a `#[repr(i32)]` enum. Aliases become associated constants.
fn generate_enum(enumeration: &EnumSchema, names: &Names) -> String {
    let enum_name = names.type_name(&enumeration.name);
    let mut scope = Scope::default();
    let mut variants = Vec::new();
    let mut aliases = Vec::new();
    let mut match_arms = Vec::new();
    let mut seen: BTreeMap<i32, String> = BTreeMap::new();

    for value in &enumeration.values {
        match seen.get(&value.number) {
            Some(first) => aliases.push(format!(
                "    pub const {}: {} = {}::{};",
                scope.claim(escape_rust_keyword(&to_snake_case(&value.name).to_uppercase())),
                enum_name,
                enum_name,
                first
            )),
            None => {
                let variant_name = scope.claim(variant_ident(&value.name));
                if variants.is_empty() {
                    variants.push("    #[default]".to_string());
                }
                variants.push(format!("    {} = {},", variant_name, value.number));
                match_arms.push(format!("            {} => Some({}::{}),", value.number, enum_name, variant_name));
                seen.insert(value.number, variant_name);
            }
        }
    }
    match_arms.push("            _ => None,".to_string());

    let mut lines = Vec::new();
    lines.push("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]".to_string());
    lines.push("#[repr(i32)]".to_string());
    lines.push(format!("pub enum {} {{", enum_name));
    lines.extend(variants);
    lines.push("}".to_string());
    lines.push("".to_string());

    lines.push(format!("impl {} {{", enum_name));
    if !aliases.is_empty() {
        lines.extend(aliases);
        lines.push("".to_string());
    }
    lines.push(format!("    pub fn from_i32(value: i32) -> Option<{}> {{", enum_name));
    lines.push("        match value {".to_string());
    lines.extend(match_arms);
    lines.push("        }".to_string());
    lines.push("    }".to_string());
    lines.push("}".to_string());
    lines.push("".to_string());

    lines.push(format!("impl From<{}> for i32 {{", enum_name));
    lines.push(format!("    fn from(value: {}) -> i32 {{", enum_name));
    lines.push("        value as i32".to_string());
    lines.push("    }".to_string());
    lines.push("}".to_string());
    lines.push("".to_string());

    lines.join("\n")
}

/// Generates the enum standing for one oneof group.
fn generate_oneof(message: &MessageSchema, group: &str, enum_name: &str, members: &Members, names: &Names) -> String {
    let mut lines = Vec::new();
    lines.push("#[derive(Debug, Clone, PartialEq)]".to_string());
    lines.push(format!("pub enum {} {{", enum_name));
    for field in message.fields.iter().filter(|f| f.oneof_group.as_deref() == Some(group)) {
        let Some(variant) = members.get(field.tag).and_then(|m| m.variant.as_deref()) else {
            continue;
        };
        if field.deprecated {
            lines.push("    #[deprecated]".to_string());
        }
        let member_type = match &field.field_type {
            FieldType::Message(name) => format!("Box<{}>", names.type_name(name)),
            other => element_type(other, names),
        };
        lines.push(format!("    {}({}),", variant, member_type));
    }
    lines.push("}".to_string());
    lines.push("".to_string());
    lines.join("\n")
}

/// Generates the struct for a message and its `encode` / `decode` impl.
fn generate_struct(message: &MessageSchema, codec: &MessageCodec, codecs: &CodecSet, names: &Names) -> String {
    let struct_name = names.type_name(&message.name);
    let members = Members::new(message);
    let mut fields = Vec::new();
    let mut oneofs = Vec::new();
    let mut groups_seen = BTreeSet::new();

    for field in &message.fields {
        let Some(member) = members.get(field.tag) else {
            continue;
        };
        if let Some(group) = &field.oneof_group {
            if groups_seen.insert(group.as_str()) {
                let enum_name = names.oneof_type(&message.name, group);
                fields.push(format!("    pub {}: Option<{}>,", member.ident, enum_name));
                oneofs.push(generate_oneof(message, group, &enum_name, &members, names));
            }
            continue;
        }
        let mut field_line = String::new();
        if field.deprecated {
            field_line.push_str("    #[deprecated]\n");
        }
        field_line.push_str(&format!("    pub {}: {},", member.ident, field_rust_type(field, names)));
        fields.push(field_line);
    }
    fields.push("    pub unknown_fields: UnknownFields,".to_string());

    let mut lines = oneofs;
    lines.push("#[derive(Debug, Clone, PartialEq, Default)]".to_string());
    lines.push(format!("pub struct {} {{", struct_name));
    lines.extend(fields);
    lines.push("}".to_string());
    lines.push("".to_string());

    if message.fields.iter().any(|f| f.deprecated) {
        lines.push("#[allow(deprecated)]".to_string());
    }
    lines.push(format!("impl {} {{", struct_name));
    lines.extend(generate_defaults(message, codec, &members));

    lines.push("    pub fn encode(&self) -> Vec<u8> {".to_string());
    lines.push("        let mut bb = ByteBufferMut::new();".to_string());
    lines.push("        self.encode_to(&mut bb);".to_string());
    lines.push("        bb.data()".to_string());
    lines.push("    }".to_string());
    lines.push("".to_string());

    lines.push("    /// Writes known fields in declared order, then unknown fields.".to_string());
    lines.push("    pub fn encode_to(&self, bb: &mut ByteBufferMut) {".to_string());
    lines.extend(generate_encode(message, codec, codecs, &members, names));
    lines.push("        self.unknown_fields.write_to(bb);".to_string());
    lines.push("    }".to_string());
    lines.push("".to_string());

    lines.push(format!("    pub fn decode(data: &[u8]) -> Result<{}, WireError> {{", struct_name));
    lines.push("        let mut bb = ByteBuffer::new(data);".to_string());
    lines.push(format!("        {}::decode_from(&mut bb)", struct_name));
    lines.push("    }".to_string());
    lines.push("".to_string());

    lines.push(format!("    pub fn decode_from(bb: &mut ByteBuffer) -> Result<{}, WireError> {{", struct_name));
    lines.push(format!("        let mut message = {}::default();", struct_name));
    lines.push("        message.merge_at(bb, 0)?;".to_string());
    lines.push("        Ok(message)".to_string());
    lines.push("    }".to_string());
    lines.push("".to_string());

    lines.push("    /// Reads fields until `bb` is exhausted, merging them into `self`.".to_string());
    lines.push("    pub fn merge_from(&mut self, bb: &mut ByteBuffer) -> Result<(), WireError> {".to_string());
    lines.push("        self.merge_at(bb, 0)".to_string());
    lines.push("    }".to_string());
    lines.push("".to_string());

    lines.push("    fn merge_at(&mut self, bb: &mut ByteBuffer, depth: usize) -> Result<(), WireError> {".to_string());
    lines.push("        if depth > MAX_DEPTH {".to_string());
    lines.push("            return Err(WireError::LimitExceeded {".to_string());
    lines.push("                offset: bb.offset(),".to_string());
    lines.push("                what:   \"nesting depth\",".to_string());
    lines.push("                limit:  MAX_DEPTH,".to_string());
    lines.push("                actual: depth,".to_string());
    lines.push("            });".to_string());
    lines.push("        }".to_string());
    lines.push("        while !bb.is_empty() {".to_string());
    lines.push("            let start = bb.index();".to_string());
    lines.push("            let key = bb.read_tag_key()?;".to_string());
    lines.push("            match (key.tag, key.wire_type) {".to_string());
    lines.extend(generate_decode_arms(message, codec, &members, names));
    lines.push(
        "                (tag, wire_type) => self.unknown_fields.push(UnknownField::read(bb, start, tag, wire_type, MAX_LENGTH)?),"
            .to_string(),
    );
    lines.push("            }".to_string());
    lines.push("        }".to_string());
    lines.push("        Ok(())".to_string());
    lines.push("    }".to_string());
    lines.push("}".to_string());
    lines.push("".to_string());

    lines.join("\n")
}

/// Accessors returning the declared default of unset `optional` fields.
fn generate_defaults(message: &MessageSchema, codec: &MessageCodec, members: &Members) -> Vec<String> {
    let mut lines = Vec::new();
    for field in &message.fields {
        let (Some(step), Some(member)) = (codec.step(field.tag), members.get(field.tag)) else {
            continue;
        };
        let (Some(default), Some(getter), EncodeOp::Scalar { scalar }) = (&step.default, &member.getter, &step.op)
        else {
            continue;
        };
        let Some(literal) = literal(default) else {
            continue;
        };
        let name = &member.ident;
        let (return_type, body) = match scalar {
            Scalar::String => ("&str".to_string(), format!("self.{}.as_deref().unwrap_or({})", name, literal)),
            Scalar::Bytes => ("&[u8]".to_string(), format!("self.{}.as_deref().unwrap_or({})", name, literal)),
            other => (scalar_rust_type(*other).to_string(), format!("self.{}.unwrap_or({})", name, literal)),
        };
        lines.push(format!("    pub fn {}(&self) -> {} {{", getter, return_type));
        lines.push(format!("        {}", body));
        lines.push("    }".to_string());
        lines.push("".to_string());
    }
    lines
}

fn generate_encode(
    message: &MessageSchema,
    codec: &MessageCodec,
    codecs: &CodecSet,
    members: &Members,
    names: &Names,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut groups_seen = BTreeSet::new();

    for step in &codec.encode.steps {
        let (Some(field), Some(member)) = (message.field_by_tag(step.tag), members.get(step.tag)) else {
            continue;
        };
        let name = &member.ident;
        let key = key_literal(&step.key);

        match (&step.op, &step.presence) {
            (_, Presence::Oneof(group)) => {
                if groups_seen.insert(group.as_str()) {
                    lines.extend(generate_oneof_encode(message, codec, group, members, names));
                }
            }

            (EncodeOp::Scalar { scalar }, Presence::Implicit) => {
                let place = format!("self.{}", name);
                lines.push(format!("        if {} {{", is_nonzero(*scalar, &place)));
                lines.push(format!("            bb.write_bytes({});", key));
                lines.push(format!("            {}", write_scalar("bb", *scalar, &place)));
                lines.push("        }".to_string());
            }

            (EncodeOp::Scalar { scalar }, _) => {
                let (pattern, place) = if is_copy(*scalar) {
                    (format!("if let Some(value) = self.{} {{", name), "value")
                } else {
                    (format!("if let Some(value) = &self.{} {{", name), "*value")
                };
                lines.push(format!("        {}", pattern));
                lines.push(format!("            bb.write_bytes({});", key));
                lines.push(format!("            {}", write_scalar("bb", *scalar, place)));
                lines.push("        }".to_string());
            }

            (EncodeOp::RepeatedScalar { scalar }, _) => {
                let (pattern, place) = if is_copy(*scalar) {
                    (format!("for &value in &self.{} {{", name), "value")
                } else {
                    (format!("for value in &self.{} {{", name), "*value")
                };
                lines.push(format!("        {}", pattern));
                lines.push(format!("            bb.write_bytes({});", key));
                lines.push(format!("            {}", write_scalar("bb", *scalar, place)));
                lines.push("        }".to_string());
            }

            (EncodeOp::Packed { scalar }, _) => {
                lines.push(format!("        if !self.{}.is_empty() {{", name));
                lines.push("            let mut packed = ByteBufferMut::new();".to_string());
                lines.push(format!("            for &value in &self.{} {{", name));
                lines.push(format!("                {}", write_scalar("packed", *scalar, "value")));
                lines.push("            }".to_string());
                lines.push(format!("            bb.write_bytes({});", key));
                lines.push("            bb.write_length_delimited(packed.as_slice());".to_string());
                lines.push("        }".to_string());
            }

            (EncodeOp::Message { .. }, _) => {
                lines.push(format!("        if let Some(value) = &self.{} {{", name));
                lines.push(format!("            bb.write_bytes({});", key));
                lines.push("            bb.write_length_delimited(&value.encode());".to_string());
                lines.push("        }".to_string());
            }

            (EncodeOp::RepeatedMessage { .. }, _) => {
                lines.push(format!("        for value in &self.{} {{", name));
                lines.push(format!("            bb.write_bytes({});", key));
                lines.push("            bb.write_length_delimited(&value.encode());".to_string());
                lines.push("        }".to_string());
            }

            (EncodeOp::Map { entry }, _) => {
                let (FieldType::Map(key_type, value_type), Some(entry_codec)) = (&field.field_type, codecs.get(entry))
                else {
                    continue;
                };
                lines.push(format!("        for (key, value) in &self.{} {{", name));
                lines.push("            let mut entry = ByteBufferMut::new();".to_string());
                lines.extend(entry_write(entry_codec, 1, key_type, "*key"));
                lines.extend(entry_write(entry_codec, 2, value_type, "*value"));
                lines.push(format!("            bb.write_bytes({});", key));
                lines.push("            bb.write_length_delimited(entry.as_slice());".to_string());
                lines.push("        }".to_string());
            }
        }
    }
    lines
}

/// Writes the key or value of a map entry the way a singular field of the
/// entry message is written.
fn entry_write(entry_codec: &MessageCodec, tag: u32, field_type: &FieldType, place: &str) -> Vec<String> {
    let Some(step) = entry_codec.step(tag) else {
        return vec![];
    };
    let key = key_literal(&step.key);
    match Scalar::of(field_type) {
        Some(scalar) => vec![
            format!("            if {} {{", is_nonzero(scalar, place)),
            format!("                entry.write_bytes({});", key),
            format!("                {}", write_scalar("entry", scalar, place)),
            "            }".to_string(),
        ],
        None => vec![
            format!("            entry.write_bytes({});", key),
            format!("            entry.write_length_delimited(&{}.encode());", receiver(place)),
        ],
    }
}

fn generate_oneof_encode(
    message: &MessageSchema,
    codec: &MessageCodec,
    group: &str,
    members: &Members,
    names: &Names,
) -> Vec<String> {
    let enum_name = names.oneof_type(&message.name, group);
    let mut lines = Vec::new();
    let mut group_field = None;
    for field in message.fields.iter().filter(|f| f.oneof_group.as_deref() == Some(group)) {
        let (Some(step), Some(member)) = (codec.step(field.tag), members.get(field.tag)) else {
            continue;
        };
        let Some(variant) = &member.variant else {
            continue;
        };
        group_field.get_or_insert(member.ident.as_str());
        lines.push(format!("            Some({}::{}(value)) => {{", enum_name, variant));
        lines.push(format!("                bb.write_bytes({});", key_literal(&step.key)));
        match &step.op {
            EncodeOp::Scalar { scalar } => {
                lines.push(format!("                {}", write_scalar("bb", *scalar, "*value")));
            }
            _ => lines.push("                bb.write_length_delimited(&value.encode());".to_string()),
        }
        lines.push("            }".to_string());
    }
    let Some(group_field) = group_field else {
        return vec![];
    };
    lines.insert(0, format!("        match &self.{} {{", group_field));
    lines.push("            None => {}".to_string());
    lines.push("        }".to_string());
    lines
}

fn generate_decode_arms(
    message: &MessageSchema,
    codec: &MessageCodec,
    members: &Members,
    names: &Names,
) -> Vec<String> {
    let mut lines = Vec::new();

    for field in &message.fields {
        let (Some(arm), Some(member)) = (codec.decode.arms.get(&field.tag), members.get(field.tag)) else {
            continue;
        };
        let name = &member.ident;
        let pattern = format!("({}, {})", field.tag, wire_type_path(arm.wire_type));
        let scalar = Scalar::of(&field.field_type);

        if let (Some(group), Some(variant)) = (&field.oneof_group, &member.variant) {
            let variant = format!("{}::{}", names.oneof_type(&message.name, group), variant);
            match (&field.field_type, scalar) {
                (FieldType::Message(type_name), _) => {
                    let type_name = names.type_name(type_name);
                    lines.push(format!("                {} => {{", pattern));
                    lines.push("                    let mut sub = bb.sub_buffer(MAX_LENGTH)?;".to_string());
                    lines.push(format!("                    match &mut self.{} {{", name));
                    lines.push(format!(
                        "                        Some({}(value)) => value.merge_at(&mut sub, depth + 1)?,",
                        variant
                    ));
                    lines.push("                        _ => {".to_string());
                    lines.push(format!("                            let mut value = Box::<{}>::default();", type_name));
                    lines.push("                            value.merge_at(&mut sub, depth + 1)?;".to_string());
                    lines.push(format!("                            self.{} = Some({}(value));", name, variant));
                    lines.push("                        }".to_string());
                    lines.push("                    }".to_string());
                    lines.push("                }".to_string());
                }
                (_, Some(scalar)) => lines.push(format!(
                    "                {} => self.{} = Some({}({})),",
                    pattern,
                    name,
                    variant,
                    read_scalar("bb", scalar)
                )),
                _ => {}
            }
            continue;
        }

        match (&field.field_type, scalar) {
            (FieldType::Map(key_type, value_type), _) => {
                lines.push(format!("                {} => {{", pattern));
                lines.extend(map_entry_decode(name, key_type, value_type, names));
                lines.push("                }".to_string());
            }

            (FieldType::Message(type_name), _) if field.is_repeated() => {
                lines.push(format!("                {} => {{", pattern));
                lines.push("                    let mut sub = bb.sub_buffer(MAX_LENGTH)?;".to_string());
                lines.push(format!("                    let mut value = {}::default();", names.type_name(type_name)));
                lines.push("                    value.merge_at(&mut sub, depth + 1)?;".to_string());
                lines.push(format!("                    self.{}.push(value);", name));
                lines.push("                }".to_string());
            }

            (FieldType::Message(_), _) => {
                lines.push(format!("                {} => {{", pattern));
                lines.push("                    let mut sub = bb.sub_buffer(MAX_LENGTH)?;".to_string());
                lines.push(format!(
                    "                    self.{}.get_or_insert_with(Default::default).merge_at(&mut sub, depth + 1)?;",
                    name
                ));
                lines.push("                }".to_string());
            }

            (_, Some(scalar)) if field.cardinality.is_repeated() => {
                lines.push(format!("                {} => self.{}.push({}),", pattern, name, read_scalar("bb", scalar)));
                if arm.accepts_packed {
                    lines.push(format!("                ({}, WireType::LengthDelimited) => {{", field.tag));
                    lines.push("                    let mut packed = bb.sub_buffer(MAX_LENGTH)?;".to_string());
                    lines.push("                    while !packed.is_empty() {".to_string());
                    lines.push(format!("                        self.{}.push({});", name, read_scalar("packed", scalar)));
                    lines.push("                    }".to_string());
                    lines.push("                }".to_string());
                }
            }

            (_, Some(scalar)) if field.cardinality == Cardinality::Optional => {
                lines.push(format!("                {} => self.{} = Some({}),", pattern, name, read_scalar("bb", scalar)));
            }

            (_, Some(scalar)) => {
                lines.push(format!("                {} => self.{} = {},", pattern, name, read_scalar("bb", scalar)));
            }

            _ => {}
        }
    }

    lines
}

/// Reads one map entry; a missing key or value keeps its zero value and a
/// repeated key replaces the earlier entry.
fn map_entry_decode(name: &str, key_type: &FieldType, value_type: &FieldType, names: &Names) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push("                    let mut entry = bb.sub_buffer(MAX_LENGTH)?;".to_string());
    lines.push(format!("                    let mut key: {} = Default::default();", element_type(key_type, names)));
    lines.push(format!("                    let mut value: {} = Default::default();", element_type(value_type, names)));
    lines.push("                    while !entry.is_empty() {".to_string());
    lines.push("                        let field = entry.read_tag_key()?;".to_string());
    lines.push("                        match (field.tag, field.wire_type) {".to_string());
    if let Some(scalar) = Scalar::of(key_type) {
        lines.push(format!(
            "                            (1, {}) => key = {},",
            wire_type_path(scalar.wire_type()),
            read_scalar("entry", scalar)
        ));
    }
    match Scalar::of(value_type) {
        Some(scalar) => lines.push(format!(
            "                            (2, {}) => value = {},",
            wire_type_path(scalar.wire_type()),
            read_scalar("entry", scalar)
        )),
        None => lines.push(
            "                            (2, WireType::LengthDelimited) => value.merge_at(&mut entry.sub_buffer(MAX_LENGTH)?, depth + 1)?,"
                .to_string(),
        ),
    }
    lines.push("                            (_, wire_type) => {".to_string());
    lines.push("                                entry.skip_value(wire_type, MAX_LENGTH)?;".to_string());
    lines.push("                            }".to_string());
    lines.push("                        }".to_string());
    lines.push("                    }".to_string());
    lines.push(format!("                    match self.{}.iter_mut().find(|(k, _)| *k == key) {{", name));
    lines.push("                        Some(existing) => existing.1 = value,".to_string());
    lines.push(format!("                        None => self.{}.push((key, value)),", name));
    lines.push("                    }".to_string());
    lines
}
