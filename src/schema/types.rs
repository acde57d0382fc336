//! Avro schema model
//!
//! Named types are stored once, in a [`TypeMap`] keyed by full name. Every
//! use of a named type inside another schema, whether it was written inline
//! or as a reference, is a [`Schema::Ref`]. Equality therefore compares the
//! structure of one definition at a time; nested named types are checked
//! under their own names.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

/// Custom properties attached to a schema (`logicalType`, `avro.java.string`, ...)
pub type Props = BTreeMap<String, Value>;

/// Named type definitions keyed by full name, in declaration order
pub type TypeMap = IndexMap<String, Schema>;

/// Primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 8] = [
        Self::Null,
        Self::Boolean,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
        Self::Bytes,
        Self::String,
    ];

    /// The Avro type name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Bytes => "bytes",
            Self::String => "string",
        }
    }

    /// Look up a primitive by its Avro type name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }
}

/// A possibly namespaced type name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    pub name: String,
    pub namespace: Option<String>,
}

impl Name {
    pub fn new(name: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
        }
    }

    /// Split a dotted name into namespace and simple name. Undotted names
    /// take the given namespace.
    pub fn parse(raw: &str, namespace: Option<&str>) -> Self {
        match raw.rfind('.') {
            Some(idx) => Self::new(&raw[idx + 1..], Some(&raw[..idx])),
            None => Self::new(raw, namespace),
        }
    }

    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}.{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Sort order of a record field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldOrder {
    #[default]
    Ascending,
    Descending,
    Ignore,
}

impl FieldOrder {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
            Self::Ignore => "ignore",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ascending" => Some(Self::Ascending),
            "descending" => Some(Self::Descending),
            "ignore" => Some(Self::Ignore),
            _ => None,
        }
    }
}

/// Record field
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    pub default: Option<Value>,
    pub order: FieldOrder,
    pub doc: Option<String>,
    pub aliases: BTreeSet<String>,
    pub props: Props,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            default: None,
            order: FieldOrder::default(),
            doc: None,
            aliases: BTreeSet::new(),
            props: Props::new(),
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

// Documentation and aliases never take part in equality.
impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.schema == other.schema
            && self.default == other.default
            && self.order == other.order
            && self.props == other.props
    }
}

/// Record (or error) definition
#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub name: Name,
    pub doc: Option<String>,
    pub aliases: BTreeSet<String>,
    pub fields: Vec<Field>,
    pub is_error: bool,
    pub props: Props,
}

impl RecordSchema {
    pub fn new(name: Name, fields: Vec<Field>) -> Self {
        Self {
            name,
            doc: None,
            aliases: BTreeSet::new(),
            fields,
            is_error: false,
            props: Props::new(),
        }
    }
}

impl PartialEq for RecordSchema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.is_error == other.is_error
            && self.fields == other.fields
            && self.props == other.props
    }
}

/// Enum definition
#[derive(Debug, Clone)]
pub struct EnumSchema {
    pub name: Name,
    pub doc: Option<String>,
    pub aliases: BTreeSet<String>,
    pub symbols: Vec<String>,
    pub props: Props,
}

impl EnumSchema {
    pub fn new(name: Name, symbols: Vec<String>) -> Self {
        Self {
            name,
            doc: None,
            aliases: BTreeSet::new(),
            symbols,
            props: Props::new(),
        }
    }
}

impl PartialEq for EnumSchema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.symbols == other.symbols && self.props == other.props
    }
}

/// Fixed-size definition
#[derive(Debug, Clone)]
pub struct FixedSchema {
    pub name: Name,
    pub doc: Option<String>,
    pub aliases: BTreeSet<String>,
    pub size: usize,
    pub props: Props,
}

impl FixedSchema {
    pub fn new(name: Name, size: usize) -> Self {
        Self {
            name,
            doc: None,
            aliases: BTreeSet::new(),
            size,
            props: Props::new(),
        }
    }
}

impl PartialEq for FixedSchema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.size == other.size && self.props == other.props
    }
}

/// An Avro schema
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Primitive(PrimitiveType, Props),
    Array { items: Box<Schema>, props: Props },
    Map { values: Box<Schema>, props: Props },
    Union(Vec<Schema>),
    Record(RecordSchema),
    Enum(EnumSchema),
    Fixed(FixedSchema),
    /// Use of a named type, by full name
    Ref(String),
}

impl Schema {
    pub fn primitive(p: PrimitiveType) -> Self {
        Self::Primitive(p, Props::new())
    }

    pub fn array(items: Schema) -> Self {
        Self::Array { items: Box::new(items), props: Props::new() }
    }

    pub fn map(values: Schema) -> Self {
        Self::Map { values: Box::new(values), props: Props::new() }
    }

    pub fn reference(fullname: impl Into<String>) -> Self {
        Self::Ref(fullname.into())
    }

    /// Name of a named definition
    pub fn name(&self) -> Option<&Name> {
        match self {
            Self::Record(r) => Some(&r.name),
            Self::Enum(e) => Some(&e.name),
            Self::Fixed(f) => Some(&f.name),
            _ => None,
        }
    }

    pub fn fullname(&self) -> Option<String> {
        self.name().map(Name::fullname)
    }

    /// Short description of the schema kind, used in messages and union checks
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Primitive(p, _) => p.name(),
            Self::Array { .. } => "array",
            Self::Map { .. } => "map",
            Self::Union(_) => "union",
            Self::Record(r) if r.is_error => "error",
            Self::Record(_) => "record",
            Self::Enum(_) => "enum",
            Self::Fixed(_) => "fixed",
            Self::Ref(_) => "reference",
        }
    }

    pub fn props(&self) -> Option<&Props> {
        match self {
            Self::Primitive(_, props) => Some(props),
            Self::Array { props, .. } | Self::Map { props, .. } => Some(props),
            Self::Record(r) => Some(&r.props),
            Self::Enum(e) => Some(&e.props),
            Self::Fixed(f) => Some(&f.props),
            Self::Union(_) | Self::Ref(_) => None,
        }
    }

    /// Full names of every named type this definition uses directly
    pub fn references(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut Vec<String>) {
        match self {
            Self::Ref(name) => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            Self::Array { items, .. } => items.collect_references(out),
            Self::Map { values, .. } => values.collect_references(out),
            Self::Union(branches) => branches.iter().for_each(|b| b.collect_references(out)),
            Self::Record(r) => r.fields.iter().for_each(|f| f.schema.collect_references(out)),
            Self::Primitive(..) | Self::Enum(_) | Self::Fixed(_) => {}
        }
    }
}
