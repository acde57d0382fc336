//! Avro schema JSON
//!
//! Parsing turns `.avsc` JSON into [`Schema`] values, registering every named
//! definition with the [`ParseContext`]. Writing goes the other way and
//! inlines each named type at its first occurrence.

use std::collections::{BTreeSet, HashSet};

use serde_json::{Map, Value};

use crate::schema::context::{is_identifier, validate_union, Lookup, ParseContext};
use crate::schema::types::{
    EnumSchema, Field, FieldOrder, FixedSchema, Name, PrimitiveType, Props, RecordSchema, Schema,
};
use crate::utils::{Error, Result};

const RECORD_KEYS: &[&str] = &["type", "name", "namespace", "doc", "aliases", "fields"];
const ENUM_KEYS: &[&str] = &["type", "name", "namespace", "doc", "aliases", "symbols"];
const FIXED_KEYS: &[&str] = &["type", "name", "namespace", "doc", "aliases", "size"];
const FIELD_KEYS: &[&str] = &["name", "type", "default", "order", "doc", "aliases"];

// ==================== Parsing ====================

/// Parse a complete `.avsc` document
pub fn parse_document(text: &str, ctx: &mut ParseContext) -> Result<Schema> {
    let value: Value = serde_json::from_str(text)?;
    parse_schema(&value, None, ctx)
}

/// Parse one schema value within an enclosing namespace
pub fn parse_schema(value: &Value, namespace: Option<&str>, ctx: &mut ParseContext) -> Result<Schema> {
    match value {
        Value::String(name) => ctx.resolve(name, namespace),
        Value::Array(branches) => {
            let branches = branches
                .iter()
                .map(|b| parse_schema(b, namespace, ctx))
                .collect::<Result<Vec<_>>>()?;
            validate_union(&branches)?;
            Ok(Schema::Union(branches))
        }
        Value::Object(map) => parse_object(map, namespace, ctx),
        other => Err(Error::InvalidSchema(format!("Not a schema: {}", other))),
    }
}

fn parse_object(map: &Map<String, Value>, namespace: Option<&str>, ctx: &mut ParseContext) -> Result<Schema> {
    let ty = match map.get("type") {
        Some(Value::String(ty)) => ty.as_str(),
        Some(nested) => return parse_schema(nested, namespace, ctx),
        None => {
            return Err(Error::InvalidSchema(format!(
                "No type: {}",
                Value::Object(map.clone())
            )))
        }
    };

    if let Some(p) = PrimitiveType::from_name(ty) {
        return Ok(Schema::Primitive(p, extra_props(map, &["type"])));
    }

    match ty {
        "record" | "error" => parse_record(map, ty == "error", namespace, ctx),
        "enum" => parse_enum(map, namespace, ctx),
        "fixed" => parse_fixed(map, namespace, ctx),
        "array" => {
            let items = map
                .get("items")
                .ok_or_else(|| Error::InvalidSchema("Array has no items type".to_string()))?;
            Ok(Schema::Array {
                items: Box::new(parse_schema(items, namespace, ctx)?),
                props: extra_props(map, &["type", "items"]),
            })
        }
        "map" => {
            let values = map
                .get("values")
                .ok_or_else(|| Error::InvalidSchema("Map has no values type".to_string()))?;
            Ok(Schema::Map {
                values: Box::new(parse_schema(values, namespace, ctx)?),
                props: extra_props(map, &["type", "values"]),
            })
        }
        name => ctx.resolve(name, namespace),
    }
}

fn parse_record(
    map: &Map<String, Value>,
    is_error: bool,
    namespace: Option<&str>,
    ctx: &mut ParseContext,
) -> Result<Schema> {
    let name = parse_name(map, namespace)?;
    ctx.begin_definition(&name)?;

    let field_values = map
        .get("fields")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::InvalidSchema(format!("Record has no fields: {}", name)))?;

    let mut fields: Vec<Field> = Vec::with_capacity(field_values.len());
    for value in field_values {
        let field = parse_field(value, name.namespace.as_deref(), ctx)?;
        if fields.iter().any(|f| f.name == field.name) {
            return Err(Error::DuplicateField {
                record: name.fullname(),
                field: field.name,
            });
        }
        ctx.check_default(&name, &field)?;
        fields.push(field);
    }

    let record = RecordSchema {
        doc: doc(map),
        aliases: qualified_aliases(map, &name)?,
        fields,
        is_error,
        props: extra_props(map, RECORD_KEYS),
        name,
    };
    ctx.finish_definition(Schema::Record(record))
}

pub(crate) fn parse_field(value: &Value, namespace: Option<&str>, ctx: &mut ParseContext) -> Result<Field> {
    let map = value
        .as_object()
        .ok_or_else(|| Error::InvalidSchema(format!("Field is not an object: {}", value)))?;
    let name = map
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidSchema("No field name".to_string()))?;
    if !is_identifier(name) {
        return Err(Error::InvalidName { name: name.to_string() });
    }
    let ty = map
        .get("type")
        .ok_or_else(|| Error::InvalidSchema(format!("No field type: {}", name)))?;
    let schema = parse_schema(ty, namespace, ctx)?;

    let order = match map.get("order") {
        None => FieldOrder::default(),
        Some(Value::String(order)) => FieldOrder::from_name(order)
            .ok_or_else(|| Error::InvalidSchema(format!("Invalid order: {}", order)))?,
        Some(other) => return Err(Error::InvalidSchema(format!("Invalid order: {}", other))),
    };

    Ok(Field {
        name: name.to_string(),
        schema,
        default: map.get("default").cloned(),
        order,
        doc: doc(map),
        aliases: string_set(map, "aliases")?,
        props: extra_props(map, FIELD_KEYS),
    })
}

fn parse_enum(map: &Map<String, Value>, namespace: Option<&str>, ctx: &mut ParseContext) -> Result<Schema> {
    let name = parse_name(map, namespace)?;
    ctx.begin_definition(&name)?;

    let values = map
        .get("symbols")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::InvalidSchema(format!("Enum has no symbols: {}", name)))?;
    let mut symbols: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let symbol = value
            .as_str()
            .ok_or_else(|| Error::InvalidSchema(format!("Enum symbol is not a string: {}", value)))?;
        if !is_identifier(symbol) {
            return Err(Error::InvalidName { name: symbol.to_string() });
        }
        if symbols.iter().any(|s| s == symbol) {
            return Err(Error::DuplicateSymbol {
                name: name.fullname(),
                symbol: symbol.to_string(),
            });
        }
        symbols.push(symbol.to_string());
    }

    let schema = EnumSchema {
        doc: doc(map),
        aliases: qualified_aliases(map, &name)?,
        symbols,
        props: extra_props(map, ENUM_KEYS),
        name,
    };
    ctx.finish_definition(Schema::Enum(schema))
}

fn parse_fixed(map: &Map<String, Value>, namespace: Option<&str>, ctx: &mut ParseContext) -> Result<Schema> {
    let name = parse_name(map, namespace)?;
    ctx.begin_definition(&name)?;

    let size = map
        .get("size")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::InvalidSchema(format!("Invalid or no size: {}", name)))?;

    let schema = FixedSchema {
        doc: doc(map),
        aliases: qualified_aliases(map, &name)?,
        size: size as usize,
        props: extra_props(map, FIXED_KEYS),
        name,
    };
    ctx.finish_definition(Schema::Fixed(schema))
}

fn parse_name(map: &Map<String, Value>, namespace: Option<&str>) -> Result<Name> {
    let raw = map
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidSchema("No name in schema".to_string()))?;
    let explicit = match map.get("namespace") {
        None | Some(Value::Null) => None,
        Some(Value::String(ns)) => Some(ns.as_str()),
        Some(other) => return Err(Error::InvalidSchema(format!("Invalid namespace: {}", other))),
    };
    Ok(if raw.contains('.') {
        Name::parse(raw, None)
    } else if let Some(ns) = explicit {
        Name::new(raw, Some(ns))
    } else {
        Name::new(raw, namespace)
    })
}

fn doc(map: &Map<String, Value>) -> Option<String> {
    map.get("doc").and_then(Value::as_str).map(str::to_string)
}

fn string_set(map: &Map<String, Value>, key: &str) -> Result<BTreeSet<String>> {
    match map.get(key) {
        None => Ok(BTreeSet::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::InvalidSchema(format!("{} must be strings", key)))
            })
            .collect(),
        Some(other) => Err(Error::InvalidSchema(format!("{} must be a list: {}", key, other))),
    }
}

fn qualified_aliases(map: &Map<String, Value>, name: &Name) -> Result<BTreeSet<String>> {
    Ok(string_set(map, "aliases")?
        .iter()
        .map(|alias| Name::parse(alias, name.namespace.as_deref()).fullname())
        .collect())
}

fn extra_props(map: &Map<String, Value>, reserved: &[&str]) -> Props {
    map.iter()
        .filter(|(key, _)| !reserved.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

// ==================== Writing ====================

/// Renders schemas as Avro JSON, inlining each named type the first time it
/// is written and referring to it by name afterwards
pub struct SchemaWriter<'a, L: Lookup + ?Sized> {
    lookup: &'a L,
    emitted: HashSet<String>,
}

impl<'a, L: Lookup + ?Sized> SchemaWriter<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self {
            lookup,
            emitted: HashSet::new(),
        }
    }

    pub fn is_emitted(&self, fullname: &str) -> bool {
        self.emitted.contains(fullname)
    }

    pub fn write(&mut self, schema: &Schema, namespace: Option<&str>) -> Value {
        match schema {
            Schema::Primitive(p, props) if props.is_empty() => Value::String(p.name().to_string()),
            Schema::Primitive(p, props) => {
                let mut obj = Map::new();
                obj.insert("type".into(), p.name().into());
                insert_props(&mut obj, props);
                Value::Object(obj)
            }
            Schema::Array { items, props } => {
                let mut obj = Map::new();
                obj.insert("type".into(), "array".into());
                obj.insert("items".into(), self.write(items, namespace));
                insert_props(&mut obj, props);
                Value::Object(obj)
            }
            Schema::Map { values, props } => {
                let mut obj = Map::new();
                obj.insert("type".into(), "map".into());
                obj.insert("values".into(), self.write(values, namespace));
                insert_props(&mut obj, props);
                Value::Object(obj)
            }
            Schema::Union(branches) => {
                Value::Array(branches.iter().map(|b| self.write(b, namespace)).collect())
            }
            Schema::Record(_) | Schema::Enum(_) | Schema::Fixed(_) => {
                self.write_definition(schema, namespace)
            }
            Schema::Ref(fullname) => {
                let lookup = self.lookup;
                match lookup.lookup(fullname) {
                    Some(definition) if !self.emitted.contains(fullname) => {
                        self.write_definition(definition, namespace)
                    }
                    _ => Value::String(relative_name(fullname, namespace)),
                }
            }
        }
    }

    fn write_definition(&mut self, schema: &Schema, namespace: Option<&str>) -> Value {
        let mut obj = Map::new();
        match schema {
            Schema::Record(record) => {
                self.emitted.insert(record.name.fullname());
                let kind = if record.is_error { "error" } else { "record" };
                obj.insert("type".into(), kind.into());
                write_name(&mut obj, &record.name, namespace, &record.doc, &record.aliases);
                let inner = record.name.namespace.as_deref();
                let fields = record
                    .fields
                    .iter()
                    .map(|field| self.write_field(field, inner))
                    .collect();
                obj.insert("fields".into(), Value::Array(fields));
                insert_props(&mut obj, &record.props);
            }
            Schema::Enum(schema) => {
                self.emitted.insert(schema.name.fullname());
                obj.insert("type".into(), "enum".into());
                write_name(&mut obj, &schema.name, namespace, &schema.doc, &schema.aliases);
                obj.insert("symbols".into(), schema.symbols.clone().into());
                insert_props(&mut obj, &schema.props);
            }
            Schema::Fixed(schema) => {
                self.emitted.insert(schema.name.fullname());
                obj.insert("type".into(), "fixed".into());
                write_name(&mut obj, &schema.name, namespace, &schema.doc, &schema.aliases);
                obj.insert("size".into(), schema.size.into());
                insert_props(&mut obj, &schema.props);
            }
            other => return self.write(other, namespace),
        }
        Value::Object(obj)
    }

    /// Write a record field or message parameter
    pub fn write_field(&mut self, field: &Field, namespace: Option<&str>) -> Value {
        let mut obj = Map::new();
        obj.insert("name".into(), field.name.clone().into());
        obj.insert("type".into(), self.write(&field.schema, namespace));
        if let Some(doc) = &field.doc {
            obj.insert("doc".into(), doc.clone().into());
        }
        if let Some(default) = &field.default {
            obj.insert("default".into(), default.clone());
        }
        if field.order != FieldOrder::Ascending {
            obj.insert("order".into(), field.order.name().into());
        }
        if !field.aliases.is_empty() {
            obj.insert("aliases".into(), field.aliases.iter().cloned().collect::<Vec<_>>().into());
        }
        insert_props(&mut obj, &field.props);
        Value::Object(obj)
    }
}

/// Render one schema with every named dependency inlined once
pub fn to_json<L: Lookup + ?Sized>(schema: &Schema, lookup: &L) -> Value {
    SchemaWriter::new(lookup).write(schema, None)
}

pub fn to_json_string<L: Lookup + ?Sized>(schema: &Schema, lookup: &L) -> String {
    serde_json::to_string_pretty(&to_json(schema, lookup)).unwrap_or_else(|_| "{}".to_string())
}

fn write_name(
    obj: &mut Map<String, Value>,
    name: &Name,
    namespace: Option<&str>,
    doc: &Option<String>,
    aliases: &BTreeSet<String>,
) {
    obj.insert("name".into(), name.name.clone().into());
    if name.namespace.as_deref() != namespace {
        let ns = name.namespace.clone().unwrap_or_default();
        obj.insert("namespace".into(), ns.into());
    }
    if let Some(doc) = doc {
        obj.insert("doc".into(), doc.clone().into());
    }
    if !aliases.is_empty() {
        obj.insert("aliases".into(), aliases.iter().cloned().collect::<Vec<_>>().into());
    }
}

fn insert_props(obj: &mut Map<String, Value>, props: &Props) {
    for (key, value) in props {
        obj.insert(key.clone(), value.clone());
    }
}

fn relative_name(fullname: &str, namespace: Option<&str>) -> String {
    let name = Name::parse(fullname, None);
    if name.namespace.as_deref() == namespace {
        name.name
    } else {
        fullname.to_string()
    }
}
