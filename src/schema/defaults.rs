//! Field default validation

use serde_json::Value;

use crate::schema::context::Lookup;
use crate::schema::types::{PrimitiveType, Schema};

/// Check that a JSON default value is acceptable for a schema.
///
/// Union defaults must match the first branch. A reference to a type that
/// cannot be looked up yet (a record still being defined) is accepted.
pub fn is_valid_default<L: Lookup + ?Sized>(schema: &Schema, value: &Value, lookup: &L) -> bool {
    match schema {
        Schema::Primitive(p, _) => match p {
            PrimitiveType::Null => value.is_null(),
            PrimitiveType::Boolean => value.is_boolean(),
            PrimitiveType::Int => value
                .as_i64()
                .map_or(false, |n| i32::try_from(n).is_ok()),
            PrimitiveType::Long => value.is_i64(),
            PrimitiveType::Float | PrimitiveType::Double => value.is_number(),
            PrimitiveType::Bytes | PrimitiveType::String => value.is_string(),
        },
        Schema::Array { items, .. } => value
            .as_array()
            .map_or(false, |elems| elems.iter().all(|e| is_valid_default(items, e, lookup))),
        Schema::Map { values, .. } => value
            .as_object()
            .map_or(false, |obj| obj.values().all(|v| is_valid_default(values, v, lookup))),
        Schema::Union(branches) => branches
            .first()
            .map_or(false, |first| is_valid_default(first, value, lookup)),
        Schema::Enum(e) => value
            .as_str()
            .map_or(false, |s| e.symbols.iter().any(|sym| sym == s)),
        Schema::Fixed(_) => value.is_string(),
        Schema::Record(r) => match value.as_object() {
            Some(obj) => r.fields.iter().all(|field| match obj.get(&field.name) {
                Some(v) => is_valid_default(&field.schema, v, lookup),
                None => field.default.is_some(),
            }),
            None => false,
        },
        Schema::Ref(name) => match lookup.lookup(name) {
            Some(definition) => is_valid_default(definition, value, lookup),
            None => true,
        },
    }
}
