//! Name resolution while parsing a single file
//!
//! A [`ParseContext`] sees two sets of named types: the visibility set handed
//! in by the resolver and the types the file has declared so far. Defining a
//! name that is already in either set is a [`Error::Redefinition`]; using a
//! name that is in neither is an [`Error::UndefinedType`].

use crate::schema::defaults::is_valid_default;
use crate::schema::types::{Field, Name, PrimitiveType, Schema, TypeMap};
use crate::utils::{Error, Result};

/// Anything that can answer "what is the definition of this full name"
pub trait Lookup {
    fn lookup(&self, fullname: &str) -> Option<&Schema>;
}

impl Lookup for TypeMap {
    fn lookup(&self, fullname: &str) -> Option<&Schema> {
        self.get(fullname)
    }
}

/// Parsing state for one file
pub struct ParseContext<'a> {
    /// Definitions the resolver made visible to this file
    visible: &'a TypeMap,
    /// Definitions made by this file, in declaration order
    declared: TypeMap,
    /// Names whose bodies are being parsed (recursive references resolve to these)
    defining: Vec<String>,
    validate_defaults: bool,
}

impl<'a> ParseContext<'a> {
    pub fn new(visible: &'a TypeMap) -> Self {
        Self {
            visible,
            declared: TypeMap::new(),
            defining: Vec::new(),
            validate_defaults: false,
        }
    }

    pub fn with_validate_defaults(mut self, validate: bool) -> Self {
        self.validate_defaults = validate;
        self
    }

    /// Resolve a type name used in a schema. Undotted names are tried in the
    /// enclosing namespace first, then in the null namespace.
    pub fn resolve(&self, raw: &str, namespace: Option<&str>) -> Result<Schema> {
        if let Some(p) = PrimitiveType::from_name(raw) {
            return Ok(Schema::primitive(p));
        }
        let qualified = Name::parse(raw, namespace).fullname();
        if self.is_known(&qualified) {
            return Ok(Schema::Ref(qualified));
        }
        if qualified != raw && self.is_known(raw) {
            return Ok(Schema::Ref(raw.to_string()));
        }
        Err(Error::UndefinedType { name: qualified })
    }

    /// Reserve a name before its body is parsed
    pub fn begin_definition(&mut self, name: &Name) -> Result<()> {
        validate_name(name)?;
        let fullname = name.fullname();
        if self.is_known(&fullname) {
            return Err(Error::Redefinition { name: fullname });
        }
        self.defining.push(fullname);
        Ok(())
    }

    /// Record a finished definition and return the reference that stands in
    /// for it inside the enclosing schema
    pub fn finish_definition(&mut self, schema: Schema) -> Result<Schema> {
        let fullname = schema
            .fullname()
            .ok_or_else(|| Error::InvalidSchema(format!("{} is not a named type", schema.kind())))?;
        self.defining.retain(|n| n != &fullname);
        self.declared.insert(fullname.clone(), schema);
        Ok(Schema::Ref(fullname))
    }

    /// Reject a field default that does not match the field's schema
    pub fn check_default(&self, record: &Name, field: &Field) -> Result<()> {
        if !self.validate_defaults {
            return Ok(());
        }
        match &field.default {
            Some(value) if !is_valid_default(&field.schema, value, self) => {
                Err(Error::InvalidDefault {
                    record: record.fullname(),
                    field: field.name.clone(),
                    value: value.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    pub fn declared(&self) -> &TypeMap {
        &self.declared
    }

    pub fn into_declared(self) -> TypeMap {
        self.declared
    }

    fn is_known(&self, fullname: &str) -> bool {
        self.declared.contains_key(fullname)
            || self.defining.iter().any(|n| n == fullname)
            || self.visible.contains_key(fullname)
    }
}

impl Lookup for ParseContext<'_> {
    fn lookup(&self, fullname: &str) -> Option<&Schema> {
        self.declared.get(fullname).or_else(|| self.visible.get(fullname))
    }
}

/// Check that every segment of a name is a legal Avro identifier
pub fn validate_name(name: &Name) -> Result<()> {
    let namespace_ok = name
        .namespace
        .as_deref()
        .map_or(true, |ns| ns.split('.').all(is_identifier));
    if !is_identifier(&name.name) || !namespace_ok {
        return Err(Error::InvalidName { name: name.fullname() });
    }
    if name.namespace.is_none() && PrimitiveType::from_name(&name.name).is_some() {
        return Err(Error::Redefinition { name: name.name.clone() });
    }
    Ok(())
}

pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Unions may not nest directly and may not hold two branches of one kind
pub fn validate_union(branches: &[Schema]) -> Result<()> {
    let mut seen: Vec<String> = Vec::new();
    for branch in branches {
        let key = match branch {
            Schema::Union(_) => {
                return Err(Error::InvalidSchema("Nested union".to_string()));
            }
            Schema::Ref(name) => name.clone(),
            other => match other.fullname() {
                Some(name) => name,
                None => other.kind().to_string(),
            },
        };
        if seen.contains(&key) {
            return Err(Error::InvalidSchema(format!("Duplicate in union: {}", key)));
        }
        seen.push(key);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_enclosing_namespace() {
        let mut visible = TypeMap::new();
        visible.insert("a.Thing".into(), Schema::reference("unused"));
        visible.insert("Thing".into(), Schema::reference("unused"));
        let ctx = ParseContext::new(&visible);

        assert_eq!(ctx.resolve("Thing", Some("a")).unwrap(), Schema::reference("a.Thing"));
        assert_eq!(ctx.resolve("Thing", Some("b")).unwrap(), Schema::reference("Thing"));
        assert_eq!(ctx.resolve("Thing", None).unwrap(), Schema::reference("Thing"));
    }

    #[test]
    fn test_resolve_unknown_name() {
        let visible = TypeMap::new();
        let ctx = ParseContext::new(&visible);
        assert_eq!(
            ctx.resolve("Ghost", Some("x")),
            Err(Error::UndefinedType { name: "x.Ghost".into() })
        );
        assert_eq!(ctx.resolve("int", Some("x")), Ok(Schema::primitive(PrimitiveType::Int)));
    }

    #[test]
    fn test_defining_a_visible_name_is_a_redefinition() {
        let mut visible = TypeMap::new();
        visible.insert("x.Foo".into(), Schema::reference("unused"));
        let mut ctx = ParseContext::new(&visible);
        assert_eq!(
            ctx.begin_definition(&Name::new("Foo", Some("x"))),
            Err(Error::Redefinition { name: "x.Foo".into() })
        );
    }

    #[test]
    fn test_name_in_progress_resolves() {
        let visible = TypeMap::new();
        let mut ctx = ParseContext::new(&visible);
        let name = Name::new("Node", None);
        ctx.begin_definition(&name).unwrap();
        assert_eq!(ctx.resolve("Node", None).unwrap(), Schema::reference("Node"));
        assert!(ctx.begin_definition(&name).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name(&Name::new("Good_1", Some("com.example"))).is_ok());
        assert!(validate_name(&Name::new("1Bad", None)).is_err());
        assert!(validate_name(&Name::new("Ok", Some("com..bad"))).is_err());
        assert!(validate_name(&Name::new("string", None)).is_err());
    }

    #[test]
    fn test_validate_union() {
        let null = Schema::primitive(PrimitiveType::Null);
        let string = Schema::primitive(PrimitiveType::String);
        assert!(validate_union(&[null.clone(), string.clone()]).is_ok());
        assert!(validate_union(&[null.clone(), null.clone()]).is_err());
        assert!(validate_union(&[null, Schema::Union(vec![string])]).is_err());
        assert!(validate_union(&[Schema::reference("A"), Schema::reference("B")]).is_ok());
        assert!(validate_union(&[Schema::reference("A"), Schema::reference("A")]).is_err());
    }
}
