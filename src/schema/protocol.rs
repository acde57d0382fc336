//! Avro protocols (`.avpr`)

use serde_json::{Map, Value};

use crate::schema::context::{Lookup, ParseContext};
use crate::schema::json::{parse_field, parse_schema, SchemaWriter};
use crate::schema::types::{Field, Name, PrimitiveType, Props, Schema};
use crate::utils::{Error, Result};

/// A protocol message
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub name: String,
    pub doc: Option<String>,
    pub props: Props,
    pub request: Vec<Field>,
    pub response: Schema,
    /// Declared errors; the implicit `string` error is not listed
    pub errors: Vec<Schema>,
    pub one_way: bool,
}

impl Message {
    pub fn new(name: impl Into<String>, response: Schema) -> Self {
        Self {
            name: name.into(),
            doc: None,
            props: Props::new(),
            request: Vec::new(),
            response,
            errors: Vec::new(),
            one_way: false,
        }
    }
}

/// What an IDL `import` statement brings in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Idl,
    Protocol,
    Schema,
}

/// `import <kind> "<path>";`, with the path relative to the importing file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub kind: ImportKind,
    pub path: String,
}

/// A protocol: named types plus messages
#[derive(Debug, Clone, PartialEq)]
pub struct Protocol {
    pub name: Name,
    pub doc: Option<String>,
    pub props: Props,
    /// Full names of the types this protocol declares, in order
    pub types: Vec<String>,
    pub messages: Vec<Message>,
    /// IDL imports; always empty for `.avpr` input
    pub imports: Vec<Import>,
}

impl Protocol {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            doc: None,
            props: Props::new(),
            types: Vec::new(),
            messages: Vec::new(),
            imports: Vec::new(),
        }
    }

    /// Render as `.avpr` JSON. Types already inlined by an earlier type are
    /// not repeated.
    pub fn to_json<L: Lookup + ?Sized>(&self, lookup: &L) -> Value {
        let mut writer = SchemaWriter::new(lookup);
        let namespace = self.name.namespace.as_deref();

        let mut obj = Map::new();
        obj.insert("protocol".into(), self.name.name.clone().into());
        if let Some(ns) = namespace {
            obj.insert("namespace".into(), ns.into());
        }
        if let Some(doc) = &self.doc {
            obj.insert("doc".into(), doc.clone().into());
        }
        for (key, value) in &self.props {
            obj.insert(key.clone(), value.clone());
        }

        let types: Vec<Value> = self
            .types
            .iter()
            .filter_map(|name| {
                if writer.is_emitted(name) {
                    None
                } else {
                    Some(writer.write(&Schema::Ref(name.clone()), namespace))
                }
            })
            .collect();
        obj.insert("types".into(), Value::Array(types));

        let mut messages = Map::new();
        for message in &self.messages {
            let mut m = Map::new();
            if let Some(doc) = &message.doc {
                m.insert("doc".into(), doc.clone().into());
            }
            for (key, value) in &message.props {
                m.insert(key.clone(), value.clone());
            }
            let request: Vec<Value> = message
                .request
                .iter()
                .map(|param| writer.write_field(param, namespace))
                .collect();
            m.insert("request".into(), Value::Array(request));
            m.insert("response".into(), writer.write(&message.response, namespace));
            if !message.errors.is_empty() {
                let errors: Vec<Value> = message
                    .errors
                    .iter()
                    .map(|e| writer.write(e, namespace))
                    .collect();
                m.insert("errors".into(), Value::Array(errors));
            }
            if message.one_way {
                m.insert("one-way".into(), true.into());
            }
            messages.insert(message.name.clone(), Value::Object(m));
        }
        obj.insert("messages".into(), Value::Object(messages));

        Value::Object(obj)
    }

    pub fn to_json_string<L: Lookup + ?Sized>(&self, lookup: &L) -> String {
        serde_json::to_string_pretty(&self.to_json(lookup)).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Parse a complete `.avpr` document
pub fn parse_document(text: &str, ctx: &mut ParseContext) -> Result<Protocol> {
    let value: Value = serde_json::from_str(text)?;
    let map = value
        .as_object()
        .ok_or_else(|| Error::InvalidSchema("Protocol must be a JSON object".to_string()))?;

    let raw_name = map
        .get("protocol")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidSchema("No protocol name specified".to_string()))?;
    let namespace = map.get("namespace").and_then(Value::as_str);
    let mut protocol = Protocol::new(Name::parse(raw_name, namespace));
    protocol.doc = map.get("doc").and_then(Value::as_str).map(str::to_string);
    protocol.props = map
        .iter()
        .filter(|(key, _)| !["protocol", "namespace", "doc", "types", "messages"].contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    let namespace = protocol.name.namespace.clone();
    let namespace = namespace.as_deref();

    if let Some(types) = map.get("types") {
        let types = types
            .as_array()
            .ok_or_else(|| Error::InvalidSchema("Types must be a list".to_string()))?;
        for value in types {
            if let Schema::Ref(name) = parse_schema(value, namespace, ctx)? {
                if ctx.declared().contains_key(&name) && !protocol.types.contains(&name) {
                    protocol.types.push(name);
                }
            }
        }
    }

    if let Some(messages) = map.get("messages") {
        let messages = messages
            .as_object()
            .ok_or_else(|| Error::InvalidSchema("Messages must be an object".to_string()))?;
        for (name, value) in messages {
            protocol.messages.push(parse_message(name, value, namespace, ctx)?);
        }
    }

    Ok(protocol)
}

fn parse_message(
    name: &str,
    value: &Value,
    namespace: Option<&str>,
    ctx: &mut ParseContext,
) -> Result<Message> {
    let map = value
        .as_object()
        .ok_or_else(|| Error::InvalidSchema(format!("Message {} must be an object", name)))?;

    let response = match map.get("response") {
        Some(response) => parse_schema(response, namespace, ctx)?,
        None => return Err(Error::InvalidSchema(format!("No response specified for {}", name))),
    };
    let mut message = Message::new(name, response);
    message.doc = map.get("doc").and_then(Value::as_str).map(str::to_string);
    message.props = map
        .iter()
        .filter(|(key, _)| !["doc", "request", "response", "errors", "one-way"].contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let request = map
        .get("request")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::InvalidSchema(format!("No request specified for {}", name)))?;
    for param in request {
        message.request.push(parse_field(param, namespace, ctx)?);
    }

    if let Some(errors) = map.get("errors") {
        let errors = errors
            .as_array()
            .ok_or_else(|| Error::InvalidSchema(format!("Errors of {} must be a list", name)))?;
        for error in errors {
            message.errors.push(parse_schema(error, namespace, ctx)?);
        }
    }

    message.one_way = map.get("one-way").and_then(Value::as_bool).unwrap_or(false);
    if message.one_way
        && (message.response != Schema::primitive(PrimitiveType::Null) || !message.errors.is_empty())
    {
        return Err(Error::InvalidSchema(format!(
            "One way message {} can't have a response or errors",
            name
        )));
    }

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::TypeMap;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const GREETER: &str = r#"{
        "protocol": "Greeter",
        "namespace": "hello",
        "types": [
            {"type": "record", "name": "Greeting", "fields": [{"name": "text", "type": "string"}]},
            {"type": "error", "name": "Refused", "fields": [{"name": "reason", "type": "string"}]}
        ],
        "messages": {
            "greet": {
                "request": [{"name": "who", "type": "Greeting"}],
                "response": "Greeting",
                "errors": ["Refused"]
            },
            "ping": {"request": [], "response": "null", "one-way": true}
        }
    }"#;

    #[test]
    fn test_parse_protocol() {
        let visible = TypeMap::new();
        let mut ctx = ParseContext::new(&visible);
        let protocol = parse_document(GREETER, &mut ctx).unwrap();

        assert_eq!(protocol.name.fullname(), "hello.Greeter");
        assert_eq!(protocol.types, vec!["hello.Greeting".to_string(), "hello.Refused".to_string()]);
        assert_eq!(protocol.messages.len(), 2);
        assert_eq!(protocol.messages[0].errors, vec![Schema::reference("hello.Refused")]);
        assert!(protocol.messages[1].one_way);
        assert_eq!(ctx.declared().len(), 2);
    }

    #[test]
    fn test_message_types_must_resolve() {
        let visible = TypeMap::new();
        let mut ctx = ParseContext::new(&visible);
        let err = parse_document(
            r#"{"protocol": "P", "messages": {"m": {"request": [], "response": "Missing"}}}"#,
            &mut ctx,
        )
        .unwrap_err();
        assert_eq!(err, Error::UndefinedType { name: "Missing".into() });
    }

    #[test]
    fn test_one_way_with_response_is_rejected() {
        let visible = TypeMap::new();
        let mut ctx = ParseContext::new(&visible);
        let result = parse_document(
            r#"{"protocol": "P", "messages": {"m": {"request": [], "response": "int", "one-way": true}}}"#,
            &mut ctx,
        );
        assert!(matches!(result, Err(Error::InvalidSchema(_))));
    }

    #[test]
    fn test_protocol_json() {
        let visible = TypeMap::new();
        let mut ctx = ParseContext::new(&visible);
        let protocol = parse_document(GREETER, &mut ctx).unwrap();
        let written = protocol.to_json(ctx.declared());

        assert_eq!(written["types"].as_array().map(Vec::len), Some(2));
        assert_eq!(
            written["messages"]["greet"],
            json!({
                "request": [{"name": "who", "type": "Greeting"}],
                "response": "Greeting",
                "errors": ["Refused"]
            })
        );
        assert_eq!(written["messages"]["ping"]["one-way"], json!(true));
    }
}
