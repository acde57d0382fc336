//! Parser for Avro IDL
//!
//! Recursive descent over the token stream. Named types are registered with
//! the [`ParseContext`] as they are declared, so a reference to a type that is
//! neither declared earlier in the file nor visible from other files fails
//! with [`Error::UndefinedType`].

use log::debug;
use serde_json::{Map, Number, Value};

use crate::idl::lexer::Lexer;
use crate::idl::token::{Token, TokenKind};
use crate::schema::context::{is_identifier, validate_union, ParseContext};
use crate::schema::protocol::{Import, ImportKind, Message, Protocol};
use crate::schema::types::{
    EnumSchema, Field, FieldOrder, FixedSchema, Name, PrimitiveType, Props, RecordSchema, Schema,
};
use crate::utils::{Error, Result, Span};

/// `@name(value)` pairs in source order
type Annotations = Vec<(String, Value)>;

/// The parser
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Create a new parser from a lexer
    pub fn new(mut lexer: Lexer) -> Self {
        Self {
            tokens: lexer.tokenize(),
            pos: 0,
        }
    }

    // ==================== Helper Methods ====================

    fn current(&self) -> &Token {
        // tokenize() always ends with Eof, so the last token exists
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token> {
        if self.check(&expected) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&describe(&expected)))
        }
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Error for the current token, reporting lexer problems as such
    fn unexpected(&self, expected: &str) -> Error {
        let token = self.current();
        match &token.kind {
            TokenKind::Unknown(ch) => Error::UnexpectedChar { ch: *ch, span: token.span },
            TokenKind::Unterminated => Error::UnterminatedString { span: token.span },
            TokenKind::UnterminatedComment => Error::UnterminatedComment { span: token.span },
            other => Error::UnexpectedToken {
                expected: expected.to_string(),
                got: describe(other),
                span: token.span,
            },
        }
    }

    fn parse_ident(&mut self) -> Result<String> {
        match self.current_kind() {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    // ==================== Parsing Methods ====================

    /// Parse a complete IDL file: exactly one protocol
    pub fn parse_protocol(&mut self, ctx: &mut ParseContext) -> Result<Protocol> {
        let doc = self.current().doc.clone();
        let annotations = self.parse_annotations()?;
        self.expect(TokenKind::Protocol)?;
        let raw_name = self.parse_ident()?;

        let (namespace, props) = split_namespace(annotations)?;
        let mut protocol = Protocol::new(Name::parse(&raw_name, namespace.as_deref()));
        protocol.doc = doc;
        protocol.props = props.into_iter().collect();
        let namespace = protocol.name.namespace.clone();
        let namespace = namespace.as_deref();

        self.expect(TokenKind::LBrace)?;
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            if self.check(&TokenKind::Import) {
                let import = self.parse_import()?;
                debug!("{} imports {}", protocol.name, import.path);
                protocol.imports.push(import);
                continue;
            }
            let doc = self.current().doc.clone();
            let annotations = self.parse_annotations()?;
            match self.current_kind() {
                TokenKind::Record | TokenKind::Error | TokenKind::Enum | TokenKind::Fixed => {
                    let name = self.parse_named_schema(doc, annotations, namespace, ctx)?;
                    protocol.types.push(name);
                }
                _ => {
                    let message = self.parse_message(doc, annotations, namespace, ctx)?;
                    if protocol.messages.iter().any(|m| m.name == message.name) {
                        return Err(Error::InvalidSchema(format!(
                            "Duplicate message {} in {}",
                            message.name, protocol.name
                        )));
                    }
                    protocol.messages.push(message);
                }
            }
        }
        self.expect(TokenKind::RBrace)?;
        if !self.is_at_end() {
            return Err(self.unexpected("end of file"));
        }

        Ok(protocol)
    }

    /// Collect the `import` statements of a file without resolving any types
    pub fn parse_imports(&mut self) -> Result<Vec<Import>> {
        let mut imports = Vec::new();
        while !self.is_at_end() {
            if self.check(&TokenKind::Import) {
                imports.push(self.parse_import()?);
            } else {
                self.advance();
            }
        }
        Ok(imports)
    }

    /// `import idl|protocol|schema "file";`
    fn parse_import(&mut self) -> Result<Import> {
        self.expect(TokenKind::Import)?;
        let kind = match self.current_kind() {
            TokenKind::Protocol => ImportKind::Protocol,
            TokenKind::Ident(kind) if kind == "idl" => ImportKind::Idl,
            TokenKind::Ident(kind) if kind == "schema" => ImportKind::Schema,
            _ => return Err(self.unexpected("idl, protocol or schema")),
        };
        self.advance();
        let path = match self.current_kind() {
            TokenKind::StringLit(path) => path.clone(),
            _ => return Err(self.unexpected("string literal")),
        };
        self.advance();
        self.expect(TokenKind::Semicolon)?;
        Ok(Import { kind, path })
    }

    fn parse_annotations(&mut self) -> Result<Annotations> {
        let mut annotations = Vec::new();
        while let TokenKind::Annotation(name) = self.current_kind() {
            let name = name.clone();
            self.advance();
            self.expect(TokenKind::LParen)?;
            let value = self.parse_json_value()?;
            self.expect(TokenKind::RParen)?;
            annotations.push((name, value));
        }
        Ok(annotations)
    }

    /// Parse a record, error, enum or fixed declaration; returns its full name
    fn parse_named_schema(
        &mut self,
        doc: Option<String>,
        annotations: Annotations,
        namespace: Option<&str>,
        ctx: &mut ParseContext,
    ) -> Result<String> {
        let keyword = self.advance();
        let raw_name = self.parse_ident()?;

        let (own_namespace, rest) = split_namespace(annotations)?;
        let (aliases, props) = split_aliases(rest)?;
        let name = if raw_name.contains('.') {
            Name::parse(&raw_name, None)
        } else {
            Name::new(raw_name, own_namespace.as_deref().or(namespace))
        };
        let aliases = aliases
            .iter()
            .map(|a| Name::parse(a, name.namespace.as_deref()).fullname())
            .collect();

        ctx.begin_definition(&name)?;
        let schema = match keyword.kind {
            TokenKind::Record | TokenKind::Error => {
                let fields = self.parse_record_body(&name, name.namespace.as_deref(), ctx)?;
                let mut record = RecordSchema::new(name, fields);
                record.is_error = keyword.kind == TokenKind::Error;
                record.doc = doc;
                record.aliases = aliases;
                record.props = props;
                Schema::Record(record)
            }
            TokenKind::Enum => {
                let symbols = self.parse_enum_body(&name)?;
                let mut schema = EnumSchema::new(name, symbols);
                schema.doc = doc;
                schema.aliases = aliases;
                schema.props = props;
                Schema::Enum(schema)
            }
            _ => {
                self.expect(TokenKind::LParen)?;
                let size = self.parse_size()?;
                self.expect(TokenKind::RParen)?;
                self.expect(TokenKind::Semicolon)?;
                let mut schema = FixedSchema::new(name, size);
                schema.doc = doc;
                schema.aliases = aliases;
                schema.props = props;
                Schema::Fixed(schema)
            }
        };

        match ctx.finish_definition(schema)? {
            Schema::Ref(fullname) => Ok(fullname),
            other => Err(Error::InvalidSchema(format!("{} is not a named type", other.kind()))),
        }
    }

    /// `{ Type a = 1, b; ... }`
    fn parse_record_body(
        &mut self,
        record: &Name,
        namespace: Option<&str>,
        ctx: &mut ParseContext,
    ) -> Result<Vec<Field>> {
        self.expect(TokenKind::LBrace)?;
        let mut fields: Vec<Field> = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let type_doc = self.current().doc.clone();
            let type_annotations = self.parse_annotations()?;
            let schema = self.parse_type(type_annotations, namespace, ctx)?;
            loop {
                let mut field = self.parse_variable(schema.clone())?;
                if field.doc.is_none() {
                    field.doc = type_doc.clone();
                }
                if fields.iter().any(|f| f.name == field.name) {
                    return Err(Error::DuplicateField {
                        record: record.fullname(),
                        field: field.name,
                    });
                }
                ctx.check_default(record, &field)?;
                fields.push(field);
                if !self.consume(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::Semicolon)?;
        }
        self.expect(TokenKind::RBrace)?;
        Ok(fields)
    }

    /// `@order("descending") name = default`
    fn parse_variable(&mut self, schema: Schema) -> Result<Field> {
        let doc = self.current().doc.clone();
        let annotations = self.parse_annotations()?;
        let name = self.parse_ident()?;
        if !is_identifier(&name) {
            return Err(Error::InvalidName { name });
        }

        let mut field = Field::new(name, schema);
        field.doc = doc;
        for (key, value) in annotations {
            match key.as_str() {
                "order" => {
                    field.order = value
                        .as_str()
                        .and_then(FieldOrder::from_name)
                        .ok_or_else(|| Error::InvalidSchema(format!("Invalid order: {}", value)))?;
                }
                "aliases" => field.aliases = string_list(&value)?.into_iter().collect(),
                _ => {
                    field.props.insert(key, value);
                }
            }
        }
        if self.consume(&TokenKind::Eq) {
            field.default = Some(self.parse_json_value()?);
        }
        Ok(field)
    }

    /// `{ A, B, C }`
    fn parse_enum_body(&mut self, name: &Name) -> Result<Vec<String>> {
        self.expect(TokenKind::LBrace)?;
        let mut symbols: Vec<String> = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let symbol = self.parse_ident()?;
            if !is_identifier(&symbol) {
                return Err(Error::InvalidName { name: symbol });
            }
            if symbols.contains(&symbol) {
                return Err(Error::DuplicateSymbol {
                    name: name.fullname(),
                    symbol,
                });
            }
            symbols.push(symbol);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(symbols)
    }

    fn parse_size(&mut self) -> Result<usize> {
        let token = self.current().clone();
        match &token.kind {
            TokenKind::Number(text) => {
                self.advance();
                text.parse::<usize>().map_err(|_| Error::InvalidNumber {
                    text: text.clone(),
                    span: token.span,
                })
            }
            _ => Err(self.unexpected("size")),
        }
    }

    /// `ResultType name(Type a, Type b = 1) throws E;` or `... oneway;`
    fn parse_message(
        &mut self,
        doc: Option<String>,
        annotations: Annotations,
        namespace: Option<&str>,
        ctx: &mut ParseContext,
    ) -> Result<Message> {
        let response = if self.consume(&TokenKind::Void) {
            Schema::primitive(PrimitiveType::Null)
        } else {
            self.parse_type(Vec::new(), namespace, ctx)?
        };
        let name = self.parse_ident()?;
        let mut message = Message::new(name, response);
        message.doc = doc;
        message.props = annotations.into_iter().collect();

        self.expect(TokenKind::LParen)?;
        while !self.check(&TokenKind::RParen) {
            let type_annotations = self.parse_annotations()?;
            let schema = self.parse_type(type_annotations, namespace, ctx)?;
            let param = self.parse_variable(schema)?;
            if message.request.iter().any(|p| p.name == param.name) {
                return Err(Error::InvalidSchema(format!(
                    "Duplicate parameter {} in {}",
                    param.name, message.name
                )));
            }
            message.request.push(param);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;

        if self.consume(&TokenKind::Oneway) {
            if message.response != Schema::primitive(PrimitiveType::Null) {
                return Err(Error::InvalidSchema(format!(
                    "One way message {} must return void",
                    message.name
                )));
            }
            message.one_way = true;
        } else if self.consume(&TokenKind::Throws) {
            loop {
                let error = self.parse_ident()?;
                message.errors.push(ctx.resolve(&error, namespace)?);
                if !self.consume(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::Semicolon)?;
        Ok(message)
    }

    /// Parse a type, applying leading annotations as schema properties
    fn parse_type(
        &mut self,
        annotations: Annotations,
        namespace: Option<&str>,
        ctx: &mut ParseContext,
    ) -> Result<Schema> {
        let mut schema = match self.current_kind().clone() {
            TokenKind::Array => {
                self.advance();
                self.expect(TokenKind::Lt)?;
                let items = self.parse_type(Vec::new(), namespace, ctx)?;
                self.expect(TokenKind::Gt)?;
                Schema::array(items)
            }
            TokenKind::Map => {
                self.advance();
                self.expect(TokenKind::Lt)?;
                let values = self.parse_type(Vec::new(), namespace, ctx)?;
                self.expect(TokenKind::Gt)?;
                Schema::map(values)
            }
            TokenKind::Union => {
                self.advance();
                self.expect(TokenKind::LBrace)?;
                let mut branches = Vec::new();
                loop {
                    branches.push(self.parse_type(Vec::new(), namespace, ctx)?);
                    if !self.consume(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace)?;
                validate_union(&branches)?;
                Schema::Union(branches)
            }
            TokenKind::Null => {
                self.advance();
                Schema::primitive(PrimitiveType::Null)
            }
            TokenKind::Ident(name) => {
                self.advance();
                self.parse_named_type(&name, namespace, ctx)?
            }
            _ => return Err(self.unexpected("type")),
        };

        if !annotations.is_empty() {
            match &mut schema {
                Schema::Primitive(_, props)
                | Schema::Array { props, .. }
                | Schema::Map { props, .. } => props.extend(annotations),
                other => debug!("ignoring properties on {} type", other.kind()),
            }
        }
        Ok(schema)
    }

    /// Primitive names, logical type shorthands, then references
    fn parse_named_type(&mut self, name: &str, namespace: Option<&str>, ctx: &mut ParseContext) -> Result<Schema> {
        let logical = |base: PrimitiveType, logical_type: &str| {
            let mut props = Props::new();
            props.insert("logicalType".to_string(), Value::from(logical_type));
            Schema::Primitive(base, props)
        };
        match name {
            "date" => Ok(logical(PrimitiveType::Int, "date")),
            "time_ms" => Ok(logical(PrimitiveType::Int, "time-millis")),
            "timestamp_ms" => Ok(logical(PrimitiveType::Long, "timestamp-millis")),
            "decimal" if self.check(&TokenKind::LParen) => {
                self.advance();
                let precision = self.parse_size()?;
                self.expect(TokenKind::Comma)?;
                let scale = self.parse_size()?;
                self.expect(TokenKind::RParen)?;
                let mut schema = logical(PrimitiveType::Bytes, "decimal");
                if let Schema::Primitive(_, props) = &mut schema {
                    props.insert("precision".to_string(), Value::from(precision));
                    props.insert("scale".to_string(), Value::from(scale));
                }
                Ok(schema)
            }
            _ => ctx.resolve(name, namespace),
        }
    }

    /// JSON values used by annotations and defaults
    fn parse_json_value(&mut self) -> Result<Value> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::StringLit(s) => {
                self.advance();
                Ok(Value::String(s))
            }
            TokenKind::Number(text) => {
                self.advance();
                parse_number(&text, token.span)
            }
            TokenKind::Minus => {
                self.advance();
                let number = self.current().clone();
                match number.kind {
                    TokenKind::Number(text) => {
                        self.advance();
                        parse_number(&format!("-{}", text), number.span)
                    }
                    _ => Err(self.unexpected("number")),
                }
            }
            TokenKind::True => {
                self.advance();
                Ok(Value::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Value::Bool(false))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Value::Null)
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                while !self.check(&TokenKind::RBracket) {
                    items.push(self.parse_json_value()?);
                    if !self.consume(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RBracket)?;
                Ok(Value::Array(items))
            }
            TokenKind::LBrace => {
                self.advance();
                let mut map = Map::new();
                while !self.check(&TokenKind::RBrace) {
                    let key = match self.current_kind() {
                        TokenKind::StringLit(key) => key.clone(),
                        _ => return Err(self.unexpected("string key")),
                    };
                    self.advance();
                    self.expect(TokenKind::Colon)?;
                    map.insert(key, self.parse_json_value()?);
                    if !self.consume(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace)?;
                Ok(Value::Object(map))
            }
            _ => Err(self.unexpected("JSON value")),
        }
    }
}

fn parse_number(text: &str, span: Span) -> Result<Value> {
    let invalid = || Error::InvalidNumber { text: text.to_string(), span };
    if let Ok(n) = text.parse::<i64>() {
        return Ok(Value::from(n));
    }
    let f = text.parse::<f64>().map_err(|_| invalid())?;
    Number::from_f64(f).map(Value::Number).ok_or_else(invalid)
}

/// Pull `@namespace` out of a set of annotations
fn split_namespace(annotations: Annotations) -> Result<(Option<String>, Annotations)> {
    let mut namespace = None;
    let mut rest = Vec::new();
    for (key, value) in annotations {
        if key == "namespace" {
            let ns = value
                .as_str()
                .ok_or_else(|| Error::InvalidSchema(format!("Invalid namespace: {}", value)))?;
            namespace = Some(ns.to_string());
        } else {
            rest.push((key, value));
        }
    }
    Ok((namespace, rest))
}

/// Pull `@aliases` out of a set of annotations; the rest become properties
fn split_aliases(annotations: Annotations) -> Result<(Vec<String>, Props)> {
    let mut aliases = Vec::new();
    let mut props = Props::new();
    for (key, value) in annotations {
        if key == "aliases" {
            aliases = string_list(&value)?;
        } else {
            props.insert(key, value);
        }
    }
    Ok((aliases, props))
}

fn string_list(value: &Value) -> Result<Vec<String>> {
    value
        .as_array()
        .and_then(|items| items.iter().map(|i| i.as_str().map(str::to_string)).collect())
        .ok_or_else(|| Error::InvalidSchema(format!("Expected a list of strings: {}", value)))
}

/// Human readable token description for error messages
fn describe(kind: &TokenKind) -> String {
    if let Some(keyword) = kind.keyword_text() {
        return format!("'{}'", keyword);
    }
    match kind {
        TokenKind::Ident(name) => format!("identifier {}", name),
        TokenKind::Number(text) => format!("number {}", text),
        TokenKind::StringLit(s) => format!("string \"{}\"", s),
        TokenKind::Annotation(name) => format!("@{}", name),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
        TokenKind::LBrace => "'{'".to_string(),
        TokenKind::RBrace => "'}'".to_string(),
        TokenKind::LBracket => "'['".to_string(),
        TokenKind::RBracket => "']'".to_string(),
        TokenKind::Lt => "'<'".to_string(),
        TokenKind::Gt => "'>'".to_string(),
        TokenKind::Comma => "','".to_string(),
        TokenKind::Semicolon => "';'".to_string(),
        TokenKind::Colon => "':'".to_string(),
        TokenKind::Eq => "'='".to_string(),
        TokenKind::Minus => "'-'".to_string(),
        TokenKind::Unterminated => "unterminated string".to_string(),
        TokenKind::UnterminatedComment => "unterminated comment".to_string(),
        TokenKind::Unknown(c) => format!("'{}'", c),
        TokenKind::Eof => "end of file".to_string(),
        _ => format!("{:?}", kind),
    }
}
