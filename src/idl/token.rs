//! Token definitions for Avro IDL

use crate::utils::Span;

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Text of a `/** ... */` comment directly preceding this token
    pub doc: Option<String>,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span, doc: None }
    }

    pub fn eof(span: Span) -> Self {
        Self { kind: TokenKind::Eof, span, doc: None }
    }
}

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ============ Keywords ============
    /// protocol
    Protocol,
    /// record
    Record,
    /// error
    Error,
    /// enum
    Enum,
    /// fixed
    Fixed,
    /// union
    Union,
    /// array
    Array,
    /// map
    Map,
    /// void
    Void,
    /// oneway
    Oneway,
    /// throws
    Throws,
    /// import
    Import,
    /// true
    True,
    /// false
    False,
    /// null
    Null,

    // ============ Literals ============
    /// Identifier, possibly dotted or backquoted
    Ident(String),
    /// Number literal, kept as written
    Number(String),
    /// String literal
    StringLit(String),
    /// `@name`, the name may contain `-` and `.`
    Annotation(String),

    // ============ Punctuation ============
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Lt,
    Gt,
    Comma,
    Semicolon,
    Colon,
    Eq,
    Minus,

    // ============ Special ============
    /// A string literal with no closing quote
    Unterminated,
    /// A block comment with no closing `*/`
    UnterminatedComment,
    /// Character the lexer does not recognize
    Unknown(char),
    Eof,
}

impl TokenKind {
    /// Convert a keyword string to a token kind
    pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
        match s {
            "protocol" => Some(TokenKind::Protocol),
            "record" => Some(TokenKind::Record),
            "error" => Some(TokenKind::Error),
            "enum" => Some(TokenKind::Enum),
            "fixed" => Some(TokenKind::Fixed),
            "union" => Some(TokenKind::Union),
            "array" => Some(TokenKind::Array),
            "map" => Some(TokenKind::Map),
            "void" => Some(TokenKind::Void),
            "oneway" => Some(TokenKind::Oneway),
            "throws" => Some(TokenKind::Throws),
            "import" => Some(TokenKind::Import),
            "true" => Some(TokenKind::True),
            "false" => Some(TokenKind::False),
            "null" => Some(TokenKind::Null),
            _ => None,
        }
    }

    /// Source text of keywords, used where a keyword may stand as a name
    pub fn keyword_text(&self) -> Option<&'static str> {
        match self {
            TokenKind::Protocol => Some("protocol"),
            TokenKind::Record => Some("record"),
            TokenKind::Error => Some("error"),
            TokenKind::Enum => Some("enum"),
            TokenKind::Fixed => Some("fixed"),
            TokenKind::Union => Some("union"),
            TokenKind::Array => Some("array"),
            TokenKind::Map => Some("map"),
            TokenKind::Void => Some("void"),
            TokenKind::Oneway => Some("oneway"),
            TokenKind::Throws => Some("throws"),
            TokenKind::Import => Some("import"),
            TokenKind::True => Some("true"),
            TokenKind::False => Some("false"),
            TokenKind::Null => Some("null"),
            _ => None,
        }
    }
}
