//! Error handling for avro-resolve

use crate::utils::Span;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Resolver error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ==================== IDL Syntax Errors ====================

    #[error("Unexpected token: expected {expected}, got {got} at {span}")]
    UnexpectedToken {
        expected: String,
        got: String,
        span: Span,
    },

    #[error("Unexpected character '{ch}' at {span}")]
    UnexpectedChar { ch: char, span: Span },

    #[error("Unterminated string literal at {span}")]
    UnterminatedString { span: Span },

    #[error("Invalid number literal '{text}' at {span}")]
    InvalidNumber { text: String, span: Span },

    #[error("Unterminated comment at {span}")]
    UnterminatedComment { span: Span },

    // ==================== Schema Errors ====================

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Illegal name: {name}")]
    InvalidName { name: String },

    #[error("Undefined name: {name}")]
    UndefinedType { name: String },

    #[error("Can't redefine: {name}")]
    Redefinition { name: String },

    #[error("Duplicate field {field} in record {record}")]
    DuplicateField { record: String, field: String },

    #[error("Duplicate enum symbol {symbol} in {name}")]
    DuplicateSymbol { name: String, symbol: String },

    #[error("Invalid default for field {field} in {record}: {value}")]
    InvalidDefault {
        record: String,
        field: String,
        value: String,
    },

    // ==================== Resolution Errors ====================

    #[error("Found conflicting definition of type {name} in [{}]", .locations.join(", "))]
    TypeConflict { name: String, locations: Vec<String> },

    #[error("Unsupported schema file: {path}")]
    UnsupportedFormat { path: String },

    // ==================== I/O ====================

    #[error("IO error: {0}")]
    Io(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Get the span associated with this error
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UnexpectedToken { span, .. } => Some(*span),
            Self::UnexpectedChar { span, .. } => Some(*span),
            Self::UnterminatedString { span } => Some(*span),
            Self::InvalidNumber { span, .. } => Some(*span),
            Self::UnterminatedComment { span } => Some(*span),
            _ => None,
        }
    }

    /// Stable diagnostic code used in structured reports
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnexpectedToken { .. } => "E0101",
            Self::UnexpectedChar { .. } => "E0102",
            Self::UnterminatedString { .. } => "E0103",
            Self::InvalidNumber { .. } => "E0104",
            Self::UnterminatedComment { .. } => "E0105",
            Self::InvalidJson(_) => "E0201",
            Self::InvalidSchema(_) => "E0202",
            Self::InvalidName { .. } => "E0203",
            Self::UndefinedType { .. } => "E0204",
            Self::Redefinition { .. } => "E0205",
            Self::DuplicateField { .. } => "E0206",
            Self::DuplicateSymbol { .. } => "E0207",
            Self::InvalidDefault { .. } => "E0208",
            Self::TypeConflict { .. } => "E0301",
            Self::UnsupportedFormat { .. } => "E0302",
            Self::Io(_) => "E0401",
            Self::Config(_) => "E0402",
        }
    }

    /// Whether a later registry state could make this failure go away
    pub fn is_missing_type(&self) -> bool {
        matches!(self, Self::UndefinedType { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidJson(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
