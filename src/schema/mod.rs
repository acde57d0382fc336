//! Avro schema model, JSON formats and per-file name resolution

pub mod types;
pub mod context;
pub mod defaults;
pub mod json;
pub mod protocol;

pub use context::{Lookup, ParseContext};
pub use protocol::{Import, ImportKind, Message, Protocol};
pub use types::{
    EnumSchema, Field, FieldOrder, FixedSchema, Name, PrimitiveType, Props, RecordSchema, Schema,
    TypeMap,
};
