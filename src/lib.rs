//! avro-resolve
//!
//! Resolves Avro schema (`.avsc`), protocol (`.avpr`) and IDL (`.avdl`) files
//! whose types refer to each other across files, in whatever order the files
//! are found.

pub mod utils;
pub mod schema;
pub mod idl;
pub mod resolver;
pub mod config;
pub mod feedback;

pub use config::ResolverConfig;
pub use feedback::ResolutionReport;
pub use resolver::{resolve, PendingFile, Resolution, SchemaFile};
pub use utils::{Error, Result};
