//! Cross-file type resolution
//!
//! Schema files may use types declared in other files and arrive in no
//! particular order. The scheduler retries files as the set of known types
//! grows until nothing more can be resolved.

pub mod registry;
pub mod file;
pub mod scheduler;
pub mod driver;

pub use driver::resolve;
pub use file::{discover_files, FileId, FileRecord, FileStatus, PendingFile, SchemaFile, SchemaFormat};
pub use registry::{TypeRegistry, TypeRegistryEntry};
pub use scheduler::{FailedFile, Resolution, ResolutionScheduler};
