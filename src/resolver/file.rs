//! Files waiting to be resolved

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::idl;
use crate::schema::{json, protocol, ParseContext, TypeMap};
use crate::utils::{Error, Result};

/// A source file the scheduler can attempt to parse
pub trait PendingFile {
    /// Stable identity, used for ordering and diagnostics
    fn path(&self) -> &str;

    /// Names whose global definitions must be hidden from this file
    fn duplicate_names(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    /// Parse against the given visibility set, returning the file's own
    /// definitions
    fn parse(&self, visible: &TypeMap) -> Result<TypeMap>;
}

/// Index of a file within one scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub usize);

/// Where a file currently sits in the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Ready,
    Blocked,
    Done,
}

/// Per-run bookkeeping for one pending file
#[derive(Debug)]
pub struct FileRecord<F> {
    pub file: F,
    pub duplicate_names: BTreeSet<String>,
    pub last_error: Option<Error>,
    pub status: FileStatus,
}

impl<F: PendingFile> FileRecord<F> {
    pub fn new(file: F) -> Self {
        let duplicate_names = file.duplicate_names();
        Self {
            file,
            duplicate_names,
            last_error: None,
            status: FileStatus::Ready,
        }
    }

    pub fn path(&self) -> &str {
        self.file.path()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }
}

/// Supported source formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    /// `.avsc`: one schema JSON document
    Schema,
    /// `.avpr`: protocol JSON
    Protocol,
    /// `.avdl`: Avro IDL
    Idl,
}

impl SchemaFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "avsc" => Some(Self::Schema),
            "avpr" => Some(Self::Protocol),
            "avdl" => Some(Self::Idl),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Source {
    Disk(PathBuf),
    Memory(String),
}

/// A schema, protocol or IDL file on disk or in memory
#[derive(Debug, Clone)]
pub struct SchemaFile {
    path: String,
    format: SchemaFormat,
    source: Source,
    validate_defaults: bool,
}

impl SchemaFile {
    /// A file on disk, read on every parse attempt
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Ok(Self {
            path: path.display().to_string(),
            format: format_of(path)?,
            source: Source::Disk(path.to_path_buf()),
            validate_defaults: false,
        })
    }

    /// In-memory text; `path` only decides the format and names the file
    pub fn from_source(path: &str, text: impl Into<String>) -> Result<Self> {
        Ok(Self {
            path: path.to_string(),
            format: format_of(Path::new(path))?,
            source: Source::Memory(text.into()),
            validate_defaults: false,
        })
    }

    pub fn with_validate_defaults(mut self, validate: bool) -> Self {
        self.validate_defaults = validate;
        self
    }

    fn read(&self) -> Result<String> {
        match &self.source {
            Source::Disk(path) => Ok(fs::read_to_string(path)?),
            Source::Memory(text) => Ok(text.clone()),
        }
    }
}

impl PendingFile for SchemaFile {
    fn path(&self) -> &str {
        &self.path
    }

    fn parse(&self, visible: &TypeMap) -> Result<TypeMap> {
        let text = self.read()?;
        let mut ctx = ParseContext::new(visible).with_validate_defaults(self.validate_defaults);
        match self.format {
            SchemaFormat::Schema => {
                json::parse_document(&text, &mut ctx)?;
            }
            SchemaFormat::Protocol => {
                protocol::parse_document(&text, &mut ctx)?;
            }
            SchemaFormat::Idl => {
                idl::parse_idl(&text, &mut ctx)?;
            }
        }
        Ok(ctx.into_declared())
    }
}

fn format_of(path: &Path) -> Result<SchemaFormat> {
    SchemaFormat::from_path(path).ok_or_else(|| Error::UnsupportedFormat {
        path: path.display().to_string(),
    })
}

/// Collect schema files under `roots`.
///
/// Directories are walked recursively and only files with one of the given
/// extensions are kept, sorted by path. Files named explicitly are kept as-is.
pub fn discover_files(roots: &[PathBuf], extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for root in roots {
        if root.is_dir() {
            let mut found = Vec::new();
            walk(root, extensions, &mut found)?;
            found.sort();
            files.extend(found);
        } else if root.is_file() {
            files.push(root.clone());
        } else {
            return Err(Error::Io(format!("No such file or directory: {}", root.display())));
        }
    }
    Ok(files)
}

fn walk(dir: &Path, extensions: &[String], out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, extensions, out)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| extensions.iter().any(|e| e == ext))
        {
            out.push(path);
        }
    }
    Ok(())
}
