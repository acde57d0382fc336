//! Avro IDL (`.avdl`) front end

pub mod token;
pub mod lexer;
pub mod parser;

pub use lexer::Lexer;
pub use parser::Parser;

use std::fs;
use std::path::{Component, Path, PathBuf};

use indexmap::IndexSet;
use log::debug;

use crate::schema::{Import, ImportKind, ParseContext, Protocol};
use crate::utils::Result;

/// Parse IDL source into a protocol, declaring its types in `ctx`
pub fn parse_idl(source: &str, ctx: &mut ParseContext) -> Result<Protocol> {
    Parser::new(Lexer::new(source)).parse_protocol(ctx)
}

/// The `import` statements of IDL source; no types are resolved
pub fn parse_imports(source: &str) -> Result<Vec<Import>> {
    Parser::new(Lexer::new(source)).parse_imports()
}

/// Every file the IDL file at `input` imports, directly or through imported
/// IDL files, each joined to the directory of the file importing it.
///
/// `.` and `..` are folded away so that an import cycle ends. `input` itself
/// is never listed.
pub fn collect_imports(input: &Path) -> Result<Vec<PathBuf>> {
    let input = normalize(input);
    let mut found: IndexSet<PathBuf> = IndexSet::new();
    let mut pending = vec![input.clone()];
    while let Some(file) = pending.pop() {
        let source = fs::read_to_string(&file)?;
        let dir = file.parent().unwrap_or_else(|| Path::new(""));
        for import in parse_imports(&source)? {
            let path = normalize(&dir.join(&import.path));
            if path == input || !found.insert(path.clone()) {
                continue;
            }
            debug!("{} imports {}", file.display(), path.display());
            if import.kind == ImportKind::Idl {
                pending.push(path);
            }
        }
    }
    Ok(found.into_iter().collect())
}

/// Fold `.` and `..` components without touching the file system
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{resolve, SchemaFile};
    use crate::schema::TypeMap;
    use crate::utils::Error;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_collect_imports_follows_idl_imports() {
        let root = std::env::temp_dir().join(format!("avro-resolve-imports-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("shared")).unwrap();
        let main = root.join("main.avdl");
        fs::write(
            &main,
            r#"@namespace("shop") protocol Main {
                import idl "shared/common.avdl";
                record Order { Item item; Tier tier; }
            }"#,
        )
        .unwrap();
        fs::write(
            root.join("shared/common.avdl"),
            r#"@namespace("shop") protocol Common {
                import schema "item.avsc";
                import idl "../main.avdl";
                enum Tier { GOLD }
            }"#,
        )
        .unwrap();
        fs::write(
            root.join("shared/item.avsc"),
            r#"{"type": "record", "name": "shop.Item", "fields": [{"name": "sku", "type": "string"}]}"#,
        )
        .unwrap();

        let imports = collect_imports(&main).unwrap();
        let common = root.join("shared/common.avdl");
        let item = root.join("shared/item.avsc");
        assert_eq!(imports, vec![common.clone(), item.clone()]);

        // Without its imports the file cannot resolve
        let text = fs::read_to_string(&main).unwrap();
        let nothing = TypeMap::new();
        let mut ctx = ParseContext::new(&nothing);
        assert_eq!(
            parse_idl(&text, &mut ctx).unwrap_err(),
            Error::UndefinedType { name: "shop.Item".into() }
        );

        let files = vec![SchemaFile::open(&common).unwrap(), SchemaFile::open(&item).unwrap()];
        let resolution = resolve(files).unwrap();
        let visible = resolution.registry.definitions();
        fs::remove_dir_all(&root).unwrap();

        let mut ctx = ParseContext::new(&visible);
        let protocol = parse_idl(&text, &mut ctx).unwrap();
        assert_eq!(protocol.types, vec!["shop.Order"]);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d.avsc")), PathBuf::from("/a/c/d.avsc"));
        assert_eq!(normalize(Path::new("a/../../b.avsc")), PathBuf::from("../b.avsc"));
        assert_eq!(normalize(Path::new("/../b.avsc")), PathBuf::from("/b.avsc"));
    }

    #[test]
    fn test_missing_input_is_an_io_error() {
        assert!(matches!(
            collect_imports(Path::new("/nonexistent/dir/main.avdl")),
            Err(Error::Io(_))
        ));
    }
}
