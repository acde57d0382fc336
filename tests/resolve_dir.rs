//! Resolve a directory of mixed schema files written to the temp dir

use std::fs;
use std::path::{Path, PathBuf};

use avro_resolve::config::ResolverConfig;
use avro_resolve::resolver::{discover_files, resolve, SchemaFile};
use avro_resolve::schema::{json, Schema};
use avro_resolve::{Error, ResolutionReport};
use pretty_assertions::assert_eq;

struct TempTree(PathBuf);

impl TempTree {
    fn new(name: &str) -> Self {
        let root = std::env::temp_dir().join(format!("avro-resolve-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).unwrap();
        Self(root)
    }

    fn write(&self, relative: &str, text: &str) {
        let path = self.0.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempTree {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

fn load(root: &Path, config: &ResolverConfig) -> Vec<SchemaFile> {
    discover_files(&[root.to_path_buf()], &config.extensions)
        .unwrap()
        .iter()
        .map(|p| SchemaFile::open(p).unwrap().with_validate_defaults(config.validate_defaults))
        .collect()
}

/// Files sort so that every dependent comes before what it uses
fn write_shop(tree: &TempTree) {
    tree.write(
        "a/order.avdl",
        r#"
        @namespace("shop")
        protocol Orders {
            import schema "../c/item.avsc";

            record Order {
                array<Item> items;
                Customer customer;
                union { null, string } note = null;
            }

            Order place(Customer who, array<Item> items) throws Rejected;
        }
        "#,
    );
    tree.write(
        "b/customer.avpr",
        r#"{
            "protocol": "Customers",
            "namespace": "shop",
            "types": [
                {"type": "record", "name": "Customer", "fields": [
                    {"name": "id", "type": "long"},
                    {"name": "tier", "type": "Tier"}
                ]},
                {"type": "error", "name": "Rejected", "fields": [{"name": "reason", "type": "string"}]}
            ],
            "messages": {}
        }"#,
    );
    tree.write(
        "c/item.avsc",
        r#"{"type": "record", "name": "shop.Item", "fields": [
            {"name": "sku", "type": "string"},
            {"name": "price", "type": {"type": "bytes", "logicalType": "decimal", "precision": 9, "scale": 2}}
        ]}"#,
    );
    tree.write("d/tier.avsc", r#"{"type": "enum", "name": "shop.Tier", "symbols": ["GOLD", "SILVER"]}"#);
    tree.write("d/README.md", "not a schema");
}

#[test]
fn test_resolves_directory_in_reverse_dependency_order() {
    let tree = TempTree::new("shop");
    write_shop(&tree);

    let config = ResolverConfig::default();
    let files = load(tree.path(), &config);
    assert_eq!(files.len(), 4);

    let resolution = resolve(files).unwrap();
    assert!(resolution.is_success());
    assert_eq!(resolution.processed, 4);

    let mut names: Vec<String> = resolution.registry.definitions().keys().cloned().collect();
    names.sort();
    assert_eq!(
        names,
        vec!["shop.Customer", "shop.Item", "shop.Order", "shop.Rejected", "shop.Tier"]
    );

    let report = ResolutionReport::from_resolution(&resolution);
    let order = report.types.iter().find(|t| t.name == "shop.Order").unwrap();
    assert_eq!(order.references, vec!["shop.Item", "shop.Customer"]);
}

#[test]
fn test_written_schema_is_self_contained() {
    let tree = TempTree::new("inline");
    write_shop(&tree);

    let resolution = resolve(load(tree.path(), &ResolverConfig::default())).unwrap();
    let definitions = resolution.registry.definitions();
    let text = json::to_json_string(&Schema::reference("shop.Order"), &definitions);

    // The standalone schema parses with nothing else visible
    let file = SchemaFile::from_source("order.avsc", text).unwrap();
    let reparsed = avro_resolve::PendingFile::parse(&file, &Default::default()).unwrap();
    assert_eq!(reparsed.get("shop.Order"), definitions.get("shop.Order"));
    assert_eq!(reparsed.get("shop.Tier"), definitions.get("shop.Tier"));
}

#[test]
fn test_missing_and_conflicting_types() {
    let tree = TempTree::new("broken");
    write_shop(&tree);
    tree.write("e/audit.avsc", r#"{"type": "record", "name": "Audit", "fields": [{"name": "who", "type": "shop.Ghost"}]}"#);

    let resolution = resolve(load(tree.path(), &ResolverConfig::default())).unwrap();
    let report = ResolutionReport::from_resolution(&resolution);
    assert!(!report.success);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].path.ends_with("audit.avsc"));
    assert_eq!(report.failures[0].message, "Undefined name: shop.Ghost");

    tree.write("e/audit.avsc", r#"{"type": "enum", "name": "shop.Tier", "symbols": ["GOLD"]}"#);
    match resolve(load(tree.path(), &ResolverConfig::default())) {
        Err(Error::TypeConflict { name, locations }) => {
            assert_eq!(name, "shop.Tier");
            assert_eq!(locations.len(), 2);
        }
        other => panic!("expected conflict, got {:?}", other.map(|r| r.processed)),
    }
}

#[test]
fn test_validate_defaults_from_config() {
    let tree = TempTree::new("defaults");
    tree.write("bad.avsc", r#"{"type": "record", "name": "R", "fields": [{"name": "n", "type": "int", "default": "zero"}]}"#);

    let lenient = resolve(load(tree.path(), &ResolverConfig::default())).unwrap();
    assert!(lenient.is_success());

    let config = ResolverConfig::from_json(r#"{"validateDefaults": true}"#).unwrap();
    let strict = resolve(load(tree.path(), &config)).unwrap();
    assert_eq!(strict.failed.len(), 1);
    assert!(matches!(strict.failed[0].error, Error::InvalidDefault { .. }));
}
