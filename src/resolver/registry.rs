//! Registry of resolved type definitions

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::schema::{Schema, TypeMap};
use crate::utils::{Error, Result};

/// Canonical definition of one type name and every file that declared it
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRegistryEntry {
    name: String,
    definition: Option<Schema>,
    /// Declaring files, sorted for stable messages
    locations: BTreeSet<String>,
}

impl TypeRegistryEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: None,
            locations: BTreeSet::new(),
        }
    }

    /// Record a declaration of this type at `location`.
    ///
    /// The first declaration becomes canonical. Later ones must be
    /// structurally equal to it.
    pub fn update(&mut self, location: &str, schema: Schema) -> Result<()> {
        self.locations.insert(location.to_string());
        match &self.definition {
            None => {
                self.definition = Some(schema);
                Ok(())
            }
            Some(existing) if *existing == schema => Ok(()),
            Some(_) => Err(Error::TypeConflict {
                name: self.name.clone(),
                locations: self.locations.iter().cloned().collect(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> Option<&Schema> {
        self.definition.as_ref()
    }

    pub fn locations(&self) -> &BTreeSet<String> {
        &self.locations
    }
}

/// All entries of one resolution run, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    entries: IndexMap<String, TypeRegistryEntry>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the entry for `name`, creating an empty one on first use
    pub fn entry_or_create(&mut self, name: &str) -> &mut TypeRegistryEntry {
        self.entries
            .entry(name.to_string())
            .or_insert_with(|| TypeRegistryEntry::new(name))
    }

    pub fn get(&self, name: &str) -> Option<&TypeRegistryEntry> {
        self.entries.get(name)
    }

    /// Every defined type, for use as a visibility set or lookup
    pub fn definitions(&self) -> TypeMap {
        self.iter()
            .filter_map(|entry| {
                entry
                    .definition()
                    .map(|schema| (entry.name().to_string(), schema.clone()))
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeRegistryEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FixedSchema, Name};
    use pretty_assertions::assert_eq;

    fn fixed(size: usize) -> Schema {
        Schema::Fixed(FixedSchema::new(Name::new("Hash", Some("x")), size))
    }

    #[test]
    fn test_first_writer_wins() {
        let mut entry = TypeRegistryEntry::new("x.Hash");
        assert!(entry.definition().is_none());
        entry.update("a.avsc", fixed(16)).unwrap();
        assert_eq!(entry.definition(), Some(&fixed(16)));
    }

    #[test]
    fn test_identical_redeclaration_is_recorded() {
        let mut entry = TypeRegistryEntry::new("x.Hash");
        entry.update("b.avsc", fixed(16)).unwrap();
        entry.update("a.avsc", fixed(16)).unwrap();
        assert_eq!(
            entry.locations().iter().collect::<Vec<_>>(),
            vec!["a.avsc", "b.avsc"]
        );
    }

    #[test]
    fn test_conflict_names_every_location() {
        let mut entry = TypeRegistryEntry::new("x.Hash");
        entry.update("z.avsc", fixed(16)).unwrap();
        entry.update("m.avsc", fixed(16)).unwrap();
        let err = entry.update("a.avsc", fixed(32)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Found conflicting definition of type x.Hash in [a.avsc, m.avsc, z.avsc]"
        );
        assert_eq!(entry.definition(), Some(&fixed(16)));
    }

    #[test]
    fn test_registry_definitions_skip_empty_entries() {
        let mut registry = TypeRegistry::new();
        registry.entry_or_create("x.Pending");
        registry.entry_or_create("x.Hash").update("a.avsc", fixed(8)).unwrap();

        let defs = registry.definitions();
        assert_eq!(registry.len(), 2);
        assert_eq!(defs.keys().collect::<Vec<_>>(), vec!["x.Hash"]);
    }
}
