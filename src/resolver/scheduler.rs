//! Incremental resolution scheduler
//!
//! Files are tried in queue order. A file that fails waits in the blocked set
//! until some other file commits new definitions; every commit wakes all
//! blocked files at once. Whatever is still blocked when the ready queue runs
//! dry has failed for good.

use std::collections::VecDeque;

use indexmap::IndexSet;
use log::debug;

use crate::resolver::file::{FileId, FileRecord, FileStatus, PendingFile};
use crate::resolver::registry::TypeRegistry;
use crate::schema::TypeMap;
use crate::utils::{Error, Result};

/// Drives a set of files towards a fixed point
pub struct ResolutionScheduler<F> {
    registry: TypeRegistry,
    files: Vec<FileRecord<F>>,
    ready: VecDeque<FileId>,
    blocked: IndexSet<FileId>,
    processed: usize,
}

impl<F: PendingFile> ResolutionScheduler<F> {
    /// Queue every file in the given order
    pub fn new(files: impl IntoIterator<Item = F>) -> Self {
        let files: Vec<FileRecord<F>> = files.into_iter().map(FileRecord::new).collect();
        let ready = (0..files.len()).map(FileId).collect();
        Self {
            registry: TypeRegistry::new(),
            files,
            ready,
            blocked: IndexSet::new(),
            processed: 0,
        }
    }

    /// Definitions `id` may use: everything defined so far except the names
    /// suppressed for this file
    pub fn visibility(&self, id: FileId) -> TypeMap {
        let hidden = &self.files[id.0].duplicate_names;
        self.registry
            .iter()
            .filter(|entry| !hidden.contains(entry.name()))
            .filter_map(|entry| {
                entry
                    .definition()
                    .map(|schema| (entry.name().to_string(), schema.clone()))
            })
            .collect()
    }

    /// Register a file's definitions, then wake every blocked file
    pub fn commit(&mut self, id: FileId, definitions: TypeMap) -> Result<()> {
        let record = &mut self.files[id.0];
        let location = record.file.path().to_string();
        for (name, schema) in definitions {
            self.registry.entry_or_create(&name).update(&location, schema)?;
        }
        record.clear_error();
        record.status = FileStatus::Done;
        self.processed += 1;

        if !self.blocked.is_empty() {
            debug!("{} resolved, waking {} blocked file(s)", location, self.blocked.len());
        }
        for woken in self.blocked.drain(..) {
            self.files[woken.0].status = FileStatus::Ready;
            self.ready.push_back(woken);
        }
        Ok(())
    }

    /// Park a failed file until the registry grows
    pub fn requeue(&mut self, id: FileId, error: Error) {
        let record = &mut self.files[id.0];
        debug!("{} blocked: {}", record.path(), error);
        record.last_error = Some(error);
        record.status = FileStatus::Blocked;
        self.blocked.insert(id);
    }

    /// Put a file straight back on the ready queue
    pub fn retry(&mut self, id: FileId) {
        self.files[id.0].status = FileStatus::Ready;
        self.ready.push_back(id);
    }

    /// Hide the global definition of `name` from `id`. Returns false if it
    /// was already hidden.
    pub fn suppress(&mut self, id: FileId, name: &str) -> bool {
        self.files[id.0].duplicate_names.insert(name.to_string())
    }

    pub fn next(&mut self) -> Option<FileId> {
        self.ready.pop_front()
    }

    pub fn has_work(&self) -> bool {
        !self.ready.is_empty()
    }

    /// Number of files resolved so far
    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn total(&self) -> usize {
        self.files.len()
    }

    pub fn record(&self, id: FileId) -> &FileRecord<F> {
        &self.files[id.0]
    }

    pub fn file(&self, id: FileId) -> &F {
        &self.files[id.0].file
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// End the run. Files still blocked are permanent failures.
    pub fn finish(self) -> Resolution<F> {
        let failed = self
            .blocked
            .iter()
            .map(|id| &self.files[id.0])
            .map(|record| FailedFile {
                path: record.path().to_string(),
                error: record
                    .last_error
                    .clone()
                    .unwrap_or_else(|| Error::InvalidSchema("Not resolved".to_string())),
            })
            .collect();
        Resolution {
            registry: self.registry,
            files: self.files.into_iter().map(|r| r.file).collect(),
            failed,
            processed: self.processed,
        }
    }
}

/// A file that never resolved, with its last error
#[derive(Debug, Clone, PartialEq)]
pub struct FailedFile {
    pub path: String,
    pub error: Error,
}

/// Outcome of a completed run
#[derive(Debug)]
pub struct Resolution<F> {
    pub registry: TypeRegistry,
    /// Input files, in their original order
    pub files: Vec<F>,
    pub failed: Vec<FailedFile>,
    pub processed: usize,
}

impl<F> Resolution<F> {
    pub fn total(&self) -> usize {
        self.files.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PrimitiveType, Schema};
    use std::collections::BTreeSet;
    use pretty_assertions::assert_eq;

    struct Stub(&'static str);

    impl PendingFile for Stub {
        fn path(&self) -> &str {
            self.0
        }

        fn parse(&self, _visible: &TypeMap) -> Result<TypeMap> {
            Ok(TypeMap::new())
        }
    }

    fn defs(name: &str) -> TypeMap {
        let mut map = TypeMap::new();
        map.insert(name.to_string(), Schema::primitive(PrimitiveType::Int));
        map
    }

    fn missing(name: &str) -> Error {
        Error::UndefinedType { name: name.into() }
    }

    #[test]
    fn test_files_start_ready_in_order() {
        let mut scheduler = ResolutionScheduler::new(vec![Stub("a"), Stub("b")]);
        assert!(scheduler.has_work());
        assert_eq!(scheduler.next(), Some(FileId(0)));
        assert_eq!(scheduler.next(), Some(FileId(1)));
        assert_eq!(scheduler.next(), None);
        assert!(!scheduler.has_work());
    }

    #[test]
    fn test_commit_wakes_blocked_in_insertion_order() {
        let mut scheduler = ResolutionScheduler::new(vec![Stub("a"), Stub("b"), Stub("c")]);
        let (a, b, c) = (FileId(0), FileId(1), FileId(2));
        scheduler.next();
        scheduler.next();
        scheduler.next();
        scheduler.requeue(b, missing("X"));
        scheduler.requeue(a, missing("X"));
        scheduler.requeue(b, missing("Y"));
        assert!(!scheduler.has_work());
        assert_eq!(scheduler.record(a).status, FileStatus::Blocked);

        scheduler.commit(c, defs("X")).unwrap();
        assert_eq!(scheduler.processed(), 1);
        assert_eq!(scheduler.record(c).status, FileStatus::Done);
        assert_eq!(scheduler.next(), Some(b));
        assert_eq!(scheduler.next(), Some(a));
        assert_eq!(scheduler.next(), None);
        assert_eq!(scheduler.record(a).status, FileStatus::Ready);
    }

    #[test]
    fn test_visibility_hides_suppressed_names() {
        let mut scheduler = ResolutionScheduler::new(vec![Stub("a"), Stub("b")]);
        let (a, b) = (FileId(0), FileId(1));
        scheduler.commit(a, defs("x.Dup")).unwrap();
        assert!(scheduler.visibility(b).contains_key("x.Dup"));

        assert!(scheduler.suppress(b, "x.Dup"));
        assert!(!scheduler.suppress(b, "x.Dup"));
        assert!(scheduler.visibility(b).is_empty());
        assert!(scheduler.visibility(a).contains_key("x.Dup"));
    }

    /// A stub that hides the given names from itself from the start
    struct Hiding(&'static str, &'static [&'static str]);

    impl PendingFile for Hiding {
        fn path(&self) -> &str {
            self.0
        }

        fn duplicate_names(&self) -> BTreeSet<String> {
            self.1.iter().map(|name| name.to_string()).collect()
        }

        fn parse(&self, _visible: &TypeMap) -> Result<TypeMap> {
            Ok(TypeMap::new())
        }
    }

    #[test]
    fn test_declared_duplicate_names_are_hidden_from_the_start() {
        let mut scheduler = ResolutionScheduler::new(vec![Hiding("a", &[]), Hiding("b", &["x.Dup"])]);
        let (a, b) = (FileId(0), FileId(1));
        assert!(scheduler.record(a).duplicate_names.is_empty());
        assert!(scheduler.record(b).duplicate_names.contains("x.Dup"));

        let mut both = defs("x.Dup");
        both.extend(defs("x.Other"));
        scheduler.commit(a, both).unwrap();

        let hidden = scheduler.visibility(b);
        assert!(!hidden.contains_key("x.Dup"));
        assert!(hidden.contains_key("x.Other"));
        assert!(scheduler.visibility(a).contains_key("x.Dup"));
        assert!(!scheduler.suppress(b, "x.Dup"));
    }

    #[test]
    fn test_commit_clears_last_error() {
        let mut scheduler = ResolutionScheduler::new(vec![Stub("a")]);
        let a = FileId(0);
        scheduler.next();
        scheduler.requeue(a, missing("X"));
        assert!(scheduler.record(a).last_error.is_some());
        scheduler.commit(a, TypeMap::new()).unwrap();
        assert_eq!(scheduler.record(a).last_error, None);
    }

    #[test]
    fn test_finish_reports_blocked_files() {
        let mut scheduler = ResolutionScheduler::new(vec![Stub("a"), Stub("b")]);
        scheduler.next();
        scheduler.next();
        scheduler.commit(FileId(0), defs("A")).unwrap();
        scheduler.requeue(FileId(1), missing("Ghost"));

        let resolution = scheduler.finish();
        assert_eq!(resolution.processed, 1);
        assert_eq!(resolution.total(), 2);
        assert_eq!(
            resolution.failed,
            vec![FailedFile { path: "b".into(), error: missing("Ghost") }]
        );
        assert!(!resolution.is_success());
    }
}
