//! Structured Feedback Module
//!
//! Reports the outcome of a resolution run, either as JSON for tools or as
//! plain text for people:
//! - every resolved type with the files that declared it
//! - every file that could not be resolved, with its last error
//! - the conflict that aborted the run, if any

use serde::{Deserialize, Serialize};

use crate::resolver::{FailedFile, Resolution};
use crate::utils::Error;

// ==================== Report Types ====================

/// Outcome of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub success: bool,

    /// Files resolved
    pub processed: usize,

    /// Files given
    pub total: usize,

    pub types: Vec<TypeSummary>,

    pub failures: Vec<FailureReport>,

    /// Set when a conflict aborted the run
    pub conflict: Option<ConflictReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSummary {
    /// Full name
    pub name: String,

    /// `record`, `error`, `enum`, `fixed`, ...
    pub kind: String,

    /// Files that declared the type, sorted
    pub locations: Vec<String>,

    /// Named types this type uses directly
    pub references: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    pub path: String,

    /// Error code (e.g., "E0204")
    pub code: String,

    pub message: String,

    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub name: String,
    pub locations: Vec<String>,
    pub message: String,
}

// ==================== Conversion ====================

impl FailureReport {
    pub fn from_failed(failed: &FailedFile) -> Self {
        let error = &failed.error;
        Self {
            path: failed.path.clone(),
            code: error.code().to_string(),
            message: error.to_string(),
            location: error.span().map(|s| Location {
                line: s.line,
                column: s.column,
            }),
        }
    }
}

impl ResolutionReport {
    /// Report for a run that finished
    pub fn from_resolution<F>(resolution: &Resolution<F>) -> Self {
        let types = resolution
            .registry
            .iter()
            .filter_map(|entry| {
                entry.definition().map(|schema| TypeSummary {
                    name: entry.name().to_string(),
                    kind: schema.kind().to_string(),
                    locations: entry.locations().iter().cloned().collect(),
                    references: schema.references(),
                })
            })
            .collect();

        Self {
            success: resolution.is_success(),
            processed: resolution.processed,
            total: resolution.total(),
            types,
            failures: resolution.failed.iter().map(FailureReport::from_failed).collect(),
            conflict: None,
        }
    }

    /// Report for a run aborted by `error`. Returns None for any error that
    /// is not a type conflict.
    pub fn from_conflict(error: &Error, total: usize) -> Option<Self> {
        match error {
            Error::TypeConflict { name, locations } => Some(Self {
                success: false,
                processed: 0,
                total,
                types: vec![],
                failures: vec![],
                conflict: Some(ConflictReport {
                    name: name.clone(),
                    locations: locations.clone(),
                    message: error.to_string(),
                }),
            }),
            _ => None,
        }
    }

    /// Output as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Output as compact JSON (for programmatic use)
    pub fn to_json_compact(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Human readable summary
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        if let Some(conflict) = &self.conflict {
            out.push_str(&conflict.message);
            out.push('\n');
            return out;
        }

        out.push_str(&format!(
            "Resolved {} of {} file(s), {} type(s)\n",
            self.processed,
            self.total,
            self.types.len()
        ));
        if !self.failures.is_empty() {
            out.push_str("Could not resolve schema definition files:\n");
            for failure in &self.failures {
                out.push_str(&format!("{}: {}\n", failure.path, failure.message));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{resolve, SchemaFile};
    use pretty_assertions::assert_eq;

    fn resolution() -> Resolution<SchemaFile> {
        let files = vec![
            SchemaFile::from_source(
                "point.avsc",
                r#"{"type": "record", "name": "geo.Point", "fields": [{"name": "unit", "type": "geo.Unit"}]}"#,
            )
            .unwrap(),
            SchemaFile::from_source("unit.avsc", r#"{"type": "enum", "name": "geo.Unit", "symbols": ["M"]}"#)
                .unwrap(),
            SchemaFile::from_source("broken.avdl", "protocol P {\n  record R { Ghost g; }\n}").unwrap(),
        ];
        resolve(files).unwrap()
    }

    #[test]
    fn test_report_from_resolution() {
        let report = ResolutionReport::from_resolution(&resolution());

        assert!(!report.success);
        assert_eq!((report.processed, report.total), (2, 3));
        assert_eq!(
            report.types,
            vec![
                TypeSummary {
                    name: "geo.Unit".into(),
                    kind: "enum".into(),
                    locations: vec!["unit.avsc".into()],
                    references: vec![],
                },
                TypeSummary {
                    name: "geo.Point".into(),
                    kind: "record".into(),
                    locations: vec!["point.avsc".into()],
                    references: vec!["geo.Unit".into()],
                },
            ]
        );
        assert_eq!(
            report.failures,
            vec![FailureReport {
                path: "broken.avdl".into(),
                code: "E0204".into(),
                message: "Undefined name: Ghost".into(),
                location: None,
            }]
        );
    }

    #[test]
    fn test_text_report() {
        let text = ResolutionReport::from_resolution(&resolution()).to_text();
        assert_eq!(
            text,
            "Resolved 2 of 3 file(s), 2 type(s)\n\
             Could not resolve schema definition files:\n\
             broken.avdl: Undefined name: Ghost\n"
        );
    }

    #[test]
    fn test_conflict_report() {
        let error = Error::TypeConflict {
            name: "geo.Unit".into(),
            locations: vec!["a.avsc".into(), "b.avsc".into()],
        };
        let report = ResolutionReport::from_conflict(&error, 2).unwrap();
        assert_eq!(
            report.to_text(),
            "Found conflicting definition of type geo.Unit in [a.avsc, b.avsc]\n"
        );
        assert!(ResolutionReport::from_conflict(&Error::Io("x".into()), 2).is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let report = ResolutionReport::from_resolution(&resolution());
        let parsed: ResolutionReport = serde_json::from_str(&report.to_json()).unwrap();
        assert_eq!(parsed, report);
        assert!(report.to_json_compact().starts_with("{\"success\":false"));
    }

    #[test]
    fn test_syntax_failure_has_location() {
        let failed = FailedFile {
            path: "x.avdl".into(),
            error: Error::UnexpectedChar {
                ch: '$',
                span: crate::utils::Span::new(10, 11, 3, 7),
            },
        };
        let report = FailureReport::from_failed(&failed);
        assert_eq!(report.code, "E0102");
        assert_eq!(report.location, Some(Location { line: 3, column: 7 }));
    }
}
