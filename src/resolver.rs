//! Foreign-key targets and stub generation.
//!
//! Any table referenced but not yet defined gets a one-column stub so the
//! generated `REFERENCES` clauses always point at something. Stubs use
//! [`OverwritePolicy::stub`]: written when missing, never regenerated.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::ast::{FieldDescriptor, SchemaArtifact, TableSpec};
use crate::error::GlyphResult;
use crate::writer::{ArtifactStore, OverwritePolicy, WriteOutcome};

/// Stubs written and references left alone during one resolution pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StubReport {
    pub created: Vec<PathBuf>,
    /// Targets that already had an artifact.
    pub existing: Vec<String>,
    /// Targets skipped because the current run defines them.
    pub deferred: Vec<String>,
}

/// `id INTEGER PRIMARY KEY AUTOINCREMENT` and nothing else, version 1.
pub fn stub_table(name: &str) -> TableSpec {
    let mut table = TableSpec::new(name, 1);
    table.columns.push(FieldDescriptor::surrogate_id());
    table
}

pub fn stub_artifact(name: &str) -> SchemaArtifact {
    stub_table(name).to_artifact()
}

/// Write a stub for every table `table` references that has no artifact yet.
/// Self-references are never stubbed.
pub fn ensure_stubs(
    store: &ArtifactStore,
    table: &TableSpec,
    defined_elsewhere: &HashSet<String>,
) -> GlyphResult<StubReport> {
    let mut report = StubReport::default();

    for target in table.referenced_tables() {
        if defined_elsewhere.contains(target) {
            debug!(table = %table.name, target, "target defined later in this run");
            report.deferred.push(target.to_string());
            continue;
        }

        match store.write(&stub_artifact(target), OverwritePolicy::stub())? {
            WriteOutcome::Kept => report.existing.push(target.to_string()),
            _ => {
                let path = store.path_for(target);
                info!(table = %table.name, target, path = %path.display(), "created stub");
                report.created.push(path);
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CompileOptions, build_table};
    use tempfile::TempDir;

    #[test]
    fn test_stub_shape() {
        let stub = stub_artifact("users");
        assert_eq!(stub.version, 1);
        assert_eq!(
            stub.create_sql,
            "CREATE TABLE IF NOT EXISTS users (\n    id INTEGER PRIMARY KEY AUTOINCREMENT\n);"
        );
        assert!(stub.extra_sql.is_empty());
    }

    #[test]
    fn test_creates_missing_stubs_once() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let table = build_table(
            "comments",
            &["post_id->posts", "parent_id->comments", "author_id->users"],
            &CompileOptions::default(),
        )
        .unwrap();

        let report = ensure_stubs(&store, &table, &HashSet::new()).unwrap();
        assert_eq!(
            report.created,
            vec![store.path_for("posts"), store.path_for("users")]
        );
        assert!(!store.exists("comments"));

        let again = ensure_stubs(&store, &table, &HashSet::new()).unwrap();
        assert!(again.created.is_empty());
        assert_eq!(again.existing, vec!["posts", "users"]);
    }

    #[test]
    fn test_hand_edited_stub_survives() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        std::fs::write(store.path_for("users"), "{ \"edited\": true }").unwrap();

        let table = build_table("posts", &["user_id->users"], &CompileOptions::default()).unwrap();
        ensure_stubs(&store, &table, &HashSet::new()).unwrap();

        assert_eq!(
            std::fs::read_to_string(store.path_for("users")).unwrap(),
            "{ \"edited\": true }"
        );
    }

    #[test]
    fn test_targets_defined_elsewhere_are_skipped() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let table = build_table("posts", &["user_id->users"], &CompileOptions::default()).unwrap();

        let later: HashSet<String> = ["users".to_string()].into_iter().collect();
        let report = ensure_stubs(&store, &table, &later).unwrap();
        assert_eq!(report.deferred, vec!["users"]);
        assert!(!store.exists("users"));
    }
}
