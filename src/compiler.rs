//! Single-table pipeline: tokens → [`TableSpec`] → [`SchemaArtifact`] → disk.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::ast::{FieldDescriptor, FieldSpec, SchemaArtifact, TableSpec};
use crate::error::{GlyphError, GlyphResult};
use crate::parser::{is_identifier, parse_field};
use crate::resolver::{self, StubReport};
use crate::transpiler::{fk_index_sql, index_sql};
use crate::types::{FkAction, StorageClass};
use crate::writer::{ArtifactStore, Force, OverwritePolicy, WriteOutcome};

/// Table-wide options applied while compiling.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub version: u32,
    /// Append `created_at`, `updated_at` and `deleted_at`.
    pub stamps: bool,
    /// Applied to references that do not set their own `ondelete`.
    pub on_delete: Option<FkAction>,
    /// Applied to references that do not set their own `onupdate`.
    pub on_update: Option<FkAction>,
    /// Emit `idx_<table>_<col>_fk` for every reference column.
    pub fk_index: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            version: 1,
            stamps: false,
            on_delete: None,
            on_update: None,
            fk_index: true,
        }
    }
}

/// Parse and resolve a table from its field tokens.
pub fn build_table<S: AsRef<str>>(
    name: &str,
    tokens: &[S],
    opts: &CompileOptions,
) -> GlyphResult<TableSpec> {
    if !is_identifier(name) {
        return Err(GlyphError::InvalidArgument(format!(
            "table name '{}' is not a valid identifier",
            name
        )));
    }
    if opts.version == 0 {
        return Err(GlyphError::InvalidArgument(
            "schema version must be at least 1".to_string(),
        ));
    }

    let mut table = TableSpec::new(name, opts.version);
    let mut index_only: Vec<String> = Vec::new();

    for token in tokens {
        match parse_field(token.as_ref())? {
            FieldSpec::Column(mut col) => {
                if let Some(fk) = col.fk.as_mut() {
                    fk.on_delete = fk.on_delete.or(opts.on_delete);
                    fk.on_update = fk.on_update.or(opts.on_update);
                }
                table.columns.push(col);
            }
            FieldSpec::IndexOnly { column } => index_only.push(column),
        }
    }

    let pk_count = table
        .columns
        .iter()
        .filter(|c| c.constraints.primary_key)
        .count();
    if pk_count > 1 {
        let names: Vec<&str> = table
            .columns
            .iter()
            .filter(|c| c.constraints.primary_key)
            .map(|c| c.name.as_str())
            .collect();
        return Err(GlyphError::constraint(
            names.join(", "),
            "only one column may be the primary key",
        ));
    }
    if pk_count == 0 {
        debug!(table = name, "no primary key declared, injecting id");
        table.columns.insert(0, FieldDescriptor::surrogate_id());
    }

    if opts.stamps {
        table.columns.extend(stamp_columns());
    }

    let mut seen = HashSet::new();
    for col in &table.columns {
        if !seen.insert(col.name.as_str()) {
            return Err(GlyphError::constraint(
                &col.name,
                "column is defined more than once",
            ));
        }
    }

    for col in &table.columns {
        if col.constraints.index {
            table.extra_indexes.insert(index_sql(name, &col.name));
        }
    }
    for column in &index_only {
        if table.find_column(column).is_none() {
            return Err(GlyphError::constraint(
                column,
                format!("index requested on unknown column of '{}'", name),
            ));
        }
        table.extra_indexes.insert(index_sql(name, column));
    }
    if opts.fk_index {
        for col in table.columns.iter().filter(|c| c.fk.is_some()) {
            table.extra_indexes.insert(fk_index_sql(name, &col.name));
        }
    }

    Ok(table)
}

fn stamp_columns() -> [FieldDescriptor; 3] {
    [
        FieldDescriptor::new("created_at", StorageClass::Text).not_null(),
        FieldDescriptor::new("updated_at", StorageClass::Text).not_null(),
        FieldDescriptor::new("deleted_at", StorageClass::Text),
    ]
}

/// Compile tokens straight to an artifact without touching the disk.
pub fn compile<S: AsRef<str>>(
    name: &str,
    tokens: &[S],
    opts: &CompileOptions,
) -> GlyphResult<SchemaArtifact> {
    Ok(build_table(name, tokens, opts)?.to_artifact())
}

/// What one `generate` call did on disk.
#[derive(Debug)]
pub struct Generated {
    pub artifact: SchemaArtifact,
    pub path: PathBuf,
    pub outcome: WriteOutcome,
    pub stubs: StubReport,
}

/// Compile a table, write it under the primary-table policy, then make sure
/// every referenced table has at least a stub.
///
/// `defined_elsewhere` lists tables that will receive a real definition later
/// in the same run; they are not stubbed.
pub fn generate<S: AsRef<str>>(
    store: &ArtifactStore,
    name: &str,
    tokens: &[S],
    opts: &CompileOptions,
    force: Force,
    defined_elsewhere: &HashSet<String>,
) -> GlyphResult<Generated> {
    let table = build_table(name, tokens, opts)?;
    let artifact = table.to_artifact();

    let outcome = store.write(&artifact, OverwritePolicy::primary(force))?;
    let path = store.path_for(name);
    info!(table = name, path = %path.display(), ?outcome, "wrote schema");

    let stubs = resolver::ensure_stubs(store, &table, defined_elsewhere)?;

    Ok(Generated {
        artifact,
        path,
        outcome,
        stubs,
    })
}
