//! Parsed and resolved table definitions.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::types::{FkAction, StorageClass};

/// Result of parsing one field token.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec {
    /// A real column.
    Column(FieldDescriptor),
    /// `^col`: only asks for an index on an existing column.
    IndexOnly { column: String },
}

/// A column with its resolved type, constraints and optional reference.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub storage: StorageClass,
    pub constraints: Constraints,
    pub fk: Option<ForeignKeyRef>,
}

/// The constraint set of a column. Emission order is fixed by the transpiler,
/// never by the order flags were written in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraints {
    pub not_null: bool,
    pub unique: bool,
    pub index: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub default: Option<String>,
}

impl Constraints {
    /// Union of two flag sets. A default on `other` wins.
    pub fn union(&self, other: &Constraints) -> Constraints {
        Constraints {
            not_null: self.not_null || other.not_null,
            unique: self.unique || other.unique,
            index: self.index || other.index,
            primary_key: self.primary_key || other.primary_key,
            auto_increment: self.auto_increment || other.auto_increment,
            default: other.default.clone().or_else(|| self.default.clone()),
        }
    }
}

/// `REFERENCES table(column)` plus its actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
    pub on_delete: Option<FkAction>,
    pub on_update: Option<FkAction>,
    pub deferred: bool,
}

impl ForeignKeyRef {
    pub fn new(table: impl Into<String>, column: Option<String>) -> Self {
        Self {
            table: table.into(),
            column: column.unwrap_or_else(|| "id".to_string()),
            on_delete: None,
            on_update: None,
            deferred: false,
        }
    }
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, storage: StorageClass) -> Self {
        Self {
            name: name.into(),
            storage,
            constraints: Constraints::default(),
            fk: None,
        }
    }

    /// `id INTEGER PRIMARY KEY AUTOINCREMENT`, injected when no primary key is declared.
    pub fn surrogate_id() -> Self {
        let mut col = Self::new("id", StorageClass::Integer);
        col.constraints.primary_key = true;
        col.constraints.auto_increment = true;
        col
    }

    pub fn not_null(mut self) -> Self {
        self.constraints.not_null = true;
        self
    }
}

/// A table being compiled. Built fresh per invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub name: String,
    pub version: u32,
    pub columns: Vec<FieldDescriptor>,
    /// Auxiliary `CREATE INDEX` statements, deduplicated, in first-seen order.
    pub extra_indexes: IndexSet<String>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
            columns: Vec::new(),
            extra_indexes: IndexSet::new(),
        }
    }

    pub fn find_column(&self, name: &str) -> Option<&FieldDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> Option<&FieldDescriptor> {
        self.columns.iter().find(|c| c.constraints.primary_key)
    }

    /// Every table this one references, excluding itself, in column order.
    pub fn referenced_tables(&self) -> Vec<&str> {
        let mut seen: IndexSet<&str> = IndexSet::new();
        for col in &self.columns {
            if let Some(fk) = &col.fk
                && fk.table != self.name
            {
                seen.insert(fk.table.as_str());
            }
        }
        seen.into_iter().collect()
    }
}

/// The compiled, persisted form of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaArtifact {
    pub table: String,
    pub version: u32,
    #[serde(rename = "createSQL")]
    pub create_sql: String,
    #[serde(rename = "extraSQL", default)]
    pub extra_sql: Vec<String>,
}
