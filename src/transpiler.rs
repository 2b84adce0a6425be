//! DDL transpiler.
//!
//! Converts resolved table definitions into SQLite DDL. Column clauses are
//! emitted in one fixed order regardless of how the flags were written:
//!
//! ```text
//! <name> <type> [PRIMARY KEY] [AUTOINCREMENT] [UNIQUE] [NOT NULL]
//!        [REFERENCES t(c) [ON DELETE a] [ON UPDATE a] [DEFERRABLE INITIALLY DEFERRED]]
//!        [DEFAULT <expr>]
//! ```

use crate::ast::*;

/// Trait for converting AST nodes to SQL.
pub trait ToSql {
    /// Convert this node to a SQL string.
    fn to_sql(&self) -> String;
}

impl ToSql for ForeignKeyRef {
    fn to_sql(&self) -> String {
        let mut sql = format!("REFERENCES {}({})", self.table, self.column);
        if let Some(action) = self.on_delete {
            sql.push_str(" ON DELETE ");
            sql.push_str(action.as_sql());
        }
        if let Some(action) = self.on_update {
            sql.push_str(" ON UPDATE ");
            sql.push_str(action.as_sql());
        }
        if self.deferred {
            sql.push_str(" DEFERRABLE INITIALLY DEFERRED");
        }
        sql
    }
}

impl ToSql for FieldDescriptor {
    fn to_sql(&self) -> String {
        let c = &self.constraints;
        let mut parts: Vec<String> = vec![self.name.clone(), self.storage.to_string()];

        if c.primary_key {
            parts.push("PRIMARY KEY".into());
        }
        if c.auto_increment {
            parts.push("AUTOINCREMENT".into());
        }
        if c.unique {
            parts.push("UNIQUE".into());
        }
        if c.not_null {
            parts.push("NOT NULL".into());
        }
        if let Some(fk) = &self.fk {
            parts.push(fk.to_sql());
        }
        if let Some(expr) = &c.default {
            parts.push(format!("DEFAULT {}", expr));
        }

        parts.join(" ")
    }
}

impl ToSql for TableSpec {
    /// `CREATE TABLE IF NOT EXISTS`, one column per line.
    fn to_sql(&self) -> String {
        let cols: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("    {}", c.to_sql()))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
            self.name,
            cols.join(",\n")
        )
    }
}

/// `CREATE INDEX IF NOT EXISTS idx_<table>_<col> ON <table>(<col>);`
pub fn index_sql(table: &str, column: &str) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS idx_{t}_{c} ON {t}({c});",
        t = table,
        c = column
    )
}

/// Index backing a foreign-key column, suffixed `_fk`.
pub fn fk_index_sql(table: &str, column: &str) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS idx_{t}_{c}_fk ON {t}({c});",
        t = table,
        c = column
    )
}

impl TableSpec {
    /// Assemble the persisted artifact.
    pub fn to_artifact(&self) -> SchemaArtifact {
        SchemaArtifact {
            table: self.name.clone(),
            version: self.version,
            create_sql: self.to_sql(),
            extra_sql: self.extra_indexes.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FkAction, StorageClass};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fixed_clause_order() {
        let mut col = FieldDescriptor::new("email", StorageClass::Text);
        col.constraints.not_null = true;
        col.constraints.unique = true;
        assert_eq!(col.to_sql(), "email TEXT UNIQUE NOT NULL");
    }

    #[test]
    fn test_full_clause() {
        let mut col = FieldDescriptor::new("owner_id", StorageClass::Integer);
        col.constraints.default = Some("0".into());
        col.constraints.not_null = true;
        col.fk = Some(ForeignKeyRef {
            table: "users".into(),
            column: "id".into(),
            on_delete: Some(FkAction::Cascade),
            on_update: Some(FkAction::SetNull),
            deferred: true,
        });
        assert_eq!(
            col.to_sql(),
            "owner_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE \
             ON UPDATE SET NULL DEFERRABLE INITIALLY DEFERRED DEFAULT 0"
        );
    }

    #[test]
    fn test_surrogate_id_clause() {
        assert_eq!(
            FieldDescriptor::surrogate_id().to_sql(),
            "id INTEGER PRIMARY KEY AUTOINCREMENT"
        );
    }

    #[test]
    fn test_create_table_layout() {
        let mut table = TableSpec::new("tags", 2);
        table.columns.push(FieldDescriptor::surrogate_id());
        table
            .columns
            .push(FieldDescriptor::new("label", StorageClass::Text).not_null());
        table.extra_indexes.insert(index_sql("tags", "label"));

        let artifact = table.to_artifact();
        assert_eq!(
            artifact.create_sql,
            "CREATE TABLE IF NOT EXISTS tags (\n    id INTEGER PRIMARY KEY AUTOINCREMENT,\n    label TEXT NOT NULL\n);"
        );
        assert_eq!(artifact.version, 2);
        assert_eq!(
            artifact.extra_sql,
            vec!["CREATE INDEX IF NOT EXISTS idx_tags_label ON tags(label);"]
        );
    }

    #[test]
    fn test_fk_index_name() {
        assert_eq!(
            fk_index_sql("posts", "user_id"),
            "CREATE INDEX IF NOT EXISTS idx_posts_user_id_fk ON posts(user_id);"
        );
    }
}
