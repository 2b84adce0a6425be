//! Batch config loader.
//!
//! Reads a multi-table JSON document and feeds every entry through the same
//! token pipeline as `glyph create table`:
//!
//! ```json
//! {
//!   "outDir": "schemas",
//!   "defaultOnDelete": "cascade",
//!   "tables": [
//!     { "name": "posts", "stamps": true, "fields": [
//!       { "name": "title", "type": "text", "notnull": true },
//!       { "name": "author_id", "fk": { "table": "users" } }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Keys are matched after normalization (ASCII lowercase, `_`/`-` removed), so
//! `Name`, `notNull`, `not_null` and `FK` all resolve. `columns` is accepted
//! wherever `fields` is.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::compiler::{self, CompileOptions, Generated};
use crate::error::{GlyphError, GlyphResult};
use crate::parser::{is_identifier, is_type_name, split_top_level};
use crate::resolver;
use crate::types::FkAction;
use crate::writer::{ArtifactStore, Force, OverwritePolicy, WriteOutcome};

/// Normalized key → value, built once per JSON object.
struct Keyed<'a> {
    entries: HashMap<String, &'a Value>,
}

impl<'a> Keyed<'a> {
    fn new(map: &'a Map<String, Value>) -> Self {
        let entries = map
            .iter()
            .map(|(k, v)| (normalize_key(k), v))
            .collect();
        Self { entries }
    }

    /// First present, non-null value among `keys` (already normalized).
    fn get(&self, keys: &[&str]) -> Option<&'a Value> {
        keys.iter()
            .filter_map(|k| self.entries.get(*k).copied())
            .find(|v| !v.is_null())
    }
}

pub(crate) fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, '_' | '-'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

const NAME: &[&str] = &["name"];
const FIELDS: &[&str] = &["fields", "columns"];
const TABLES: &[&str] = &["tables"];
const OUT_DIR: &[&str] = &["outdir"];
const DEFAULT_ON_DELETE: &[&str] = &["defaultondelete"];
const DEFAULT_ON_UPDATE: &[&str] = &["defaultonupdate"];
const STAMPS: &[&str] = &["stamps"];
const VERSION: &[&str] = &["version"];
const TYPE: &[&str] = &["type"];
const NOT_NULL: &[&str] = &["notnull"];
const UNIQUE: &[&str] = &["unique"];
const INDEX: &[&str] = &["index"];
const PRIMARY: &[&str] = &["pk", "primary", "primarykey"];
const AUTO_INCREMENT: &[&str] = &["autoincrement", "ai"];
const DEFAULT: &[&str] = &["default"];
const FK: &[&str] = &["fk", "foreignkey", "references"];
const FK_TABLE: &[&str] = &["table"];
const FK_COLUMN: &[&str] = &["column"];
const ON_DELETE: &[&str] = &["ondelete"];
const ON_UPDATE: &[&str] = &["onupdate"];
const DEFERRED: &[&str] = &["deferred", "deferrable", "defer"];

/// A parsed batch document. Table entries stay raw until they are run so that
/// a bad entry only fails once the entries before it have been written.
#[derive(Debug, Clone)]
pub struct BatchDocument {
    pub out_dir: Option<PathBuf>,
    pub default_on_delete: Option<FkAction>,
    pub default_on_update: Option<FkAction>,
    tables: Vec<Value>,
}

/// One table entry, reduced to field tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub name: String,
    pub version: u32,
    pub stamps: bool,
    pub tokens: Vec<String>,
}

impl BatchDocument {
    pub fn from_file(path: &Path) -> GlyphResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GlyphError::fs(path, e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> GlyphResult<Self> {
        let root: Value = serde_json::from_str(content)
            .map_err(|e| GlyphError::config(format!("invalid JSON: {}", e)))?;
        let obj = root
            .as_object()
            .ok_or_else(|| GlyphError::config("document must be a JSON object"))?;
        let keyed = Keyed::new(obj);

        let tables = keyed
            .get(TABLES)
            .ok_or_else(|| GlyphError::config("missing 'tables'"))?
            .as_array()
            .ok_or_else(|| GlyphError::config("'tables' must be an array"))?
            .clone();

        let out_dir = match keyed.get(OUT_DIR) {
            Some(Value::String(s)) => Some(PathBuf::from(s)),
            Some(_) => return Err(GlyphError::config("'outDir' must be a string")),
            None => None,
        };

        Ok(Self {
            out_dir,
            default_on_delete: doc_action(&keyed, DEFAULT_ON_DELETE, "defaultOnDelete")?,
            default_on_update: doc_action(&keyed, DEFAULT_ON_UPDATE, "defaultOnUpdate")?,
            tables,
        })
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Names of every entry that has one; malformed entries are skipped here
    /// and reported when they are reached.
    pub fn declared_tables(&self) -> HashSet<String> {
        self.tables
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|obj| entry_name(&Keyed::new(obj)))
            .collect()
    }

    /// Validate and convert the entry at `index`.
    pub fn entry(&self, index: usize) -> GlyphResult<TableEntry> {
        let value = self
            .tables
            .get(index)
            .ok_or_else(|| GlyphError::config_at(index, None, "no such table entry"))?;
        table_entry(index, value)
    }

    /// Run every entry in order, stopping at the first failure. Artifacts
    /// written before the failure stay on disk, and any reference they make
    /// to a table the run never reached is given a stub.
    pub fn run(
        &self,
        store: &ArtifactStore,
        base: &CompileOptions,
        force: Force,
    ) -> GlyphResult<Vec<Generated>> {
        let declared = self.declared_tables();
        let mut done = Vec::with_capacity(self.tables.len());

        for index in 0..self.tables.len() {
            match self.run_entry(index, store, base, force, &declared, &done) {
                Ok(generated) => done.push(generated),
                Err(e) => {
                    stub_unwritten(store, &done);
                    return Err(e);
                }
            }
        }

        Ok(done)
    }

    fn run_entry(
        &self,
        index: usize,
        store: &ArtifactStore,
        base: &CompileOptions,
        force: Force,
        declared: &HashSet<String>,
        done: &[Generated],
    ) -> GlyphResult<Generated> {
        let entry = self.entry(index)?;
        debug!(index, table = %entry.name, tokens = ?entry.tokens, "batch entry");

        let opts = CompileOptions {
            version: entry.version,
            stamps: entry.stamps,
            on_delete: self.default_on_delete.or(base.on_delete),
            on_update: self.default_on_update.or(base.on_update),
            fk_index: base.fk_index,
        };
        // tables still to come in this document get real definitions
        let pending: HashSet<String> = declared
            .iter()
            .filter(|name| **name != entry.name && !is_done(done, name))
            .cloned()
            .collect();

        let generated =
            compiler::generate(store, &entry.name, &entry.tokens, &opts, force, &pending)?;
        info!(index, table = %entry.name, "batch entry written");
        Ok(generated)
    }
}

/// Stub every deferred reference whose table was never written.
fn stub_unwritten(store: &ArtifactStore, done: &[Generated]) {
    for target in done.iter().flat_map(|g| &g.stubs.deferred) {
        if is_done(done, target) {
            continue;
        }
        match store.write(&resolver::stub_artifact(target), OverwritePolicy::stub()) {
            Ok(WriteOutcome::Kept) => {}
            Ok(_) => info!(target = %target, "batch aborted, created stub"),
            Err(e) => warn!(target = %target, error = %e, "batch aborted, stub not written"),
        }
    }
}

fn is_done(done: &[Generated], name: &str) -> bool {
    done.iter().any(|g| g.artifact.table == name)
}

fn doc_action(keyed: &Keyed<'_>, keys: &[&str], label: &str) -> GlyphResult<Option<FkAction>> {
    match keyed.get(keys) {
        None => Ok(None),
        Some(Value::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|e: String| GlyphError::config(format!("'{}': {}", label, e))),
        Some(_) => Err(GlyphError::config(format!("'{}' must be a string", label))),
    }
}

/// Trimmed table name, if the entry has one that is an identifier.
fn entry_name(keyed: &Keyed<'_>) -> Option<String> {
    keyed
        .get(NAME)?
        .as_str()
        .map(str::trim)
        .filter(|s| is_identifier(s))
        .map(str::to_string)
}

fn table_entry(t: usize, value: &Value) -> GlyphResult<TableEntry> {
    let obj = value
        .as_object()
        .ok_or_else(|| GlyphError::config_at(t, None, "table entry must be an object"))?;
    let keyed = Keyed::new(obj);

    let name = match keyed.get(NAME) {
        Some(_) => entry_name(&keyed).ok_or_else(|| {
            GlyphError::config_at(t, None, "'name' must be an identifier string")
        })?,
        None => return Err(GlyphError::config_at(t, None, "table is missing 'name'")),
    };

    let fields = keyed
        .get(FIELDS)
        .ok_or_else(|| {
            GlyphError::config_at(t, None, format!("table '{}' is missing 'fields'", name))
        })?
        .as_array()
        .ok_or_else(|| {
            GlyphError::config_at(t, None, format!("'fields' of '{}' must be an array", name))
        })?;

    let stamps = flag(&keyed, STAMPS, t, None, "stamps")?;
    let version = match keyed.get(VERSION) {
        None => 1,
        Some(v) => v
            .as_u64()
            .filter(|n| (1..=u32::MAX as u64).contains(n))
            .map(|n| n as u32)
            .ok_or_else(|| GlyphError::config_at(t, None, "'version' must be an integer >= 1"))?,
    };

    let tokens = fields
        .iter()
        .enumerate()
        .map(|(f, field)| field_token(t, f, field))
        .collect::<GlyphResult<Vec<_>>>()?;

    Ok(TableEntry {
        name,
        version,
        stamps,
        tokens,
    })
}

/// Re-serialize one field object into the token grammar.
///
/// `{name, type?, notnull?, unique?, index?, pk?, autoincrement?, default?, fk?}`
/// becomes `name[:type][!+^#~][->table(column)][,ondelete=..][,onupdate=..][,defer][,default=..]`.
pub fn field_token(t: usize, f: usize, value: &Value) -> GlyphResult<String> {
    let err = |msg: String| GlyphError::config_at(t, Some(f), msg);

    let obj = value
        .as_object()
        .ok_or_else(|| err("field entry must be an object".to_string()))?;
    let keyed = Keyed::new(obj);

    let name = match keyed.get(NAME) {
        Some(Value::String(s)) if is_identifier(s.trim()) => s.trim().to_string(),
        Some(other) => return Err(err(format!("'name' must be an identifier, got {}", other))),
        None => return Err(err("field is missing 'name'".to_string())),
    };

    let mut token = name.clone();
    match keyed.get(TYPE) {
        Some(Value::String(ty)) if is_type_name(ty.trim()) => {
            token.push(':');
            token.push_str(ty.trim());
        }
        Some(other) => {
            return Err(err(format!(
                "'type' of '{}' is not a type name: {}",
                name, other
            )));
        }
        None => {}
    }

    for (keys, label, symbol) in [
        (NOT_NULL, "notnull", '!'),
        (UNIQUE, "unique", '+'),
        (INDEX, "index", '^'),
        (PRIMARY, "pk", '#'),
        (AUTO_INCREMENT, "autoincrement", '~'),
    ] {
        if flag(&keyed, keys, t, Some(f), label)? {
            token.push(symbol);
        }
    }

    let mut attrs: Vec<String> = Vec::new();
    if let Some(fk) = keyed.get(FK) {
        let (table, column, fk_attrs) = fk_parts(t, f, fk)?;
        token.push_str("->");
        token.push_str(&table);
        if let Some(column) = column {
            token.push('(');
            token.push_str(&column);
            token.push(')');
        }
        attrs.extend(fk_attrs);
    }

    if let Some(default) = keyed.get(DEFAULT) {
        let expr = match default {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
            other => return Err(err(format!("'default' must be a scalar, got {}", other))),
        };
        if split_top_level(&expr).len() > 1 {
            return Err(err(format!("'default' of '{}' has an unquoted comma", name)));
        }
        attrs.push(format!("default={}", expr));
    }

    for attr in attrs {
        token.push(',');
        token.push_str(&attr);
    }
    Ok(token)
}

/// `"users"`, `"users(uid)"` or `{table, column?, onDelete?, onUpdate?, deferred?}`.
fn fk_parts(
    t: usize,
    f: usize,
    value: &Value,
) -> GlyphResult<(String, Option<String>, Vec<String>)> {
    let err = |msg: String| GlyphError::config_at(t, Some(f), msg);
    let ident = |v: &str, what: &str| -> GlyphResult<String> {
        if is_identifier(v) {
            Ok(v.to_string())
        } else {
            Err(err(format!("fk {} '{}' is not an identifier", what, v)))
        }
    };

    match value {
        Value::String(s) => {
            let s = s.trim();
            match s.split_once('(') {
                Some((table, rest)) => {
                    let column = rest
                        .strip_suffix(')')
                        .ok_or_else(|| err(format!("fk '{}' is missing ')'", s)))?;
                    Ok((ident(table, "table")?, Some(ident(column, "column")?), vec![]))
                }
                None => Ok((ident(s, "table")?, None, vec![])),
            }
        }
        Value::Object(obj) => {
            let keyed = Keyed::new(obj);
            let table = match keyed.get(FK_TABLE) {
                Some(Value::String(s)) => ident(s.trim(), "table")?,
                _ => return Err(err("fk is missing 'table'".to_string())),
            };
            let column = match keyed.get(FK_COLUMN) {
                Some(Value::String(s)) => Some(ident(s.trim(), "column")?),
                Some(_) => return Err(err("fk 'column' must be a string".to_string())),
                None => None,
            };

            let mut attrs = Vec::new();
            for (keys, attr) in [(ON_DELETE, "ondelete"), (ON_UPDATE, "onupdate")] {
                match keyed.get(keys) {
                    Some(Value::String(s)) => {
                        let action: FkAction = s.parse().map_err(|e: String| err(e))?;
                        attrs.push(format!("{}={}", attr, action_token(action)));
                    }
                    Some(_) => return Err(err(format!("fk '{}' must be a string", attr))),
                    None => {}
                }
            }
            if flag(&keyed, DEFERRED, t, Some(f), "deferred")? {
                attrs.push("defer".to_string());
            }
            Ok((table, column, attrs))
        }
        other => Err(err(format!("'fk' must be a string or object, got {}", other))),
    }
}

/// Grammar spelling of an action.
fn action_token(action: FkAction) -> &'static str {
    match action {
        FkAction::Cascade => "cascade",
        FkAction::Restrict => "restrict",
        FkAction::SetNull => "setnull",
        FkAction::SetDefault => "setdefault",
        FkAction::NoAction => "noaction",
    }
}

fn flag(
    keyed: &Keyed<'_>,
    keys: &[&str],
    t: usize,
    f: Option<usize>,
    label: &str,
) -> GlyphResult<bool> {
    match keyed.get(keys) {
        None => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(GlyphError::config_at(
            t,
            f,
            format!("'{}' must be a boolean, got {}", label, other),
        )),
    }
}

/// JSON Schema (draft 2020-12) for the batch document.
pub fn json_schema() -> Value {
    let action = json!({
        "type": "string",
        "enum": ["cascade", "restrict", "setnull", "setdefault", "noaction"]
    });
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "glyph batch document",
        "type": "object",
        "required": ["tables"],
        "properties": {
            "outDir": { "type": "string", "description": "Directory artifacts are written to" },
            "defaultOnDelete": action,
            "defaultOnUpdate": action,
            "tables": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["name", "fields"],
                    "properties": {
                        "name": { "type": "string" },
                        "version": { "type": "integer", "minimum": 1 },
                        "stamps": {
                            "type": "boolean",
                            "description": "Append created_at, updated_at, deleted_at"
                        },
                        "fields": {
                            "type": "array",
                            "description": "Also accepted as 'columns'",
                            "items": {
                                "type": "object",
                                "required": ["name"],
                                "properties": {
                                    "name": {
                                        "type": "string",
                                        "pattern": "^[A-Za-z_][A-Za-z0-9_]*$"
                                    },
                                    "type": { "type": "string" },
                                    "notnull": { "type": "boolean" },
                                    "unique": { "type": "boolean" },
                                    "index": { "type": "boolean" },
                                    "pk": { "type": "boolean" },
                                    "autoincrement": { "type": "boolean" },
                                    "default": { "type": ["string", "number", "boolean"] },
                                    "fk": {
                                        "oneOf": [
                                            { "type": "string" },
                                            {
                                                "type": "object",
                                                "required": ["table"],
                                                "properties": {
                                                    "table": { "type": "string" },
                                                    "column": { "type": "string", "default": "id" },
                                                    "onDelete": action,
                                                    "onUpdate": action,
                                                    "deferred": { "type": "boolean" }
                                                }
                                            }
                                        ]
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token(value: Value) -> GlyphResult<String> {
        field_token(0, 0, &value)
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("notNull"), "notnull");
        assert_eq!(normalize_key("Not_Null"), "notnull");
        assert_eq!(normalize_key("outDir"), "outdir");
        assert_eq!(normalize_key("FK"), "fk");
    }

    #[test]
    fn test_field_token_serialization() {
        assert_eq!(token(json!({"name": "title"})).unwrap(), "title");
        assert_eq!(
            token(json!({
                "Name": "email",
                "type": "text",
                "NotNull": true,
                "Unique": true
            }))
            .unwrap(),
            "email:text!+"
        );
        assert_eq!(
            token(json!({"name": "author_id", "FK": {"Table": "users"}})).unwrap(),
            "author_id->users"
        );
        assert_eq!(
            token(json!({
                "name": "owner",
                "type": "text",
                "fk": {
                    "table": "accounts",
                    "Column": "uid",
                    "onDelete": "set null",
                    "deferred": true
                },
                "default": "'root'"
            }))
            .unwrap(),
            "owner:text->accounts(uid),ondelete=setnull,defer,default='root'"
        );
        assert_eq!(
            token(json!({"name": "n", "type": "int", "default": 0, "index": true})).unwrap(),
            "n:int^,default=0"
        );
        assert_eq!(
            token(json!({"name": "parent", "fk": "nodes(key)"})).unwrap(),
            "parent->nodes(key)"
        );
    }

    #[test]
    fn test_field_errors_are_index_qualified() {
        let err = field_token(2, 5, &json!({"type": "text"})).unwrap_err();
        assert!(matches!(
            err,
            GlyphError::MalformedConfig { table: Some(2), field: Some(5), .. }
        ));

        for bad in [
            json!({"name": "a b"}),
            json!({"name": "a", "type": "text,unique"}),
            json!({"name": "a", "unique": "yes"}),
            json!({"name": "a", "default": "1,2"}),
            json!({"name": "a", "fk": {"column": "id"}}),
            json!({"name": "a", "fk": {"table": "users", "onDelete": "boom"}}),
            json!("just a string"),
        ] {
            assert!(
                matches!(token(bad.clone()), Err(GlyphError::MalformedConfig { .. })),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_document_keys() {
        let doc = BatchDocument::parse(
            r#"{"outDir": "out", "defaultOnDelete": "cascade", "Tables": []}"#,
        )
        .unwrap();
        assert_eq!(doc.out_dir, Some(PathBuf::from("out")));
        assert_eq!(doc.default_on_delete, Some(FkAction::Cascade));
        assert!(doc.is_empty());

        assert!(matches!(
            BatchDocument::parse("[]").unwrap_err(),
            GlyphError::MalformedConfig { table: None, .. }
        ));
        assert!(BatchDocument::parse(r#"{"tables": {}}"#).is_err());
        assert!(BatchDocument::parse(r#"{"tables": [], "defaultOnDelete": "zap"}"#).is_err());
        assert!(BatchDocument::parse("{not json").is_err());
    }

    #[test]
    fn test_entry_accepts_columns_alias() {
        let doc = BatchDocument::parse(
            r#"{"tables": [
                {"Name": "a", "Columns": [{"name": "x"}]},
                {"name": "b", "fields": [], "stamps": true, "version": 3}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            doc.entry(0).unwrap(),
            TableEntry {
                name: "a".into(),
                version: 1,
                stamps: false,
                tokens: vec!["x".into()]
            }
        );
        let b = doc.entry(1).unwrap();
        assert!(b.stamps);
        assert_eq!(b.version, 3);
    }

    #[test]
    fn test_entry_errors_name_the_table_index() {
        let doc = BatchDocument::parse(
            r#"{"tables": [
                {"name": "a", "fields": []},
                {"name": "b"},
                {"fields": []},
                {"name": "d", "fields": [{"name": "ok"}, {"nope": 1}]}
            ]}"#,
        )
        .unwrap();
        assert!(matches!(
            doc.entry(1).unwrap_err(),
            GlyphError::MalformedConfig { table: Some(1), field: None, .. }
        ));
        assert!(matches!(
            doc.entry(2).unwrap_err(),
            GlyphError::MalformedConfig { table: Some(2), field: None, .. }
        ));
        assert!(matches!(
            doc.entry(3).unwrap_err(),
            GlyphError::MalformedConfig { table: Some(3), field: Some(1), .. }
        ));
        let expected: HashSet<String> = ["a", "b", "d"].into_iter().map(String::from).collect();
        assert_eq!(doc.declared_tables(), expected);
    }

    #[test]
    fn test_names_are_trimmed_consistently() {
        let doc = BatchDocument::parse(
            r#"{"tables": [
                {"name": " users ", "fields": []},
                {"name": "bad name", "fields": []}
            ]}"#,
        )
        .unwrap();
        let expected: HashSet<String> = ["users".to_string()].into_iter().collect();
        assert_eq!(doc.declared_tables(), expected);
        assert_eq!(doc.entry(0).unwrap().name, "users");
        assert!(matches!(
            doc.entry(1).unwrap_err(),
            GlyphError::MalformedConfig { table: Some(1), .. }
        ));
    }

    #[test]
    fn test_json_schema_shape() {
        let schema = json_schema();
        assert_eq!(schema["required"], json!(["tables"]));
        assert_eq!(
            schema["properties"]["tables"]["items"]["required"],
            json!(["name", "fields"])
        );
    }
}
