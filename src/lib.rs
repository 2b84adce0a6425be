//! # Glyph: symbolic table definitions
//!
//! Glyph compiles dense field tokens into SQLite `CREATE TABLE` DDL and
//! persists one JSON artifact per table.
//!
//! ## Quick Example
//!
//! ```rust
//! use glyph::prelude::*;
//!
//! let opts = CompileOptions::default();
//! let artifact = compile("users", &["email:text!+", "org_id->orgs"], &opts).unwrap();
//!
//! assert!(artifact.create_sql.contains("email TEXT UNIQUE NOT NULL"));
//! assert!(artifact.create_sql.contains("org_id INTEGER REFERENCES orgs(id)"));
//! ```
//!
//! ## Symbology
//!
//! | Symbol | Name          | Effect                      |
//! |--------|---------------|-----------------------------|
//! | `:`    | Type          | Storage class (alias table) |
//! | `!`    | NotNull       | `NOT NULL`                  |
//! | `+`    | Unique        | `UNIQUE`                    |
//! | `^`    | Index         | `CREATE INDEX`              |
//! | `#`    | PrimaryKey    | `PRIMARY KEY`               |
//! | `~`    | AutoIncrement | `AUTOINCREMENT`             |
//! | `->`   | Reference     | `REFERENCES table(col)`     |
//! | `,`    | Attribute     | Long-form flags and actions |

#![recursion_limit = "256"]

pub mod ast;
pub mod batch;
pub mod cli;
pub mod compiler;
pub mod error;
pub mod parser;
pub mod resolver;
pub mod settings;
pub mod transpiler;
pub mod types;
pub mod writer;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::batch::BatchDocument;
    pub use crate::compiler::{CompileOptions, Generated, build_table, compile, generate};
    pub use crate::error::*;
    pub use crate::parser::parse_field;
    pub use crate::transpiler::ToSql;
    pub use crate::types::{FkAction, StorageClass};
    pub use crate::writer::{ArtifactStore, Force, OverwritePolicy, WriteOutcome};
}

/// Parse a single field token.
///
/// # Example
///
/// ```
/// use glyph::{ast::FieldSpec, parse_field};
///
/// let spec = parse_field("email:text!+").unwrap();
/// assert!(matches!(spec, FieldSpec::Column(ref c) if c.name == "email"));
/// ```
pub fn parse_field(token: &str) -> Result<ast::FieldSpec, error::GlyphError> {
    parser::parse_field(token)
}
