//! Error types for Glyph.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for Glyph operations.
#[derive(Debug, Error)]
pub enum GlyphError {
    /// A command-line flag or option carried a bad value.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A field token does not follow the grammar.
    #[error("Malformed field spec '{token}': {message}")]
    MalformedFieldSpec { token: String, message: String },

    /// Flags are individually valid but contradict each other.
    #[error("Invalid constraint on '{column}': {message}")]
    InvalidConstraint { column: String, message: String },

    /// An artifact already exists and overwriting was not forced.
    #[error(
        "Table '{table}' already exists at {}. Use --force or set GLYPH_FORCE=1 to overwrite",
        .path.display()
    )]
    NameCollision { table: String, path: PathBuf },

    /// The batch document is structurally invalid.
    #[error("Malformed config{}: {message}", locate(.table, .field))]
    MalformedConfig {
        table: Option<usize>,
        field: Option<usize>,
        message: String,
    },

    /// Reading or writing an artifact failed.
    #[error("File system error at {}: {source}", .path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn locate(table: &Option<usize>, field: &Option<usize>) -> String {
    match (table, field) {
        (Some(t), Some(f)) => format!(" (table #{}, field #{})", t, f),
        (Some(t), None) => format!(" (table #{})", t),
        (None, Some(f)) => format!(" (field #{})", f),
        (None, None) => String::new(),
    }
}

impl GlyphError {
    /// Create a grammar error for the given token.
    pub fn malformed(token: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedFieldSpec {
            token: token.into(),
            message: message.into(),
        }
    }

    /// Create a constraint error for the given column.
    pub fn constraint(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConstraint {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a config error that is not tied to any table entry.
    pub fn config(message: impl Into<String>) -> Self {
        Self::MalformedConfig {
            table: None,
            field: None,
            message: message.into(),
        }
    }

    /// Create a config error located at a table entry, and optionally one of its fields.
    pub fn config_at(table: usize, field: Option<usize>, message: impl Into<String>) -> Self {
        Self::MalformedConfig {
            table: Some(table),
            field,
            message: message.into(),
        }
    }

    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for Glyph operations.
pub type GlyphResult<T> = Result<T, GlyphError>;
