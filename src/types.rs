//! Storage classes and referential actions.
//!
//! Every user-facing type synonym is folded into one of SQLite's storage
//! classes here. Unknown names are kept (uppercased) in [`StorageClass::Other`]
//! so engine-specific types still compile.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical column type after alias resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageClass {
    Integer,
    Text,
    Real,
    Numeric,
    Blob,
    /// Anything the alias table does not know, uppercased verbatim.
    Other(String),
}

impl StorageClass {
    /// Resolve a type token through the alias table (case-insensitive).
    ///
    /// Never fails: unrecognized tokens pass through as [`StorageClass::Other`].
    pub fn from_alias(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" | "bool" => Self::Integer,
            "text" | "string" | "datetime" | "timestamp" => Self::Text,
            "real" | "float" => Self::Real,
            "number" | "numeric" => Self::Numeric,
            "blob" => Self::Blob,
            _ => Self::Other(token.trim().to_ascii_uppercase()),
        }
    }

    /// The SQL spelling of this storage class.
    pub fn as_sql(&self) -> &str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
            Self::Real => "REAL",
            Self::Numeric => "NUMERIC",
            Self::Blob => "BLOB",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Integer)
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Referential action for `ON DELETE` / `ON UPDATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FkAction {
    Cascade,
    Restrict,
    SetNull,
    SetDefault,
    NoAction,
}

impl FkAction {
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::NoAction => "NO ACTION",
        }
    }

    /// Accepted spellings, for help and error messages.
    pub const NAMES: &'static str = "cascade, restrict, setnull, setdefault, noaction";
}

impl fmt::Display for FkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for FkAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();

        match folded.as_str() {
            "cascade" => Ok(Self::Cascade),
            "restrict" => Ok(Self::Restrict),
            "setnull" => Ok(Self::SetNull),
            "setdefault" => Ok(Self::SetDefault),
            "noaction" => Ok(Self::NoAction),
            _ => Err(format!(
                "unknown referential action '{}' (expected one of: {})",
                s,
                Self::NAMES
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_table() {
        assert_eq!(StorageClass::from_alias("int"), StorageClass::Integer);
        assert_eq!(StorageClass::from_alias("BOOL"), StorageClass::Integer);
        assert_eq!(StorageClass::from_alias("String"), StorageClass::Text);
        assert_eq!(StorageClass::from_alias("datetime"), StorageClass::Text);
        assert_eq!(StorageClass::from_alias("timestamp"), StorageClass::Text);
        assert_eq!(StorageClass::from_alias("float"), StorageClass::Real);
        assert_eq!(StorageClass::from_alias("number"), StorageClass::Numeric);
        assert_eq!(StorageClass::from_alias("blob"), StorageClass::Blob);
    }

    #[test]
    fn test_unknown_type_passes_through_uppercased() {
        let ty = StorageClass::from_alias("varchar(255)");
        assert_eq!(ty, StorageClass::Other("VARCHAR(255)".to_string()));
        assert_eq!(ty.as_sql(), "VARCHAR(255)");
    }

    #[test]
    fn test_action_spellings() {
        assert_eq!("cascade".parse::<FkAction>(), Ok(FkAction::Cascade));
        assert_eq!("SetNull".parse::<FkAction>(), Ok(FkAction::SetNull));
        assert_eq!("set null".parse::<FkAction>(), Ok(FkAction::SetNull));
        assert_eq!("no_action".parse::<FkAction>(), Ok(FkAction::NoAction));
        assert_eq!(FkAction::SetDefault.to_string(), "SET DEFAULT");
        assert!("explode".parse::<FkAction>().is_err());
    }
}
