//! Short symbolic flags and long comma-attributes.
//!
//! Both spellings fold into the same [`Constraints`] set; the transpiler
//! decides emission order, so `email:text!+` and `email:text,unique,nn`
//! are indistinguishable after this step.

use crate::ast::{Constraints, ForeignKeyRef};
use crate::error::{GlyphError, GlyphResult};
use crate::types::{FkAction, StorageClass};

/// Short flag reference: symbol, name, SQL it produces.
pub const SHORT_FLAGS: &[(char, &str, &str)] = &[
    ('!', "NotNull", "NOT NULL"),
    ('+', "Unique", "UNIQUE"),
    ('^', "Index", "CREATE INDEX idx_<table>_<col>"),
    ('#', "PrimaryKey", "PRIMARY KEY"),
    ('~', "AutoIncrement", "AUTOINCREMENT"),
];

/// Long attribute reference: accepted keys, SQL it produces.
pub const LONG_ATTRIBUTES: &[(&str, &str)] = &[
    ("notnull | nn | !", "NOT NULL"),
    ("unique | u | +", "UNIQUE"),
    ("index | idx | ^", "CREATE INDEX idx_<table>_<col>"),
    ("pk | primary | #", "PRIMARY KEY"),
    ("ai | autoincrement | ~", "AUTOINCREMENT"),
    ("default=<expr> | def=<expr> | =<expr>", "DEFAULT <expr>"),
    ("ondelete=<action>", "ON DELETE <action>"),
    ("onupdate=<action>", "ON UPDATE <action>"),
    ("defer | deferrable", "DEFERRABLE INITIALLY DEFERRED"),
];

pub(crate) fn is_short_flag(c: char) -> bool {
    SHORT_FLAGS.iter().any(|(sym, _, _)| *sym == c)
}

/// Fold a run of short flag characters into a constraint set.
pub(crate) fn from_short_flags(flags: &[char]) -> Constraints {
    let mut c = Constraints::default();
    for flag in flags {
        match flag {
            '!' => c.not_null = true,
            '+' => c.unique = true,
            '^' => c.index = true,
            '#' => c.primary_key = true,
            '~' => c.auto_increment = true,
            _ => {}
        }
    }
    c
}

/// Apply one long attribute (the text between commas) to a field.
pub(crate) fn apply_attribute(
    token: &str,
    attr: &str,
    constraints: &mut Constraints,
    fk: &mut Option<ForeignKeyRef>,
) -> GlyphResult<()> {
    let attr = attr.trim();
    if attr.is_empty() {
        return Err(GlyphError::malformed(token, "empty attribute"));
    }

    let (key, value) = match attr.strip_prefix('=') {
        Some(expr) => ("default".to_string(), Some(expr.trim())),
        None => match attr.split_once('=') {
            Some((k, v)) => (k.trim().to_ascii_lowercase(), Some(v.trim())),
            None => (attr.to_ascii_lowercase(), None),
        },
    };

    let flag = |set: &mut bool| -> GlyphResult<()> {
        if value.is_some() {
            return Err(GlyphError::malformed(
                token,
                format!("attribute '{}' does not take a value", key),
            ));
        }
        *set = true;
        Ok(())
    };

    match key.as_str() {
        "notnull" | "nn" | "!" => flag(&mut constraints.not_null),
        "unique" | "u" | "+" => flag(&mut constraints.unique),
        "index" | "idx" | "^" => flag(&mut constraints.index),
        "pk" | "primary" | "#" => flag(&mut constraints.primary_key),
        "ai" | "autoincrement" | "~" => flag(&mut constraints.auto_increment),
        "default" | "def" => match value {
            Some(expr) if !expr.is_empty() => {
                constraints.default = Some(expr.to_string());
                Ok(())
            }
            _ => Err(GlyphError::malformed(token, "default needs an expression")),
        },
        "ondelete" | "onupdate" => {
            let raw = value.filter(|v| !v.is_empty()).ok_or_else(|| {
                GlyphError::malformed(token, format!("{} needs an action", key))
            })?;
            let action: FkAction = raw
                .parse()
                .map_err(|e: String| GlyphError::malformed(token, e))?;
            let fk = fk.as_mut().ok_or_else(|| {
                GlyphError::malformed(token, format!("{} requires a foreign key", key))
            })?;
            if key == "ondelete" {
                fk.on_delete = Some(action);
            } else {
                fk.on_update = Some(action);
            }
            Ok(())
        }
        "defer" | "deferrable" => {
            let fk = fk.as_mut().ok_or_else(|| {
                GlyphError::malformed(token, format!("{} requires a foreign key", key))
            })?;
            fk.deferred = true;
            Ok(())
        }
        _ => Err(GlyphError::malformed(
            token,
            format!("unknown attribute '{}'", key),
        )),
    }
}

/// AutoIncrement is only meaningful on an INTEGER PRIMARY KEY.
pub(crate) fn check_auto_increment(
    name: &str,
    storage: &StorageClass,
    constraints: &Constraints,
) -> GlyphResult<()> {
    if constraints.auto_increment && !(constraints.primary_key && storage.is_integer()) {
        return Err(GlyphError::constraint(
            name,
            format!(
                "AUTOINCREMENT requires an INTEGER PRIMARY KEY (got {}{})",
                storage,
                if constraints.primary_key { "" } else { " without PRIMARY KEY" }
            ),
        ));
    }
    Ok(())
}
