//! Field token parser using nom.
//!
//! # Grammar
//!
//! ```text
//! token        := indexOnly | fkField | plainField
//! indexOnly    := "^" identifier
//! fkField      := base ("->"|">") identifier ["(" identifier ")"] ["," attr]*
//! plainField   := base ["," attr]*
//! base         := identifier shortflags [":" type shortflags]
//! shortflags   := ("!"|"+"|"^"|"#"|"~")*
//! ```
//!
//! ```text
//! author_id:int!->users(id),ondelete=cascade
//! ───┬───── ─┬─┬ ───┬────── ───────┬────────
//!    │       │ │    │              └── Long attributes
//!    │       │ │    └── Reference target (column defaults to id)
//!    │       │ └── Short flags
//!    │       └── Type (alias-resolved)
//!    └── Column name
//! ```

pub mod flags;

use nom::{
    bytes::complete::{tag_no_case, take_while, take_while1},
    character::complete::{char, satisfy},
    combinator::{opt, recognize},
    multi::many0,
    sequence::{delimited, pair, preceded},
    IResult,
};
use tracing::trace;

use crate::ast::{FieldDescriptor, FieldSpec, ForeignKeyRef};
use crate::error::{GlyphError, GlyphResult};
use crate::types::StorageClass;

/// Parse a single field token into a column or an index-only directive.
pub fn parse_field(token: &str) -> GlyphResult<FieldSpec> {
    let token = token.trim();
    if token.is_empty() {
        return Err(GlyphError::malformed(token, "empty field token"));
    }

    // 1. `^col` with nothing else is an index directive, not an Index flag.
    if let Some(column) = token.strip_prefix('^')
        && !token.contains([':', ',', '>'])
    {
        let column = finish(token, "index column", identifier(column))?;
        trace!(token, column, "index-only directive");
        return Ok(FieldSpec::IndexOnly {
            column: column.to_string(),
        });
    }

    let segments = split_top_level(token);
    let (head, attrs) = segments
        .split_first()
        .ok_or_else(|| GlyphError::malformed(token, "empty field token"))?;

    // 2. FK shorthand is only looked for before the first comma.
    let (base_text, target) = match split_arrow(head) {
        Some((left, right)) => (left, Some(right)),
        None => (*head, None),
    };

    let base = finish(token, "column definition", base(base_text))?;
    let mut constraints = flags::from_short_flags(&base.flags);

    let (storage, mut fk) = match (target, base.type_name) {
        (Some(_), Some(ty)) if inline_fk(ty).is_some() => {
            return Err(GlyphError::malformed(
                token,
                "use either fk(...) or '->', not both",
            ));
        }
        (Some(rhs), ty) => {
            let (table, column) = finish(token, "reference target", fk_target(rhs.trim()))?;
            let storage = ty.map(StorageClass::from_alias).unwrap_or(StorageClass::Integer);
            (
                Some(storage),
                Some(ForeignKeyRef::new(table, column.map(str::to_string))),
            )
        }
        // 3. `:fk(table.column)` declares the reference inline.
        (None, Some(ty)) => match inline_fk(ty) {
            Some(text) => {
                let (table, column) = finish(token, "fk(table.column)", fk_inline_body(text))?;
                (
                    Some(StorageClass::Integer),
                    Some(ForeignKeyRef::new(table, column.map(str::to_string))),
                )
            }
            None => (Some(StorageClass::from_alias(ty)), None),
        },
        (None, None) => (None, None),
    };

    for attr in attrs {
        flags::apply_attribute(token, attr, &mut constraints, &mut fk)?;
    }
    // 4. untyped columns are TEXT, unless they ask for AUTOINCREMENT
    let storage = storage.unwrap_or(if constraints.auto_increment {
        StorageClass::Integer
    } else {
        StorageClass::Text
    });
    flags::check_auto_increment(base.name, &storage, &constraints)?;

    trace!(token, name = base.name, %storage, "parsed column");
    Ok(FieldSpec::Column(FieldDescriptor {
        name: base.name.to_string(),
        storage,
        constraints,
        fk,
    }))
}

/// Is `s` a plain SQL identifier (`[A-Za-z_][A-Za-z0-9_]*`)?
pub fn is_identifier(s: &str) -> bool {
    matches!(identifier(s), Ok(("", _)))
}

/// Is `s` usable as the type segment of a token (`text`, `decimal(10,2)`)?
pub(crate) fn is_type_name(s: &str) -> bool {
    matches!(type_name(s), Ok(("", _)))
}

/// Name, optional type and the short flags found on either segment.
struct Base<'a> {
    name: &'a str,
    type_name: Option<&'a str>,
    flags: Vec<char>,
}

fn base(input: &str) -> IResult<&str, Base<'_>> {
    let (input, name) = identifier(input)?;
    let (input, mut flags) = short_flags(input)?;
    let (input, typed) = opt(preceded(char(':'), pair(type_name, short_flags)))(input)?;

    let type_name = typed.map(|(ty, type_flags)| {
        flags.extend(type_flags);
        ty
    });

    Ok((
        input,
        Base {
            name,
            type_name,
            flags,
        },
    ))
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn short_flags(input: &str) -> IResult<&str, Vec<char>> {
    many0(satisfy(flags::is_short_flag))(input)
}

/// `text`, `varchar(255)`, `decimal(10,2)`, `fk(users.id)`.
fn type_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        opt(delimited(char('('), take_while(|c| c != ')'), char(')'))),
    ))(input)
}

/// `users` or `users(uid)`.
fn fk_target(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    pair(
        identifier,
        opt(delimited(char('('), identifier, char(')'))),
    )(input)
}

/// Body of `fk(...)`: `users.id` or just `users`.
fn fk_inline_body(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    pair(identifier, opt(preceded(char('.'), identifier)))(input)
}

/// Returns the text inside `fk(...)` if the type segment is an inline reference.
fn inline_fk(ty: &str) -> Option<&str> {
    let (rest, body) = preceded(
        tag_no_case::<_, _, nom::error::Error<&str>>("fk"),
        delimited(char('('), take_while(|c| c != ')'), char(')')),
    )(ty)
    .ok()?;
    rest.is_empty().then_some(body.trim())
}

/// Split the head at `->`, or failing that at a bare `>`.
fn split_arrow(head: &str) -> Option<(&str, &str)> {
    if let Some(i) = head.find("->") {
        return Some((&head[..i], &head[i + 2..]));
    }
    head.find('>').map(|i| (&head[..i], &head[i + 1..]))
}

/// Split on commas that are outside parentheses and quotes.
pub(crate) fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Require a sub-parser to consume all of its input.
fn finish<T>(token: &str, what: &str, result: IResult<&str, T>) -> GlyphResult<T> {
    match result {
        Ok(("", value)) => Ok(value),
        Ok((rest, _)) => Err(GlyphError::malformed(
            token,
            format!("unexpected '{}' in {}", rest, what),
        )),
        Err(_) => Err(GlyphError::malformed(token, format!("invalid {}", what))),
    }
}

#[cfg(test)]
mod tests;
