//! Identifier text policy shared by the model and the dependency core.
//!
//! # Invariant
//!
//! Entity names are stored **unquoted**. Quoting (`'Sales Data'`, `[Amount]`)
//! exists only in formula text. These helpers are the single implementation
//! of the quoting/escaping rules so that splicing new reference text and
//! normalizing lookup input agree byte-for-byte.

use std::borrow::Cow;

use thiserror::Error;

/// Errors raised when validating an entity name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameValidationError {
    #[error("entity name cannot be empty")]
    Empty,
    #[error("entity name cannot have leading or trailing whitespace")]
    SurroundingWhitespace,
    #[error("entity name contains invalid character {ch:?}")]
    InvalidCharacter { ch: char },
}

/// Validate an entity name (table, column, or measure).
///
/// Names must be non-empty, carry no surrounding whitespace, and may not
/// contain square brackets or control characters. Uniqueness within the
/// containing table/model is enforced by [`crate::Model`] APIs.
pub fn validate_entity_name(name: &str) -> Result<(), NameValidationError> {
    if name.is_empty() {
        return Err(NameValidationError::Empty);
    }
    if name.trim() != name {
        return Err(NameValidationError::SurroundingWhitespace);
    }
    for ch in name.chars() {
        if ch == '[' || ch == ']' || ch.is_control() {
            return Err(NameValidationError::InvalidCharacter { ch });
        }
    }
    Ok(())
}

/// Compare two entity names for equality, case-insensitively.
///
/// ASCII-only names take a fast path; everything else falls back to Unicode
/// lowercasing, matching identifier comparison in the expression language.
pub fn name_eq(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    a.to_lowercase() == b.to_lowercase()
}

fn is_bare_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_bare_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

/// Returns true if `name` can appear in formula text without quoting.
pub fn is_bare_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if is_bare_ident_start(c) => {}
        _ => return false,
    }
    chars.all(is_bare_ident_part)
}

/// The textual form of a table reference: bare if the name is a valid bare
/// identifier, otherwise `'quoted'` with embedded quotes doubled.
pub fn table_reference_text(name: &str) -> String {
    if is_bare_identifier(name) {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

/// The textual form of a column or measure reference: `[name]` with embedded
/// closing brackets doubled.
pub fn bracket_reference_text(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Strip one layer of identifier quoting, undoing doubled delimiters.
///
/// Accepts `'quoted'`, `[bracketed]`, or bare text; bare text is returned
/// trimmed and otherwise untouched. An unterminated delimiter is tolerated
/// (the opener is stripped and the rest kept) so lookups behave on
/// work-in-progress formula text.
pub fn strip_quoting(text: &str) -> Cow<'_, str> {
    let text = text.trim();
    if let Some(inner) = text.strip_prefix('\'') {
        let inner = inner.strip_suffix('\'').unwrap_or(inner);
        return unescape(inner, '\'');
    }
    if let Some(inner) = text.strip_prefix('[') {
        let inner = inner.strip_suffix(']').unwrap_or(inner);
        return unescape(inner.trim(), ']');
    }
    Cow::Borrowed(text)
}

fn unescape(text: &str, delim: char) -> Cow<'_, str> {
    if !text.contains(delim) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if c == delim && chars.peek() == Some(&delim) {
            chars.next();
        }
    }
    Cow::Owned(out)
}
