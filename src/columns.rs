//! Column name normalization.
//!
//! Raw headers arrive with Portuguese accents, stray punctuation, and
//! inconsistent spacing. [`normalize_column`] maps each one to a canonical
//! identifier; names that survive validation can participate in the unified
//! schema, while per-file headers that do not get a positional
//! `field_<n>` placeholder via [`local_column_name`] so the column keeps its
//! slot in the local lookup.

/// Canonicalizes one raw header string.
///
/// Trims surrounding whitespace, turns space, hyphen, and period into
/// underscores, and drops every other character that is not alphanumeric or
/// an underscore. Alphanumeric is Unicode-aware, so accented letters
/// survive. Returns `None` when the result is empty or starts with a digit;
/// such names cannot be unified-schema columns.
pub fn normalize_column(raw: &str) -> Option<String> {
    let mut name = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        match ch {
            ' ' | '-' | '.' => name.push('_'),
            c if c.is_alphanumeric() || c == '_' => name.push(c),
            _ => {}
        }
    }
    if name.is_empty() || name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        None
    } else {
        Some(name)
    }
}

/// Resolves the name a column carries inside one file's own header map:
/// the normalized name when valid, otherwise `field_<n>` for its position.
pub fn local_column_name(raw: &str, index: usize) -> String {
    normalize_column(raw).unwrap_or_else(|| format!("field_{index}"))
}
