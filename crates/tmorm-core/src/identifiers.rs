//! Identifier quoting and value escaping for hand-assembled SQL.
//!
//! Collections render their statements as text, so every identifier is
//! backtick-quoted and every caller-supplied value is escaped before it is
//! stored in a filter.

use crate::value::Value;

/// Quote an identifier with backticks.
///
/// Embedded backticks are doubled. Both MySQL and SQLite accept the result.
///
/// ```
/// use tmorm_core::quote_ident;
///
/// assert_eq!(quote_ident("items"), "`items`");
/// assert_eq!(quote_ident("odd`name"), "`odd``name`");
/// ```
#[inline]
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote a `table.column` pair.
#[inline]
pub fn quote_qualified(table: &str, column: &str) -> String {
    format!("{}.{}", quote_ident(table), quote_ident(column))
}

/// Strip everything except ASCII alphanumerics and underscores.
///
/// For places where quoting is not available, such as PRAGMA arguments.
#[inline]
pub fn sanitize_identifier(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// How a backend reads backslashes inside string literals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LiteralStyle {
    /// Backslash is an ordinary character (SQLite, standard SQL).
    #[default]
    Standard,
    /// Backslash starts an escape sequence (MySQL default mode).
    BackslashEscapes,
}

/// Escape text for use inside a single-quoted SQL literal.
///
/// The input is trimmed and single quotes are doubled. Under
/// [`LiteralStyle::BackslashEscapes`] backslashes are doubled first. The
/// surrounding quotes are not added. With `used_in_like`, `_` and `%` are
/// escaped with a backslash, so the pattern needs `ESCAPE '\'`.
///
/// ```
/// use tmorm_core::{LiteralStyle, escape_value};
///
/// assert_eq!(escape_value(" O'Brien ", false, LiteralStyle::Standard), "O''Brien");
/// assert_eq!(escape_value("50%_off", true, LiteralStyle::Standard), "50\\%\\_off");
/// assert_eq!(escape_value("a\\b", false, LiteralStyle::BackslashEscapes), "a\\\\b");
/// ```
pub fn escape_value(raw: &str, used_in_like: bool, style: LiteralStyle) -> String {
    let trimmed = raw.trim();
    let escaped = match style {
        LiteralStyle::Standard => trimmed.replace('\'', "''"),
        LiteralStyle::BackslashEscapes => trimmed.replace('\\', "\\\\").replace('\'', "''"),
    };
    if used_in_like {
        escaped.replace('_', "\\_").replace('%', "\\%")
    } else {
        escaped
    }
}

/// Render a value as a SQL literal.
///
/// Numbers stay bare, NULL becomes `NULL`, everything else is escaped and
/// single-quoted.
pub fn sql_literal(value: &Value, style: LiteralStyle) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::Int(v) => v.to_string(),
        Value::BigInt(v) => v.to_string(),
        Value::Double(v) if v.is_finite() => v.to_string(),
        other => match other.to_text() {
            Some(text) => format!("'{}'", escape_value(&text, false, style)),
            None => "NULL".to_string(),
        },
    }
}
