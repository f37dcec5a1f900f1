//! SQL dialect differences that leak into rendered collections.

use serde::{Deserialize, Serialize};
use tmorm_core::{LiteralStyle, Value, sql_literal};

/// SQL dialect a collection renders for.
///
/// Identifiers are backtick-quoted in both. Function spellings and
/// backslash handling in string literals differ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialect {
    /// SQLite (`RANDOM()`)
    #[default]
    Sqlite,
    /// MySQL (`RAND()`)
    Mysql,
}

impl Dialect {
    /// Expression that yields a fresh random value per row.
    pub const fn random_function(self) -> &'static str {
        match self {
            Dialect::Sqlite => "RANDOM()",
            Dialect::Mysql => "RAND()",
        }
    }

    /// How string literals treat backslashes.
    pub const fn literal_style(self) -> LiteralStyle {
        match self {
            Dialect::Sqlite => LiteralStyle::Standard,
            Dialect::Mysql => LiteralStyle::BackslashEscapes,
        }
    }

    /// Escaped SQL literal for `value`.
    pub fn literal(self, value: &Value) -> String {
        sql_literal(value, self.literal_style())
    }

    /// Identifier quoting. Embedded backticks are doubled.
    pub fn quote_identifier(self, name: &str) -> String {
        tmorm_core::quote_ident(name)
    }
}
