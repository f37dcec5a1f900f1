//! ORDER BY, GROUP BY and HAVING pieces.

use tmorm_core::{quote_ident, quote_qualified};

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// One ORDER BY entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    pub table: String,
    pub field: String,
    pub direction: OrderDirection,
    /// Render the bare field without its table, for computed aliases.
    pub suppress_table_qualifier: bool,
}

impl OrderSpec {
    /// Ascending order on `table.field`.
    pub fn asc(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            field: field.into(),
            direction: OrderDirection::Asc,
            suppress_table_qualifier: false,
        }
    }

    /// Descending order on `table.field`.
    pub fn desc(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            direction: OrderDirection::Desc,
            ..Self::asc(table, field)
        }
    }

    /// Drop the table qualifier when rendering.
    pub fn unqualified(mut self) -> Self {
        self.suppress_table_qualifier = true;
        self
    }

    pub fn to_sql(&self) -> String {
        let column = if self.suppress_table_qualifier {
            quote_ident(&self.field)
        } else {
            quote_qualified(&self.table, &self.field)
        };
        format!("{} {}", column, self.direction.as_str())
    }
}

/// One GROUP BY column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupBy {
    pub table: String,
    pub field: String,
}

impl GroupBy {
    pub fn to_sql(&self) -> String {
        quote_qualified(&self.table, &self.field)
    }
}

/// One HAVING condition: a quoted field followed by trusted condition text,
/// e.g. `("total", "> 10")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Having {
    pub field: String,
    pub condition: String,
}

impl Having {
    pub fn to_sql(&self) -> String {
        format!("{} {}", quote_ident(&self.field), self.condition)
    }
}
