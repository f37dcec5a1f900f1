//! SELECT list projections.

use tmorm_core::{quote_ident, quote_qualified};

/// How a projection is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    /// A quoted `table.field`, optionally aliased
    Column,
    /// Trusted expression text
    RawExpression,
}

/// One entry of the SELECT list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub table: Option<String>,
    /// Column name or, for raw expressions, the expression itself.
    pub field: String,
    pub alias: Option<String>,
    pub kind: ProjectionKind,
}

impl Projection {
    pub fn column(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            field: field.into(),
            alias: None,
            kind: ProjectionKind::Column,
        }
    }

    pub fn aliased(
        table: impl Into<String>,
        field: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            alias: Some(alias.into()),
            ..Self::column(table, field)
        }
    }

    pub fn raw(expression: impl Into<String>) -> Self {
        Self {
            table: None,
            field: expression.into(),
            alias: None,
            kind: ProjectionKind::RawExpression,
        }
    }

    pub fn to_sql(&self) -> String {
        match self.kind {
            ProjectionKind::RawExpression => self.field.clone(),
            ProjectionKind::Column => {
                let column = match &self.table {
                    Some(table) => quote_qualified(table, &self.field),
                    None => quote_ident(&self.field),
                };
                match &self.alias {
                    Some(alias) => format!("{} AS {}", column, quote_ident(alias)),
                    None => column,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_projection() {
        assert_eq!(Projection::column("items", "name").to_sql(), "`items`.`name`");
    }

    #[test]
    fn test_aliased_projection() {
        assert_eq!(
            Projection::aliased("categories", "title", "category_title").to_sql(),
            "`categories`.`title` AS `category_title`"
        );
    }

    #[test]
    fn test_raw_projection() {
        assert_eq!(
            Projection::raw("COUNT(*) AS `n`").to_sql(),
            "COUNT(*) AS `n`"
        );
    }
}
