//! Collection query builder.
//!
//! `CollectionQuery` accumulates the pieces of one SELECT statement scoped to
//! a single base table and renders them into a one-line SQL string. Every
//! accumulator returns `&mut Self` and never fails: malformed configuration
//! is only detected by the database when the statement runs.

use crate::clause::{GroupBy, Having, OrderDirection, OrderSpec};
use crate::dialect::Dialect;
use crate::filter::Filter;
use crate::join::{JoinKind, JoinSpec};
use crate::select::Projection;
use tmorm_core::{IDENTITY_FIELD, Value, quote_ident, quote_qualified};

/// Mutable query state for one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionQuery {
    table: String,
    dialect: Dialect,
    /// WHERE predicates, joined with AND
    filters: Vec<Filter>,
    /// SELECT list (empty = `table.*`)
    projections: Vec<Projection>,
    /// Explicit joins
    joins: Vec<JoinSpec>,
    /// Opaque join fragments rendered before explicit joins
    translation_joins: Vec<String>,
    order: Vec<OrderSpec>,
    order_random: bool,
    group_by: Vec<GroupBy>,
    having: Vec<Having>,
    limit: u64,
    offset: u64,
}

impl CollectionQuery {
    /// Create an empty query against `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self::with_dialect(table, Dialect::default())
    }

    /// Create an empty query rendering for `dialect`.
    pub fn with_dialect(table: impl Into<String>, dialect: Dialect) -> Self {
        Self {
            table: table.into(),
            dialect,
            filters: Vec::new(),
            projections: Vec::new(),
            joins: Vec::new(),
            translation_joins: Vec::new(),
            order: Vec::new(),
            order_random: false,
            group_by: Vec::new(),
            having: Vec::new(),
            limit: 0,
            offset: 0,
        }
    }

    // ==================== Filters ====================

    /// Equality predicate on a field of the base table.
    pub fn set_filter_value(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        let filter = Filter::equals(self.dialect, self.table.clone(), field, &value.into());
        self.filters.push(filter);
        self
    }

    /// Equality predicate on a field of another (joined) table.
    pub fn set_filter_value_in_table(
        &mut self,
        field: &str,
        value: impl Into<Value>,
        table: &str,
    ) -> &mut Self {
        self.filters.push(Filter::equals(self.dialect, table, field, &value.into()));
        self
    }

    /// `IN (...)` predicate. An empty list matches no rows.
    pub fn set_filter_value_where_in(
        &mut self,
        field: &str,
        values: &[Value],
        table: Option<&str>,
    ) -> &mut Self {
        let table = table.unwrap_or(&self.table).to_string();
        self.filters.push(Filter::in_list(self.dialect, table, field, values));
        self
    }

    /// Restrict the collection to the given identities.
    pub fn set_ids(&mut self, ids: &[i64]) -> &mut Self {
        let values: Vec<Value> = ids.iter().copied().map(Value::BigInt).collect();
        self.set_filter_value_where_in(IDENTITY_FIELD, &values, None)
    }

    /// Named equality setter; same as [`set_filter_value`](Self::set_filter_value).
    pub fn set_where(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.set_filter_value(field, value)
    }

    /// Append a raw WHERE fragment.
    ///
    /// The text is used verbatim. Never build it from untrusted input.
    pub fn add_where_field_as_string(&mut self, sql: impl Into<String>) -> &mut Self {
        self.filters.push(Filter::raw(sql));
        self
    }

    // ==================== Joins ====================

    /// Join `table` on `table.left_key = base.right_key`.
    pub fn add_join_table(
        &mut self,
        table: &str,
        left_key: &str,
        right_key: &str,
        kind: JoinKind,
    ) -> &mut Self {
        self.joins
            .push(JoinSpec::new(table, left_key, right_key, kind));
        self
    }

    /// Append an opaque join fragment (localized text side tables).
    pub fn add_translation_join(&mut self, fragment: impl Into<String>) -> &mut Self {
        self.translation_joins.push(fragment.into());
        self
    }

    // ==================== Ordering ====================

    /// Order by a field of the base table.
    pub fn add_order_by_field(&mut self, field: &str, direction: OrderDirection) -> &mut Self {
        let spec = match direction {
            OrderDirection::Asc => OrderSpec::asc(self.table.clone(), field),
            OrderDirection::Desc => OrderSpec::desc(self.table.clone(), field),
        };
        self.order.push(spec);
        self
    }

    /// Order by a fully specified entry (other table, unqualified alias).
    pub fn add_order_by(&mut self, spec: OrderSpec) -> &mut Self {
        self.order.push(spec);
        self
    }

    /// Random ordering. When set, explicit order entries are ignored.
    pub fn set_order_by_random(&mut self, random: bool) -> &mut Self {
        self.order_random = random;
        self
    }

    // ==================== Grouping ====================

    pub fn add_group_by(&mut self, field: &str, table: Option<&str>) -> &mut Self {
        self.group_by.push(GroupBy {
            table: table.unwrap_or(&self.table).to_string(),
            field: field.to_string(),
        });
        self
    }

    /// HAVING `field` followed by trusted condition text such as `"> 10"`.
    pub fn add_having(&mut self, field: &str, condition: &str) -> &mut Self {
        self.having.push(Having {
            field: field.to_string(),
            condition: condition.to_string(),
        });
        self
    }

    // ==================== Paging ====================

    /// Maximum number of rows; zero means unlimited.
    pub fn set_limit(&mut self, limit: u64) -> &mut Self {
        self.limit = limit;
        self
    }

    pub fn set_offset(&mut self, offset: u64) -> &mut Self {
        self.offset = offset;
        self
    }

    // ==================== Projection ====================

    pub fn add_simple_select_fields(&mut self, fields: &[&str], table: Option<&str>) -> &mut Self {
        let table = table.unwrap_or(&self.table).to_string();
        self.projections
            .extend(fields.iter().map(|field| Projection::column(table.clone(), *field)));
        self
    }

    pub fn add_select_field_as_alias(
        &mut self,
        field: &str,
        alias: &str,
        table: Option<&str>,
    ) -> &mut Self {
        let table = table.unwrap_or(&self.table).to_string();
        self.projections
            .push(Projection::aliased(table, field, alias));
        self
    }

    /// Append a trusted SELECT expression, e.g. `SUM(price) AS total`.
    pub fn add_select_field_as_string(&mut self, expression: impl Into<String>) -> &mut Self {
        self.projections.push(Projection::raw(expression));
        self
    }

    // ==================== Accessors ====================

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn select_fields(&self) -> &[Projection] {
        &self.projections
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn joins(&self) -> &[JoinSpec] {
        &self.joins
    }

    pub fn order_fields(&self) -> &[OrderSpec] {
        &self.order
    }

    pub fn is_order_random(&self) -> bool {
        self.order_random
    }

    pub fn translation_joins(&self) -> &[String] {
        &self.translation_joins
    }

    // ==================== Rendering ====================

    /// Render the statement.
    ///
    /// With `for_max_count` the projection becomes `COUNT(*)` and translation
    /// joins, WHERE, HAVING, ORDER BY and LIMIT are left out, so the statement
    /// counts every row reachable through the explicit joins.
    pub fn select_sql(&self, for_max_count: bool) -> String {
        let mut parts: Vec<String> = Vec::new();

        parts.push(format!("SELECT {}", self.projection_sql(for_max_count)));
        parts.push(format!("FROM {}", quote_ident(&self.table)));

        if !for_max_count {
            parts.extend(
                self.translation_joins
                    .iter()
                    .filter(|fragment| !fragment.trim().is_empty())
                    .map(|fragment| fragment.trim().to_string()),
            );
        }

        parts.extend(self.joins.iter().map(|join| join.to_sql(&self.table)));

        if !for_max_count && !self.filters.is_empty() {
            let predicates: Vec<String> = self.filters.iter().map(Filter::to_sql).collect();
            parts.push(format!("WHERE {}", predicates.join(" AND ")));
        }

        if !self.group_by.is_empty() {
            let columns: Vec<String> = self.group_by.iter().map(GroupBy::to_sql).collect();
            parts.push(format!("GROUP BY {}", columns.join(", ")));
        }

        if !for_max_count {
            if !self.having.is_empty() {
                let conditions: Vec<String> = self.having.iter().map(Having::to_sql).collect();
                parts.push(format!("HAVING {}", conditions.join(" AND ")));
            }

            if self.order_random {
                parts.push(format!("ORDER BY {}", self.dialect.random_function()));
            } else if !self.order.is_empty() {
                let entries: Vec<String> = self.order.iter().map(OrderSpec::to_sql).collect();
                parts.push(format!("ORDER BY {}", entries.join(", ")));
            }

            if self.limit > 0 {
                parts.push(format!("LIMIT {}, {}", self.offset, self.limit));
            }
        }

        let sql = parts.join(" ");
        tracing::trace!(table = %self.table, for_max_count, sql = %sql, "Rendered collection SQL");
        sql
    }

    fn projection_sql(&self, for_max_count: bool) -> String {
        if for_max_count {
            return "COUNT(*)".to_string();
        }
        if self.projections.is_empty() {
            return format!("{}.*", quote_ident(&self.table));
        }
        self.projections
            .iter()
            .map(Projection::to_sql)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Fully qualified, quoted column of the base table.
    pub fn qualified(&self, field: &str) -> String {
        quote_qualified(&self.table, field)
    }
}
