//! Collection query builder for tmorm.
//!
//! `tmorm-query` is the **query construction layer**. It accumulates filters,
//! joins, ordering, grouping and paging for one table and renders them into a
//! single-line SQL statement. It performs no I/O.
//!
//! # Example
//!
//! ```
//! use tmorm_query::{CollectionQuery, OrderDirection};
//!
//! let mut query = CollectionQuery::new("items");
//! query
//!     .set_filter_value("status", "active")
//!     .add_order_by_field("created_at", OrderDirection::Desc)
//!     .set_limit(10);
//!
//! assert_eq!(
//!     query.select_sql(false),
//!     "SELECT `items`.* FROM `items` WHERE `items`.`status` = 'active' \
//!      ORDER BY `items`.`created_at` DESC LIMIT 0, 10"
//! );
//! assert_eq!(query.select_sql(true), "SELECT COUNT(*) FROM `items`");
//! ```

pub mod builder;
pub mod clause;
pub mod dialect;
pub mod filter;
pub mod join;
pub mod select;

pub use builder::CollectionQuery;
pub use clause::{GroupBy, Having, OrderDirection, OrderSpec};
pub use dialect::Dialect;
pub use filter::{Filter, FilterKind};
pub use join::{JoinKind, JoinSpec};
pub use select::{Projection, ProjectionKind};
