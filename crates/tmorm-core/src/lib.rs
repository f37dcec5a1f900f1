//! Core types and traits for tmorm.
//!
//! - `Value`, `Row` and `Attributes` for data moving in and out of the backend
//! - `Connection` trait for blocking database access
//! - `Entity` trait and the schemaless `Record`
//! - `Error` and `Result`
//! - identifier quoting, value escaping, and connection retry helpers

pub mod connection;
pub mod entity;
pub mod error;
pub mod identifiers;
pub mod retry;
pub mod row;
pub mod value;

pub use connection::{Connection, RowIter, TransactionBehavior};
pub use entity::{Entity, IDENTITY_FIELD, Record};
pub use error::{Error, Result};
pub use identifiers::{
    LiteralStyle, escape_value, quote_ident, quote_qualified, sanitize_identifier, sql_literal,
};
pub use retry::{ConnectPolicy, connect_with_retry};
pub use row::{Attributes, Columns, FromValue, Row};
pub use value::Value;
