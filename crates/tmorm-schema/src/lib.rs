//! Schema introspection for tmorm.
//!
//! This crate provides:
//! - Table listing and existence checks
//! - Column descriptions via `PRAGMA table_info`
//! - Stored CREATE statements, flattened to one line
//! - Enumerated column values parsed into value/label pairs
//! - Table name resolution for entity base names
//! - A per-session `MetadataCache` over all of the above

pub mod introspect;
pub mod metadata;

pub use introspect::{
    ColumnInfo, Introspector, parse_check_in_list, parse_enum_declaration, strip_line_breaks,
    title_label,
};
pub use metadata::MetadataCache;
