//! SQL emission: condition rendering, full-text search, and statement
//! assembly.
//!
//! Everything in this module produces `(sql_text, bind_values)` pairs;
//! nothing here executes SQL or touches a connection.

pub mod builder;
pub mod condition;
pub mod dialect;
pub mod fts;
pub mod ident;

pub use builder::{CountQueryBuilder, SafeQueryBuilder};
pub use condition::{MAX_FILTER_DEPTH, Rendered, build_condition, build_condition_with};
pub use dialect::Dialect;
pub use fts::{FtsConfig, build_fts_condition, build_with_fallback};
