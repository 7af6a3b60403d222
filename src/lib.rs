//! # Labsieve
//!
//! Safe SQL condition and query construction for lab inventory record
//! stores.
//!
//! Labsieve lets application code describe filtering, sorting,
//! full-text search, and pagination as structured data and emits
//! parameterized SQL — text plus an ordered bind list — without ever
//! interpolating untrusted strings into SQL text. Field names resolve
//! through a per-table whitelist, operators are a closed enum, and
//! every literal travels to the driver as a bind parameter.
//!
//! ## Features
//!
//! - Arbitrary AND/OR filter trees with depth bounding
//! - Field whitelists with per-field operator sets and typed values
//! - FTS5 `MATCH` search with phrase escaping and a `LIKE` fallback
//! - Offset and keyset (cursor) pagination
//! - Consistent SELECT/COUNT pairs sharing one WHERE clause
//!
//! ## Example
//!
//! ```rust
//! use labsieve::{
//!     FieldConfig, FieldWhitelist, FilterOperator, PageRequest, SafeQueryBuilder,
//!     SortDirection, ValueKind,
//! };
//!
//! # fn main() -> labsieve::Result<()> {
//! let whitelist = FieldWhitelist::new()
//!     .with_field(
//!         "status",
//!         FieldConfig::new("status", ValueKind::Text)
//!             .with_operators([FilterOperator::Eq, FilterOperator::In]),
//!     )?
//!     .with_field(
//!         "quantity",
//!         FieldConfig::new("quantity", ValueKind::Integer).with_all_operators(),
//!     )?;
//!
//! let (sql, binds) = SafeQueryBuilder::new("reagents", whitelist)?
//!     .add_exact_match("status", "available")
//!     .add_comparison("quantity", FilterOperator::Gte, 10i64)
//!     .order_by("quantity", SortDirection::Desc)?
//!     .paginate(PageRequest::new(1, 25))
//!     .build_select(&[])?;
//!
//! assert_eq!(
//!     sql,
//!     "SELECT * FROM reagents WHERE status = ?1 AND quantity >= ?2 \
//!      ORDER BY quantity DESC LIMIT ?3 OFFSET ?4"
//! );
//! assert_eq!(binds.len(), 4);
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use thiserror::Error as ThisError;

// Module declarations
pub mod models;
pub mod sql;

// Re-exports for convenience
pub use models::{
    Conjunction, Cursor, DateRange, FieldConfig, FieldWhitelist, Filter, FilterGroup, FilterItem,
    FilterOperator, FilterValue, PageInfo, PageLimits, PageRequest, SortDirection, TimeSlot,
    ValidationMode, ValueKind,
};
pub use sql::{
    CountQueryBuilder, Dialect, FtsConfig, MAX_FILTER_DEPTH, Rendered, SafeQueryBuilder,
    build_condition, build_condition_with, build_fts_condition, build_with_fallback,
};

/// Error type for labsieve operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait
/// implementations. Every variant is a recoverable validation error: a
/// caller maps them to a 4xx-class response naming the offending field
/// or operator. Malformed or hostile input never panics and never
/// reaches a state where unparameterized SQL is produced.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `UnknownField` | A filter, sort, or projection references a field outside the whitelist (strict mode) |
/// | `OperatorNotAllowed` | A filter uses an operator absent from the field's allowed set (strict mode) |
/// | `MissingValue` | An operator that binds a value received none (or an explicit null) |
/// | `ArityMismatch` | `Between` without exactly 2 values, `In` with an empty list, a list where a scalar belongs |
/// | `InvalidValue` | A value (or raw request string) does not match the field's declared kind |
/// | `MaxDepthExceeded` | A filter tree nests deeper than [`MAX_FILTER_DEPTH`] |
/// | `InvalidCursor` | A pagination cursor fails to decode, or its key count disagrees with the sort spec |
/// | `InvertedRange` | A date range or time slot with `from > to` |
/// | `EmptyWhitelist` | Building against a whitelist with no fields |
/// | `UnsafeIdentifier` | A table/column/index name outside `[A-Za-z_][A-Za-z0-9_]*` |
#[derive(Debug, ThisError)]
pub enum Error {
    /// A field was not found in the whitelist.
    #[error("unknown field: '{field}'")]
    UnknownField {
        /// The logical field name from the request.
        field: String,
    },

    /// The operator is not in the field's allowed set.
    #[error("operator '{operator}' is not allowed for field '{field}'")]
    OperatorNotAllowed {
        /// The logical field name.
        field: String,
        /// The rejected operator.
        operator: FilterOperator,
    },

    /// A value-binding operator received no value.
    #[error("filter on '{field}' is missing a value")]
    MissingValue {
        /// The logical field name.
        field: String,
    },

    /// The wrong number or shape of values for the operator.
    #[error("filter on '{field}': operator '{operator}' expects {expected}, got {got}")]
    ArityMismatch {
        /// The logical field name.
        field: String,
        /// The operator whose arity was violated.
        operator: FilterOperator,
        /// What the operator requires.
        expected: &'static str,
        /// The number of values supplied.
        got: usize,
    },

    /// A value does not match the field's declared kind.
    #[error("invalid value for field '{field}': expected {kind}, got '{raw}'")]
    InvalidValue {
        /// The logical field name.
        field: String,
        /// The declared value kind.
        kind: ValueKind,
        /// The offending value, rendered for diagnostics.
        raw: String,
    },

    /// The filter tree nests too deeply.
    #[error("filter tree exceeds maximum depth of {max}")]
    MaxDepthExceeded {
        /// The configured depth bound.
        max: usize,
    },

    /// A pagination cursor could not be used.
    #[error("invalid cursor: {reason}")]
    InvalidCursor {
        /// Why the cursor was rejected.
        reason: String,
    },

    /// A range with `from` after `to`.
    #[error("inverted range: '{from}' is after '{to}'")]
    InvertedRange {
        /// The lower bound as supplied.
        from: String,
        /// The upper bound as supplied.
        to: String,
    },

    /// The whitelist has no fields.
    #[error("field whitelist is empty")]
    EmptyWhitelist,

    /// An identifier failed validation.
    #[error("unsafe SQL identifier: '{identifier}'")]
    UnsafeIdentifier {
        /// The rejected name.
        identifier: String,
    },
}

/// Result type alias for labsieve operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnknownField {
            field: "password".to_string(),
        };
        assert_eq!(err.to_string(), "unknown field: 'password'");

        let err = Error::OperatorNotAllowed {
            field: "quantity".to_string(),
            operator: FilterOperator::IsNull,
        };
        assert_eq!(
            err.to_string(),
            "operator 'is_null' is not allowed for field 'quantity'"
        );

        let err = Error::ArityMismatch {
            field: "quantity".to_string(),
            operator: FilterOperator::Between,
            expected: "exactly 2 values",
            got: 3,
        };
        assert_eq!(
            err.to_string(),
            "filter on 'quantity': operator 'between' expects exactly 2 values, got 3"
        );

        let err = Error::EmptyWhitelist;
        assert_eq!(err.to_string(), "field whitelist is empty");
    }
}
