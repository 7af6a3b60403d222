//! Data models for labsieve.
//!
//! This module contains the filter expression tree, the field whitelist,
//! and the pagination and time-range primitives consumed by the SQL
//! builders.

mod filter;
mod pagination;
mod temporal;
mod whitelist;

pub use filter::{Conjunction, Filter, FilterGroup, FilterItem, FilterOperator, FilterValue};
pub use pagination::{Cursor, PageInfo, PageLimits, PageRequest, SortDirection};
pub use temporal::{DateRange, TimeSlot};
pub use whitelist::{FieldConfig, FieldWhitelist, ValidationMode, ValueKind};
