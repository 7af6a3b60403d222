//! Backend dialect: placeholder conventions.
//!
//! Placeholder style is the only dialect-sensitive rendering concern in
//! this layer; binding the parameters to a concrete driver happens at
//! the caller's assembly boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Target backend for placeholder formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `SQLite`: numbered `?N` placeholders (the default).
    #[default]
    Sqlite,
    /// `PostgreSQL`: `$N` placeholders.
    Postgres,
}

impl Dialect {
    /// Returns the dialect as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
        }
    }

    /// Formats the placeholder for the 1-based parameter `ordinal`.
    #[must_use]
    pub fn placeholder(&self, ordinal: usize) -> String {
        match self {
            Self::Sqlite => format!("?{ordinal}"),
            Self::Postgres => format!("${ordinal}"),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
