//! Field whitelist: the authoritative mapping from logical field names
//! to safe columns, allowed operators, and declared value types.
//!
//! Every identifier that reaches emitted SQL is resolved through a
//! [`FieldWhitelist`]; a field absent from the whitelist can never appear
//! in a query, regardless of what a request supplies.

use super::filter::{FilterOperator, FilterValue};
use crate::sql::ident::validate_identifier;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Declared data type of a whitelisted field.
///
/// Used at the parse-and-validate boundary to convert raw request strings
/// into typed [`FilterValue`]s, and at render time to reject values of
/// the wrong type before they reach the bind list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// UTF-8 text.
    Text,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Float,
    /// Boolean.
    Bool,
    /// UTC timestamp.
    Timestamp,
}

impl ValueKind {
    /// Returns all kind variants.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Text,
            Self::Integer,
            Self::Float,
            Self::Bool,
            Self::Timestamp,
        ]
    }

    /// Returns the kind as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Timestamp => "timestamp",
        }
    }

    /// Parses a kind from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "string" => Some(Self::Text),
            "integer" | "int" => Some(Self::Integer),
            "float" | "real" => Some(Self::Float),
            "bool" | "boolean" => Some(Self::Bool),
            "timestamp" | "datetime" => Some(Self::Timestamp),
            _ => None,
        }
    }

    /// Returns true if a scalar value is acceptable for this kind.
    ///
    /// Integers are accepted where floats are declared, and as epoch
    /// seconds where timestamps are declared; `Null` and `List` are never
    /// acceptable as scalars.
    #[must_use]
    pub const fn accepts(&self, value: &FilterValue) -> bool {
        matches!(
            (value, self),
            (FilterValue::Text(_), Self::Text)
                | (FilterValue::Integer(_), Self::Integer | Self::Float | Self::Timestamp)
                | (FilterValue::Float(_), Self::Float)
                | (FilterValue::Bool(_), Self::Bool)
                | (FilterValue::Timestamp(_), Self::Timestamp)
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whitelist strictness when a request references an unknown field or a
/// disallowed operator.
///
/// The mode is an explicit builder-level setting; there is no implicit
/// per-call behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Reject the whole tree with a typed error (the default).
    #[default]
    Strict,
    /// Drop the offending leaf and keep going; each drop is logged.
    Lenient,
}

impl ValidationMode {
    /// Returns the mode as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        }
    }
}

/// Validated column specification for one logical field.
#[derive(Debug, Clone)]
pub struct FieldConfig {
    column: String,
    kind: ValueKind,
    operators: HashSet<FilterOperator>,
}

impl FieldConfig {
    /// Creates a config mapping to `column` with the given kind and no
    /// allowed operators yet.
    ///
    /// The column name is vetted when the config is inserted into a
    /// [`FieldWhitelist`].
    pub fn new(column: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            column: column.into(),
            kind,
            operators: HashSet::new(),
        }
    }

    /// Allows the given operators for this field.
    #[must_use]
    pub fn with_operators(mut self, operators: impl IntoIterator<Item = FilterOperator>) -> Self {
        self.operators.extend(operators);
        self
    }

    /// Allows every operator for this field.
    #[must_use]
    pub fn with_all_operators(mut self) -> Self {
        self.operators.extend(FilterOperator::all());
        self
    }

    /// The actual column name emitted into SQL.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// The declared value kind.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Returns true if `operator` is allowed for this field.
    #[must_use]
    pub fn allows(&self, operator: FilterOperator) -> bool {
        self.operators.contains(&operator)
    }

    /// Converts a raw request string into a typed value per the declared
    /// kind.
    ///
    /// This is the parse-and-validate boundary: loosely-typed query
    /// parameters become typed [`FilterValue`]s here, before any tree
    /// reaches the renderer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] naming the field when the raw
    /// string cannot be parsed as the declared kind.
    pub fn parse_value(&self, field: &str, raw: &str) -> Result<FilterValue> {
        let raw = raw.trim();
        let invalid = || Error::InvalidValue {
            field: field.to_string(),
            kind: self.kind,
            raw: raw.to_string(),
        };
        match self.kind {
            ValueKind::Text => Ok(FilterValue::Text(raw.to_string())),
            ValueKind::Integer => raw
                .parse::<i64>()
                .map(FilterValue::Integer)
                .map_err(|_| invalid()),
            ValueKind::Float => raw
                .parse::<f64>()
                .map(FilterValue::Float)
                .map_err(|_| invalid()),
            ValueKind::Bool => match raw.to_lowercase().as_str() {
                "true" | "1" => Ok(FilterValue::Bool(true)),
                "false" | "0" => Ok(FilterValue::Bool(false)),
                _ => Err(invalid()),
            },
            ValueKind::Timestamp => {
                // RFC 3339 first, epoch seconds as a fallback
                if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
                    return Ok(FilterValue::Timestamp(ts.with_timezone(&Utc)));
                }
                raw.parse::<i64>()
                    .map(FilterValue::Integer)
                    .map_err(|_| invalid())
            },
        }
    }
}

/// Maps logical field names to validated column specifications.
///
/// Whitelists are built by application code per table, not from request
/// input. Column names are vetted at insertion, so by construction every
/// identifier the renderer can emit is safe.
#[derive(Debug, Clone, Default)]
pub struct FieldWhitelist {
    fields: HashMap<String, FieldConfig>,
}

impl FieldWhitelist {
    /// Creates an empty whitelist.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    /// Adds a field, vetting its column name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsafeIdentifier`] if the config's column name is
    /// not a plain SQL identifier.
    pub fn with_field(mut self, name: impl Into<String>, config: FieldConfig) -> Result<Self> {
        validate_identifier(&config.column)?;
        self.fields.insert(name.into(), config);
        Ok(self)
    }

    /// Looks up a field by logical name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.get(name)
    }

    /// Looks up a field, failing with [`Error::UnknownField`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] when the name is not whitelisted.
    pub fn resolve(&self, name: &str) -> Result<&FieldConfig> {
        self.fields.get(name).ok_or_else(|| Error::UnknownField {
            field: name.to_string(),
        })
    }

    /// Returns the number of whitelisted fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no fields are whitelisted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fails with [`Error::EmptyWhitelist`] when no fields are present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyWhitelist`] for an empty whitelist.
    pub fn require_non_empty(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(Error::EmptyWhitelist);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> FieldConfig {
        FieldConfig::new("status", ValueKind::Text)
            .with_operators([FilterOperator::Eq, FilterOperator::In])
    }

    #[test]
    fn test_kind_as_str_roundtrips() {
        for kind in ValueKind::all() {
            assert_eq!(ValueKind::parse(kind.as_str()), Some(*kind));
        }
    }

    #[test]
    fn test_kind_accepts() {
        assert!(ValueKind::Text.accepts(&FilterValue::Text("x".to_string())));
        assert!(ValueKind::Float.accepts(&FilterValue::Integer(3)));
        assert!(ValueKind::Timestamp.accepts(&FilterValue::Integer(1_700_000_000)));
        assert!(!ValueKind::Integer.accepts(&FilterValue::Text("3".to_string())));
        assert!(!ValueKind::Text.accepts(&FilterValue::Null));
        assert!(!ValueKind::Text.accepts(&FilterValue::List(vec![])));
    }

    #[test]
    fn test_field_config_allows() {
        let config = sample_config();
        assert!(config.allows(FilterOperator::Eq));
        assert!(config.allows(FilterOperator::In));
        assert!(!config.allows(FilterOperator::Like));
        assert_eq!(config.column(), "status");
        assert_eq!(config.kind(), ValueKind::Text);
    }

    #[test]
    fn test_with_all_operators() {
        let config = FieldConfig::new("quantity", ValueKind::Integer).with_all_operators();
        for op in FilterOperator::all() {
            assert!(config.allows(*op));
        }
    }

    #[test]
    fn test_parse_value_per_kind() {
        let text = FieldConfig::new("name", ValueKind::Text);
        assert_eq!(
            text.parse_value("name", " acetone ").unwrap(),
            FilterValue::Text("acetone".to_string())
        );

        let int = FieldConfig::new("quantity", ValueKind::Integer);
        assert_eq!(
            int.parse_value("quantity", "42").unwrap(),
            FilterValue::Integer(42)
        );
        assert!(int.parse_value("quantity", "forty-two").is_err());

        let boolean = FieldConfig::new("hazardous", ValueKind::Bool);
        assert_eq!(
            boolean.parse_value("hazardous", "TRUE").unwrap(),
            FilterValue::Bool(true)
        );
        assert_eq!(
            boolean.parse_value("hazardous", "0").unwrap(),
            FilterValue::Bool(false)
        );
        assert!(boolean.parse_value("hazardous", "yes").is_err());
    }

    #[test]
    fn test_parse_value_timestamp() {
        let ts = FieldConfig::new("expires_at", ValueKind::Timestamp);
        assert!(matches!(
            ts.parse_value("expires_at", "2024-03-01T12:00:00Z").unwrap(),
            FilterValue::Timestamp(_)
        ));
        assert_eq!(
            ts.parse_value("expires_at", "1700000000").unwrap(),
            FilterValue::Integer(1_700_000_000)
        );
        assert!(ts.parse_value("expires_at", "tomorrow").is_err());
    }

    #[test]
    fn test_parse_value_error_names_field() {
        let int = FieldConfig::new("quantity", ValueKind::Integer);
        let err = int.parse_value("quantity", "abc").unwrap_err();
        assert!(matches!(err, Error::InvalidValue { ref field, .. } if field == "quantity"));
    }

    #[test]
    fn test_whitelist_lookup() {
        let wl = FieldWhitelist::new()
            .with_field("status", sample_config())
            .unwrap();
        assert!(wl.get("status").is_some());
        assert!(wl.get("password").is_none());
        assert!(wl.resolve("status").is_ok());
        assert!(matches!(
            wl.resolve("password"),
            Err(Error::UnknownField { .. })
        ));
        assert_eq!(wl.len(), 1);
    }

    #[test]
    fn test_whitelist_rejects_unsafe_column() {
        let config = FieldConfig::new("status; DROP TABLE reagents", ValueKind::Text);
        let result = FieldWhitelist::new().with_field("status", config);
        assert!(matches!(result, Err(Error::UnsafeIdentifier { .. })));
    }

    #[test]
    fn test_empty_whitelist_check() {
        let wl = FieldWhitelist::new();
        assert!(wl.is_empty());
        assert!(matches!(wl.require_non_empty(), Err(Error::EmptyWhitelist)));
    }
}
