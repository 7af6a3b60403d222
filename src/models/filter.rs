//! Filter expression model.
//!
//! A query's filtering requirements are described as a tree of
//! [`Filter`] predicates combined by [`FilterGroup`] nodes. The tree is
//! plain data: it carries no SQL and is only turned into a parameterized
//! fragment by the renderer in [`crate::sql::condition`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operators available to filter predicates.
///
/// This is a closed enumeration: operators are never represented as free
/// strings in the public API, so request input cannot smuggle SQL through
/// the operator position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Equality (`=`).
    Eq,
    /// Inequality (`<>`).
    Neq,
    /// Greater than (`>`).
    Gt,
    /// Greater than or equal (`>=`).
    Gte,
    /// Less than (`<`).
    Lt,
    /// Less than or equal (`<=`).
    Lte,
    /// Substring match (`LIKE '%value%'` with escaped wildcards).
    Like,
    /// Prefix match (`LIKE 'value%'` with escaped wildcards).
    StartsWith,
    /// Suffix match (`LIKE '%value'` with escaped wildcards).
    EndsWith,
    /// Membership in a non-empty list (`IN (...)`).
    In,
    /// Exclusion from a non-empty list (`NOT IN (...)`).
    NotIn,
    /// Null check (`IS NULL`), takes no value.
    IsNull,
    /// Not-null check (`IS NOT NULL`), takes no value.
    IsNotNull,
    /// Inclusive range (`BETWEEN ? AND ?`), takes exactly two values.
    Between,
    /// Excluded range (`NOT BETWEEN ? AND ?`), takes exactly two values.
    NotBetween,
}

impl FilterOperator {
    /// Returns all operator variants.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Eq,
            Self::Neq,
            Self::Gt,
            Self::Gte,
            Self::Lt,
            Self::Lte,
            Self::Like,
            Self::StartsWith,
            Self::EndsWith,
            Self::In,
            Self::NotIn,
            Self::IsNull,
            Self::IsNotNull,
            Self::Between,
            Self::NotBetween,
        ]
    }

    /// Returns the operator as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Like => "like",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
            Self::Between => "between",
            Self::NotBetween => "not_between",
        }
    }

    /// Parses an operator from a string.
    ///
    /// Accepts the canonical snake_case names plus the common symbolic
    /// aliases a request-parsing layer sees in query strings. Unknown
    /// strings yield `None`, never a passthrough.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "eq" | "=" | "==" => Some(Self::Eq),
            "neq" | "ne" | "!=" | "<>" => Some(Self::Neq),
            "gt" | ">" => Some(Self::Gt),
            "gte" | ">=" => Some(Self::Gte),
            "lt" | "<" => Some(Self::Lt),
            "lte" | "<=" => Some(Self::Lte),
            "like" | "contains" => Some(Self::Like),
            "starts_with" | "startswith" | "prefix" => Some(Self::StartsWith),
            "ends_with" | "endswith" | "suffix" => Some(Self::EndsWith),
            "in" => Some(Self::In),
            "not_in" | "notin" => Some(Self::NotIn),
            "is_null" | "null" => Some(Self::IsNull),
            "is_not_null" | "not_null" => Some(Self::IsNotNull),
            "between" => Some(Self::Between),
            "not_between" => Some(Self::NotBetween),
            _ => None,
        }
    }

    /// Returns true if the operator takes no bound value.
    #[must_use]
    pub const fn is_unary(&self) -> bool {
        matches!(self, Self::IsNull | Self::IsNotNull)
    }

    /// Returns true if the operator binds a list of values.
    #[must_use]
    pub const fn takes_list(&self) -> bool {
        matches!(self, Self::In | Self::NotIn | Self::Between | Self::NotBetween)
    }

    /// Returns true if the operator binds a `LIKE` pattern built from text.
    #[must_use]
    pub const fn is_pattern(&self) -> bool {
        matches!(self, Self::Like | Self::StartsWith | Self::EndsWith)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bindable value destined for a positional SQL parameter.
///
/// Every literal that ends up in a query travels through this type and is
/// handed to the database driver out-of-band from the SQL text. Nothing
/// in this crate ever renders a `FilterValue` into a SQL string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Float(f64),
    /// UTC timestamp (serialized as RFC 3339).
    Timestamp(DateTime<Utc>),
    /// UTF-8 text.
    Text(String),
    /// List of scalars, for `In`/`NotIn`/`Between`.
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// Returns true for every variant except `List`.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        !matches!(self, Self::List(_))
    }

    /// Returns the list elements if this is a `List`.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the text content if this is `Text`.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FilterValue {
    /// Human-readable rendering for logs and error messages.
    ///
    /// Never used to build SQL.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Self::Text(s) => write!(f, "{s}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            },
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FilterValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for FilterValue {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for FilterValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// A single field/operator/value predicate.
///
/// The `field` is a logical name resolved through a
/// [`crate::FieldWhitelist`] at render time; it is never emitted as a SQL
/// identifier directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Logical field name.
    pub field: String,
    /// Comparison operator.
    pub operator: FilterOperator,
    /// Bound value; required except for `IsNull`/`IsNotNull`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FilterValue>,
}

impl Filter {
    /// Creates a predicate with a bound value.
    pub fn new(
        field: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: Some(value.into()),
        }
    }

    /// Creates a value-less predicate (`IsNull`/`IsNotNull`).
    pub fn unary(field: impl Into<String>, operator: FilterOperator) -> Self {
        Self {
            field: field.into(),
            operator,
            value: None,
        }
    }

    /// Equality shorthand.
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::Eq, value)
    }

    /// Membership shorthand; `values` becomes a `List`.
    pub fn is_in<T: Into<FilterValue>>(field: impl Into<String>, values: Vec<T>) -> Self {
        Self::new(field, FilterOperator::In, values)
    }

    /// Inclusive-range shorthand.
    pub fn between(
        field: impl Into<String>,
        low: impl Into<FilterValue>,
        high: impl Into<FilterValue>,
    ) -> Self {
        Self::new(
            field,
            FilterOperator::Between,
            FilterValue::List(vec![low.into(), high.into()]),
        )
    }
}

/// Boolean connective for a [`FilterGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conjunction {
    /// All items must match.
    #[default]
    And,
    /// At least one item must match.
    Or,
}

impl Conjunction {
    /// Returns the conjunction as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }

    /// The SQL keyword used to join rendered children.
    #[must_use]
    pub(crate) const fn sql_joiner(&self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One node of a filter tree: either a leaf predicate or a nested group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterItem {
    /// A leaf predicate.
    Condition(Filter),
    /// A nested boolean group.
    Group(FilterGroup),
}

impl From<Filter> for FilterItem {
    fn from(filter: Filter) -> Self {
        Self::Condition(filter)
    }
}

impl From<FilterGroup> for FilterItem {
    fn from(group: FilterGroup) -> Self {
        Self::Group(group)
    }
}

/// A boolean composition of filters and nested groups.
///
/// An empty group is semantically "always true" and contributes no SQL.
/// Depth is bounded by the renderer, so a hostile request cannot force
/// unbounded recursion or SQL size.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterGroup {
    /// How the items combine.
    #[serde(default)]
    pub conjunction: Conjunction,
    /// Ordered child predicates and groups.
    #[serde(default)]
    pub items: Vec<FilterItem>,
}

impl FilterGroup {
    /// Creates an empty AND group.
    #[must_use]
    pub const fn and() -> Self {
        Self {
            conjunction: Conjunction::And,
            items: Vec::new(),
        }
    }

    /// Creates an empty OR group.
    #[must_use]
    pub const fn or() -> Self {
        Self {
            conjunction: Conjunction::Or,
            items: Vec::new(),
        }
    }

    /// Adds a leaf predicate.
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.items.push(FilterItem::Condition(filter));
        self
    }

    /// Adds a nested group.
    #[must_use]
    pub fn with_group(mut self, group: Self) -> Self {
        self.items.push(FilterItem::Group(group));
        self
    }

    /// Appends an item in place.
    pub fn push(&mut self, item: impl Into<FilterItem>) {
        self.items.push(item.into());
    }

    /// Returns the number of direct children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the group has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Greatest nesting depth of the tree, counting this group as 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self
            .items
            .iter()
            .map(|item| match item {
                FilterItem::Condition(_) => 0,
                FilterItem::Group(g) => g.depth(),
            })
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_as_str_roundtrips() {
        for op in FilterOperator::all() {
            assert_eq!(FilterOperator::parse(op.as_str()), Some(*op));
        }
    }

    #[test]
    fn test_operator_parse_aliases() {
        assert_eq!(FilterOperator::parse("="), Some(FilterOperator::Eq));
        assert_eq!(FilterOperator::parse("<>"), Some(FilterOperator::Neq));
        assert_eq!(FilterOperator::parse(">="), Some(FilterOperator::Gte));
        assert_eq!(FilterOperator::parse("contains"), Some(FilterOperator::Like));
        assert_eq!(FilterOperator::parse("NOT_IN"), Some(FilterOperator::NotIn));
        assert_eq!(FilterOperator::parse("drop table"), None);
    }

    #[test]
    fn test_operator_arity_flags() {
        assert!(FilterOperator::IsNull.is_unary());
        assert!(FilterOperator::IsNotNull.is_unary());
        assert!(!FilterOperator::Eq.is_unary());
        assert!(FilterOperator::In.takes_list());
        assert!(FilterOperator::Between.takes_list());
        assert!(!FilterOperator::Like.takes_list());
        assert!(FilterOperator::StartsWith.is_pattern());
    }

    #[test]
    fn test_operator_serde_snake_case() {
        let json = serde_json::to_string(&FilterOperator::NotBetween).unwrap();
        assert_eq!(json, "\"not_between\"");
        let parsed: FilterOperator = serde_json::from_str("\"starts_with\"").unwrap();
        assert_eq!(parsed, FilterOperator::StartsWith);
    }

    #[test]
    fn test_value_from_conversions() {
        assert_eq!(FilterValue::from("abc"), FilterValue::Text("abc".to_string()));
        assert_eq!(FilterValue::from(42i64), FilterValue::Integer(42));
        assert_eq!(FilterValue::from(true), FilterValue::Bool(true));
        assert_eq!(
            FilterValue::from(vec![1i64, 2, 3]),
            FilterValue::List(vec![
                FilterValue::Integer(1),
                FilterValue::Integer(2),
                FilterValue::Integer(3)
            ])
        );
    }

    #[test]
    fn test_value_untagged_deserialization() {
        let v: FilterValue = serde_json::from_str("\"available\"").unwrap();
        assert_eq!(v, FilterValue::Text("available".to_string()));

        let v: FilterValue = serde_json::from_str("7").unwrap();
        assert_eq!(v, FilterValue::Integer(7));

        let v: FilterValue = serde_json::from_str("2.5").unwrap();
        assert_eq!(v, FilterValue::Float(2.5));

        let v: FilterValue = serde_json::from_str("null").unwrap();
        assert_eq!(v, FilterValue::Null);

        let v: FilterValue = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(
            v,
            FilterValue::List(vec![FilterValue::Integer(1), FilterValue::Integer(2)])
        );
    }

    #[test]
    fn test_timestamp_deserializes_from_rfc3339() {
        let v: FilterValue = serde_json::from_str("\"2024-03-01T12:00:00Z\"").unwrap();
        assert!(matches!(v, FilterValue::Timestamp(_)));
    }

    #[test]
    fn test_filter_tree_deserializes_from_request_json() {
        let json = r#"{
            "conjunction": "and",
            "items": [
                {"field": "status", "operator": "in", "value": ["available", "reserved"]},
                {
                    "conjunction": "or",
                    "items": [
                        {"field": "quantity", "operator": "gte", "value": 10},
                        {"field": "expires_at", "operator": "is_null"}
                    ]
                }
            ]
        }"#;
        let group: FilterGroup = serde_json::from_str(json).unwrap();
        assert_eq!(group.conjunction, Conjunction::And);
        assert_eq!(group.len(), 2);
        assert!(matches!(group.items[0], FilterItem::Condition(_)));
        assert!(matches!(group.items[1], FilterItem::Group(_)));
        assert_eq!(group.depth(), 2);
    }

    #[test]
    fn test_group_builders() {
        let group = FilterGroup::and()
            .with_filter(Filter::eq("status", "available"))
            .with_group(
                FilterGroup::or()
                    .with_filter(Filter::new("quantity", FilterOperator::Gte, 10i64))
                    .with_filter(Filter::unary("expires_at", FilterOperator::IsNull)),
            );
        assert_eq!(group.len(), 2);
        assert_eq!(group.depth(), 2);
        assert!(!group.is_empty());
    }

    #[test]
    fn test_empty_group_depth() {
        assert_eq!(FilterGroup::and().depth(), 1);
        assert!(FilterGroup::or().is_empty());
    }
}
