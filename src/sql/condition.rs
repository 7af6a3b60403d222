//! Recursive filter-tree renderer.
//!
//! Walks a [`FilterGroup`] against a [`FieldWhitelist`] and emits a SQL
//! fragment with numbered placeholders plus the ordered bind list. The
//! renderer is a pure function over its inputs: each recursive call
//! returns its own `(fragment, binds, next_ordinal)` and the caller
//! concatenates, so bind-index alignment never depends on shared state.
//!
//! The emitted fragment can only contain whitelisted column names and
//! the operator enum's fixed keywords; every literal is represented
//! solely as a placeholder with a bind value at the same ordinal.

use crate::models::{
    Conjunction, FieldWhitelist, Filter, FilterGroup, FilterItem, FilterOperator, FilterValue,
    ValidationMode, ValueKind,
};
use crate::sql::dialect::Dialect;
use crate::sql::ident::escape_like_wildcards;
use crate::{Error, Result};

/// Maximum nesting depth of a filter tree.
///
/// Bounds SQL size and recursion against pathological request input.
pub const MAX_FILTER_DEPTH: usize = 10;

/// A rendered SQL fragment and its ordered bind values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rendered {
    /// The SQL fragment. Empty when the source tree contributed nothing.
    pub sql: String,
    /// Bind values in placeholder-ordinal order.
    pub binds: Vec<FilterValue>,
}

impl Rendered {
    /// An empty fragment (no condition, i.e. always true).
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            sql: String::new(),
            binds: Vec::new(),
        }
    }

    /// The well-known always-true fragment, for callers that need a
    /// non-empty WHERE body.
    #[must_use]
    pub fn always_true() -> Self {
        Self {
            sql: "1=1".to_string(),
            binds: Vec::new(),
        }
    }

    /// Returns true when the fragment carries no condition.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Renders a filter tree in strict mode with the default dialect,
/// numbering placeholders from 1.
///
/// # Errors
///
/// Returns a validation error when the tree references an unknown field
/// or disallowed operator, breaks an arity invariant, carries a value of
/// the wrong type, or exceeds [`MAX_FILTER_DEPTH`].
pub fn build_condition(group: &FilterGroup, whitelist: &FieldWhitelist) -> Result<Rendered> {
    build_condition_with(
        group,
        whitelist,
        ValidationMode::Strict,
        Dialect::default(),
        1,
    )
    .map(|(rendered, _)| rendered)
}

/// Renders a filter tree with explicit mode, dialect, and starting
/// placeholder ordinal.
///
/// Returns the fragment together with the next unused ordinal, so
/// callers can append further parameterized clauses.
///
/// # Errors
///
/// As [`build_condition`]; in [`ValidationMode::Lenient`], unknown
/// fields and disallowed operators are dropped (with a warning) instead
/// of failing, but arity and value-type violations still fail.
pub fn build_condition_with(
    group: &FilterGroup,
    whitelist: &FieldWhitelist,
    mode: ValidationMode,
    dialect: Dialect,
    start_ordinal: usize,
) -> Result<(Rendered, usize)> {
    whitelist.require_non_empty()?;
    let (rendered, next) = render_group(group, whitelist, mode, dialect, start_ordinal, 1)?;
    match rendered {
        Some(part) => Ok((
            Rendered {
                sql: part.sql,
                binds: part.binds,
            },
            next,
        )),
        None => Ok((Rendered::empty(), next)),
    }
}

/// A rendered subtree, with enough shape information for the parent to
/// decide on parenthesization.
struct GroupPart {
    sql: String,
    binds: Vec<FilterValue>,
    child_count: usize,
    conjunction: Conjunction,
}

fn render_group(
    group: &FilterGroup,
    whitelist: &FieldWhitelist,
    mode: ValidationMode,
    dialect: Dialect,
    start_ordinal: usize,
    depth: usize,
) -> Result<(Option<GroupPart>, usize)> {
    if depth > MAX_FILTER_DEPTH {
        return Err(Error::MaxDepthExceeded {
            max: MAX_FILTER_DEPTH,
        });
    }

    let mut fragments: Vec<String> = Vec::with_capacity(group.items.len());
    let mut binds: Vec<FilterValue> = Vec::new();
    let mut ordinal = start_ordinal;

    for item in &group.items {
        match item {
            FilterItem::Condition(filter) => {
                let (rendered, next) = render_filter(filter, whitelist, mode, dialect, ordinal)?;
                ordinal = next;
                if let Some((sql, mut values)) = rendered {
                    fragments.push(sql);
                    binds.append(&mut values);
                }
            },
            FilterItem::Group(child) => {
                let (rendered, next) =
                    render_group(child, whitelist, mode, dialect, ordinal, depth + 1)?;
                ordinal = next;
                if let Some(part) = rendered {
                    // Parenthesize when precedence could change the
                    // meaning: multiple children, or a conjunction
                    // differing from the parent's.
                    let wrap =
                        part.child_count > 1 || part.conjunction != group.conjunction;
                    if wrap {
                        fragments.push(format!("({})", part.sql));
                    } else {
                        fragments.push(part.sql);
                    }
                    binds.extend(part.binds);
                }
            },
        }
    }

    if fragments.is_empty() {
        return Ok((None, ordinal));
    }

    let child_count = fragments.len();
    Ok((
        Some(GroupPart {
            sql: fragments.join(group.conjunction.sql_joiner()),
            binds,
            child_count,
            conjunction: group.conjunction,
        }),
        ordinal,
    ))
}

/// Renders one leaf predicate, or drops it in lenient mode.
///
/// Returns `(None, ordinal)` when the leaf was dropped; the ordinal is
/// unchanged in that case so later placeholders stay dense.
fn render_filter(
    filter: &Filter,
    whitelist: &FieldWhitelist,
    mode: ValidationMode,
    dialect: Dialect,
    ordinal: usize,
) -> Result<(Option<(String, Vec<FilterValue>)>, usize)> {
    let Some(config) = whitelist.get(&filter.field) else {
        match mode {
            ValidationMode::Strict => {
                return Err(Error::UnknownField {
                    field: filter.field.clone(),
                });
            },
            ValidationMode::Lenient => {
                tracing::warn!(field = %filter.field, "dropping filter on unknown field");
                return Ok((None, ordinal));
            },
        }
    };

    if !config.allows(filter.operator) {
        match mode {
            ValidationMode::Strict => {
                return Err(Error::OperatorNotAllowed {
                    field: filter.field.clone(),
                    operator: filter.operator,
                });
            },
            ValidationMode::Lenient => {
                tracing::warn!(
                    field = %filter.field,
                    operator = %filter.operator,
                    "dropping filter with disallowed operator"
                );
                return Ok((None, ordinal));
            },
        }
    }

    let column = config.column();

    match filter.operator {
        FilterOperator::IsNull => Ok((Some((format!("{column} IS NULL"), Vec::new())), ordinal)),
        FilterOperator::IsNotNull => {
            Ok((Some((format!("{column} IS NOT NULL"), Vec::new())), ordinal))
        },
        FilterOperator::Between | FilterOperator::NotBetween => {
            let items = require_list(filter)?;
            if items.len() != 2 {
                return Err(Error::ArityMismatch {
                    field: filter.field.clone(),
                    operator: filter.operator,
                    expected: "exactly 2 values",
                    got: items.len(),
                });
            }
            for item in items {
                check_scalar(&filter.field, config.kind(), item)?;
            }
            let keyword = if filter.operator == FilterOperator::Between {
                "BETWEEN"
            } else {
                "NOT BETWEEN"
            };
            let sql = format!(
                "{column} {keyword} {} AND {}",
                dialect.placeholder(ordinal),
                dialect.placeholder(ordinal + 1)
            );
            Ok((Some((sql, items.to_vec())), ordinal + 2))
        },
        FilterOperator::In | FilterOperator::NotIn => {
            let items = require_list(filter)?;
            if items.is_empty() {
                return Err(Error::ArityMismatch {
                    field: filter.field.clone(),
                    operator: filter.operator,
                    expected: "a non-empty list",
                    got: 0,
                });
            }
            for item in items {
                check_scalar(&filter.field, config.kind(), item)?;
            }
            let placeholders: Vec<String> = (0..items.len())
                .map(|i| dialect.placeholder(ordinal + i))
                .collect();
            let keyword = if filter.operator == FilterOperator::In {
                "IN"
            } else {
                "NOT IN"
            };
            let sql = format!("{column} {keyword} ({})", placeholders.join(", "));
            Ok((Some((sql, items.to_vec())), ordinal + items.len()))
        },
        FilterOperator::Like | FilterOperator::StartsWith | FilterOperator::EndsWith => {
            let value = require_scalar(filter)?;
            let Some(text) = value.as_text() else {
                return Err(Error::InvalidValue {
                    field: filter.field.clone(),
                    kind: ValueKind::Text,
                    raw: value.to_string(),
                });
            };
            let escaped = escape_like_wildcards(text);
            let pattern = match filter.operator {
                FilterOperator::Like => format!("%{escaped}%"),
                FilterOperator::StartsWith => format!("{escaped}%"),
                _ => format!("%{escaped}"),
            };
            let sql = format!("{column} LIKE {} ESCAPE '\\'", dialect.placeholder(ordinal));
            Ok((Some((sql, vec![FilterValue::Text(pattern)])), ordinal + 1))
        },
        FilterOperator::Eq
        | FilterOperator::Neq
        | FilterOperator::Gt
        | FilterOperator::Gte
        | FilterOperator::Lt
        | FilterOperator::Lte => {
            let value = require_scalar(filter)?;
            check_scalar(&filter.field, config.kind(), value)?;
            let sql = format!(
                "{column} {} {}",
                comparison_sql(filter.operator),
                dialect.placeholder(ordinal)
            );
            Ok((Some((sql, vec![value.clone()])), ordinal + 1))
        },
    }
}

/// SQL operator text for the scalar comparison operators.
const fn comparison_sql(op: FilterOperator) -> &'static str {
    match op {
        FilterOperator::Eq => "=",
        FilterOperator::Neq => "<>",
        FilterOperator::Gt => ">",
        FilterOperator::Gte => ">=",
        FilterOperator::Lt => "<",
        FilterOperator::Lte => "<=",
        // Remaining operators are rendered from their own templates
        _ => "=",
    }
}

fn require_list(filter: &Filter) -> Result<&[FilterValue]> {
    match &filter.value {
        None | Some(FilterValue::Null) => Err(Error::MissingValue {
            field: filter.field.clone(),
        }),
        Some(FilterValue::List(items)) => Ok(items),
        Some(_) => Err(Error::ArityMismatch {
            field: filter.field.clone(),
            operator: filter.operator,
            expected: "a list of values",
            got: 1,
        }),
    }
}

fn require_scalar(filter: &Filter) -> Result<&FilterValue> {
    match &filter.value {
        None | Some(FilterValue::Null) => Err(Error::MissingValue {
            field: filter.field.clone(),
        }),
        Some(FilterValue::List(items)) => Err(Error::ArityMismatch {
            field: filter.field.clone(),
            operator: filter.operator,
            expected: "a single value",
            got: items.len(),
        }),
        Some(value) => Ok(value),
    }
}

fn check_scalar(field: &str, kind: ValueKind, value: &FilterValue) -> Result<()> {
    if kind.accepts(value) {
        return Ok(());
    }
    Err(Error::InvalidValue {
        field: field.to_string(),
        kind,
        raw: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldConfig, Filter};

    fn inventory_whitelist() -> FieldWhitelist {
        FieldWhitelist::new()
            .with_field(
                "status",
                FieldConfig::new("status", ValueKind::Text)
                    .with_operators([FilterOperator::Eq, FilterOperator::In]),
            )
            .unwrap()
            .with_field(
                "quantity",
                FieldConfig::new("quantity", ValueKind::Integer).with_operators([
                    FilterOperator::Gt,
                    FilterOperator::Gte,
                    FilterOperator::Lt,
                    FilterOperator::Lte,
                ]),
            )
            .unwrap()
            .with_field(
                "name",
                FieldConfig::new("name", ValueKind::Text).with_all_operators(),
            )
            .unwrap()
            .with_field(
                "expires_at",
                FieldConfig::new("expires_at", ValueKind::Timestamp).with_all_operators(),
            )
            .unwrap()
    }

    #[test]
    fn test_single_condition() {
        let group = FilterGroup::and().with_filter(Filter::eq("status", "available"));
        let rendered = build_condition(&group, &inventory_whitelist()).unwrap();
        assert_eq!(rendered.sql, "status = ?1");
        assert_eq!(
            rendered.binds,
            vec![FilterValue::Text("available".to_string())]
        );
    }

    #[test]
    fn test_nested_group_parenthesized() {
        let group = FilterGroup::and()
            .with_filter(Filter::is_in("status", vec!["available", "reserved"]))
            .with_group(
                FilterGroup::or()
                    .with_filter(Filter::new("quantity", FilterOperator::Gte, 10i64))
                    .with_filter(Filter::new("quantity", FilterOperator::Lt, 2i64)),
            );
        let rendered = build_condition(&group, &inventory_whitelist()).unwrap();
        assert_eq!(
            rendered.sql,
            "status IN (?1, ?2) AND (quantity >= ?3 OR quantity < ?4)"
        );
        assert_eq!(rendered.binds.len(), 4);
    }

    #[test]
    fn test_single_child_nested_group_unwrapped_same_conjunction() {
        let group = FilterGroup::and().with_group(
            FilterGroup::and().with_filter(Filter::eq("status", "available")),
        );
        let rendered = build_condition(&group, &inventory_whitelist()).unwrap();
        assert_eq!(rendered.sql, "status = ?1");
    }

    #[test]
    fn test_single_child_different_conjunction_wrapped() {
        let group = FilterGroup::and()
            .with_filter(Filter::eq("status", "available"))
            .with_group(FilterGroup::or().with_filter(Filter::new(
                "quantity",
                FilterOperator::Gt,
                0i64,
            )));
        let rendered = build_condition(&group, &inventory_whitelist()).unwrap();
        assert_eq!(rendered.sql, "status = ?1 AND (quantity > ?2)");
    }

    #[test]
    fn test_operator_not_allowed_scenario() {
        // quantity's whitelist carries comparisons only, so IS NULL on it
        // must be rejected even inside a nested OR
        let group = FilterGroup::and()
            .with_filter(Filter::is_in("status", vec!["available", "reserved"]))
            .with_group(
                FilterGroup::or()
                    .with_filter(Filter::new("quantity", FilterOperator::Gte, 10i64))
                    .with_filter(Filter::unary("quantity", FilterOperator::IsNull)),
            );
        let err = build_condition(&group, &inventory_whitelist()).unwrap_err();
        assert!(matches!(
            err,
            Error::OperatorNotAllowed {
                ref field,
                operator: FilterOperator::IsNull,
            } if field == "quantity"
        ));
    }

    #[test]
    fn test_unknown_field_strict_vs_lenient() {
        let group = FilterGroup::and()
            .with_filter(Filter::eq("password", "x"))
            .with_filter(Filter::eq("status", "available"));

        let err = build_condition(&group, &inventory_whitelist()).unwrap_err();
        assert!(matches!(err, Error::UnknownField { ref field } if field == "password"));

        let (rendered, next) = build_condition_with(
            &group,
            &inventory_whitelist(),
            ValidationMode::Lenient,
            Dialect::Sqlite,
            1,
        )
        .unwrap();
        assert_eq!(rendered.sql, "status = ?1");
        assert_eq!(next, 2);
        // The dropped field's name must not appear anywhere in the SQL
        assert!(!rendered.sql.contains("password"));
    }

    #[test]
    fn test_value_content_never_in_sql() {
        let hostile = "'; DROP TABLE reagents; --";
        let group = FilterGroup::and().with_filter(Filter::eq("status", hostile));
        let rendered = build_condition(&group, &inventory_whitelist()).unwrap();
        assert_eq!(rendered.sql, "status = ?1");
        assert!(!rendered.sql.contains("DROP"));
        assert_eq!(rendered.binds, vec![FilterValue::Text(hostile.to_string())]);
    }

    #[test]
    fn test_like_escapes_wildcards_into_bind() {
        let group =
            FilterGroup::and().with_filter(Filter::new("name", FilterOperator::Like, "100%_pure"));
        let rendered = build_condition(&group, &inventory_whitelist()).unwrap();
        assert_eq!(rendered.sql, "name LIKE ?1 ESCAPE '\\'");
        assert_eq!(
            rendered.binds,
            vec![FilterValue::Text("%100\\%\\_pure%".to_string())]
        );
    }

    #[test]
    fn test_starts_with_and_ends_with_patterns() {
        let wl = inventory_whitelist();
        let starts =
            FilterGroup::and().with_filter(Filter::new("name", FilterOperator::StartsWith, "sod"));
        assert_eq!(
            build_condition(&starts, &wl).unwrap().binds,
            vec![FilterValue::Text("sod%".to_string())]
        );

        let ends =
            FilterGroup::and().with_filter(Filter::new("name", FilterOperator::EndsWith, "ide"));
        assert_eq!(
            build_condition(&ends, &wl).unwrap().binds,
            vec![FilterValue::Text("%ide".to_string())]
        );
    }

    #[test]
    fn test_between_arity() {
        let wl = inventory_whitelist();
        let ok = FilterGroup::and().with_filter(Filter::new(
            "name",
            FilterOperator::Between,
            FilterValue::List(vec![FilterValue::Text("a".into()), FilterValue::Text("m".into())]),
        ));
        assert_eq!(
            build_condition(&ok, &wl).unwrap().sql,
            "name BETWEEN ?1 AND ?2"
        );

        let short = FilterGroup::and().with_filter(Filter::new(
            "name",
            FilterOperator::Between,
            FilterValue::List(vec![FilterValue::Text("a".into())]),
        ));
        assert!(matches!(
            build_condition(&short, &wl).unwrap_err(),
            Error::ArityMismatch { got: 1, .. }
        ));

        let long = FilterGroup::and().with_filter(Filter::new(
            "name",
            FilterOperator::Between,
            FilterValue::List(vec![
                FilterValue::Text("a".into()),
                FilterValue::Text("m".into()),
                FilterValue::Text("z".into()),
            ]),
        ));
        assert!(matches!(
            build_condition(&long, &wl).unwrap_err(),
            Error::ArityMismatch { got: 3, .. }
        ));
    }

    #[test]
    fn test_empty_in_list_rejected() {
        let group = FilterGroup::and().with_filter(Filter::new(
            "status",
            FilterOperator::In,
            FilterValue::List(Vec::new()),
        ));
        assert!(matches!(
            build_condition(&group, &inventory_whitelist()).unwrap_err(),
            Error::ArityMismatch { got: 0, .. }
        ));
    }

    #[test]
    fn test_missing_value_rejected() {
        let group = FilterGroup::and().with_filter(Filter::unary("status", FilterOperator::Eq));
        assert!(matches!(
            build_condition(&group, &inventory_whitelist()).unwrap_err(),
            Error::MissingValue { ref field } if field == "status"
        ));
    }

    #[test]
    fn test_wrong_value_type_rejected_in_both_modes() {
        let group = FilterGroup::and().with_filter(Filter::new(
            "quantity",
            FilterOperator::Gt,
            "lots",
        ));
        assert!(matches!(
            build_condition(&group, &inventory_whitelist()).unwrap_err(),
            Error::InvalidValue { ref field, .. } if field == "quantity"
        ));
        // Leniency covers fields and operators, not malformed values
        let lenient = build_condition_with(
            &group,
            &inventory_whitelist(),
            ValidationMode::Lenient,
            Dialect::Sqlite,
            1,
        );
        assert!(lenient.is_err());
    }

    #[test]
    fn test_empty_group_yields_empty_fragment() {
        let rendered = build_condition(&FilterGroup::and(), &inventory_whitelist()).unwrap();
        assert!(rendered.is_empty());
        assert!(rendered.binds.is_empty());

        // A group holding only empty groups also contributes nothing
        let nested = FilterGroup::and().with_group(FilterGroup::or());
        let rendered = build_condition(&nested, &inventory_whitelist()).unwrap();
        assert!(rendered.is_empty());
    }

    #[test]
    fn test_max_depth_exceeded() {
        let mut group = FilterGroup::and().with_filter(Filter::eq("status", "available"));
        for _ in 0..MAX_FILTER_DEPTH {
            group = FilterGroup::and().with_group(group);
        }
        assert!(matches!(
            build_condition(&group, &inventory_whitelist()).unwrap_err(),
            Error::MaxDepthExceeded { max: MAX_FILTER_DEPTH }
        ));
    }

    #[test]
    fn test_depth_at_limit_allowed() {
        let mut group = FilterGroup::and().with_filter(Filter::eq("status", "available"));
        for _ in 0..(MAX_FILTER_DEPTH - 1) {
            group = FilterGroup::and().with_group(group);
        }
        assert!(build_condition(&group, &inventory_whitelist()).is_ok());
    }

    #[test]
    fn test_idempotent_rendering() {
        let group = FilterGroup::and()
            .with_filter(Filter::is_in("status", vec!["available", "reserved"]))
            .with_filter(Filter::new("quantity", FilterOperator::Lte, 100i64));
        let wl = inventory_whitelist();
        let first = build_condition(&group, &wl).unwrap();
        let second = build_condition(&group, &wl).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_postgres_placeholders() {
        let group = FilterGroup::and()
            .with_filter(Filter::eq("status", "available"))
            .with_filter(Filter::new("quantity", FilterOperator::Gt, 5i64));
        let (rendered, next) = build_condition_with(
            &group,
            &inventory_whitelist(),
            ValidationMode::Strict,
            Dialect::Postgres,
            3,
        )
        .unwrap();
        assert_eq!(rendered.sql, "status = $3 AND quantity > $4");
        assert_eq!(next, 5);
    }

    #[test]
    fn test_empty_whitelist_rejected() {
        let group = FilterGroup::and().with_filter(Filter::eq("status", "available"));
        assert!(matches!(
            build_condition(&group, &FieldWhitelist::new()).unwrap_err(),
            Error::EmptyWhitelist
        ));
    }

    #[test]
    fn test_is_not_null_consumes_no_ordinal() {
        let group = FilterGroup::and()
            .with_filter(Filter::unary("name", FilterOperator::IsNotNull))
            .with_filter(Filter::eq("status", "available"));
        let rendered = build_condition(&group, &inventory_whitelist()).unwrap();
        assert_eq!(rendered.sql, "name IS NOT NULL AND status = ?1");
        assert_eq!(rendered.binds.len(), 1);
    }
}
