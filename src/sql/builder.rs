//! Safe SELECT/COUNT assembly.
//!
//! [`SafeQueryBuilder`] accumulates validated conditions, search, sort,
//! and pagination state, then emits a complete statement plus its
//! ordered bind list. [`CountQueryBuilder`] is the sibling view that
//! reuses the identical WHERE clause without ORDER BY/LIMIT/OFFSET, so a
//! total count and a page of results always describe the same row set.

use crate::models::{
    Cursor, FieldWhitelist, Filter, FilterGroup, FilterOperator, FilterValue, PageLimits,
    PageRequest, SortDirection, ValidationMode,
};
use crate::sql::condition::build_condition_with;
use crate::sql::dialect::Dialect;
use crate::sql::fts::FtsConfig;
use crate::sql::ident::validate_identifier;
use crate::{Error, Result};

/// Search state attached to a builder.
#[derive(Debug, Clone)]
struct SearchSpec {
    phrase: String,
    config: FtsConfig,
    fts_available: bool,
}

/// One validated ORDER BY entry.
#[derive(Debug, Clone)]
struct OrderSpec {
    column: String,
    direction: SortDirection,
}

/// Pagination state attached to a builder.
#[derive(Debug, Clone)]
enum Paging {
    None,
    Offset(PageRequest),
    Keyset { cursor: Cursor, per_page: u32 },
}

/// Builder for parameterized SELECT statements over one table.
///
/// Conditions accumulate with implicit AND; complex boolean trees attach
/// as a single [`FilterGroup`]. Every field reference is resolved
/// through the whitelist, every value becomes a bind parameter, and the
/// table/column identifiers are vetted at configuration time — emitted
/// SQL text is independent of request-supplied content.
#[derive(Debug, Clone)]
pub struct SafeQueryBuilder {
    table: String,
    id_column: String,
    whitelist: FieldWhitelist,
    mode: ValidationMode,
    dialect: Dialect,
    root: FilterGroup,
    search: Option<SearchSpec>,
    order: Vec<OrderSpec>,
    paging: Paging,
    limits: PageLimits,
}

impl SafeQueryBuilder {
    /// Creates a builder for `table` with the given whitelist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsafeIdentifier`] for an unsafe table name and
    /// [`Error::EmptyWhitelist`] for a whitelist with no fields.
    pub fn new(table: impl Into<String>, whitelist: FieldWhitelist) -> Result<Self> {
        let table = table.into();
        validate_identifier(&table)?;
        whitelist.require_non_empty()?;
        Ok(Self {
            table,
            id_column: "id".to_string(),
            whitelist,
            mode: ValidationMode::Strict,
            dialect: Dialect::default(),
            root: FilterGroup::and(),
            search: None,
            order: Vec::new(),
            paging: Paging::None,
            limits: PageLimits::default(),
        })
    }

    /// Sets the whitelist strictness (strict by default).
    #[must_use]
    pub const fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the placeholder dialect (`SQLite` by default).
    #[must_use]
    pub const fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Sets the per-page clamping bounds.
    #[must_use]
    pub const fn with_page_limits(mut self, limits: PageLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Overrides the id column used for FTS joins and keyset tiebreaks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsafeIdentifier`] for an unsafe column name.
    pub fn with_id_column(mut self, column: impl Into<String>) -> Result<Self> {
        let column = column.into();
        validate_identifier(&column)?;
        self.id_column = column;
        Ok(self)
    }

    /// Adds an equality condition (implicit AND).
    #[must_use]
    pub fn add_exact_match(
        mut self,
        field: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> Self {
        self.root.push(Filter::eq(field, value));
        self
    }

    /// Adds a comparison condition (implicit AND).
    #[must_use]
    pub fn add_comparison(
        mut self,
        field: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<FilterValue>,
    ) -> Self {
        self.root.push(Filter::new(field, operator, value));
        self
    }

    /// Adds an arbitrary predicate (implicit AND).
    #[must_use]
    pub fn add_filter(mut self, filter: Filter) -> Self {
        self.root.push(filter);
        self
    }

    /// Attaches a boolean filter tree as one condition (implicit AND
    /// with the rest of the builder state).
    #[must_use]
    pub fn add_filter_group(mut self, group: FilterGroup) -> Self {
        self.root.push(group);
        self
    }

    /// Attaches a full-text search over the configured FTS index.
    #[must_use]
    pub fn with_search(mut self, phrase: impl Into<String>, config: FtsConfig) -> Self {
        self.search = Some(SearchSpec {
            phrase: phrase.into(),
            config,
            fts_available: true,
        });
        self
    }

    /// Attaches a search using the `LIKE` fallback (FTS index absent or
    /// not yet built).
    #[must_use]
    pub fn with_search_fallback(mut self, phrase: impl Into<String>, config: FtsConfig) -> Self {
        self.search = Some(SearchSpec {
            phrase: phrase.into(),
            config,
            fts_available: false,
        });
        self
    }

    /// Adds a sort key, validated against the whitelist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] for a field outside the
    /// whitelist, in either validation mode: an unvalidated sort column
    /// is never interpolated.
    pub fn order_by(mut self, field: &str, direction: SortDirection) -> Result<Self> {
        let column = self.whitelist.resolve(field)?.column().to_string();
        self.order.push(OrderSpec { column, direction });
        Ok(self)
    }

    /// Uses offset pagination: `LIMIT ?N OFFSET ?M`.
    ///
    /// Offset cost grows with page depth; prefer [`Self::with_cursor`]
    /// when paging deep into large tables.
    #[must_use]
    pub fn paginate(mut self, page: PageRequest) -> Self {
        self.paging = Paging::Offset(page);
        self
    }

    /// Uses keyset pagination from an opaque cursor token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursor`] when the token does not decode;
    /// a key count that does not match the sort specification is caught
    /// at build time.
    pub fn with_cursor(mut self, token: &str, per_page: u32) -> Result<Self> {
        let cursor = Cursor::decode(token)?;
        self.paging = Paging::Keyset { cursor, per_page };
        Ok(self)
    }

    /// Encodes a continuation cursor from the last row of a page.
    ///
    /// `sort_keys` are the row's values for the builder's ORDER BY
    /// columns, in order; `id` is the row's id-column value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursor`] when the key count does not
    /// match the sort specification or a key is not a non-null scalar.
    pub fn cursor_for(&self, sort_keys: &[FilterValue], id: FilterValue) -> Result<String> {
        if sort_keys.len() != self.order.len() {
            return Err(Error::InvalidCursor {
                reason: format!(
                    "expected {} sort key(s), got {}",
                    self.order.len(),
                    sort_keys.len()
                ),
            });
        }
        let mut keys = sort_keys.to_vec();
        keys.push(id);
        Ok(Cursor::new(keys)?.encode())
    }

    /// The target table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The configured validation mode.
    #[must_use]
    pub const fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// A sibling count builder sharing this builder's WHERE clause.
    #[must_use]
    pub const fn count_builder(&self) -> CountQueryBuilder<'_> {
        CountQueryBuilder { inner: self }
    }

    /// Builds the SELECT statement and its bind list.
    ///
    /// `projection` holds logical field names resolved through the
    /// whitelist (always strictly — a dropped projection column would
    /// silently change the result shape); empty means `*`.
    ///
    /// # Errors
    ///
    /// Propagates condition validation errors, unknown projection
    /// fields, and cursor/sort mismatches.
    pub fn build_select(&self, projection: &[&str]) -> Result<(String, Vec<FilterValue>)> {
        let columns = self.resolve_projection(projection)?;

        let mut sql = format!("SELECT {} FROM {}", columns, self.table);
        let (mut where_parts, mut binds, mut ordinal) = self.render_where(1)?;

        // The keyset predicate is pagination state, not filtering: it
        // belongs to the SELECT only, appended after the shared parts.
        if let Paging::Keyset { cursor, .. } = &self.paging {
            let (fragment, mut keyset_binds, next) = self.keyset_predicate(cursor, ordinal)?;
            where_parts.push(fragment);
            binds.append(&mut keyset_binds);
            ordinal = next;
        }

        if !where_parts.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_parts.join(" AND "));
        }

        if let Some(order_sql) = self.render_order_by() {
            sql.push_str(&order_sql);
        }

        match &self.paging {
            Paging::None => {},
            Paging::Offset(page) => {
                let page = page.clamped(self.limits);
                sql.push_str(&format!(
                    " LIMIT {} OFFSET {}",
                    self.dialect.placeholder(ordinal),
                    self.dialect.placeholder(ordinal + 1)
                ));
                binds.push(FilterValue::Integer(i64::from(page.per_page)));
                #[allow(clippy::cast_possible_wrap)]
                binds.push(FilterValue::Integer(page.offset() as i64));
            },
            Paging::Keyset { per_page, .. } => {
                let per_page = self.limits.clamp(*per_page);
                sql.push_str(&format!(" LIMIT {}", self.dialect.placeholder(ordinal)));
                binds.push(FilterValue::Integer(i64::from(per_page)));
            },
        }

        tracing::debug!(table = %self.table, sql = %sql, binds = binds.len(), "built select");
        Ok((sql, binds))
    }

    /// Builds the COUNT statement sharing this builder's WHERE clause.
    ///
    /// The WHERE fragment and bind order are identical to
    /// [`Self::build_select`]'s shared conditions; cursor position and
    /// pagination never affect the count.
    ///
    /// # Errors
    ///
    /// Propagates condition validation errors.
    pub fn build_count(&self) -> Result<(String, Vec<FilterValue>)> {
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let (where_parts, binds, _) = self.render_where(1)?;
        if !where_parts.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_parts.join(" AND "));
        }
        tracing::debug!(table = %self.table, sql = %sql, binds = binds.len(), "built count");
        Ok((sql, binds))
    }

    /// Renders the shared WHERE conditions: the filter tree, then the
    /// search condition.
    fn render_where(&self, start_ordinal: usize) -> Result<(Vec<String>, Vec<FilterValue>, usize)> {
        let mut parts = Vec::new();
        let mut binds = Vec::new();

        let (rendered, mut ordinal) = build_condition_with(
            &self.root,
            &self.whitelist,
            self.mode,
            self.dialect,
            start_ordinal,
        )?;
        if !rendered.is_empty() {
            parts.push(rendered.sql);
            binds.extend(rendered.binds);
        }

        if let Some(search) = &self.search {
            let condition = if search.fts_available {
                search.config.match_condition(
                    &search.phrase,
                    Some(&self.table),
                    self.dialect,
                    ordinal,
                )
            } else {
                search.config.like_condition(&search.phrase, self.dialect, ordinal)
            };
            if let Some((sql, mut search_binds, next)) = condition {
                // The LIKE fallback joins per-token groups with AND;
                // parenthesize so it composes under the outer AND chain
                if search.fts_available {
                    parts.push(sql);
                } else {
                    parts.push(format!("({sql})"));
                }
                binds.append(&mut search_binds);
                ordinal = next;
            }
        }

        Ok((parts, binds, ordinal))
    }

    fn render_order_by(&self) -> Option<String> {
        let mut entries: Vec<String> = self
            .order
            .iter()
            .map(|spec| format!("{} {}", spec.column, spec.direction.sql_keyword()))
            .collect();
        if matches!(self.paging, Paging::Keyset { .. }) {
            entries.push(format!(
                "{} {}",
                self.id_column,
                self.tiebreak_direction().sql_keyword()
            ));
        }
        if entries.is_empty() {
            None
        } else {
            Some(format!(" ORDER BY {}", entries.join(", ")))
        }
    }

    /// Direction of the id tiebreaker: follows the sort keys when they
    /// agree, ascending otherwise (the expanded keyset form handles the
    /// mixed case per column).
    fn tiebreak_direction(&self) -> SortDirection {
        let mut directions = self.order.iter().map(|spec| spec.direction);
        let Some(first) = directions.next() else {
            return SortDirection::Asc;
        };
        if directions.all(|d| d == first) {
            first
        } else {
            SortDirection::Asc
        }
    }

    /// Builds the seek predicate for keyset pagination.
    ///
    /// Uniform sort directions use a row-value comparison,
    /// `(col…, id) > (?…)`; mixed directions expand to the
    /// `(a > ?) OR (a = ? AND b < ?) OR …` form.
    fn keyset_predicate(
        &self,
        cursor: &Cursor,
        start_ordinal: usize,
    ) -> Result<(String, Vec<FilterValue>, usize)> {
        let tiebreak = self.tiebreak_direction();
        let mut keyset: Vec<(&str, SortDirection)> = self
            .order
            .iter()
            .map(|spec| (spec.column.as_str(), spec.direction))
            .collect();
        keyset.push((self.id_column.as_str(), tiebreak));

        let keys = cursor.keys();
        if keys.len() != keyset.len() {
            return Err(Error::InvalidCursor {
                reason: format!(
                    "cursor carries {} key(s) but the sort specification needs {}",
                    keys.len(),
                    keyset.len()
                ),
            });
        }

        let uniform = keyset.iter().all(|(_, d)| *d == keyset[0].1);
        let mut ordinal = start_ordinal;

        if uniform {
            let columns: Vec<&str> = keyset.iter().map(|(c, _)| *c).collect();
            let placeholders: Vec<String> = (0..keys.len())
                .map(|i| self.dialect.placeholder(ordinal + i))
                .collect();
            ordinal += keys.len();
            let sql = format!(
                "({}) {} ({})",
                columns.join(", "),
                keyset[0].1.seek_operator(),
                placeholders.join(", ")
            );
            return Ok((sql, keys.to_vec(), ordinal));
        }

        let mut clauses = Vec::with_capacity(keyset.len());
        let mut binds = Vec::new();
        for level in 0..keyset.len() {
            let mut parts = Vec::with_capacity(level + 1);
            for (eq_idx, (column, _)) in keyset.iter().enumerate().take(level) {
                parts.push(format!("{column} = {}", self.dialect.placeholder(ordinal)));
                ordinal += 1;
                binds.push(keys[eq_idx].clone());
            }
            let (column, direction) = keyset[level];
            parts.push(format!(
                "{column} {} {}",
                direction.seek_operator(),
                self.dialect.placeholder(ordinal)
            ));
            ordinal += 1;
            binds.push(keys[level].clone());
            clauses.push(format!("({})", parts.join(" AND ")));
        }

        Ok((format!("({})", clauses.join(" OR ")), binds, ordinal))
    }

    fn resolve_projection(&self, projection: &[&str]) -> Result<String> {
        if projection.is_empty() {
            return Ok("*".to_string());
        }
        let mut columns = Vec::with_capacity(projection.len());
        for field in projection {
            columns.push(self.whitelist.resolve(field)?.column().to_string());
        }
        Ok(columns.join(", "))
    }
}

/// Count-statement view over a [`SafeQueryBuilder`].
#[derive(Debug, Clone, Copy)]
pub struct CountQueryBuilder<'a> {
    inner: &'a SafeQueryBuilder,
}

impl CountQueryBuilder<'_> {
    /// Builds the COUNT statement; see [`SafeQueryBuilder::build_count`].
    ///
    /// # Errors
    ///
    /// Propagates condition validation errors.
    pub fn build(&self) -> Result<(String, Vec<FilterValue>)> {
        self.inner.build_count()
    }
}
