//! Full-text-search condition builder.
//!
//! Turns a raw, user-supplied search phrase into either an FTS5 `MATCH`
//! subquery condition or a `LIKE`-based fallback, with the phrase bound
//! as a parameter in both cases. Normalization strips every character
//! the match-query grammar assigns meaning to, so a phrase can never
//! alter the boolean structure of the MATCH expression.

use crate::models::FilterValue;
use crate::sql::dialect::Dialect;
use crate::sql::ident::{escape_like_wildcards, validate_identifier};
use crate::{Error, Result};

/// Descriptor for one table's full-text index.
#[derive(Debug, Clone)]
pub struct FtsConfig {
    index_name: String,
    id_column: String,
    indexed_columns: Vec<String>,
    min_token_len: usize,
}

impl FtsConfig {
    /// Creates a config for the given FTS index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsafeIdentifier`] if the index name is not a
    /// plain identifier.
    pub fn new(index_name: impl Into<String>) -> Result<Self> {
        let index_name = index_name.into();
        validate_identifier(&index_name)?;
        Ok(Self {
            index_name,
            id_column: "id".to_string(),
            indexed_columns: Vec::new(),
            min_token_len: 1,
        })
    }

    /// Overrides the id column joining the index to its base table.
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

    /// Sets the columns scanned by the `LIKE` fallback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsafeIdentifier`] for any unsafe column name.
    pub fn with_indexed_columns<I, S>(mut self, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut validated = Vec::new();
        for column in columns {
            let column = column.into();
            validate_identifier(&column)?;
            validated.push(column);
        }
        self.indexed_columns = validated;
        Ok(self)
    }

    /// Ignores search tokens shorter than `len` characters.
    #[must_use]
    pub const fn with_min_token_len(mut self, len: usize) -> Self {
        self.min_token_len = len;
        self
    }

    /// The FTS index name.
    #[must_use]
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// The id column joining the index to its base table.
    #[must_use]
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Columns scanned by the `LIKE` fallback.
    #[must_use]
    pub fn indexed_columns(&self) -> &[String] {
        &self.indexed_columns
    }

    /// Normalizes a raw phrase into a safe prefix-match query.
    ///
    /// Tokenizes on whitespace, lowercases (the FTS5 `AND`/`OR`/`NOT`
    /// operators are recognized in uppercase only), keeps only
    /// alphanumeric characters, drops short tokens, and appends a `*`
    /// prefix wildcard per token. Returns `None` when nothing survives.
    #[must_use]
    pub fn normalize_phrase(&self, raw: &str) -> Option<String> {
        let tokens: Vec<String> = raw
            .split_whitespace()
            .filter_map(|word| {
                let token: String = word
                    .chars()
                    .flat_map(char::to_lowercase)
                    .filter(|c| c.is_alphanumeric())
                    .collect();
                if token.chars().count() < self.min_token_len || token.is_empty() {
                    None
                } else {
                    Some(format!("{token}*"))
                }
            })
            .collect();
        if tokens.is_empty() {
            None
        } else {
            Some(tokens.join(" "))
        }
    }

    pub(crate) fn match_condition(
        &self,
        raw_phrase: &str,
        table: Option<&str>,
        dialect: Dialect,
        start_ordinal: usize,
    ) -> Option<(String, Vec<FilterValue>, usize)> {
        let phrase = self.normalize_phrase(raw_phrase)?;
        let id = &self.id_column;
        let index = &self.index_name;
        let qualified_id = table.map_or_else(|| id.clone(), |t| format!("{t}.{id}"));
        let sql = format!(
            "{qualified_id} IN (SELECT {id} FROM {index} WHERE {index} MATCH {})",
            dialect.placeholder(start_ordinal)
        );
        Some((sql, vec![FilterValue::Text(phrase)], start_ordinal + 1))
    }

    pub(crate) fn like_condition(
        &self,
        raw_phrase: &str,
        dialect: Dialect,
        start_ordinal: usize,
    ) -> Option<(String, Vec<FilterValue>, usize)> {
        if self.indexed_columns.is_empty() {
            return None;
        }
        let normalized = self.normalize_phrase(raw_phrase)?;
        let tokens: Vec<&str> = normalized
            .split_whitespace()
            .map(|t| t.trim_end_matches('*'))
            .collect();

        let mut ordinal = start_ordinal;
        let mut binds = Vec::new();
        let mut token_fragments = Vec::with_capacity(tokens.len());
        for token in tokens {
            let pattern = format!("%{}%", escape_like_wildcards(token));
            let column_fragments: Vec<String> = self
                .indexed_columns
                .iter()
                .map(|column| {
                    let fragment =
                        format!("{column} LIKE {} ESCAPE '\\'", dialect.placeholder(ordinal));
                    ordinal += 1;
                    binds.push(FilterValue::Text(pattern.clone()));
                    fragment
                })
                .collect();
            if column_fragments.len() == 1 {
                token_fragments.push(column_fragments.join(" OR "));
            } else {
                token_fragments.push(format!("({})", column_fragments.join(" OR ")));
            }
        }

        Some((token_fragments.join(" AND "), binds, ordinal))
    }
}

/// Builds an FTS `MATCH` condition for `raw_phrase`.
///
/// Emits `id IN (SELECT id FROM <index> WHERE <index> MATCH ?N)` with
/// the normalized phrase as the single bind value. Returns `None` for an
/// empty or fully-stripped phrase: no condition means no filtering, not
/// a malformed query.
#[must_use]
pub fn build_fts_condition(
    raw_phrase: &str,
    config: &FtsConfig,
    dialect: Dialect,
    start_ordinal: usize,
) -> Option<(String, Vec<FilterValue>, usize)> {
    config.match_condition(raw_phrase, None, dialect, start_ordinal)
}

/// Builds a search condition, preferring the FTS index when available.
///
/// With `fts_available` false (index not yet built, or the engine lacks
/// FTS support) an equivalent `LIKE` scan over the configured indexed
/// columns is emitted instead, each token bound as `%token%` with
/// wildcard metacharacters escaped.
#[must_use]
pub fn build_with_fallback(
    raw_phrase: &str,
    config: &FtsConfig,
    fts_available: bool,
    dialect: Dialect,
    start_ordinal: usize,
) -> Option<(String, Vec<FilterValue>, usize)> {
    if fts_available {
        config.match_condition(raw_phrase, None, dialect, start_ordinal)
    } else {
        config.like_condition(raw_phrase, dialect, start_ordinal)
    }
}
