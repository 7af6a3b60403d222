//! Pagination primitives: clamped offset paging and opaque keyset
//! cursors.
//!
//! Offset pagination costs grow with page depth in the underlying
//! engine; keyset (cursor) pagination seeks directly past the last seen
//! sort key and stays O(`per_page`) regardless of depth. Callers paging
//! deep into large tables should prefer cursors.

use super::filter::FilterValue;
use crate::{Error, Result};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sort direction for ORDER BY and keyset predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl SortDirection {
    /// Returns the direction as a lowercase string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// The SQL keyword for this direction.
    #[must_use]
    pub const fn sql_keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// The row-comparison operator that seeks past a boundary row.
    #[must_use]
    pub(crate) const fn seek_operator(&self) -> &'static str {
        match self {
            Self::Asc => ">",
            Self::Desc => "<",
        }
    }

    /// Parses a direction from a string.
    ///
    /// Unrecognized input yields `None`; a free-form direction string is
    /// never interpolated into SQL.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }

    /// Returns the opposite direction.
    #[must_use]
    pub const fn reversed(&self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configured bounds for `per_page`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLimits {
    /// Smallest allowed page size.
    pub min_per_page: u32,
    /// Largest allowed page size.
    pub max_per_page: u32,
}

impl PageLimits {
    /// Creates limits with the given bounds.
    #[must_use]
    pub const fn new(min_per_page: u32, max_per_page: u32) -> Self {
        Self {
            min_per_page,
            max_per_page,
        }
    }

    /// Clamps a requested page size into the configured range.
    #[must_use]
    pub const fn clamp(&self, per_page: u32) -> u32 {
        if per_page < self.min_per_page {
            self.min_per_page
        } else if per_page > self.max_per_page {
            self.max_per_page
        } else {
            per_page
        }
    }
}

impl Default for PageLimits {
    /// 1 to 100 rows per page.
    fn default() -> Self {
        Self::new(1, 100)
    }
}

/// An offset-model page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    /// Requested rows per page (clamped by [`PageLimits`]).
    pub per_page: u32,
}

impl PageRequest {
    /// Creates a page request; a page of 0 is treated as page 1.
    #[must_use]
    pub const fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: if page == 0 { 1 } else { page },
            per_page,
        }
    }

    /// Returns a copy with `per_page` clamped into `limits`.
    #[must_use]
    pub const fn clamped(self, limits: PageLimits) -> Self {
        Self {
            page: self.page,
            per_page: limits.clamp(self.per_page),
        }
    }

    /// Number of rows to skip: `(page - 1) * per_page`.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        // Tolerate a literal page of 0 from direct struct construction
        let page = if self.page == 0 { 1 } else { self.page };
        (page as u64 - 1) * self.per_page as u64
    }
}

/// Computed pagination metadata for an offset-model response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// 1-based page number.
    pub page: u32,
    /// Effective rows per page.
    pub per_page: u32,
    /// Total matching rows.
    pub total: u64,
    /// Total pages: `ceil(total / per_page)`.
    pub total_pages: u64,
    /// Whether a later page exists.
    pub has_next: bool,
    /// Whether an earlier page exists.
    pub has_prev: bool,
}

impl PageInfo {
    /// Computes page metadata from a request and a total row count.
    #[must_use]
    pub const fn compute(request: PageRequest, total: u64) -> Self {
        let per_page = if request.per_page == 0 {
            1
        } else {
            request.per_page
        };
        let total_pages = total.div_ceil(per_page as u64);
        Self {
            page: request.page,
            per_page,
            total,
            total_pages,
            has_next: (request.page as u64) < total_pages,
            has_prev: request.page > 1,
        }
    }
}

/// An opaque keyset-pagination cursor.
///
/// The cursor encodes the last-seen row's sort-key values (in `ORDER BY`
/// column order) followed by its id, as a base64 JSON array. The token is
/// opaque to callers; a tampered or truncated token fails to decode with
/// [`Error::InvalidCursor`] rather than silently selecting a different
/// result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    keys: Vec<FilterValue>,
}

impl Cursor {
    /// Creates a cursor from the last row's sort-key values plus id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursor`] if `keys` is empty or contains a
    /// non-scalar entry.
    pub fn new(keys: Vec<FilterValue>) -> Result<Self> {
        if keys.is_empty() {
            return Err(Error::InvalidCursor {
                reason: "cursor requires at least one sort key".to_string(),
            });
        }
        if keys.iter().any(|k| !k.is_scalar() || *k == FilterValue::Null) {
            return Err(Error::InvalidCursor {
                reason: "cursor keys must be non-null scalars".to_string(),
            });
        }
        Ok(Self { keys })
    }

    /// The decoded sort-key values, in `ORDER BY` column order.
    #[must_use]
    pub fn keys(&self) -> &[FilterValue] {
        &self.keys
    }

    /// Number of sort-key values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false for a constructed cursor.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Encodes the cursor as an opaque token.
    #[must_use]
    pub fn encode(&self) -> String {
        // Scalars only (enforced in new), so serialization cannot fail
        let payload = serde_json::to_vec(&self.keys).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(payload)
    }

    /// Decodes an opaque token back into a cursor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursor`] when the token is not valid
    /// base64, not a JSON array, empty, or contains non-scalar entries.
    pub fn decode(token: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|_| Error::InvalidCursor {
            reason: "token is not valid base64".to_string(),
        })?;
        let keys: Vec<FilterValue> =
            serde_json::from_slice(&bytes).map_err(|_| Error::InvalidCursor {
                reason: "token payload is not a key array".to_string(),
            })?;
        Self::new(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;

    #[test]
    fn test_direction_parse() {
        assert_eq!(SortDirection::parse("ASC"), Some(SortDirection::Asc));
        assert_eq!(SortDirection::parse("descending"), Some(SortDirection::Desc));
        assert_eq!(SortDirection::parse("sideways"), None);
        assert_eq!(SortDirection::Asc.sql_keyword(), "ASC");
        assert_eq!(SortDirection::Desc.reversed(), SortDirection::Asc);
    }

    #[test]
    fn test_page_request_offset() {
        assert_eq!(PageRequest::new(1, 25).offset(), 0);
        assert_eq!(PageRequest::new(4, 25).offset(), 75);
        // Page 0 is normalized to page 1
        assert_eq!(PageRequest::new(0, 25).offset(), 0);
    }

    #[test]
    fn test_per_page_clamping() {
        let limits = PageLimits::default();
        assert_eq!(PageRequest::new(1, 10_000).clamped(limits).per_page, 100);
        assert_eq!(PageRequest::new(1, 0).clamped(limits).per_page, 1);
        assert_eq!(PageRequest::new(1, 50).clamped(limits).per_page, 50);
    }

    #[test]
    fn test_page_info_compute() {
        let info = PageInfo::compute(PageRequest::new(2, 25), 60);
        assert_eq!(info.total_pages, 3);
        assert!(info.has_next);
        assert!(info.has_prev);

        let first = PageInfo::compute(PageRequest::new(1, 25), 60);
        assert!(!first.has_prev);

        let last = PageInfo::compute(PageRequest::new(3, 25), 60);
        assert!(!last.has_next);

        let empty = PageInfo::compute(PageRequest::new(1, 25), 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
    }

    #[test]
    fn test_cursor_roundtrip() {
        let cursor = Cursor::new(vec![
            FilterValue::Text("acetone".to_string()),
            FilterValue::Integer(812),
        ])
        .unwrap();
        let token = cursor.encode();
        let decoded = Cursor::decode(&token).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn test_cursor_rejects_tampered_token() {
        let cursor = Cursor::new(vec![FilterValue::Integer(7)]).unwrap();
        let mut token = cursor.encode();
        token.push('!');
        assert!(matches!(
            Cursor::decode(&token),
            Err(Error::InvalidCursor { .. })
        ));
    }

    #[test]
    fn test_cursor_rejects_non_array_payload() {
        let token = URL_SAFE_NO_PAD.encode(b"{\"page\": 2}");
        assert!(matches!(
            Cursor::decode(&token),
            Err(Error::InvalidCursor { .. })
        ));
    }

    #[test]
    fn test_cursor_rejects_nested_list() {
        let result = Cursor::new(vec![FilterValue::List(vec![FilterValue::Integer(1)])]);
        assert!(matches!(result, Err(Error::InvalidCursor { .. })));
    }

    #[test]
    fn test_cursor_rejects_empty() {
        assert!(Cursor::new(Vec::new()).is_err());
        assert!(Cursor::decode(&URL_SAFE_NO_PAD.encode(b"[]")).is_err());
    }
}
