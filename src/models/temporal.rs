//! Date-range and time-slot helpers.
//!
//! Both types normalize into ordinary [`Filter`] predicates, so callers
//! that accept "received between X and Y" or "audited during the morning
//! slot" UI inputs get the same whitelist validation and parameterized
//! rendering as any other filter.

use super::filter::{Filter, FilterOperator, FilterValue};
use crate::{Error, Result};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A UTC date/time range with optionally open ends.
///
/// The closed-interval invariant `from <= to` is checked at
/// construction; an inverted range is a validation error, never silently
/// swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Inclusive lower bound, `None` for an open start.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound, `None` for an open end.
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Creates a range bounded on both ends.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvertedRange`] when `from > to`.
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        if from > to {
            return Err(Error::InvertedRange {
                from: from.to_rfc3339(),
                to: to.to_rfc3339(),
            });
        }
        Ok(Self {
            from: Some(from),
            to: Some(to),
        })
    }

    /// Creates a range open on the upper end.
    #[must_use]
    pub const fn starting(from: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }

    /// Creates a range open on the lower end.
    #[must_use]
    pub const fn until(to: DateTime<Utc>) -> Self {
        Self {
            from: None,
            to: Some(to),
        }
    }

    /// Returns true when both ends are open.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Returns true when `ts` falls inside the range (inclusive bounds).
    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| ts >= from) && self.to.is_none_or(|to| ts <= to)
    }

    /// Converts the range into a predicate on `field`.
    ///
    /// Both bounds become `Between`; one bound becomes `Gte`/`Lte`; an
    /// unbounded range yields no predicate.
    #[must_use]
    pub fn into_filter(self, field: impl Into<String>) -> Option<Filter> {
        match (self.from, self.to) {
            (Some(from), Some(to)) => Some(Filter::new(
                field,
                FilterOperator::Between,
                FilterValue::List(vec![
                    FilterValue::Timestamp(from),
                    FilterValue::Timestamp(to),
                ]),
            )),
            (Some(from), None) => Some(Filter::new(
                field,
                FilterOperator::Gte,
                FilterValue::Timestamp(from),
            )),
            (None, Some(to)) => Some(Filter::new(
                field,
                FilterOperator::Lte,
                FilterValue::Timestamp(to),
            )),
            (None, None) => None,
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.from, self.to) {
            (None, None) => write!(f, "(open)"),
            (Some(from), None) => write!(f, "[{}, ...]", from.to_rfc3339()),
            (None, Some(to)) => write!(f, "[..., {}]", to.to_rfc3339()),
            (Some(from), Some(to)) => {
                write!(f, "[{}, {}]", from.to_rfc3339(), to.to_rfc3339())
            },
        }
    }
}

/// A same-day time-of-day slot, e.g. a delivery or audit window.
///
/// Converts to a `Between` predicate over a `TIME`-typed text column
/// (`HH:MM:SS` sorts lexicographically in that encoding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeSlot {
    /// Creates a slot running from `start` to `end` within one day.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvertedRange`] when `start > end`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if start > end {
            return Err(Error::InvertedRange {
                from: start.format("%H:%M:%S").to_string(),
                to: end.format("%H:%M:%S").to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Slot start.
    #[must_use]
    pub const fn start(&self) -> NaiveTime {
        self.start
    }

    /// Slot end.
    #[must_use]
    pub const fn end(&self) -> NaiveTime {
        self.end
    }

    /// Returns true when `t` falls inside the slot (inclusive bounds).
    #[must_use]
    pub fn contains(&self, t: NaiveTime) -> bool {
        t >= self.start && t <= self.end
    }

    /// Converts the slot into a `Between` predicate on `field`.
    #[must_use]
    pub fn into_filter(self, field: impl Into<String>) -> Filter {
        Filter::new(
            field,
            FilterOperator::Between,
            FilterValue::List(vec![
                FilterValue::Text(self.start.format("%H:%M:%S").to_string()),
                FilterValue::Text(self.end.format("%H:%M:%S").to_string()),
            ]),
        )
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%H:%M:%S"),
            self.end.format("%H:%M:%S")
        )
    }
}
