//! Declarative record filters.
//!
//! # Responsibility
//! - Express which records a caller may see as a value (`Visibility`).
//! - Compile that value into a SQL `WHERE` fragment so filtering runs inside
//!   the storage engine instead of over loaded rows.
//!
//! # Invariants
//! - For every record, `Visibility::Live` compiled to SQL selects the record
//!   iff `liveness::is_live` returns true for it.
//! - Dates bind as ISO-8601 text; lexicographic and calendar order agree
//!   because only four-digit years are ever stored or bound.

use crate::model::record::{Publication, FIRST_STORABLE_YEAR, LAST_STORABLE_YEAR};
use crate::model::status::AllowedStatuses;
use crate::publish::liveness;
use chrono::{Datelike, NaiveDate};
use rusqlite::types::Value;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Which records a query may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// Every record regardless of status or dates.
    All,
    /// Records whose status is in the set, regardless of dates.
    StatusIn(AllowedStatuses),
    /// Records that are live on `today` for the given statuses.
    Live {
        allowed: AllowedStatuses,
        today: NaiveDate,
    },
}

impl Visibility {
    pub fn live(allowed: AllowedStatuses, today: NaiveDate) -> Self {
        Self::Live { allowed, today }
    }

    /// Evaluates the filter on one in-memory record.
    pub fn admits(&self, publication: &Publication) -> bool {
        match self {
            Self::All => true,
            Self::StatusIn(allowed) => allowed.contains(&publication.status),
            Self::Live { allowed, today } => liveness::is_live(
                &publication.status,
                publication.start,
                publication.end,
                allowed,
                *today,
            ),
        }
    }

    /// Compiles the filter to a `WHERE` fragment over the `records` table.
    pub(crate) fn to_sql(&self) -> SqlFilter {
        match self {
            Self::All => SqlFilter {
                clause: "1 = 1".to_string(),
                binds: Vec::new(),
            },
            Self::StatusIn(allowed) => status_in(allowed),
            Self::Live { allowed, today } => {
                let mut filter = status_in(allowed);
                // Stored dates lie within the storable years, so a day past
                // either edge decides the date checks without a bind.
                if today.year() > LAST_STORABLE_YEAR {
                    filter.clause.push_str(" AND end_date IS NULL");
                } else if today.year() < FIRST_STORABLE_YEAR {
                    filter.clause.push_str(" AND start_date IS NULL");
                } else {
                    let today = date_to_db(*today);
                    filter
                        .clause
                        .push_str(" AND (start_date IS NULL OR start_date <= ?)");
                    filter.binds.push(Value::Text(today.clone()));
                    filter
                        .clause
                        .push_str(" AND (end_date IS NULL OR end_date >= ?)");
                    filter.binds.push(Value::Text(today));
                }
                filter
            }
        }
    }
}

/// SQL fragment with positional `?` placeholders and their values.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SqlFilter {
    pub clause: String,
    pub binds: Vec<Value>,
}

fn status_in(allowed: &AllowedStatuses) -> SqlFilter {
    let placeholders = vec!["?"; allowed.len()].join(", ");
    SqlFilter {
        clause: format!("status IN ({placeholders})"),
        binds: allowed
            .iter()
            .map(|status| Value::Text(status.to_string()))
            .collect(),
    }
}

/// Granularity of the distinct start-date buckets used by archive navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBucket {
    /// First day of each year that has records.
    Year,
    /// First day of each month that has records.
    Month,
}

impl DateBucket {
    pub(crate) fn sql_expr(self) -> &'static str {
        match self {
            Self::Year => "strftime('%Y-01-01', start_date)",
            Self::Month => "strftime('%Y-%m-01', start_date)",
        }
    }
}

pub(crate) fn date_to_db(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// First and last storable day of `year`, or `None` when no stored date can
/// fall in it.
pub(crate) fn storable_year_bounds(year: i32) -> Option<(NaiveDate, NaiveDate)> {
    if !(FIRST_STORABLE_YEAR..=LAST_STORABLE_YEAR).contains(&year) {
        return None;
    }
    Some((
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}

pub(crate) fn date_from_db(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}
