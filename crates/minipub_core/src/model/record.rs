//! Publishable record domain model.
//!
//! # Responsibility
//! - Define the record shape shared by every publishing section.
//! - Compose publication state, timestamp metadata and SEO metadata as
//!   separate parts of one record.
//! - Provide explicit full validation (`clean`).
//!
//! # Invariants
//! - `start <= end` when both are set; violations surface from `clean`, they
//!   are never corrected silently.
//! - Timestamps are maintained by the save path and are read-only to callers.
//! - Liveness is never stored; it is recomputed against a caller-supplied day.

use crate::model::status::{AllowedStatuses, Status, StatusChoices};
use crate::publish::liveness;
use chrono::{DateTime, Datelike, NaiveDate, SubsecRound, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w-]+$").expect("valid slug regex"));

/// Publication dates are stored as `YYYY-MM-DD` text, which only sorts in
/// calendar order for four-digit years.
pub const FIRST_STORABLE_YEAR: i32 = 0;
pub const LAST_STORABLE_YEAR: i32 = 9999;

/// Stable identifier of a publishable record.
pub type RecordId = Uuid;

/// Validation failures raised by explicit validation steps.
///
/// Messages of `EndBeforeStart` and `PriorityOutOfRange` are fixed and shown
/// to editors verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("The end date cannot be before the start date.")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
    #[error("Please enter a number between 0 and 1")]
    PriorityOutOfRange(f64),
    #[error("unknown status `{0}`")]
    UnknownStatus(String),
    #[error("invalid status token `{0}`; expected [a-z][a-z0-9_]*")]
    InvalidStatusToken(String),
    #[error("status `{0}` is declared more than once")]
    DuplicateStatus(String),
    #[error("at least one status must be declared")]
    EmptyStatusChoices,
    #[error("allowed statuses cannot be empty")]
    EmptyAllowedStatuses,
    #[error("title must not be blank")]
    EmptyTitle,
    #[error("invalid slug `{0}`; use letters, digits, underscores or hyphens")]
    InvalidSlug(String),
    #[error("date {0} is outside the supported years 0000-9999")]
    DateOutOfRange(NaiveDate),
}

/// Sitemap priority in the closed interval `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Priority(f64);

impl Priority {
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ValidationError::PriorityOutOfRange(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Priority {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Priority> for f64 {
    fn from(value: Priority) -> Self {
        value.0
    }
}

/// Publication controls editors set on a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub status: Status,
    /// Visible from this day (inclusive). Filled on first non-draft save.
    pub start: Option<NaiveDate>,
    /// Visible until this day (inclusive).
    pub end: Option<NaiveDate>,
}

impl Publication {
    /// Draft state with no date bounds.
    pub fn new(status: Status) -> Self {
        Self {
            status,
            start: None,
            end: None,
        }
    }

    pub fn is_live(&self, allowed: &AllowedStatuses, today: NaiveDate) -> bool {
        liveness::is_live(&self.status, self.start, self.end, allowed, today)
    }

    /// Checks that both bounds fit the stored date format.
    pub fn validate_storable(&self) -> Result<(), ValidationError> {
        for date in [self.start, self.end].into_iter().flatten() {
            if !(FIRST_STORABLE_YEAR..=LAST_STORABLE_YEAR).contains(&date.year()) {
                return Err(ValidationError::DateOutOfRange(date));
            }
        }
        Ok(())
    }

    /// Checks the start/end ordering.
    pub fn validate_dates(&self) -> Result<(), ValidationError> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(ValidationError::EndBeforeStart { start, end });
            }
        }
        Ok(())
    }
}

/// Timestamps maintained by the save path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
    status_changed: DateTime<Utc>,
}

impl Timestamps {
    /// Timestamps are kept at millisecond precision, the precision they are
    /// stored with.
    pub(crate) fn new(now: DateTime<Utc>) -> Self {
        let now = now.trunc_subsecs(3);
        Self {
            created: now,
            modified: now,
            status_changed: now,
        }
    }

    pub(crate) fn from_parts(
        created: DateTime<Utc>,
        modified: DateTime<Utc>,
        status_changed: DateTime<Utc>,
    ) -> Self {
        Self {
            created,
            modified,
            status_changed,
        }
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>, status_changed: bool) {
        let now = now.trunc_subsecs(3);
        self.modified = now;
        if status_changed {
            self.status_changed = now;
        }
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    pub fn status_changed(&self) -> DateTime<Utc> {
        self.status_changed
    }
}

/// Search-engine metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeoMeta {
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub sitemap_priority: Option<Priority>,
}

/// A date-bounded, status-gated piece of content such as a news article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub title: String,
    /// URL identifier, unique across records.
    pub slug: String,
    pub body: String,
    pub publication: Publication,
    pub(crate) timestamps: Timestamps,
    pub seo: SeoMeta,
}

impl Record {
    /// Creates an unsaved record in the initial status of `choices`.
    ///
    /// # Errors
    /// - `EmptyTitle` when `title` is blank.
    /// - `InvalidSlug` when `slug` is not URL-safe.
    pub fn new(
        title: impl Into<String>,
        slug: impl Into<String>,
        choices: &StatusChoices,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let record = Self {
            id: Uuid::new_v4(),
            title: title.into(),
            slug: slug.into(),
            body: String::new(),
            publication: Publication::new(choices.initial().clone()),
            timestamps: Timestamps::new(now),
            seo: SeoMeta::default(),
        };
        record.validate_identity()?;
        Ok(record)
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> &Status {
        &self.publication.status
    }

    pub fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }

    /// Instance form of the liveness predicate.
    pub fn is_live(&self, allowed: &AllowedStatuses, today: NaiveDate) -> bool {
        self.publication.is_live(allowed, today)
    }

    /// True when the record is still in the draft-equivalent state, i.e. a
    /// staff member looking at it is previewing it.
    pub fn staff_preview(&self, choices: &StatusChoices) -> bool {
        choices.is_initial(&self.publication.status)
    }

    /// Full validation. Callers run this explicitly before persisting edits.
    pub fn clean(&self, choices: &StatusChoices) -> Result<(), ValidationError> {
        self.validate_persistable(choices)?;
        self.publication.validate_dates()
    }

    /// Checks required for any write, independent of date ordering.
    pub(crate) fn validate_persistable(
        &self,
        choices: &StatusChoices,
    ) -> Result<(), ValidationError> {
        self.validate_identity()?;
        if !choices.contains(&self.publication.status) {
            return Err(ValidationError::UnknownStatus(
                self.publication.status.to_string(),
            ));
        }
        self.publication.validate_storable()
    }

    fn validate_identity(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if !SLUG_RE.is_match(&self.slug) {
            return Err(ValidationError::InvalidSlug(self.slug.clone()));
        }
        Ok(())
    }

    /// Admin-facing projection with derived read-only fields.
    pub fn overview(
        &self,
        choices: &StatusChoices,
        allowed: &AllowedStatuses,
        today: NaiveDate,
    ) -> RecordOverview {
        RecordOverview {
            id: self.id,
            title: self.title.clone(),
            slug: self.slug.clone(),
            status: self.publication.status.clone(),
            start: self.publication.start,
            end: self.publication.end,
            sitemap_priority: self.seo.sitemap_priority,
            created: self.timestamps.created,
            modified: self.timestamps.modified,
            status_changed: self.timestamps.status_changed,
            live: self.is_live(allowed, today),
            staff_preview: self.staff_preview(choices),
        }
    }
}

/// Admin list row: editable publication fields plus derived read-only ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordOverview {
    pub id: RecordId,
    pub title: String,
    pub slug: String,
    pub status: Status,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub sitemap_priority: Option<Priority>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub status_changed: DateTime<Utc>,
    pub live: bool,
    pub staff_preview: bool,
}
