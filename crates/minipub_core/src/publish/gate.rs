//! Access gate for public sections.
//!
//! # Responsibility
//! - Decide the record visibility of one caller in one section.
//! - Turn "hidden" into the same not-found outcome as "missing".
//!
//! # Invariants
//! - Non-staff callers only ever see records live for the section.
//! - Staff callers see the section's statuses plus the initial draft status,
//!   whatever their dates; in the plain draft/published model that is every
//!   record.
//! - `today` is taken once per request from `RequestContext`.

use crate::model::record::Record;
use crate::model::status::{AllowedStatuses, StatusChoices};
use crate::publish::filter::Visibility;
use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity of the caller as provided by the request layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: Option<String>,
    pub is_staff: bool,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            is_staff: false,
        }
    }

    pub fn staff(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            is_staff: true,
        }
    }

    /// Identifier used in log events; `anonymous` when there is none.
    pub fn label(&self) -> &str {
        self.user_id.as_deref().unwrap_or("anonymous")
    }
}

/// Per-request inputs: who is asking, and the single "now" used for every
/// evaluation made while answering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub viewer: Viewer,
    pub now: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(viewer: Viewer, now: DateTime<Utc>) -> Self {
        Self { viewer, now }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

/// A public area of the site backed by a set of live statuses, e.g. `news`
/// over `{published}` and `archives` over `{archived}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    #[serde(default)]
    pub allowed: AllowedStatuses,
    /// URL path under which detail pages live, e.g. `/news/`.
    #[serde(default)]
    pub path_prefix: String,
}

impl Section {
    pub fn new(name: impl Into<String>, allowed: AllowedStatuses) -> Self {
        let name = name.into();
        let path_prefix = format!("/{name}/");
        Self {
            name,
            allowed,
            path_prefix,
        }
    }

    pub fn with_path_prefix(mut self, path_prefix: impl Into<String>) -> Self {
        self.path_prefix = path_prefix.into();
        self
    }

    /// Detail page path of `slug` in this section.
    pub fn location(&self, slug: &str) -> String {
        let prefix = if self.path_prefix.is_empty() {
            format!("/{}/", self.name)
        } else {
            self.path_prefix.clone()
        };
        let separator = if prefix.ends_with('/') { "" } else { "/" };
        format!("{prefix}{separator}{slug}/")
    }
}

/// Generic not-found outcome; carries nothing about why.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("not found")]
pub struct NotFound;

/// Visibility decisions for one caller in one section.
#[derive(Debug, Clone)]
pub struct AccessGate<'a> {
    section: &'a Section,
    choices: &'a StatusChoices,
    viewer: Viewer,
    today: NaiveDate,
}

impl<'a> AccessGate<'a> {
    pub fn new(section: &'a Section, choices: &'a StatusChoices, ctx: &RequestContext) -> Self {
        Self {
            section,
            choices,
            viewer: ctx.viewer.clone(),
            today: ctx.today(),
        }
    }

    pub fn section(&self) -> &Section {
        self.section
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    /// Filter applied to every collection and lookup made for this caller.
    pub fn visibility(&self) -> Visibility {
        if !self.viewer.is_staff {
            return Visibility::live(self.section.allowed.clone(), self.today);
        }

        let staff_statuses = self.section.allowed.with(self.choices.initial());
        if self.choices.is_covered_by(&staff_statuses) {
            Visibility::All
        } else {
            Visibility::StatusIn(staff_statuses)
        }
    }

    /// Admits one looked-up record, mapping both "absent" and "hidden" to
    /// `NotFound`.
    pub fn admit(&self, record: Option<Record>) -> Result<Record, NotFound> {
        let admitted = record.filter(|record| self.visibility().admits(&record.publication));
        debug!(
            "event=gate_decision module=publish status=ok section={} viewer={} staff={} outcome={}",
            self.section.name,
            self.viewer.label(),
            self.viewer.is_staff,
            if admitted.is_some() {
                "admitted"
            } else {
                "not_found"
            }
        );
        admitted.ok_or(NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessGate, NotFound, RequestContext, Section, Viewer};
    use crate::model::record::Record;
    use crate::model::status::{AllowedStatuses, Status, StatusChoices};
    use crate::publish::filter::Visibility;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn ctx(viewer: Viewer) -> RequestContext {
        RequestContext::new(viewer, Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap())
    }

    fn extended() -> StatusChoices {
        StatusChoices::new(["draft", "published", "archived"]).unwrap()
    }

    fn record_with(status: &str, choices: &StatusChoices) -> Record {
        let mut record = Record::new("Title", "title", choices, Utc::now()).unwrap();
        record.publication.status = Status::parse(status).unwrap();
        record
    }

    #[test]
    fn anonymous_callers_get_live_filter() {
        let section = Section::new("news", AllowedStatuses::published());
        let choices = StatusChoices::default();
        let gate = AccessGate::new(&section, &choices, &ctx(Viewer::anonymous()));
        assert_eq!(
            gate.visibility(),
            Visibility::live(
                AllowedStatuses::published(),
                NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
            )
        );
    }

    #[test]
    fn staff_see_everything_in_simple_model() {
        let section = Section::new("news", AllowedStatuses::published());
        let choices = StatusChoices::default();
        let gate = AccessGate::new(&section, &choices, &ctx(Viewer::staff("john.doe")));
        assert_eq!(gate.visibility(), Visibility::All);
    }

    #[test]
    fn staff_see_section_statuses_plus_draft_in_extended_model() {
        let choices = extended();
        let archives = Section::new("archives", AllowedStatuses::new(["archived"]).unwrap());
        let gate = AccessGate::new(&archives, &choices, &ctx(Viewer::staff("john.doe")));

        assert!(gate.admit(Some(record_with("draft", &choices))).is_ok());
        assert!(gate.admit(Some(record_with("archived", &choices))).is_ok());
        assert_eq!(
            gate.admit(Some(record_with("published", &choices))).unwrap_err(),
            NotFound
        );
    }

    #[test]
    fn non_staff_get_not_found_for_drafts_and_missing_records() {
        let choices = StatusChoices::default();
        let section = Section::new("news", AllowedStatuses::published());
        let gate = AccessGate::new(&section, &choices, &ctx(Viewer::user("jane")));

        assert_eq!(gate.admit(None).unwrap_err(), NotFound);
        assert_eq!(
            gate.admit(Some(record_with("draft", &choices))).unwrap_err(),
            NotFound
        );
        assert!(gate
            .admit(Some(record_with("published", &choices)))
            .is_ok());
    }

    #[test]
    fn gate_keeps_the_caller_identity() {
        let section = Section::new("news", AllowedStatuses::published());
        let choices = StatusChoices::default();

        let gate = AccessGate::new(&section, &choices, &ctx(Viewer::staff("john.doe")));
        assert_eq!(gate.viewer().label(), "john.doe");
        assert!(gate.viewer().is_staff);

        let gate = AccessGate::new(&section, &choices, &ctx(Viewer::anonymous()));
        assert_eq!(gate.viewer().label(), "anonymous");
        assert_eq!(gate.viewer().user_id, None);
    }

    #[test]
    fn section_location_joins_prefix_and_slug() {
        let section = Section::new("news", AllowedStatuses::published());
        assert_eq!(section.location("article-2"), "/news/article-2/");

        let archived = Section::new("archives", AllowedStatuses::new(["archived"]).unwrap())
            .with_path_prefix("/news_with_archive/archived");
        assert_eq!(
            archived.location("article-3"),
            "/news_with_archive/archived/article-3/"
        );
    }
}
