//! Publication use-case service.
//!
//! # Responsibility
//! - Serve the public section views (archive index, year archive, detail)
//!   through the access gate.
//! - Build sitemap entries and the admin overview.
//! - Run full validation before persisting editor changes.
//!
//! # Invariants
//! - Every read goes through one `AccessGate` built from one `RequestContext`,
//!   so a response never mixes two notions of "today".
//! - Hidden and missing records both surface as `ServiceError::NotFound`.
//! - Archive index pages may be empty; year archives may not.

use crate::model::record::{Record, RecordOverview, ValidationError};
use crate::model::status::{Status, StatusChoices};
use crate::publish::filter::{DateBucket, Visibility};
use crate::publish::gate::{AccessGate, NotFound, RequestContext, Section};
use crate::publish::lifecycle::SaveEffects;
use crate::publish::sitemap::{SitemapEntry, SitemapSection};
use crate::repo::record_repo::{RecordQuery, RecordRepository, RepoError};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use log::info;
use thiserror::Error;

/// Records per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

const DEMO_BODY: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do \
eiusmod tempor incididunt ut labore et dolore magna aliqua.";

/// Service error for publication use-cases.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Requested record, page or year is absent or hidden from the caller.
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Repo(#[source] RepoError),
}

impl From<NotFound> for ServiceError {
    fn from(_: NotFound) -> Self {
        Self::NotFound
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(_) => Self::NotFound,
            other => Self::Repo(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number.
    pub number: u32,
    pub num_pages: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}

/// Landing page of a section.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveIndex {
    pub page: Page<Record>,
    /// First day of every year with visible records, newest first.
    pub date_list: Vec<NaiveDate>,
}

/// Listing of one year of a section.
#[derive(Debug, Clone, PartialEq)]
pub struct YearArchive {
    pub year: i32,
    pub page: Page<Record>,
    /// First day of every month of `year` with visible records, newest first.
    pub date_list: Vec<NaiveDate>,
}

/// Publication service facade over repository implementations.
pub struct PublicationService<R: RecordRepository> {
    repo: R,
    page_size: u32,
}

impl<R: RecordRepository> PublicationService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Overrides the page size; zero falls back to the default.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size
        };
        self
    }

    pub fn choices(&self) -> &StatusChoices {
        self.repo.choices()
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Validates and persists an edited record, inserting it when new.
    ///
    /// # Errors
    /// - `Validation` when `Record::clean` fails; nothing is written.
    pub fn save(&self, record: &mut Record, now: DateTime<Utc>) -> ServiceResult<SaveEffects> {
        record.clean(self.repo.choices())?;
        let effects = match self.repo.get_record(record.id)? {
            Some(_) => self.repo.update_record(record, now)?,
            None => self.repo.create_record(record, now)?,
        };
        Ok(effects)
    }

    /// Editor lookup: any record by slug, regardless of visibility.
    pub fn get_for_edit(&self, slug: &str) -> ServiceResult<Record> {
        self.repo
            .find_by_slug(slug, &Visibility::All)?
            .ok_or(ServiceError::NotFound)
    }

    /// Moves a record to another declared status and saves it.
    pub fn set_status(
        &self,
        slug: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<(Record, SaveEffects)> {
        let status = self.repo.choices().get(token)?;
        let mut record = self.get_for_edit(slug)?;
        record.publication.status = status;
        let effects = self.save(&mut record, now)?;
        Ok((record, effects))
    }

    /// Section landing page: visible records by start date, newest first,
    /// plus the years that have visible records.
    pub fn archive_index(
        &self,
        ctx: &RequestContext,
        section: &Section,
        page_number: u32,
    ) -> ServiceResult<ArchiveIndex> {
        let gate = AccessGate::new(section, self.repo.choices(), ctx);
        let visibility = gate.visibility();

        let page = self.paginate(RecordQuery::new(visibility.clone()), page_number, true)?;
        let date_list = self
            .repo
            .date_buckets(&visibility, DateBucket::Year, None)?;

        info!(
            "event=archive_index module=service status=ok section={} viewer={} staff={} page={} items={} total={}",
            section.name,
            gate.viewer().label(),
            gate.viewer().is_staff,
            page.number,
            page.items.len(),
            page.total
        );
        Ok(ArchiveIndex { page, date_list })
    }

    /// Visible records starting in `year`; not-found when there are none.
    pub fn year_archive(
        &self,
        ctx: &RequestContext,
        section: &Section,
        year: i32,
        page_number: u32,
    ) -> ServiceResult<YearArchive> {
        let gate = AccessGate::new(section, self.repo.choices(), ctx);
        let visibility = gate.visibility();

        let query = RecordQuery::new(visibility.clone()).in_year(year);
        let page = self.paginate(query, page_number, false)?;
        let date_list = self
            .repo
            .date_buckets(&visibility, DateBucket::Month, Some(year))?;

        info!(
            "event=year_archive module=service status=ok section={} viewer={} staff={} year={} items={} total={}",
            section.name,
            gate.viewer().label(),
            gate.viewer().is_staff,
            year,
            page.items.len(),
            page.total
        );
        Ok(YearArchive {
            year,
            page,
            date_list,
        })
    }

    /// Years with visible records, newest first.
    pub fn date_list(&self, ctx: &RequestContext, section: &Section) -> ServiceResult<Vec<i32>> {
        let gate = AccessGate::new(section, self.repo.choices(), ctx);
        let buckets = self
            .repo
            .date_buckets(&gate.visibility(), DateBucket::Year, None)?;
        Ok(buckets.iter().map(Datelike::year).collect())
    }

    /// Detail page of one record in a section.
    pub fn detail(
        &self,
        ctx: &RequestContext,
        section: &Section,
        slug: &str,
    ) -> ServiceResult<Record> {
        let gate = AccessGate::new(section, self.repo.choices(), ctx);
        let found = self.repo.find_by_slug(slug, &gate.visibility())?;
        Ok(gate.admit(found)?)
    }

    /// Sitemap entries of a section, newest start date first.
    pub fn sitemap(&self, section: &Section, today: NaiveDate) -> ServiceResult<Vec<SitemapEntry>> {
        let feed = SitemapSection::new(section, today);
        let records = self.repo.list_records(&RecordQuery::new(feed.visibility()))?;
        let entries = feed.entries(&records);
        info!(
            "event=sitemap_build module=service status=ok section={} entries={}",
            section.name,
            entries.len()
        );
        Ok(entries)
    }

    /// Admin list: every record, newest start date first, with the live flag
    /// computed for `section`.
    pub fn admin_list(
        &self,
        section: &Section,
        today: NaiveDate,
    ) -> ServiceResult<Vec<RecordOverview>> {
        let records = self.repo.list_records(&RecordQuery::new(Visibility::All))?;
        let choices = self.repo.choices();
        Ok(records
            .iter()
            .map(|record| record.overview(choices, &section.allowed, today))
            .collect())
    }

    /// Replaces every record with demo articles dated 1-14 December 2011 and
    /// 1-14 January 2012, all published.
    pub fn seed_demo_records(&self, now: DateTime<Utc>) -> ServiceResult<usize> {
        let published = self.repo.choices().get(Status::published().as_str())?;
        let deleted = self.repo.delete_all()?;

        let mut created = 0usize;
        for (year, month) in [(2011, 12), (2012, 1)] {
            for day in 1..=14 {
                created += 1;
                let name = format!("article{created:03}");
                let mut record = Record::new(name.clone(), name, self.repo.choices(), now)?
                    .with_body(DEMO_BODY);
                record.publication.status = published.clone();
                record.publication.start = NaiveDate::from_ymd_opt(year, month, day);
                let created_at = Utc
                    .with_ymd_and_hms(year, month, day, 9, 0, 0)
                    .single()
                    .unwrap_or(now);
                self.repo.create_record(&mut record, created_at)?;
            }
        }

        info!(
            "event=seed_demo module=service status=ok deleted={deleted} created={created}"
        );
        Ok(created)
    }

    fn paginate(
        &self,
        query: RecordQuery,
        page_number: u32,
        allow_empty: bool,
    ) -> ServiceResult<Page<Record>> {
        let total = self.repo.count_records(&query)?;
        if total == 0 && !allow_empty {
            return Err(ServiceError::NotFound);
        }

        let page_size = u64::from(self.page_size);
        let num_pages = u32::try_from(total.div_ceil(page_size).max(1)).unwrap_or(u32::MAX);
        if page_number == 0 || page_number > num_pages {
            return Err(ServiceError::NotFound);
        }

        let offset = (page_number - 1).saturating_mul(self.page_size);
        let items = self
            .repo
            .list_records(&query.page(self.page_size, offset))?;
        Ok(Page {
            items,
            number: page_number,
            num_pages,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Page;

    #[test]
    fn page_navigation_flags() {
        let page = Page::<u8> {
            items: Vec::new(),
            number: 1,
            num_pages: 1,
            total: 0,
        };
        assert!(!page.has_next());
        assert!(!page.has_previous());

        let middle = Page::<u8> {
            items: Vec::new(),
            number: 2,
            num_pages: 3,
            total: 45,
        };
        assert!(middle.has_next());
        assert!(middle.has_previous());
    }
}
