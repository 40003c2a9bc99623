//! Sitemap feed entries for one section.
//!
//! # Invariants
//! - Sitemap generation has no authenticated caller: membership is always the
//!   live filter of the section's statuses, never a staff view.
//! - Entries are ordered by start date, newest first.

use crate::model::record::{Priority, Record, RecordId};
use crate::publish::filter::Visibility;
use crate::publish::gate::Section;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// One `<url>` of a sitemap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SitemapEntry {
    pub id: RecordId,
    pub slug: String,
    /// Path of the record's detail page in this section.
    pub location: String,
    pub lastmod: DateTime<Utc>,
    pub priority: Option<Priority>,
}

/// Builds entries for a section from records the storage layer returned.
pub struct SitemapSection<'a> {
    section: &'a Section,
    today: NaiveDate,
}

impl<'a> SitemapSection<'a> {
    pub fn new(section: &'a Section, today: NaiveDate) -> Self {
        Self { section, today }
    }

    /// Filter handed to the storage layer.
    pub fn visibility(&self) -> Visibility {
        Visibility::live(self.section.allowed.clone(), self.today)
    }

    pub fn entry(&self, record: &Record) -> SitemapEntry {
        SitemapEntry {
            id: record.id,
            slug: record.slug.clone(),
            location: self.section.location(&record.slug),
            lastmod: record.timestamps().modified(),
            priority: record.seo.sitemap_priority,
        }
    }

    /// Maps records to entries, dropping any the section does not admit.
    pub fn entries<'r, I>(&self, records: I) -> Vec<SitemapEntry>
    where
        I: IntoIterator<Item = &'r Record>,
    {
        let visibility = self.visibility();
        records
            .into_iter()
            .filter(|record| visibility.admits(&record.publication))
            .map(|record| self.entry(record))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::SitemapSection;
    use crate::model::record::{Priority, Record};
    use crate::model::status::{AllowedStatuses, Status, StatusChoices};
    use crate::publish::gate::Section;
    use chrono::{TimeZone, Utc};

    #[test]
    fn published_and_archived_feeds_are_disjoint() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let choices = StatusChoices::new(["draft", "published", "archived"]).unwrap();
        let mut record = Record::new("Test article", "test-article", &choices, now).unwrap();
        record.publication.status = Status::parse("archived").unwrap();
        record.seo.sitemap_priority = Some(Priority::new(0.2).unwrap());

        let news = Section::new("news", AllowedStatuses::published());
        let archives = Section::new("archived", AllowedStatuses::new(["archived"]).unwrap());

        let news_feed = SitemapSection::new(&news, now.date_naive()).entries([&record]);
        assert!(news_feed.is_empty());

        let archive_feed = SitemapSection::new(&archives, now.date_naive()).entries([&record]);
        assert_eq!(archive_feed.len(), 1);
        assert_eq!(archive_feed[0].location, "/archived/test-article/");
        assert_eq!(archive_feed[0].lastmod, now);
        assert_eq!(archive_feed[0].priority, Some(Priority::new(0.2).unwrap()));
    }

    #[test]
    fn drafts_appear_in_no_feed() {
        let now = Utc::now();
        let choices = StatusChoices::default();
        let record = Record::new("Draft", "draft", &choices, now).unwrap();
        let news = Section::new("news", AllowedStatuses::published());
        assert!(SitemapSection::new(&news, now.date_naive())
            .entries([&record])
            .is_empty());
    }
}
