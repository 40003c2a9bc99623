//! Core publishing logic for minipub.
//!
//! Date-bounded, status-gated records (news articles and the like): the
//! liveness predicate, its SQL rendition, the pre-save hook, the access gate
//! of public sections and sitemap feeds. This crate owns every publishing
//! invariant; front ends only wire requests into `PublicationService`.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod publish;
pub mod repo;
pub mod service;

pub use config::{ConfigError, PublishConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::record::{
    Priority, Publication, Record, RecordId, RecordOverview, SeoMeta, Timestamps,
    ValidationError,
};
pub use model::status::{AllowedStatuses, Status, StatusChoices};
pub use publish::filter::{DateBucket, Visibility};
pub use publish::gate::{AccessGate, NotFound, RequestContext, Section, Viewer};
pub use publish::lifecycle::{before_save, SaveEffects};
pub use publish::liveness::is_live;
pub use publish::sitemap::{SitemapEntry, SitemapSection};
pub use repo::record_repo::{
    RecordQuery, RecordRepository, RepoError, RepoResult, SqliteRecordRepository,
};
pub use service::publication_service::{
    ArchiveIndex, Page, PublicationService, ServiceError, ServiceResult, YearArchive,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
