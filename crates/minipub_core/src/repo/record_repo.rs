//! Record repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist publishable records and run the pre-save lifecycle hook.
//! - Execute `Visibility` filters, ordering and date bucketing inside SQLite.
//!
//! # Invariants
//! - Every write runs `lifecycle::before_save` and rejects unknown statuses
//!   and dates outside the storable years.
//! - A failed write leaves the caller's record untouched.
//! - Start/end ordering is not enforced here; see `Record::clean`.
//! - Read paths reject undecodable rows instead of masking them.
//! - Listings are ordered by `start` descending (nulls last), then
//!   `created` descending, then id.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::record::{
    Priority, Publication, Record, RecordId, SeoMeta, Timestamps, ValidationError,
};
use crate::model::status::{Status, StatusChoices};
use crate::publish::filter::{
    date_from_db, date_to_db, storable_year_bounds, DateBucket, SqlFilter, Visibility,
};
use crate::publish::lifecycle::{before_save, SaveEffects};
use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use thiserror::Error;
use uuid::Uuid;

const RECORD_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    slug,
    body,
    status,
    start_date,
    end_date,
    meta_description,
    meta_keywords,
    sitemap_priority,
    created_at,
    modified_at,
    status_changed_at
FROM records";

const RECORD_ORDER_SQL: &str = " ORDER BY start_date IS NULL, start_date DESC, created_at DESC, uuid ASC";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for record persistence and query operations.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Db(#[from] DbError),
    #[error("record not found: {0}")]
    NotFound(RecordId),
    #[error("invalid persisted record data: {0}")]
    InvalidData(String),
    #[error("database schema version {found} does not match expected {expected}")]
    SchemaNotReady { found: u32, expected: u32 },
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Query options for listing records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub visibility: Visibility,
    /// Restricts results to records starting within this calendar year.
    pub start_year: Option<i32>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl RecordQuery {
    pub fn new(visibility: Visibility) -> Self {
        Self {
            visibility,
            start_year: None,
            limit: None,
            offset: 0,
        }
    }

    pub fn in_year(mut self, year: i32) -> Self {
        self.start_year = Some(year);
        self
    }

    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }
}

/// Storage collaborator for publishable records.
pub trait RecordRepository {
    /// Status vocabulary writes are checked against.
    fn choices(&self) -> &StatusChoices;
    /// Inserts a new record, running the pre-save hook first.
    fn create_record(&self, record: &mut Record, now: DateTime<Utc>) -> RepoResult<SaveEffects>;
    /// Updates an existing record, running the pre-save hook first.
    fn update_record(&self, record: &mut Record, now: DateTime<Utc>) -> RepoResult<SaveEffects>;
    fn get_record(&self, id: RecordId) -> RepoResult<Option<Record>>;
    /// Looks up one record by slug among those the filter admits.
    fn find_by_slug(&self, slug: &str, visibility: &Visibility) -> RepoResult<Option<Record>>;
    fn list_records(&self, query: &RecordQuery) -> RepoResult<Vec<Record>>;
    /// Counts matches of `query`, ignoring its limit and offset.
    fn count_records(&self, query: &RecordQuery) -> RepoResult<u64>;
    /// Distinct start-date buckets among admitted records, newest first.
    fn date_buckets(
        &self,
        visibility: &Visibility,
        bucket: DateBucket,
        start_year: Option<i32>,
    ) -> RepoResult<Vec<NaiveDate>>;
    /// Removes every record; returns how many were deleted.
    fn delete_all(&self) -> RepoResult<usize>;
}

/// SQLite-backed record repository.
pub struct SqliteRecordRepository<'conn> {
    conn: &'conn Connection,
    choices: StatusChoices,
}

impl<'conn> SqliteRecordRepository<'conn> {
    /// Wraps a connection opened through `db::open_db*`.
    ///
    /// # Errors
    /// - `SchemaNotReady` when migrations have not been applied.
    pub fn try_new(conn: &'conn Connection, choices: StatusChoices) -> RepoResult<Self> {
        let found: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        let expected = latest_version();
        if found != expected {
            return Err(RepoError::SchemaNotReady { found, expected });
        }
        Ok(Self { conn, choices })
    }
}

impl RecordRepository for SqliteRecordRepository<'_> {
    fn choices(&self) -> &StatusChoices {
        &self.choices
    }

    fn create_record(&self, record: &mut Record, now: DateTime<Utc>) -> RepoResult<SaveEffects> {
        let mut staged = record.clone();
        let effects = before_save(&mut staged, None, &self.choices, now);
        staged.validate_persistable(&self.choices)?;

        self.conn.execute(
            "INSERT INTO records (
                uuid,
                title,
                slug,
                body,
                status,
                start_date,
                end_date,
                meta_description,
                meta_keywords,
                sitemap_priority,
                created_at,
                modified_at,
                status_changed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
            params![
                staged.id.to_string(),
                staged.title.as_str(),
                staged.slug.as_str(),
                staged.body.as_str(),
                staged.publication.status.as_str(),
                staged.publication.start.map(date_to_db),
                staged.publication.end.map(date_to_db),
                staged.seo.meta_description.as_deref(),
                staged.seo.meta_keywords.as_deref(),
                staged.seo.sitemap_priority.map(Priority::value),
                staged.timestamps.created().timestamp_millis(),
                staged.timestamps.modified().timestamp_millis(),
                staged.timestamps.status_changed().timestamp_millis(),
            ],
        )?;

        log_save("create", &staged, effects);
        *record = staged;
        Ok(effects)
    }

    fn update_record(&self, record: &mut Record, now: DateTime<Utc>) -> RepoResult<SaveEffects> {
        record.validate_persistable(&self.choices)?;

        let tx = self.conn.unchecked_transaction()?;
        let persisted_status = tx
            .query_row(
                "SELECT status FROM records WHERE uuid = ?1;",
                [record.id.to_string()],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .ok_or(RepoError::NotFound(record.id))?;
        let persisted_status = parse_status(&persisted_status)?;

        let mut staged = record.clone();
        let effects = before_save(&mut staged, Some(&persisted_status), &self.choices, now);
        staged.validate_persistable(&self.choices)?;

        tx.execute(
            "UPDATE records
             SET
                title = ?1,
                slug = ?2,
                body = ?3,
                status = ?4,
                start_date = ?5,
                end_date = ?6,
                meta_description = ?7,
                meta_keywords = ?8,
                sitemap_priority = ?9,
                modified_at = ?10,
                status_changed_at = ?11
             WHERE uuid = ?12;",
            params![
                staged.title.as_str(),
                staged.slug.as_str(),
                staged.body.as_str(),
                staged.publication.status.as_str(),
                staged.publication.start.map(date_to_db),
                staged.publication.end.map(date_to_db),
                staged.seo.meta_description.as_deref(),
                staged.seo.meta_keywords.as_deref(),
                staged.seo.sitemap_priority.map(Priority::value),
                staged.timestamps.modified().timestamp_millis(),
                staged.timestamps.status_changed().timestamp_millis(),
                staged.id.to_string(),
            ],
        )?;
        tx.commit()?;

        log_save("update", &staged, effects);
        *record = staged;
        Ok(effects)
    }

    fn get_record(&self, id: RecordId) -> RepoResult<Option<Record>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RECORD_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_record_row(row)?));
        }
        Ok(None)
    }

    fn find_by_slug(&self, slug: &str, visibility: &Visibility) -> RepoResult<Option<Record>> {
        let filter = visibility.to_sql();
        let sql = format!("{RECORD_SELECT_SQL} WHERE slug = ? AND {};", filter.clause);
        let mut bind_values = vec![Value::Text(slug.to_string())];
        bind_values.extend(filter.binds);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_record_row(row)?));
        }
        Ok(None)
    }

    fn list_records(&self, query: &RecordQuery) -> RepoResult<Vec<Record>> {
        let filter = where_sql(&query.visibility, query.start_year);
        let mut sql = format!("{RECORD_SELECT_SQL} WHERE {}", filter.clause);
        let mut bind_values = filter.binds;

        sql.push_str(RECORD_ORDER_SQL);

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row)?);
        }
        Ok(records)
    }

    fn count_records(&self, query: &RecordQuery) -> RepoResult<u64> {
        let filter = where_sql(&query.visibility, query.start_year);
        let sql = format!("SELECT COUNT(*) FROM records WHERE {};", filter.clause);
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(filter.binds), |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative record count `{count}`")))
    }

    fn date_buckets(
        &self,
        visibility: &Visibility,
        bucket: DateBucket,
        start_year: Option<i32>,
    ) -> RepoResult<Vec<NaiveDate>> {
        let filter = where_sql(visibility, start_year);
        let sql = format!(
            "SELECT DISTINCT {} AS bucket
             FROM records
             WHERE start_date IS NOT NULL AND {}
             ORDER BY bucket DESC;",
            bucket.sql_expr(),
            filter.clause
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(filter.binds))?;
        let mut buckets = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get("bucket")?;
            let date = date_from_db(&value).ok_or_else(|| {
                RepoError::InvalidData(format!("invalid date bucket `{value}`"))
            })?;
            buckets.push(date);
        }
        Ok(buckets)
    }

    fn delete_all(&self) -> RepoResult<usize> {
        let deleted = self.conn.execute("DELETE FROM records;", [])?;
        info!("event=record_delete_all module=repo status=ok deleted={deleted}");
        Ok(deleted)
    }
}

fn log_save(action: &str, record: &Record, effects: SaveEffects) {
    info!(
        "event=record_save module=repo status=ok action={} record_id={} record_status={} start_autofilled={} status_changed={}",
        action,
        record.id,
        record.publication.status,
        effects.start_autofilled,
        effects.status_changed
    );
}

fn where_sql(visibility: &Visibility, start_year: Option<i32>) -> SqlFilter {
    let mut filter = visibility.to_sql();
    if let Some(year) = start_year {
        match storable_year_bounds(year) {
            Some((first, last)) => {
                filter
                    .clause
                    .push_str(" AND start_date >= ? AND start_date <= ?");
                filter.binds.push(Value::Text(date_to_db(first)));
                filter.binds.push(Value::Text(date_to_db(last)));
            }
            None => filter.clause.push_str(" AND 0 = 1"),
        }
    }
    filter
}

fn parse_status(value: &str) -> RepoResult<Status> {
    Status::parse(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid status `{value}` in records.status")))
}

fn parse_date_column(row: &Row<'_>, column: &str) -> RepoResult<Option<NaiveDate>> {
    match row.get::<_, Option<String>>(column)? {
        Some(value) => date_from_db(&value).map(Some).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid date `{value}` in records.{column}"))
        }),
        None => Ok(None),
    }
}

fn parse_timestamp_column(row: &Row<'_>, column: &str) -> RepoResult<DateTime<Utc>> {
    let millis: i64 = row.get(column)?;
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid timestamp `{millis}` in records.{column}"))
    })
}

fn parse_record_row(row: &Row<'_>) -> RepoResult<Record> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in records.uuid"))
    })?;

    let status_text: String = row.get("status")?;
    let status = parse_status(&status_text)?;

    let sitemap_priority = match row.get::<_, Option<f64>>("sitemap_priority")? {
        Some(value) => Some(Priority::new(value).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid priority `{value}` in records.sitemap_priority"
            ))
        })?),
        None => None,
    };

    Ok(Record {
        id,
        title: row.get("title")?,
        slug: row.get("slug")?,
        body: row.get("body")?,
        publication: Publication {
            status,
            start: parse_date_column(row, "start_date")?,
            end: parse_date_column(row, "end_date")?,
        },
        timestamps: Timestamps::from_parts(
            parse_timestamp_column(row, "created_at")?,
            parse_timestamp_column(row, "modified_at")?,
            parse_timestamp_column(row, "status_changed_at")?,
        ),
        seo: SeoMeta {
            meta_description: row.get("meta_description")?,
            meta_keywords: row.get("meta_keywords")?,
            sitemap_priority,
        },
    })
}
