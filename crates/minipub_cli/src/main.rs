//! `minipub` command-line front end.
//!
//! # Responsibility
//! - Wire command-line requests into `PublicationService`.
//! - Print results as JSON on stdout.
//!
//! # Invariants
//! - One `RequestContext` (one "now") per invocation.
//! - Exit codes: 4 for not-found, 2 for validation and usage errors, 1 for
//!   anything else.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use minipub_core::{
    default_log_level, init_logging, init_logging_from_config, open_db, ArchiveIndex,
    ConfigError, DbError, LoggingError, Page, Priority, PublicationService, PublishConfig,
    Record, RepoError, RequestContext, SaveEffects, Section, ServiceError,
    SqliteRecordRepository, ValidationError, Viewer, YearArchive,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process;
use thiserror::Error;

const EXIT_FAILURE: i32 = 1;
const EXIT_INVALID: i32 = 2;
const EXIT_NOT_FOUND: i32 = 4;

#[derive(Parser)]
#[command(name = "minipub")]
#[command(about = "Date-bounded, status-gated publishing", long_about = None)]
#[command(version)]
struct Cli {
    /// SQLite record store; created and migrated when missing
    #[arg(long, value_name = "PATH")]
    db: PathBuf,

    /// TOML configuration (statuses, sections, pagination, logging)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Absolute directory for rolling log files
    #[arg(long, value_name = "DIR")]
    log_dir: Option<String>,

    /// trace|debug|info|warn|error
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Evaluate the request as of noon UTC on this day
    #[arg(long, value_name = "YYYY-MM-DD")]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a record
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        slug: String,

        /// Status token; defaults to the initial (draft) status
        #[arg(long)]
        status: Option<String>,

        #[arg(long, value_name = "YYYY-MM-DD")]
        start: Option<NaiveDate>,

        #[arg(long, value_name = "YYYY-MM-DD")]
        end: Option<NaiveDate>,

        /// Sitemap priority between 0 and 1
        #[arg(long)]
        priority: Option<f64>,

        #[arg(long, default_value = "")]
        body: String,

        #[arg(long)]
        meta_description: Option<String>,

        #[arg(long)]
        meta_keywords: Option<String>,
    },

    /// Move a record to another status
    SetStatus {
        #[arg(value_name = "SLUG")]
        slug: String,

        #[arg(value_name = "STATUS")]
        status: String,
    },

    /// Change the publication window of a record
    SetDates {
        #[arg(value_name = "SLUG")]
        slug: String,

        #[arg(long, value_name = "YYYY-MM-DD", conflicts_with = "clear_start")]
        start: Option<NaiveDate>,

        #[arg(long, value_name = "YYYY-MM-DD", conflicts_with = "clear_end")]
        end: Option<NaiveDate>,

        #[arg(long)]
        clear_start: bool,

        #[arg(long)]
        clear_end: bool,
    },

    /// Archive index of a section, or one year of it
    List {
        #[arg(long)]
        section: Option<String>,

        /// View the section as a staff member
        #[arg(long)]
        staff: bool,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long)]
        year: Option<i32>,
    },

    /// Detail page of one record
    Show {
        #[arg(value_name = "SLUG")]
        slug: String,

        #[arg(long)]
        section: Option<String>,

        #[arg(long)]
        staff: bool,
    },

    /// Years with visible records
    Years {
        #[arg(long)]
        section: Option<String>,

        #[arg(long)]
        staff: bool,
    },

    /// Sitemap entries of a section
    Sitemap {
        #[arg(long)]
        section: Option<String>,
    },

    /// Every record with its live flag for a section
    Admin {
        #[arg(long)]
        section: Option<String>,
    },

    /// Replace all records with demo articles
    Seed,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Failed(String),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound => EXIT_NOT_FOUND,
            Self::Invalid(_) => EXIT_INVALID,
            Self::Failed(_) => EXIT_FAILURE,
        }
    }
}

impl From<ServiceError> for CliError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::NotFound => Self::NotFound,
            ServiceError::Validation(err) => Self::Invalid(err.to_string()),
            ServiceError::Repo(err) => Self::Failed(err.to_string()),
        }
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        ServiceError::from(value).into()
    }
}

impl From<ValidationError> for CliError {
    fn from(value: ValidationError) -> Self {
        Self::Invalid(value.to_string())
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        match value {
            ConfigError::UnknownSection(_) | ConfigError::Invalid(_) => {
                Self::Invalid(value.to_string())
            }
            other => Self::Failed(other.to_string()),
        }
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Failed(value.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Failed(value.to_string())
    }
}

type Service<'conn> = PublicationService<SqliteRecordRepository<'conn>>;

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => println!("{output:#}"),
        Err(err) => {
            eprintln!("{err}");
            process::exit(err.exit_code());
        }
    }
}

fn run(cli: Cli) -> Result<Value, CliError> {
    let config = match &cli.config {
        Some(path) => PublishConfig::load(path)?,
        None => PublishConfig::default(),
    };
    setup_logging(&cli, &config)?;

    let now = request_now(cli.today);
    let conn = open_db(&cli.db)?;
    let repo = SqliteRecordRepository::try_new(&conn, config.choices().clone())?;
    let service = PublicationService::new(repo).with_page_size(config.pagination.page_size);

    match cli.command {
        Commands::Add {
            title,
            slug,
            status,
            start,
            end,
            priority,
            body,
            meta_description,
            meta_keywords,
        } => {
            let mut record = Record::new(title, slug, service.choices(), now)?.with_body(body);
            if let Some(token) = status {
                record.publication.status = service.choices().get(&token)?;
            }
            record.publication.start = start;
            record.publication.end = end;
            record.seo.sitemap_priority = priority.map(Priority::new).transpose()?;
            record.seo.meta_description = meta_description;
            record.seo.meta_keywords = meta_keywords;
            let effects = service.save(&mut record, now)?;
            Ok(saved_json(&record, effects))
        }
        Commands::SetStatus { slug, status } => {
            let (record, effects) = service.set_status(&slug, &status, now)?;
            Ok(saved_json(&record, effects))
        }
        Commands::SetDates {
            slug,
            start,
            end,
            clear_start,
            clear_end,
        } => {
            let mut record = service.get_for_edit(&slug)?;
            if clear_start {
                record.publication.start = None;
            } else if start.is_some() {
                record.publication.start = start;
            }
            if clear_end {
                record.publication.end = None;
            } else if end.is_some() {
                record.publication.end = end;
            }
            let effects = service.save(&mut record, now)?;
            Ok(saved_json(&record, effects))
        }
        Commands::List {
            section,
            staff,
            page,
            year,
        } => {
            let section = config.section(section.as_deref())?;
            let ctx = RequestContext::new(viewer(staff), now);
            match year {
                Some(year) => Ok(year_json(&service.year_archive(&ctx, section, year, page)?)),
                None => Ok(index_json(&service.archive_index(&ctx, section, page)?)),
            }
        }
        Commands::Show {
            slug,
            section,
            staff,
        } => {
            let section = config.section(section.as_deref())?;
            let ctx = RequestContext::new(viewer(staff), now);
            let record = service.detail(&ctx, section, &slug)?;
            Ok(detail_json(&service, section, &record))
        }
        Commands::Years { section, staff } => {
            let section = config.section(section.as_deref())?;
            let ctx = RequestContext::new(viewer(staff), now);
            Ok(json!({ "years": service.date_list(&ctx, section)? }))
        }
        Commands::Sitemap { section } => {
            let section = config.section(section.as_deref())?;
            Ok(to_json(&service.sitemap(section, now.date_naive())?))
        }
        Commands::Admin { section } => {
            let section = config.section(section.as_deref())?;
            Ok(to_json(&service.admin_list(section, now.date_naive())?))
        }
        Commands::Seed => Ok(json!({ "created": service.seed_demo_records(now)? })),
    }
}

fn setup_logging(cli: &Cli, config: &PublishConfig) -> Result<(), CliError> {
    match (&cli.log_dir, &config.logging) {
        (Some(dir), _) => {
            let level = cli.log_level.as_deref().unwrap_or(default_log_level());
            init_logging(level, dir)?;
        }
        (None, Some(logging)) => match &cli.log_level {
            Some(level) => init_logging(level, &logging.dir)?,
            None => init_logging_from_config(logging)?,
        },
        (None, None) => {}
    }
    Ok(())
}

fn request_now(today: Option<NaiveDate>) -> DateTime<Utc> {
    today
        .and_then(|day| day.and_hms_opt(12, 0, 0))
        .map(|noon| noon.and_utc())
        .unwrap_or_else(Utc::now)
}

fn viewer(staff: bool) -> Viewer {
    if staff {
        Viewer::staff("cli")
    } else {
        Viewer::anonymous()
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|err| json!({ "error": err.to_string() }))
}

fn saved_json(record: &Record, effects: SaveEffects) -> Value {
    json!({
        "record": to_json(record),
        "start_autofilled": effects.start_autofilled,
        "status_changed": effects.status_changed,
    })
}

fn page_json(page: &Page<Record>) -> Value {
    json!({
        "number": page.number,
        "num_pages": page.num_pages,
        "total": page.total,
        "has_next": page.has_next(),
        "has_previous": page.has_previous(),
        "items": to_json(&page.items),
    })
}

fn index_json(index: &ArchiveIndex) -> Value {
    json!({
        "page": page_json(&index.page),
        "date_list": to_json(&index.date_list),
    })
}

fn year_json(archive: &YearArchive) -> Value {
    json!({
        "year": archive.year,
        "page": page_json(&archive.page),
        "date_list": to_json(&archive.date_list),
    })
}

fn detail_json(service: &Service<'_>, section: &Section, record: &Record) -> Value {
    json!({
        "record": to_json(record),
        "location": section.location(&record.slug),
        "staff_preview": record.staff_preview(service.choices()),
    })
}
