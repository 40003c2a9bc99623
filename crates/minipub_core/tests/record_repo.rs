use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use minipub_core::db::open_db_in_memory;
use minipub_core::{
    AllowedStatuses, Priority, Record, RecordQuery, RecordRepository, RepoError, Status,
    StatusChoices, SqliteRecordRepository, ValidationError, Visibility,
};
use uuid::Uuid;

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn extended() -> StatusChoices {
    StatusChoices::new(["draft", "published", "archived"]).unwrap()
}

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn, StatusChoices::default()).unwrap();
    let now = at(2024, 6, 1, 9);

    let mut record = Record::new("Some news", "some-news", repo.choices(), now)
        .unwrap()
        .with_body("body text");
    record.seo.meta_description = Some("summary".to_string());
    record.seo.sitemap_priority = Some(Priority::new(0.2).unwrap());
    let effects = repo.create_record(&mut record, now).unwrap();
    assert!(effects.status_changed);
    assert!(!effects.start_autofilled);

    let loaded = repo.get_record(record.id).unwrap().unwrap();
    assert_eq!(loaded, record);
    assert_eq!(loaded.status(), &Status::draft());
    assert_eq!(loaded.publication.start, None);
    assert_eq!(loaded.timestamps().created(), now);
}

#[test]
fn publishing_fills_start_once() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn, StatusChoices::default()).unwrap();
    let created = at(2024, 6, 1, 9);

    let mut record = Record::new("News", "news", repo.choices(), created).unwrap();
    repo.create_record(&mut record, created).unwrap();

    let published = at(2024, 6, 3, 10);
    record.publication.status = Status::published();
    let effects = repo.update_record(&mut record, published).unwrap();
    assert!(effects.start_autofilled);
    assert!(effects.status_changed);
    assert_eq!(record.publication.start, Some(day(2024, 6, 3)));

    let later = published + Duration::days(10);
    record.title = "News, revised".to_string();
    let effects = repo.update_record(&mut record, later).unwrap();
    assert!(!effects.start_autofilled);
    assert!(!effects.status_changed);

    let loaded = repo.get_record(record.id).unwrap().unwrap();
    assert_eq!(loaded.publication.start, Some(day(2024, 6, 3)));
    assert_eq!(loaded.title, "News, revised");
    assert_eq!(loaded.timestamps().created(), created);
    assert_eq!(loaded.timestamps().modified(), later);
    assert_eq!(loaded.timestamps().status_changed(), published);
}

#[test]
fn archiving_fills_start_when_missing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn, extended()).unwrap();
    let now = at(2024, 6, 1, 9);

    let mut record = Record::new("Old", "old", repo.choices(), now).unwrap();
    record.publication.status = Status::parse("archived").unwrap();
    let effects = repo.create_record(&mut record, now).unwrap();
    assert!(effects.start_autofilled);
    assert_eq!(record.publication.start, Some(day(2024, 6, 1)));
}

#[test]
fn explicit_start_is_preserved_on_publish() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn, StatusChoices::default()).unwrap();
    let now = at(2024, 6, 1, 9);

    let mut record = Record::new("Scheduled", "scheduled", repo.choices(), now).unwrap();
    record.publication.status = Status::published();
    record.publication.start = Some(day(2024, 7, 1));
    let effects = repo.create_record(&mut record, now).unwrap();
    assert!(!effects.start_autofilled);

    let loaded = repo.get_record(record.id).unwrap().unwrap();
    assert_eq!(loaded.publication.start, Some(day(2024, 7, 1)));
}

#[test]
fn repository_does_not_check_date_ordering() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn, StatusChoices::default()).unwrap();
    let now = at(2024, 6, 1, 9);

    let mut record = Record::new("Reversed", "reversed", repo.choices(), now).unwrap();
    record.publication.start = Some(day(2010, 1, 2));
    record.publication.end = Some(day(2010, 1, 1));
    repo.create_record(&mut record, now).unwrap();

    let loaded = repo.get_record(record.id).unwrap().unwrap();
    assert!(matches!(
        loaded.clean(repo.choices()),
        Err(ValidationError::EndBeforeStart { .. })
    ));
}

#[test]
fn unknown_status_is_rejected_before_write() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn, StatusChoices::default()).unwrap();
    let now = at(2024, 6, 1, 9);

    let mut record = Record::new("Archived", "archived", repo.choices(), now).unwrap();
    record.publication.status = Status::parse("archived").unwrap();
    let err = repo.create_record(&mut record, now).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::UnknownStatus(token)) if token == "archived"
    ));
    assert!(repo.get_record(record.id).unwrap().is_none());
}

#[test]
fn update_not_found_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn, StatusChoices::default()).unwrap();
    let now = at(2024, 6, 1, 9);

    let mut record = Record::new("Ghost", "ghost", repo.choices(), now).unwrap();
    let err = repo.update_record(&mut record, now).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == record.id));
}

#[test]
fn duplicate_slug_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn, StatusChoices::default()).unwrap();
    let now = at(2024, 6, 1, 9);

    let mut first = Record::new("First", "same", repo.choices(), now).unwrap();
    repo.create_record(&mut first, now).unwrap();
    let mut second = Record::new("Second", "same", repo.choices(), now).unwrap();
    assert!(matches!(
        repo.create_record(&mut second, now),
        Err(RepoError::Db(_))
    ));
}

#[test]
fn failed_create_leaves_the_record_untouched() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn, StatusChoices::default()).unwrap();
    let created = at(2024, 5, 1, 9);

    let mut first = Record::new("First", "same", repo.choices(), created).unwrap();
    repo.create_record(&mut first, created).unwrap();

    let mut second = Record::new("Second", "same", repo.choices(), created).unwrap();
    second.publication.status = Status::published();
    let before = second.clone();
    let result = repo.create_record(&mut second, at(2024, 6, 1, 9));

    assert!(matches!(result, Err(RepoError::Db(_))));
    assert_eq!(second, before);
    assert_eq!(second.publication.start, None);
    assert_eq!(second.timestamps().modified(), created);
}

#[test]
fn failed_update_leaves_the_record_untouched() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn, StatusChoices::default()).unwrap();
    let created = at(2024, 5, 1, 9);

    let mut taken = Record::new("Taken", "taken", repo.choices(), created).unwrap();
    repo.create_record(&mut taken, created).unwrap();
    let mut record = Record::new("Draft", "draft", repo.choices(), created).unwrap();
    repo.create_record(&mut record, created).unwrap();

    record.slug = "taken".to_string();
    record.publication.status = Status::published();
    let before = record.clone();
    let result = repo.update_record(&mut record, at(2024, 6, 1, 9));

    assert!(matches!(result, Err(RepoError::Db(_))));
    assert_eq!(record, before);
    assert_eq!(record.publication.start, None);

    let stored = repo.get_record(record.id).unwrap().unwrap();
    assert_eq!(stored.slug, "draft");
    assert_eq!(stored.status(), &Status::draft());
    assert_eq!(stored.publication.start, None);
}

#[test]
fn dates_beyond_four_digit_years_are_not_stored() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn, StatusChoices::default()).unwrap();
    let now = at(2024, 6, 1, 9);

    let far = NaiveDate::from_ymd_opt(10000, 1, 1).unwrap();
    let mut record = Record::new("Far", "far", repo.choices(), now).unwrap();
    record.publication.status = Status::published();
    record.publication.start = Some(far);

    assert!(matches!(
        repo.create_record(&mut record, now),
        Err(RepoError::Validation(ValidationError::DateOutOfRange(date))) if date == far
    ));
    assert_eq!(
        repo.count_records(&RecordQuery::new(Visibility::All)).unwrap(),
        0
    );
}

#[test]
fn find_by_slug_applies_visibility() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn, StatusChoices::default()).unwrap();
    let now = at(2024, 6, 1, 9);

    let mut draft = Record::new("Draft", "draft-news", repo.choices(), now).unwrap();
    repo.create_record(&mut draft, now).unwrap();

    let live = Visibility::live(AllowedStatuses::published(), day(2024, 6, 1));
    assert!(repo.find_by_slug("draft-news", &live).unwrap().is_none());
    assert!(repo
        .find_by_slug("draft-news", &Visibility::All)
        .unwrap()
        .is_some());
    assert!(repo.find_by_slug("missing", &Visibility::All).unwrap().is_none());
}

#[test]
fn list_orders_by_start_desc_with_undated_last() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn, StatusChoices::default()).unwrap();
    let now = at(2024, 6, 1, 9);

    for (slug, start) in [
        ("undated", None),
        ("older", Some(day(2011, 12, 23))),
        ("newest", Some(day(2012, 12, 25))),
        ("newer", Some(day(2012, 12, 24))),
    ] {
        let mut record = Record::new(slug, slug, repo.choices(), now).unwrap();
        record.publication.start = start;
        repo.create_record(&mut record, now).unwrap();
    }

    let slugs: Vec<String> = repo
        .list_records(&RecordQuery::new(Visibility::All))
        .unwrap()
        .into_iter()
        .map(|record| record.slug)
        .collect();
    assert_eq!(slugs, ["newest", "newer", "older", "undated"]);

    let query = RecordQuery::new(Visibility::All).in_year(2012);
    assert_eq!(repo.count_records(&query).unwrap(), 2);
    let page = repo.list_records(&query.page(1, 1)).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].slug, "newer");
}

#[test]
fn corrupted_row_is_rejected_instead_of_masked() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn, StatusChoices::default()).unwrap();
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO records (
            uuid, title, slug, status, start_date,
            created_at, modified_at, status_changed_at
        ) VALUES (?1, 'Bad', 'bad', 'published', 'not-a-date', 0, 0, 0);",
        [id.to_string()],
    )
    .unwrap();

    let err = repo.get_record(id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(message) if message.contains("start_date")));
}

#[test]
fn delete_all_empties_the_store() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn, StatusChoices::default()).unwrap();
    let now = at(2024, 6, 1, 9);

    for slug in ["a", "b"] {
        let mut record = Record::new(slug, slug, repo.choices(), now).unwrap();
        repo.create_record(&mut record, now).unwrap();
    }
    assert_eq!(repo.delete_all().unwrap(), 2);
    assert_eq!(
        repo.count_records(&RecordQuery::new(Visibility::All)).unwrap(),
        0
    );
}
