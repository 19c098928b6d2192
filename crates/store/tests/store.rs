use camino::Utf8Path;
use chrono::NaiveDate;
use intake_primitives::validation::NormalizedSubmission;
use intake_store::{FileRecord, Store, StoreError, MAX_RECENT_LIMIT};
use tempdir::TempDir;

fn submission(first: &str, last: &str) -> NormalizedSubmission {
    NormalizedSubmission {
        first_name: first.to_owned(),
        last_name: last.to_owned(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 6, 15).expect("valid date"),
        phone_number: "9515263834".to_owned(),
        street_address: "1 Analytical Way".to_owned(),
        state: "CA".to_owned(),
        zip_code: "90210".to_owned(),
    }
}

fn file(path: &str, name: &str) -> FileRecord {
    FileRecord {
        stored_path: path.to_owned(),
        original_name: name.to_owned(),
        size: 1024,
        mime_type: "application/pdf".to_owned(),
    }
}

#[test]
fn creates_parent_and_children_atomically() {
    let mut store = Store::open_in_memory().expect("open");

    let created = store
        .create_investor(
            &submission("Ada", "Lovelace"),
            &[file("/up/a.pdf", "a.pdf"), file("/up/b.pdf", "b.pdf")],
        )
        .expect("create");

    assert_eq!(created.files_count, 2);
    assert_eq!(created.first_name, "Ada");

    let investor = store.get_investor(created.id).expect("fetch");
    assert_eq!(investor.phone_number, "9515263834");
    assert_eq!(investor.state, "CA");
    assert_eq!(investor.created_at, created.created_at);

    let files = store.files_for(created.id).expect("files");
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].original_name, "a.pdf");
    assert!(files.iter().all(|f| f.investor_id == created.id));
}

#[test]
fn rejects_an_empty_file_batch() {
    let mut store = Store::open_in_memory().expect("open");
    let err = store
        .create_investor(&submission("Ada", "Lovelace"), &[])
        .expect_err("must fail");
    assert!(matches!(err, StoreError::InvalidInput(_)));
}

#[test]
fn identical_submissions_create_distinct_records() {
    let mut store = Store::open_in_memory().expect("open");
    let sub = submission("Ada", "Lovelace");
    let files = [file("/up/a.pdf", "a.pdf")];

    let first = store.create_investor(&sub, &files).expect("first");
    let second = store.create_investor(&sub, &files).expect("second");

    assert_ne!(first.id, second.id);
    assert_eq!(store.recent_investors(None).expect("recent").len(), 2);
}

#[test]
fn schema_rejects_a_record_that_skipped_validation() {
    let mut store = Store::open_in_memory().expect("open");

    // A drifted caller: phone not normalized to ten digits.
    let mut bad = submission("Ada", "Lovelace");
    bad.phone_number = "(951) 526-3834".to_owned();
    let err = store
        .create_investor(&bad, &[file("/up/a.pdf", "a.pdf")])
        .expect_err("schema must reject");
    assert!(matches!(err, StoreError::Constraint(_)), "{err}");

    // The failed transaction left nothing behind.
    assert!(store.recent_investors(None).expect("recent").is_empty());
}

#[test]
fn schema_rejects_underage_date_of_birth() {
    let mut store = Store::open_in_memory().expect("open");

    let mut bad = submission("Kid", "Lovelace");
    bad.date_of_birth = chrono::Utc::now().date_naive();
    let err = store
        .create_investor(&bad, &[file("/up/a.pdf", "a.pdf")])
        .expect_err("schema must reject");
    assert!(matches!(err, StoreError::Constraint(_)), "{err}");
}

#[test]
fn schema_rejects_disallowed_mime_type() {
    let mut store = Store::open_in_memory().expect("open");

    let mut bad = file("/up/a.gif", "a.gif");
    bad.mime_type = "image/gif".to_owned();
    let err = store
        .create_investor(&submission("Ada", "Lovelace"), &[bad])
        .expect_err("schema must reject");
    assert!(matches!(err, StoreError::Constraint(_)), "{err}");

    // All-or-nothing: the parent row rolled back with the child.
    assert!(store.recent_investors(None).expect("recent").is_empty());
}

#[test]
fn recent_listing_is_newest_first_and_capped() {
    let mut store = Store::open_in_memory().expect("open");

    for n in 0..3 {
        let _created = store
            .create_investor(
                &submission(&format!("N{n}"), "Order"),
                &[file(&format!("/up/{n}.pdf"), "doc.pdf")],
            )
            .expect("create");
    }

    let recent = store.recent_investors(Some(2)).expect("recent");
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].first_name, "N2");
    assert_eq!(recent[1].first_name, "N1");

    // Limits above the cap clamp to it.
    let clamped = store.recent_investors(Some(500)).expect("recent");
    assert!(clamped.len() <= MAX_RECENT_LIMIT as usize);
}

#[test]
fn delete_cascades_to_files() {
    let mut store = Store::open_in_memory().expect("open");

    let created = store
        .create_investor(
            &submission("Ada", "Lovelace"),
            &[file("/up/a.pdf", "a.pdf")],
        )
        .expect("create");

    store.delete_investor(created.id).expect("delete");

    assert!(matches!(
        store.get_investor(created.id),
        Err(StoreError::NotFound)
    ));
    assert!(store.files_for(created.id).expect("files").is_empty());
    assert!(store.stored_paths().expect("paths").is_empty());
}

#[test]
fn stored_paths_lists_every_file_row() {
    let mut store = Store::open_in_memory().expect("open");

    let _created = store
        .create_investor(
            &submission("Ada", "Lovelace"),
            &[file("/up/a.pdf", "a.pdf"), file("/up/b.pdf", "b.pdf")],
        )
        .expect("create");

    let paths = store.stored_paths().expect("paths");
    assert!(paths.contains("/up/a.pdf"));
    assert!(paths.contains("/up/b.pdf"));
    assert_eq!(paths.len(), 2);
}

#[test]
fn reopens_an_existing_database_on_disk() {
    let dir = TempDir::new("intake-store").expect("tempdir");
    let path = Utf8Path::from_path(dir.path())
        .expect("utf8 path")
        .join("intake.db");

    let id = {
        let mut store = Store::open(&path).expect("open");
        store
            .create_investor(
                &submission("Ada", "Lovelace"),
                &[file("/up/a.pdf", "a.pdf")],
            )
            .expect("create")
            .id
    };

    let store = Store::open(&path).expect("reopen");
    assert_eq!(store.get_investor(id).expect("fetch").first_name, "Ada");
}
