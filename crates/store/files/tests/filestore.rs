use std::collections::BTreeSet;
use std::time::Duration;

use camino::Utf8Path;
use intake_filestore::{FilePayload, FileStore, FileStoreError};
use tempdir::TempDir;

fn payload(name: &str, bytes: &[u8]) -> FilePayload {
    FilePayload {
        name: name.to_owned(),
        mime_type: "application/pdf".to_owned(),
        bytes: bytes.to_vec(),
    }
}

fn utf8_root(dir: &TempDir) -> &Utf8Path {
    Utf8Path::from_path(dir.path()).expect("tempdir path is utf8")
}

#[tokio::test]
async fn writes_batch_and_reports_metadata_in_input_order() {
    let dir = TempDir::new("filestore").expect("tempdir");
    let store = FileStore::new(utf8_root(&dir)).await.expect("open store");

    let stored = store
        .put_batch(&[payload("a.pdf", b"first"), payload("b.png", b"second")])
        .await
        .expect("batch should store");

    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].original_name, "a.pdf");
    assert_eq!(stored[0].size, 5);
    assert_eq!(stored[1].original_name, "b.png");

    for file in &stored {
        let on_disk = std::fs::read(&file.stored_path).expect("file exists");
        assert_eq!(on_disk.len() as u64, file.size);
    }
}

#[tokio::test]
async fn generated_names_follow_the_scheme() {
    let dir = TempDir::new("filestore").expect("tempdir");
    let store = FileStore::new(utf8_root(&dir)).await.expect("open store");

    let stored = store
        .put_batch(&[payload("my report (final).pdf", b"x")])
        .await
        .expect("store");

    let name = Utf8Path::new(&stored[0].stored_path)
        .file_name()
        .expect("has a file name");

    // <millis>-<suffix>-<sanitized original>
    let mut parts = name.splitn(3, '-');
    let millis = parts.next().expect("timestamp part");
    assert!(millis.chars().all(|c| c.is_ascii_digit()), "{name}");
    let suffix = parts.next().expect("suffix part");
    assert_eq!(suffix.len(), 8);
    let sanitized = parts.next().expect("name part");
    assert_eq!(sanitized, "my_report__final_.pdf");
}

#[tokio::test]
async fn over_long_path_rejects_the_whole_batch_before_any_write() {
    let dir = TempDir::new("filestore").expect("tempdir");
    let store = FileStore::new(utf8_root(&dir)).await.expect("open store");

    let long_name = format!("{}.pdf", "n".repeat(600));
    let err = store
        .put_batch(&[payload("ok.pdf", b"fine"), payload(&long_name, b"too long")])
        .await
        .expect_err("batch must fail");

    match err {
        FileStoreError::PathTooLong { original_name } => {
            assert_eq!(original_name, long_name);
        }
        other => panic!("unexpected error: {other}"),
    }

    // All-or-nothing: the valid file was not written either.
    let entries = std::fs::read_dir(dir.path()).expect("read dir").count();
    assert_eq!(entries, 0);
}

#[tokio::test]
async fn sweep_removes_only_unreferenced_files() {
    let dir = TempDir::new("filestore").expect("tempdir");
    let store = FileStore::new(utf8_root(&dir)).await.expect("open store");

    let stored = store
        .put_batch(&[payload("keep.pdf", b"keep"), payload("drop.pdf", b"drop")])
        .await
        .expect("store");

    let live: BTreeSet<String> = [stored[0].stored_path.clone()].into();
    let removed = store
        .sweep_orphans(&live, Duration::ZERO)
        .await
        .expect("sweep");

    assert_eq!(removed, 1);
    assert!(std::fs::read(&stored[0].stored_path).is_ok());
    assert!(std::fs::read(&stored[1].stored_path).is_err());
}

#[tokio::test]
async fn sweep_leaves_young_files_for_in_flight_requests() {
    let dir = TempDir::new("filestore").expect("tempdir");
    let store = FileStore::new(utf8_root(&dir)).await.expect("open store");

    let stored = store
        .put_batch(&[payload("fresh.pdf", b"fresh")])
        .await
        .expect("store");

    // Not referenced by any row, but too young to reclaim.
    let live = BTreeSet::new();
    let removed = store
        .sweep_orphans(&live, Duration::from_secs(3600))
        .await
        .expect("sweep");

    assert_eq!(removed, 0);
    assert!(std::fs::read(&stored[0].stored_path).is_ok());
}

#[tokio::test]
async fn new_is_idempotent_over_an_existing_root() {
    let dir = TempDir::new("filestore").expect("tempdir");
    let root = utf8_root(&dir).join("a/b/c");

    let _first = FileStore::new(&root).await.expect("creates ancestors");
    let _second = FileStore::new(&root).await.expect("reopen is fine");
    assert!(root.as_std_path().is_dir());
}
