//! On-disk storage for uploaded investor documents.
//!
//! Files live flat under a configured root directory. Generated names are
//! collision resistant (millisecond timestamp + random suffix), which is the
//! only concurrency-safety mechanism the directory needs: concurrent
//! requests never contend for the same name.

use std::collections::BTreeSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use camino::{Utf8Path, Utf8PathBuf};
use intake_primitives::validation::STORED_PATH_MAX_LEN;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

const NAME_SUFFIX_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("stored path for \"{original_name}\" would exceed {STORED_PATH_MAX_LEN} characters")]
    PathTooLong { original_name: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One validated upload, ready to be written.
#[derive(Clone, Debug)]
pub struct FilePayload {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Metadata for a durably written file, in input order.
#[derive(Clone, Debug)]
pub struct StoredFile {
    pub stored_path: String,
    pub original_name: String,
    pub size: u64,
    pub mime_type: String,
}

#[derive(Clone, Debug)]
pub struct FileStore {
    root: Utf8PathBuf,
}

impl FileStore {
    /// Opens the store, creating the root directory (and any missing
    /// ancestors) idempotently.
    pub async fn new(root: &Utf8Path) -> Result<Self, FileStoreError> {
        fs::create_dir_all(root).await?;

        Ok(Self {
            root: root.to_owned(),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Writes a batch of files, returning their stored metadata in input
    /// order.
    ///
    /// Every generated path is checked against the schema's 500-character
    /// ceiling before any byte is written; one over-long path fails the
    /// whole batch with nothing on disk. A write failure aborts the
    /// remaining files; anything already written is reclaimed later by
    /// [`Self::sweep_orphans`].
    pub async fn put_batch(
        &self,
        files: &[FilePayload],
    ) -> Result<Vec<StoredFile>, FileStoreError> {
        let mut targets = Vec::with_capacity(files.len());

        for file in files {
            let target = self.root.join(generate_name(&file.name));
            if target.as_str().chars().count() > STORED_PATH_MAX_LEN {
                return Err(FileStoreError::PathTooLong {
                    original_name: file.name.clone(),
                });
            }
            targets.push(target);
        }

        let mut stored = Vec::with_capacity(files.len());

        for (file, target) in files.iter().zip(&targets) {
            let mut out = fs::File::create(target).await?;
            out.write_all(&file.bytes).await?;
            out.sync_all().await?;

            debug!(path=%target, size=file.bytes.len(), "stored uploaded file");

            stored.push(StoredFile {
                stored_path: target.as_str().to_owned(),
                original_name: file.name.clone(),
                size: file.bytes.len() as u64,
                mime_type: file.mime_type.clone(),
            });
        }

        Ok(stored)
    }

    /// Deletes files under the root that no database row references.
    ///
    /// Reclaims documents stranded by a persistence failure that happened
    /// after their bytes were already written. Files younger than `min_age`
    /// are left alone: an in-flight request writes its files before its
    /// database rows exist, and the sweep must not eat that window. Returns
    /// the number of files removed.
    pub async fn sweep_orphans(
        &self,
        live: &BTreeSet<String>,
        min_age: Duration,
    ) -> Result<u64, FileStoreError> {
        let now = SystemTime::now();
        let mut removed = 0_u64;
        let mut entries = fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Ok(modified) = entry.metadata().await?.modified() {
                let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
                if age < min_age {
                    continue;
                }
            }
            let path = entry.path();
            let Some(path_str) = path.to_str() else {
                warn!(path=%path.display(), "skipping non-utf8 path during sweep");
                continue;
            };
            if !live.contains(path_str) {
                fs::remove_file(&path).await?;
                removed = removed.saturating_add(1);
                debug!(path=%path_str, "removed orphaned file");
            }
        }

        Ok(removed)
    }
}

/// `<millis>-<random suffix>-<sanitized original>`; timestamp first keeps
/// directory listings roughly chronological.
fn generate_name(original: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis());
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NAME_SUFFIX_LEN)
        .map(char::from)
        .collect();

    format!("{millis}-{suffix}-{}", sanitize_name(original))
}

/// Replaces every character outside `[A-Za-z0-9.-]` with `_`.
#[must_use]
pub fn sanitize_name(original: &str) -> String {
    original
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
