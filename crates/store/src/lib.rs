//! Relational persistence gateway for investor records.
//!
//! Sole writer of the `investor` and `investor_file` tables. The schema
//! mirrors every bound from `intake_primitives::validation` as CHECK
//! constraints, so a record that slips past application-level validation is
//! still rejected at commit time.

use std::collections::BTreeSet;

use camino::Utf8Path;
use chrono::{DateTime, Utc};
use intake_primitives::investor::{FileId, Investor, InvestorFile, InvestorId};
use intake_primitives::validation::NormalizedSubmission;
use rusqlite::{params, Connection};
use thiserror::Error;
use tracing::info;

pub const MAX_RECENT_LIMIT: u32 = 50;

/// Closed set of storage error categories.
///
/// Raw SQLite error codes are mapped here and never surface to callers.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("record not found")]
    NotFound,
    #[error("storage connectivity failure: {0}")]
    Connectivity(String),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("storage failure: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, message) => match failure.code {
                rusqlite::ErrorCode::ConstraintViolation => Self::Constraint(
                    message
                        .clone()
                        .unwrap_or_else(|| "schema constraint rejected the record".to_owned()),
                ),
                rusqlite::ErrorCode::DatabaseBusy
                | rusqlite::ErrorCode::DatabaseLocked
                | rusqlite::ErrorCode::CannotOpen => Self::Connectivity(err.to_string()),
                _ => Self::Internal(err.to_string()),
            },
            rusqlite::Error::QueryReturnedNoRows => Self::NotFound,
            _ => Self::Internal(err.to_string()),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Connectivity(err.to_string())
    }
}

/// File metadata handed over by the file store, one entry per written file.
#[derive(Clone, Debug)]
pub struct FileRecord {
    pub stored_path: String,
    pub original_name: String,
    pub size: u64,
    pub mime_type: String,
}

/// Creation confirmation returned to the endpoint.
#[derive(Clone, Debug)]
pub struct CreatedInvestor {
    pub id: InvestorId,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub files_count: usize,
}

/// One row of the recent-investors listing.
#[derive(Clone, Debug)]
pub struct RecentInvestor {
    pub id: InvestorId,
    pub first_name: String,
    pub last_name: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub files_count: u64,
}

#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (creating if needed) the database and applies the schema.
    pub fn open(path: &Utf8Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path).map_err(|err| {
            if matches!(err, rusqlite::Error::SqliteFailure(_, _)) {
                StoreError::Connectivity(format!("cannot open database at {path}: {err}"))
            } else {
                err.into()
            }
        })?;

        let store = Self { conn };
        store.migrate()?;

        info!(%path, "opened investor store");

        Ok(store)
    }

    /// In-memory database, test use.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Atomically creates one investor together with all of its files.
    ///
    /// Single transaction: either every row lands or none does, so partial
    /// state is never observable by readers. An empty file batch is rejected
    /// up front (an investor must have at least one file).
    pub fn create_investor(
        &mut self,
        submission: &NormalizedSubmission,
        files: &[FileRecord],
    ) -> Result<CreatedInvestor, StoreError> {
        if files.is_empty() {
            return Err(StoreError::InvalidInput(
                "an investor requires at least one file",
            ));
        }

        let id = InvestorId::random();
        let now = Utc::now();

        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO investor (
                 id, first_name, last_name, date_of_birth, phone_number,
                 street_address, state, zip_code, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id.to_string(),
                submission.first_name,
                submission.last_name,
                submission.date_of_birth,
                submission.phone_number,
                submission.street_address,
                submission.state,
                submission.zip_code,
                now,
                now,
            ],
        )?;

        for file in files {
            let byte_size = i64::try_from(file.size)
                .map_err(|_| StoreError::InvalidInput("file size exceeds supported range"))?;

            tx.execute(
                "INSERT INTO investor_file (
                     id, investor_id, stored_path, original_name, byte_size,
                     mime_type, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    FileId::random().to_string(),
                    id.to_string(),
                    file.stored_path,
                    file.original_name,
                    byte_size,
                    file.mime_type,
                    now,
                ],
            )?;
        }

        tx.commit()?;

        info!(investor_id=%id, files=files.len(), "created investor");

        Ok(CreatedInvestor {
            id,
            first_name: submission.first_name.clone(),
            last_name: submission.last_name.clone(),
            created_at: now,
            files_count: files.len(),
        })
    }

    /// The most recent investors, newest first. `limit` is capped at
    /// [`MAX_RECENT_LIMIT`].
    pub fn recent_investors(&self, limit: Option<u32>) -> Result<Vec<RecentInvestor>, StoreError> {
        let limit = limit.unwrap_or(MAX_RECENT_LIMIT).min(MAX_RECENT_LIMIT);

        let mut stmt = self.conn.prepare(
            "SELECT i.id, i.first_name, i.last_name, i.state, i.created_at,
                    (SELECT COUNT(*) FROM investor_file f WHERE f.investor_id = i.id)
             FROM investor i
             ORDER BY i.created_at DESC, i.rowid DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map([limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, DateTime<Utc>>(4)?,
                row.get::<_, u64>(5)?,
            ))
        })?;

        let mut investors = Vec::new();
        for row in rows {
            let (id, first_name, last_name, state, created_at, files_count) = row?;
            investors.push(RecentInvestor {
                id: parse_id(&id)?,
                first_name,
                last_name,
                state,
                created_at,
                files_count,
            });
        }

        Ok(investors)
    }

    /// Fetches one investor by identifier.
    pub fn get_investor(&self, id: InvestorId) -> Result<Investor, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, first_name, last_name, date_of_birth, phone_number,
                    street_address, state, zip_code, created_at, updated_at
             FROM investor WHERE id = ?1",
        )?;

        let investor = stmt.query_row([id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, chrono::NaiveDate>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, DateTime<Utc>>(8)?,
                row.get::<_, DateTime<Utc>>(9)?,
            ))
        })?;

        let (
            id,
            first_name,
            last_name,
            date_of_birth,
            phone_number,
            street_address,
            state,
            zip_code,
            created_at,
            updated_at,
        ) = investor;

        Ok(Investor {
            id: parse_id(&id)?,
            first_name,
            last_name,
            date_of_birth,
            phone_number,
            street_address,
            state,
            zip_code,
            created_at,
            updated_at,
        })
    }

    /// All files belonging to one investor, in insertion order.
    pub fn files_for(&self, id: InvestorId) -> Result<Vec<InvestorFile>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, investor_id, stored_path, original_name, byte_size, mime_type, created_at
             FROM investor_file WHERE investor_id = ?1 ORDER BY rowid",
        )?;

        let rows = stmt.query_map([id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, u64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, DateTime<Utc>>(6)?,
            ))
        })?;

        let mut files = Vec::new();
        for row in rows {
            let (id, investor_id, stored_path, original_name, byte_size, mime_type, created_at) =
                row?;
            files.push(InvestorFile {
                id: parse_file_id(&id)?,
                investor_id: parse_id(&investor_id)?,
                stored_path,
                original_name,
                byte_size,
                mime_type,
                created_at,
            });
        }

        Ok(files)
    }

    /// Every stored path referenced by a file row; feeds the orphan sweep.
    pub fn stored_paths(&self) -> Result<BTreeSet<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT stored_path FROM investor_file")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut paths = BTreeSet::new();
        for row in rows {
            let _ = paths.insert(row?);
        }

        Ok(paths)
    }

    /// Deletes an investor; file rows cascade.
    pub fn delete_investor(&mut self, id: InvestorId) -> Result<(), StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM investor WHERE id = ?1", [id.to_string()])?;
        if deleted == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

fn parse_id(raw: &str) -> Result<InvestorId, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Internal(format!("corrupt investor id in storage: {raw}")))
}

fn parse_file_id(raw: &str) -> Result<FileId, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Internal(format!("corrupt file id in storage: {raw}")))
}

/// Schema: the CHECK constraints restate, bound for bound, the rules in
/// `intake_primitives::validation`. SQLite forbids non-deterministic
/// functions in CHECK expressions, so the age window is anchored to the
/// row's own `created_at` instead of `date('now')`.
const SCHEMA: &str = r"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS investor (
  id             TEXT PRIMARY KEY,
  first_name     TEXT NOT NULL
                   CHECK (length(trim(first_name)) > 0 AND length(first_name) <= 100),
  last_name      TEXT NOT NULL
                   CHECK (length(trim(last_name)) > 0 AND length(last_name) <= 100),
  date_of_birth  TEXT NOT NULL,
  phone_number   TEXT NOT NULL
                   CHECK (phone_number GLOB '[0-9][0-9][0-9][0-9][0-9][0-9][0-9][0-9][0-9][0-9]'),
  street_address TEXT NOT NULL
                   CHECK (length(trim(street_address)) > 0 AND length(street_address) <= 255),
  state          TEXT NOT NULL
                   CHECK (state IN (
                     'AL','AK','AZ','AR','CA','CO','CT','DE','DC','FL','GA','HI',
                     'ID','IL','IN','IA','KS','KY','LA','ME','MD','MA','MI','MN',
                     'MS','MO','MT','NE','NV','NH','NJ','NM','NY','NC','ND','OH',
                     'OK','OR','PA','RI','SC','SD','TN','TX','UT','VT','VA','WA',
                     'WV','WI','WY')),
  zip_code       TEXT NOT NULL
                   CHECK ((zip_code GLOB '[0-9][0-9][0-9][0-9][0-9]'
                           OR zip_code GLOB '[0-9][0-9][0-9][0-9][0-9]-[0-9][0-9][0-9][0-9]')
                          AND CAST(substr(zip_code, 1, 5) AS INTEGER) BETWEEN 501 AND 99950),
  created_at     TEXT NOT NULL,
  updated_at     TEXT NOT NULL,
  CHECK (date(date_of_birth) <= date(created_at, '-18 years')
         AND date(date_of_birth) >= date(created_at, '-120 years'))
);

CREATE INDEX IF NOT EXISTS idx_investor_last_name_created_at
  ON investor (last_name, created_at);
CREATE INDEX IF NOT EXISTS idx_investor_phone_number
  ON investor (phone_number);

CREATE TABLE IF NOT EXISTS investor_file (
  id            TEXT PRIMARY KEY,
  investor_id   TEXT NOT NULL REFERENCES investor (id) ON DELETE CASCADE,
  stored_path   TEXT NOT NULL
                  CHECK (length(stored_path) BETWEEN 1 AND 500),
  original_name TEXT NOT NULL
                  CHECK (length(original_name) BETWEEN 1 AND 255),
  byte_size     INTEGER NOT NULL
                  CHECK (byte_size BETWEEN 0 AND 3145728),
  mime_type     TEXT NOT NULL
                  CHECK (length(mime_type) <= 100 AND mime_type IN
                         ('application/pdf','image/jpeg','image/jpg','image/png')),
  created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_investor_file_investor_id
  ON investor_file (investor_id);
";
