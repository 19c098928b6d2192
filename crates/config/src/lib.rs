//! Process configuration for the intake service.
//!
//! All values are environment-supplied and read exactly once at process
//! start; nothing here is mutated per request.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use camino::Utf8PathBuf;
use intake_primitives::validation::DEFAULT_MAX_FILE_SIZE;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 2428;
pub const DEFAULT_UPLOAD_DIR: &str = "./uploads";
pub const DEFAULT_DB_PATH: &str = "./intake.db";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub struct IntakeConfig {
    /// Address the HTTP server binds to.
    pub listen: SocketAddr,

    pub datastore: DataStoreConfig,

    pub filestore: FileStoreConfig,
}

impl IntakeConfig {
    #[must_use]
    pub const fn new(
        listen: SocketAddr,
        datastore: DataStoreConfig,
        filestore: FileStoreConfig,
    ) -> Self {
        Self {
            listen,
            datastore,
            filestore,
        }
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self::new(
            default_listen(),
            DataStoreConfig {
                path: Utf8PathBuf::from(DEFAULT_DB_PATH),
            },
            FileStoreConfig {
                path: Utf8PathBuf::from(DEFAULT_UPLOAD_DIR),
                max_file_size: DEFAULT_MAX_FILE_SIZE,
            },
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub struct DataStoreConfig {
    /// SQLite database file.
    pub path: Utf8PathBuf,
}

impl DataStoreConfig {
    #[must_use]
    pub const fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub struct FileStoreConfig {
    /// Root directory for uploaded documents, created on demand.
    pub path: Utf8PathBuf,

    /// Per-file size ceiling in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl FileStoreConfig {
    #[must_use]
    pub const fn new(path: Utf8PathBuf, max_file_size: u64) -> Self {
        Self {
            path,
            max_file_size,
        }
    }
}

#[must_use]
pub const fn default_listen() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT)
}

const fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}
