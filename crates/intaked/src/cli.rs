use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use eyre::Result as EyreResult;
use intake_config::{
    default_listen, DataStoreConfig, FileStoreConfig, IntakeConfig, DEFAULT_DB_PATH,
    DEFAULT_UPLOAD_DIR,
};
use intake_filestore::FileStore;
use intake_primitives::validation::DEFAULT_MAX_FILE_SIZE;
use intake_server::ServerState;
use intake_store::Store;
use tracing::{error, info, warn};

pub const EXAMPLES: &str = r"
  # Run with defaults (listens on 127.0.0.1:2428)
  $ intaked

  # Custom storage locations
  $ intaked --db /var/lib/intake/intake.db --upload-dir /var/lib/intake/uploads

  # Tighter upload ceiling (1 MiB), hourly orphan sweep disabled
  $ intaked --max-file-size 1048576 --sweep-interval-secs 0
";

/// Minimum age before the sweep may reclaim an unreferenced file; an
/// in-flight request writes files before its rows commit.
const SWEEP_MIN_AGE: Duration = Duration::from_secs(300);

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(after_help = EXAMPLES)]
pub struct RootCommand {
    /// Address the HTTP server binds to
    #[arg(long, value_name = "ADDR", default_value_t = default_listen())]
    #[arg(env = "INTAKE_LISTEN", hide_env_values = true)]
    pub listen: SocketAddr,

    /// SQLite database file
    #[arg(long, value_name = "PATH", default_value = DEFAULT_DB_PATH)]
    #[arg(env = "INTAKE_DB", hide_env_values = true)]
    pub db: Utf8PathBuf,

    /// Directory for uploaded documents, created on demand
    #[arg(long, value_name = "PATH", default_value = DEFAULT_UPLOAD_DIR)]
    #[arg(env = "INTAKE_UPLOAD_DIR", hide_env_values = true)]
    pub upload_dir: Utf8PathBuf,

    /// Per-file upload ceiling in bytes
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_FILE_SIZE)]
    #[arg(env = "INTAKE_MAX_FILE_SIZE", hide_env_values = true)]
    pub max_file_size: u64,

    /// Seconds between orphaned-file sweeps; 0 disables the sweep
    #[arg(long, value_name = "SECS", default_value_t = 3600)]
    #[arg(env = "INTAKE_SWEEP_INTERVAL_SECS", hide_env_values = true)]
    pub sweep_interval_secs: u64,
}

impl RootCommand {
    pub async fn run(self) -> EyreResult<()> {
        let config = IntakeConfig::new(
            self.listen,
            DataStoreConfig::new(self.db),
            FileStoreConfig::new(self.upload_dir, self.max_file_size),
        );

        let store = Store::open(&config.datastore.path)?;
        let files = FileStore::new(&config.filestore.path).await?;
        info!(uploads=%files.root(), db=%config.datastore.path, "intake storage ready");

        let state = Arc::new(ServerState::new(
            store,
            files,
            config.filestore.max_file_size,
        ));

        if self.sweep_interval_secs > 0 {
            spawn_sweep(
                Arc::clone(&state),
                Duration::from_secs(self.sweep_interval_secs),
            );
        }

        intake_server::start(config.listen, state).await
    }
}

fn spawn_sweep(state: Arc<ServerState>, interval: Duration) {
    drop(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;

            let live = match state.store.lock() {
                Ok(store) => store.stored_paths(),
                Err(_) => {
                    error!("store lock poisoned; skipping orphan sweep");
                    continue;
                }
            };

            match live {
                Ok(live) => match state.files.sweep_orphans(&live, SWEEP_MIN_AGE).await {
                    Ok(0) => {}
                    Ok(removed) => info!(removed, "swept orphaned upload files"),
                    Err(err) => warn!(%err, "orphan sweep failed"),
                },
                Err(err) => warn!(%err, "could not list stored paths; skipping orphan sweep"),
            }
        }
    }));
}
