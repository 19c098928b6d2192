//! HTTP surface for the investor intake service.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Extension, Router};
use intake_filestore::FileStore;
use intake_store::Store;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod handlers;
pub mod service;

use crate::handlers::investors::{create_investor_handler, list_investors_handler};
use crate::service::health_check_handler;

/// Process-wide state, initialized once at startup and shared across
/// requests. Nothing in here is mutated per request beyond the store's own
/// transactional writes.
#[derive(Debug)]
pub struct ServerState {
    pub store: Mutex<Store>,
    pub files: FileStore,
    pub max_file_size: u64,
}

impl ServerState {
    #[must_use]
    pub fn new(store: Store, files: FileStore, max_file_size: u64) -> Self {
        Self {
            store: Mutex::new(store),
            files,
            max_file_size,
        }
    }
}

/// Assembles the application router. Exposed separately from [`start`] so
/// tests can drive it without a listener.
#[must_use]
pub fn router(state: Arc<ServerState>) -> Router {
    // Leave headroom above the per-file ceiling so a full batch reaches the
    // validators instead of dying in the framework's body limit.
    let body_limit = usize::try_from(
        state
            .max_file_size
            .saturating_mul(5)
            .saturating_add(1 << 20),
    )
    .unwrap_or(usize::MAX);

    Router::new()
        .route(
            "/api/investors",
            post(create_investor_handler).get(list_investors_handler),
        )
        .route("/health", get(health_check_handler))
        .layer(Extension(state))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds the listener and serves until the task is stopped.
pub async fn start(listen: SocketAddr, state: Arc<ServerState>) -> eyre::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
