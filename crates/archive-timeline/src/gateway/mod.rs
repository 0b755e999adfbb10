//! Proxy gateway.
//!
//! A stateless HTTP relay: `GET /api/records?offset=...` becomes an
//! authenticated upstream call whose JSON body is returned byte for byte. Any
//! upstream failure becomes a single generic 500. No retries, no caching.
//! Other paths are served from the prebuilt frontend bundle, falling back to
//! its `index.html` so client-side routes resolve.

mod upstream;

use std::path::Path;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, error, info, warn};

pub use upstream::{AirtableUpstream, RecordsUpstream};

use crate::client::RECORDS_PATH;
use crate::config::Config;
use crate::error::{Error, Result};

/// Body of every upstream failure response.
pub const UPSTREAM_ERROR_MESSAGE: &str = "Failed to fetch records.";

/// Liveness route.
pub const HEALTH_PATH: &str = "/healthz";

/// Shared, read-only handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    upstream: Arc<dyn RecordsUpstream>,
}

impl AppState {
    /// State relaying to `upstream`.
    #[must_use]
    pub fn new(upstream: Arc<dyn RecordsUpstream>) -> Self {
        Self { upstream }
    }

    /// State relaying to Airtable as configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream values are missing.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(Arc::new(AirtableUpstream::from_config(config)?)))
    }
}

/// The cursor from a records query string.
///
/// Only the first `offset` counts; an empty one means the first page. Other
/// parameters are ignored.
fn requested_offset(params: &[(String, String)]) -> Option<&str> {
    params
        .iter()
        .find(|(name, _)| name == "offset")
        .map(|(_, value)| value.as_str())
        .filter(|offset| !offset.is_empty())
}

async fn records_handler(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let offset = requested_offset(&params);
    debug!(has_offset = offset.is_some(), "relaying records request");

    match state.upstream.list_records(offset).await {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(err) => {
            error!("error fetching records: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": UPSTREAM_ERROR_MESSAGE })),
            )
                .into_response()
        }
    }
}

async fn healthz_handler() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

/// Build the gateway router.
///
/// `static_dir`, when given, serves every unmatched GET, with `index.html`
/// as the fallback document.
pub fn build_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .route(RECORDS_PATH, get(records_handler))
        .route(HEALTH_PATH, get(healthz_handler))
        .with_state(state);

    match static_dir {
        Some(dir) => {
            let index = dir.join("index.html");
            router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)))
        }
        None => router,
    }
}

/// Resolve the configured static directory.
///
/// A missing directory disables static hosting with a warning; a path that
/// exists but is not a directory is an error.
///
/// # Errors
///
/// Returns [`Error::StaticDir`] when the path is not a directory.
pub fn resolve_static_dir(config: &Config) -> Result<Option<&Path>> {
    let Some(dir) = config.server.static_dir.as_deref() else {
        return Ok(None);
    };
    if dir.is_dir() {
        Ok(Some(dir))
    } else if dir.exists() {
        Err(Error::StaticDir {
            path: dir.to_path_buf(),
        })
    } else {
        warn!(path = %dir.display(), "static directory not found; serving API only");
        Ok(None)
    }
}

/// Run the gateway until interrupted.
///
/// # Errors
///
/// Returns an error if required configuration is missing, the listener
/// cannot be bound, or the server fails.
pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState::from_config(config)?;
    let router = build_router(state, resolve_static_dir(config)?);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| Error::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!("Server is running on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}
