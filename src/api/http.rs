use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast::Sender as BroadcastSender;
use tracing::{error, info};

use crate::error::Error;
use crate::merge::MergePolicy;
use crate::render::{self, PresentedReading};

/// Query string sent by hubs: `s` = customer id + batch body + terminator.
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub s: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        error!(code = self.code(), error = %self, "request failed");
        (status, self.to_string()).into_response()
    }
}

pub fn router(state: Arc<crate::AppState>) -> Router {
    Router::new()
        .route("/upload.php", get(upload_handler))
        .route("/upload_save_all.php", get(upload_save_all_handler))
        .route("/check_data.php", get(check_data_handler))
        .route("/api/v1/readings", get(readings_handler))
        .route("/health", get(health_handler))
        .layer(Extension(state))
}

pub async fn run(state: Arc<crate::AppState>, listener: TcpListener, shutdown: BroadcastSender<()>) {
    let app = router(state);
    if let Ok(addr) = listener.local_addr() {
        info!("listening on http://{}", addr);
    }
    let mut shutdown_sub = shutdown.subscribe();
    let graceful = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = shutdown_sub.recv().await;
    });
    if let Err(e) = graceful.await {
        error!("server error: {}", e);
    }
}

/// Append-or-insert ingestion.
pub async fn upload_handler(
    Extension(state): Extension<Arc<crate::AppState>>,
    Query(query): Query<UploadQuery>,
) -> Result<String, Error> {
    let outcome = state.ingestor.ingest(MergePolicy::AppendOrInsert, &query.s).await?;
    Ok(outcome.status_text())
}

/// Always-append ingestion of a single reading.
pub async fn upload_save_all_handler(
    Extension(state): Extension<Arc<crate::AppState>>,
    Query(query): Query<UploadQuery>,
) -> Result<String, Error> {
    let outcome = state.ingestor.ingest(MergePolicy::AlwaysAppend, &query.s).await?;
    Ok(outcome.status_text())
}

/// Raw table as an array of arrays, the shape the dashboard polls.
pub async fn check_data_handler(
    Extension(state): Extension<Arc<crate::AppState>>,
) -> Result<Json<Vec<Value>>, Error> {
    let table = state.store.load().await?;
    Ok(Json(render::raw_rows(&table)))
}

/// Readings with sign correction and display units applied.
pub async fn readings_handler(
    Extension(state): Extension<Arc<crate::AppState>>,
) -> Result<Json<Vec<PresentedReading>>, Error> {
    let table = state.store.load().await?;
    Ok(Json(render::presented(&table)))
}

pub async fn health_handler() -> &'static str {
    "ok"
}
