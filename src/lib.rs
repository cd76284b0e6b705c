use std::sync::Arc;
use tracing::info;

pub mod api;
pub mod codec;
pub mod config;
pub mod error;
pub mod ingest;
pub mod merge;
pub mod render;
pub mod storage;

pub use error::{Error, Result};

pub struct AppState {
    pub config: config::Config,
    pub store: Arc<storage::TableStore>,
    pub ingestor: ingest::Ingestor,
}

impl AppState {
    pub fn new(config: config::Config) -> Self {
        let store = Arc::new(storage::TableStore::new(config.data_file.clone()));
        let ingestor = ingest::Ingestor::new(store.clone(), config.accounting());
        Self { config, store, ingestor }
    }
}

pub async fn run_server(config: config::Config) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(config));
    if state.config.init_table {
        state.store.init_if_missing().await?;
    }
    info!(
        data_file = %state.store.path().display(),
        accounting = ?state.ingestor.accounting(),
        "table store ready"
    );

    let listener = tokio::net::TcpListener::bind(state.config.bind).await?;

    // broadcast channel for shutdown signaling
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    // run HTTP server in background; it will be shut down via broadcast signal
    let http_state = state.clone();
    let http_shutdown = shutdown_tx.clone();
    let server = tokio::spawn(async move {
        api::http::run(http_state, listener, http_shutdown).await;
    });

    // wait for CTRL-C then signal shutdown
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    let _ = shutdown_tx.send(());
    server.await?;
    Ok(())
}
