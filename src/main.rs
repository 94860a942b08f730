//! Raider Hotline - voice IVR dialogue engine
//!
//! Routes caller turns through a set of small hotline state machines and
//! serves them over a stateless form endpoint and a WebSocket stream.

mod api;
mod config;
mod db;
mod hotline;
mod intent;
mod memory;
mod records;
mod router;
mod session;
mod signature;
mod transport;
mod turn;

#[cfg(test)]
mod testing;

use api::{create_router, AppState};
use config::HotlineConfig;
use db::Database;
use records::{LoggingRecordStore, RecordStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "raider_hotline=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = HotlineConfig::from_env();

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&config.db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path, "Opening database");
    let db = Database::open(&config.db_path)?;
    let records: Arc<dyn RecordStore> = Arc::new(LoggingRecordStore::new(Arc::new(db)));

    let verifier = signature::verifier_for(config.signing_secret.as_deref(), config.require_signature);

    let port = config.port;
    let sweep_interval = config.sweep_interval();
    let state = AppState::new(config, records.clone(), verifier);

    let shutdown = CancellationToken::new();
    let sweeper = session::spawn_sweeper(
        state.sessions.clone(),
        records,
        sweep_interval,
        shutdown.clone(),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Raider Hotline listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutting down");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "Session sweeper ended abnormally");
    }

    Ok(())
}
