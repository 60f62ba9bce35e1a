// Unraid BFF — Library root
//
// Wires the credential store, the Unraid gateway and the HTTP API together.
// `serve` is the whole runtime; the binary only parses flags and logs.

pub mod api;
pub mod cli;
pub mod config;
pub mod enclave;
pub mod error;
pub mod gateway;
pub mod mapper;
pub mod scopes;
pub mod store;

use std::net::SocketAddr;
use std::sync::Arc;

pub use config::Config;
pub use error::{BffError, Result};

use store::{AuditLog, FileCredentialStore};

/// Open the data directory and serve the API until ctrl-c.
pub async fn serve(config: Config) -> Result<()> {
    let data_dir = config.data_dir.clone();
    let secret = config.encryption_key.clone();
    let store = run_blocking(move || Ok(FileCredentialStore::open(&data_dir, secret.as_deref())?)).await?;
    let audit = AuditLog::in_dir(&config.data_dir);
    let state = api::AppState::new(&config, Arc::new(store), audit)?;
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        data_dir = %config.data_dir.display(),
        any_origin = config.allows_any_origin(),
        "Unraid BFF listening"
    );

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Unraid BFF stopped");
    Ok(())
}

/// Run filesystem work (store open, key-file generation and its race retry)
/// on the blocking pool instead of an async worker.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| BffError::Io(std::io::Error::other(e)))?
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
