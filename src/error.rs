// Unraid BFF — Top-level error types
//
// Aggregates the module errors into a single enum for the binary boundary.
// HTTP handlers use `api::ApiError` instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BffError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Enclave error: {0}")]
    Enclave(#[from] crate::enclave::EnclaveError),

    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] crate::gateway::GatewayError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BffError>;
