// Unraid BFF — Store error types

use std::path::PathBuf;

use thiserror::Error;

use crate::enclave::EnclaveError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store file error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store encryption error: {0}")]
    Enclave(#[from] EnclaveError),

    #[error("Store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
