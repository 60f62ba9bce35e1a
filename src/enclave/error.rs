// Unraid BFF — Enclave error types

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnclaveError {
    #[error("Key file error at {path}: {source}")]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Key file {0} exists but holds no key material")]
    EmptyKeyFile(PathBuf),

    #[error("No key source produced key material")]
    NoKeyMaterial,

    #[error("Corrupt encrypted payload: {0}")]
    CorruptPayload(String),

    #[error("Decryption failed: payload does not match the current or legacy key")]
    DecryptionFailed,

    #[error("Encryption failed")]
    EncryptionFailed,
}
