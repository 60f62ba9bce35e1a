// Unraid BFF — Enclave Module
//
// Resolves the key material that protects the server store and implements
// the AES-256-GCM record format used on disk. Key material is derived by
// hashing a key source: either a configured secret or a random key that is
// generated once and persisted next to the data files.

mod cipher;
mod error;
mod provider;

pub use cipher::{KeyRing, Opened};
pub use error::EnclaveError;
pub use provider::{
    is_weak_secret, resolve_key, ConfiguredSecret, DerivedKey, GeneratedKeyFile, KeySource,
    KEY_FILE_NAME, LEGACY_FALLBACK_SECRET,
};
