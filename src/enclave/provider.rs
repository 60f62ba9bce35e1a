// Unraid BFF — Key Sources
//
// The store key is resolved by walking an ordered list of key sources and
// taking the first one that yields material. Sources are side-effect free
// except the generated key file, which persists a fresh random key the first
// time it is consulted. Persisting uses exclusive-create, so when two
// processes race the first writer wins and the loser reads the winner's key.
//
// Flow:
//   1. `ConfiguredSecret`: the UNRAID_BFF_ENCRYPTION_KEY value, unless weak
//   2. `GeneratedKeyFile`: `<data-dir>/.encryption-key` (read, or create once)
//   3. The chosen source string is hashed with SHA-256 into a 256-bit key

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::EnclaveError;

// ─── Constants ───────────────────────────────────────────────────────────────

/// Secrets shorter than this are treated as unset.
const MIN_SECRET_LEN: usize = 16;

/// Prefix used by the sample `.env` placeholders.
const PLACEHOLDER_PREFIX: &str = "replace-with-";

/// The insecure default earlier releases encrypted with. Only ever used to
/// decrypt, never to encrypt.
pub const LEGACY_FALLBACK_SECRET: &str = "unraid-pwa-insecure-dev-key";

/// File name of the generated key inside the data directory.
pub const KEY_FILE_NAME: &str = ".encryption-key";

/// Random bytes in a generated key (hex-encoded on disk).
const GENERATED_KEY_LEN: usize = 32;

/// How often a reader retries a key file another process is still writing.
const KEY_FILE_READ_ATTEMPTS: u32 = 5;

static WARNED_WEAK_SECRET: AtomicBool = AtomicBool::new(false);

// ─── Derived Key ─────────────────────────────────────────────────────────────

/// A 256-bit AES key derived from a key source. Zeroized on drop.
pub struct DerivedKey(Zeroizing<[u8; 32]>);

impl DerivedKey {
    /// Derive the key for `source` (SHA-256 of its bytes).
    pub fn from_source(source: &[u8]) -> Self {
        let digest = Sha256::digest(source);
        let mut bytes = Zeroizing::new([0u8; 32]);
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    pub fn legacy() -> Self {
        Self::from_source(LEGACY_FALLBACK_SECRET.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// One strategy for obtaining key material.
pub trait KeySource {
    /// Short label for logs.
    fn describe(&self) -> &'static str;

    /// Return the key source string, or `None` to let the next source try.
    fn resolve(&self) -> Result<Option<Zeroizing<String>>, EnclaveError>;
}

/// Walk `sources` in order and derive the key from the first one that answers.
pub fn resolve_key(sources: &[&dyn KeySource]) -> Result<DerivedKey, EnclaveError> {
    for source in sources {
        if let Some(material) = source.resolve()? {
            tracing::debug!(source = source.describe(), "Resolved store key material");
            return Ok(DerivedKey::from_source(material.as_bytes()));
        }
    }
    Err(EnclaveError::NoKeyMaterial)
}

// ─── Configured Secret ───────────────────────────────────────────────────────

/// True when a configured secret must not be used directly.
pub fn is_weak_secret(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.len() < MIN_SECRET_LEN || trimmed.starts_with(PLACEHOLDER_PREFIX)
}

/// The secret supplied through the environment.
pub struct ConfiguredSecret {
    secret: Option<Zeroizing<String>>,
}

impl ConfiguredSecret {
    pub fn new(raw: Option<&str>) -> Self {
        Self {
            secret: raw.map(|value| Zeroizing::new(value.trim().to_string())),
        }
    }
}

impl KeySource for ConfiguredSecret {
    fn describe(&self) -> &'static str {
        "configured-secret"
    }

    fn resolve(&self) -> Result<Option<Zeroizing<String>>, EnclaveError> {
        match &self.secret {
            Some(secret) if !is_weak_secret(secret) => Ok(Some(secret.clone())),
            _ => {
                if !WARNED_WEAK_SECRET.swap(true, Ordering::Relaxed) {
                    tracing::warn!(
                        "UNRAID_BFF_ENCRYPTION_KEY is missing or weak, using a generated local key file"
                    );
                }
                Ok(None)
            }
        }
    }
}

// ─── Generated Key File ──────────────────────────────────────────────────────

/// A random key persisted with owner-only permissions.
pub struct GeneratedKeyFile {
    path: PathBuf,
}

impl GeneratedKeyFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Key file location inside `data_dir`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(KEY_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn key_file_error(&self, source: std::io::Error) -> EnclaveError {
        EnclaveError::KeyFile {
            path: self.path.clone(),
            source,
        }
    }

    fn read_existing(&self) -> Result<Option<Zeroizing<String>>, EnclaveError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let content = Zeroizing::new(content);
                let trimmed = content.trim();
                if trimmed.is_empty() {
                    Ok(Some(Zeroizing::new(String::new())))
                } else {
                    Ok(Some(Zeroizing::new(trimmed.to_string())))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.key_file_error(e)),
        }
    }

    /// Read a key file that another writer created, waiting briefly for its
    /// content to land. Blocks the calling thread; async callers go through
    /// `spawn_blocking`.
    fn read_after_race(&self) -> Result<Zeroizing<String>, EnclaveError> {
        for _ in 0..KEY_FILE_READ_ATTEMPTS {
            if let Some(key) = self.read_existing()? {
                if !key.is_empty() {
                    return Ok(key);
                }
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        Err(EnclaveError::EmptyKeyFile(self.path.clone()))
    }

    fn generate() -> Zeroizing<String> {
        let mut bytes = Zeroizing::new([0u8; GENERATED_KEY_LEN]);
        rand::rng().fill_bytes(bytes.as_mut());
        Zeroizing::new(hex::encode(bytes.as_ref()))
    }

    fn create_exclusive(&self, key: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path)?;
        file.write_all(key.as_bytes())
            .and_then(|_| file.write_all(b"\n"))
            .and_then(|_| file.sync_all())
    }
}

impl KeySource for GeneratedKeyFile {
    fn describe(&self) -> &'static str {
        "generated-key-file"
    }

    fn resolve(&self) -> Result<Option<Zeroizing<String>>, EnclaveError> {
        match self.read_existing()? {
            Some(key) if !key.is_empty() => return Ok(Some(key)),
            Some(_) => return self.read_after_race().map(Some),
            None => {}
        }

        let key = Self::generate();
        match self.create_exclusive(&key) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Generated new store key file");
                Ok(Some(key))
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!("Key file created concurrently, adopting existing key");
                self.read_after_race().map(Some)
            }
            Err(e) => Err(self.key_file_error(e)),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
