// Unraid BFF — Credential Store Repository
//
// Every operation is a full read-decrypt-modify-encrypt-write cycle over a
// single sealed file. There is no cross-request locking: concurrent writers
// race and the last rename wins, but a rename never leaves a torn file.
//
// Read path:
//   1. `servers.enc` present → open (current key, then legacy key)
//   2. `servers.enc` absent  → try the deprecated `server.enc`
//   3. neither present       → empty default store
// Anything other than "file missing" is fatal; the store is never reset.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::models::{
    AppSettings, NewServer, ServerListing, ServerStore, ServerUpdate, SettingsUpdate,
    StoredServer, DEFAULT_ACCENT_COLOR,
};
use super::normalize::{normalize_accent_color, normalize_store};
use super::StoreError;
use crate::enclave::KeyRing;

pub const STORE_FILE_NAME: &str = "servers.enc";
pub const LEGACY_STORE_FILE_NAME: &str = "server.enc";

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over server credential storage.
pub trait CredentialStore: Send + Sync {
    /// Upsert a server. Blank names get the next `Server N` label and the
    /// first saved server becomes active.
    fn save(&self, server: NewServer) -> Result<StoredServer, StoreError>;

    /// The server referenced by the active pointer, if any.
    fn load_active(&self) -> Result<Option<StoredServer>, StoreError>;

    fn load_by_id(&self, id: &str) -> Result<Option<StoredServer>, StoreError>;

    fn list_all(&self) -> Result<ServerListing, StoreError>;

    /// Apply the provided non-blank fields. Returns false if `id` is unknown.
    fn update(&self, id: &str, update: ServerUpdate) -> Result<bool, StoreError>;

    /// Switch the active pointer. Returns false if `id` is unknown.
    fn set_active(&self, id: &str) -> Result<bool, StoreError>;

    /// Delete a server, promoting the first remaining one if it was active.
    /// Returns false if `id` is unknown.
    fn remove(&self, id: &str) -> Result<bool, StoreError>;

    fn settings(&self) -> Result<AppSettings, StoreError>;

    fn update_settings(&self, update: SettingsUpdate) -> Result<AppSettings, StoreError>;
}

// ─── File Implementation ─────────────────────────────────────────────────────

pub struct FileCredentialStore {
    primary_path: PathBuf,
    legacy_path: PathBuf,
    keys: KeyRing,
}

impl FileCredentialStore {
    /// Open the store in `data_dir`, resolving the store key from the
    /// configured secret or the generated key file.
    pub fn open(data_dir: &Path, configured_secret: Option<&str>) -> Result<Self, StoreError> {
        fs::create_dir_all(data_dir).map_err(|e| StoreError::io(data_dir, e))?;
        let keys = KeyRing::resolve(configured_secret, data_dir)?;
        Ok(Self::with_keys(data_dir, keys))
    }

    pub fn with_keys(data_dir: &Path, keys: KeyRing) -> Self {
        Self {
            primary_path: data_dir.join(STORE_FILE_NAME),
            legacy_path: data_dir.join(LEGACY_STORE_FILE_NAME),
            keys,
        }
    }

    pub fn path(&self) -> &Path {
        &self.primary_path
    }

    fn read_sealed(path: &Path) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    /// Decrypt and normalize one sealed file. The flag reports whether the
    /// content must be written back under the current key and schema.
    fn open_sealed(&self, sealed: &str) -> Result<(ServerStore, bool), StoreError> {
        let opened = self.keys.open(sealed)?;
        let payload: Value = serde_json::from_str(&opened.plaintext)?;
        let store = normalize_store(&payload);
        let schema_changed = serde_json::to_value(&store)? != payload;
        Ok((store, opened.needs_reseal || schema_changed))
    }

    fn read_store(&self) -> Result<ServerStore, StoreError> {
        if let Some(sealed) = Self::read_sealed(&self.primary_path)? {
            let (store, rewrite) = self.open_sealed(&sealed)?;
            if rewrite {
                tracing::info!(path = %self.primary_path.display(), "Re-encrypting store under the current key and schema");
                self.write_store(&store)?;
            }
            return Ok(store);
        }

        if let Some(sealed) = Self::read_sealed(&self.legacy_path)? {
            let (store, _) = self.open_sealed(&sealed)?;
            tracing::info!(
                from = %self.legacy_path.display(),
                to = %self.primary_path.display(),
                "Migrating deprecated store file"
            );
            self.write_store(&store)?;
            return Ok(store);
        }

        Ok(ServerStore::default())
    }

    /// Seal and atomically replace the primary file.
    fn write_store(&self, store: &ServerStore) -> Result<(), StoreError> {
        let json = zeroize::Zeroizing::new(serde_json::to_string(store)?);
        let sealed = self.keys.seal(&json)?;

        let dir = self
            .primary_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        }

        let temp_path = dir.join(format!(".{}.{}.tmp", STORE_FILE_NAME, Uuid::new_v4()));
        let result = write_private(&temp_path, sealed.as_bytes())
            .and_then(|_| fs::rename(&temp_path, &self.primary_path));
        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::io(&self.primary_path, e));
        }
        Ok(())
    }
}

fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn trimmed_non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, server: NewServer) -> Result<StoredServer, StoreError> {
        let mut store = self.read_store()?;

        let id = trimmed_non_blank(server.id).unwrap_or_else(|| Uuid::new_v4().to_string());
        let name = trimmed_non_blank(server.name)
            .unwrap_or_else(|| format!("Server {}", store.servers.len() + 1));
        let existing = store.find(&id);

        let trust_self_signed = server
            .trust_self_signed
            .or(existing.map(|s| s.trust_self_signed))
            .unwrap_or(true);
        let accent_color = match (server.accent_color, existing) {
            (Some(color), _) => normalize_accent_color(Some(&color)),
            (None, Some(current)) => current.accent_color.clone(),
            (None, None) => DEFAULT_ACCENT_COLOR.to_string(),
        };
        let created_at = server
            .created_at
            .or(existing.map(|s| s.created_at))
            .unwrap_or_else(Utc::now);

        let next = StoredServer::new(
            id.clone(),
            name,
            accent_color,
            server.base_url,
            server.api_key,
            trust_self_signed,
            server.scopes,
            created_at,
        );

        match store.servers.iter().position(|item| item.id == id) {
            Some(index) => store.servers[index] = next.clone(),
            None => store.servers.push(next.clone()),
        }
        if store.active_server_id.is_none() {
            store.active_server_id = Some(id.clone());
        }

        self.write_store(&store)?;
        tracing::info!(server_id = %id, name = %next.name, "Server saved");
        Ok(next)
    }

    fn load_active(&self) -> Result<Option<StoredServer>, StoreError> {
        Ok(self.read_store()?.active().cloned())
    }

    fn load_by_id(&self, id: &str) -> Result<Option<StoredServer>, StoreError> {
        Ok(self.read_store()?.find(id).cloned())
    }

    fn list_all(&self) -> Result<ServerListing, StoreError> {
        let store = self.read_store()?;
        Ok(ServerListing {
            active_server_id: store.active_server_id,
            servers: store.servers,
        })
    }

    fn update(&self, id: &str, update: ServerUpdate) -> Result<bool, StoreError> {
        let mut store = self.read_store()?;
        let Some(target) = store.find_mut(id) else {
            return Ok(false);
        };

        if let Some(name) = trimmed_non_blank(update.name) {
            target.name = name;
        }
        if let Some(trust) = update.trust_self_signed {
            target.trust_self_signed = trust;
        }
        if let Some(color) = update.accent_color {
            target.accent_color = normalize_accent_color(Some(&color));
        }
        if let Some(api_key) = trimmed_non_blank(update.api_key) {
            target.set_api_key(api_key);
        }

        self.write_store(&store)?;
        tracing::info!(server_id = %id, "Server updated");
        Ok(true)
    }

    fn set_active(&self, id: &str) -> Result<bool, StoreError> {
        let mut store = self.read_store()?;
        if store.find(id).is_none() {
            return Ok(false);
        }
        store.active_server_id = Some(id.to_string());
        self.write_store(&store)?;
        tracing::info!(server_id = %id, "Active server switched");
        Ok(true)
    }

    fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let mut store = self.read_store()?;
        let before = store.servers.len();
        store.servers.retain(|server| server.id != id);
        if store.servers.len() == before {
            return Ok(false);
        }

        if store.active_server_id.as_deref() == Some(id) {
            store.active_server_id = store.servers.first().map(|server| server.id.clone());
        }

        self.write_store(&store)?;
        tracing::info!(server_id = %id, "Server removed");
        Ok(true)
    }

    fn settings(&self) -> Result<AppSettings, StoreError> {
        Ok(self.read_store()?.app_settings)
    }

    fn update_settings(&self, update: SettingsUpdate) -> Result<AppSettings, StoreError> {
        let mut store = self.read_store()?;
        let current = store.app_settings.clone();

        store.app_settings = AppSettings {
            theme_mode: update.theme_mode.unwrap_or(current.theme_mode),
            accent_color: normalize_accent_color(Some(
                update.accent_color.as_deref().unwrap_or(&current.accent_color),
            )),
        };

        self.write_store(&store)?;
        Ok(store.app_settings)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
