// Unraid BFF — Store Module
//
// Encrypted multi-server credential storage. The whole store lives in one
// AES-256-GCM sealed JSON file; older key material and older file layouts are
// migrated forward on read. Mutating actions are recorded in an append-only
// audit log next to it.

mod audit;
mod error;
mod models;
mod normalize;
mod repository;

pub use audit::{AuditEntry, AuditLog, AuditResult, AUDIT_FILE_NAME};
pub use error::StoreError;
pub use models::{
    AppSettings, NewServer, ServerListing, ServerStore, ServerSummary, ServerUpdate,
    SettingsUpdate, StoredServer, ThemeMode, DEFAULT_ACCENT_COLOR,
};
pub use normalize::{is_valid_accent_color, normalize_accent_color, normalize_store};
pub use repository::{CredentialStore, FileCredentialStore, LEGACY_STORE_FILE_NAME, STORE_FILE_NAME};
