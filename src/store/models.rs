// Unraid BFF — Store data models
//
// SECURITY: `api_key` is private. It is never included in Debug output, log
// messages, or HTTP responses; only the encrypted store file carries it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Accent used when none is configured or the stored value is unrecognized.
pub const DEFAULT_ACCENT_COLOR: &str = "#ea580c";

/// One configured Unraid server, as persisted in the encrypted store.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredServer {
    pub id: String,
    pub name: String,
    pub accent_color: String,
    pub base_url: String,
    /// The Unraid API key. NEVER printed, logged, or Debug-displayed
    api_key: String,
    pub trust_self_signed: bool,
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl StoredServer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        name: String,
        accent_color: String,
        base_url: String,
        api_key: String,
        trust_self_signed: bool,
        scopes: Vec<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            accent_color,
            base_url,
            api_key,
            trust_self_signed,
            scopes,
            created_at,
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = api_key;
    }

    /// Metadata view that is safe to return over HTTP.
    pub fn summary(&self) -> ServerSummary {
        ServerSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            accent_color: self.accent_color.clone(),
            base_url: self.base_url.clone(),
            trust_self_signed: self.trust_self_signed,
            scopes: self.scopes.clone(),
            created_at: self.created_at,
        }
    }
}

impl fmt::Debug for StoredServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredServer")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("accent_color", &self.accent_color)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("trust_self_signed", &self.trust_self_signed)
            .field("scopes", &self.scopes)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl fmt::Display for StoredServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.id, self.name, self.base_url)
    }
}

/// A server without its api key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSummary {
    pub id: String,
    pub name: String,
    pub accent_color: String,
    pub base_url: String,
    pub trust_self_signed: bool,
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Result of `list_all`.
#[derive(Debug, Clone)]
pub struct ServerListing {
    pub active_server_id: Option<String>,
    pub servers: Vec<StoredServer>,
}

// ─── App Settings ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
}

impl ThemeMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub theme_mode: ThemeMode,
    pub accent_color: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme_mode: ThemeMode::Dark,
            accent_color: DEFAULT_ACCENT_COLOR.to_string(),
        }
    }
}

// ─── Root Aggregate ──────────────────────────────────────────────────────────

/// Everything persisted in the encrypted store file.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStore {
    pub active_server_id: Option<String>,
    pub servers: Vec<StoredServer>,
    pub app_settings: AppSettings,
}

impl ServerStore {
    pub fn find(&self, id: &str) -> Option<&StoredServer> {
        self.servers.iter().find(|server| server.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut StoredServer> {
        self.servers.iter_mut().find(|server| server.id == id)
    }

    pub fn active(&self) -> Option<&StoredServer> {
        self.active_server_id.as_deref().and_then(|id| self.find(id))
    }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input for `save`. Missing optional fields take store defaults.
pub struct NewServer {
    pub id: Option<String>,
    pub name: Option<String>,
    pub accent_color: Option<String>,
    pub base_url: String,
    pub api_key: String,
    pub trust_self_signed: Option<bool>,
    pub scopes: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl NewServer {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            id: None,
            name: None,
            accent_color: None,
            base_url: base_url.into(),
            api_key: api_key.into(),
            trust_self_signed: None,
            scopes: Vec::new(),
            created_at: None,
        }
    }
}

/// Partial update for an existing server. `None` and blank values are no-ops.
#[derive(Default)]
pub struct ServerUpdate {
    pub name: Option<String>,
    pub trust_self_signed: Option<bool>,
    pub accent_color: Option<String>,
    pub api_key: Option<String>,
}

/// Partial update for the app settings.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub theme_mode: Option<ThemeMode>,
    pub accent_color: Option<String>,
}

// ─── Tests ───────────────────────────────────────────────────────────────────
