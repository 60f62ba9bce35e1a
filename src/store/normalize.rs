// Unraid BFF — Store schema normalization
//
// Every read passes the decrypted JSON through here. Three shapes are accepted:
// the current multi-server store, the single-server layout written by early
// releases, and anything else (treated as an empty store). Each server record
// is re-validated field by field so a hand-edited or partially written file
// still loads.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::models::{AppSettings, ServerStore, StoredServer, ThemeMode, DEFAULT_ACCENT_COLOR};

/// Name given to the server migrated from the single-server layout.
pub const LEGACY_SERVER_NAME: &str = "Primary server";

const LEGACY_ACCENTS: [(&str, &str); 5] = [
    ("amber", "#d97706"),
    ("orange", "#ea580c"),
    ("purple", "#9333ea"),
    ("blue", "#3b82f6"),
    ("green", "#22c55e"),
];

// ─── Colors & Theme ──────────────────────────────────────────────────────────

/// Map a legacy color name or hex color to a lowercase `#rrggbb` value.
/// Anything unrecognized becomes the default accent.
pub fn normalize_accent_color(value: Option<&str>) -> String {
    let Some(raw) = value else {
        return DEFAULT_ACCENT_COLOR.to_string();
    };
    let trimmed = raw.trim().to_ascii_lowercase();

    if let Some((_, hex)) = LEGACY_ACCENTS.iter().find(|(name, _)| *name == trimmed) {
        return (*hex).to_string();
    }

    let Some(digits) = trimmed.strip_prefix('#') else {
        return DEFAULT_ACCENT_COLOR.to_string();
    };
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return DEFAULT_ACCENT_COLOR.to_string();
    }

    match digits.len() {
        3 => {
            let expanded: String = digits.chars().flat_map(|c| [c, c]).collect();
            format!("#{}", expanded)
        }
        6 => trimmed,
        _ => DEFAULT_ACCENT_COLOR.to_string(),
    }
}

/// True when `value` is a hex color or one of the legacy color names.
pub fn is_valid_accent_color(value: &str) -> bool {
    let lowered = value.trim().to_ascii_lowercase();
    if LEGACY_ACCENTS.iter().any(|(name, _)| *name == lowered) {
        return true;
    }
    match lowered.strip_prefix('#') {
        Some(digits) => {
            matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

pub fn normalize_theme_mode(value: Option<&str>) -> ThemeMode {
    value.and_then(ThemeMode::parse).unwrap_or_default()
}

// ─── Store Shapes ────────────────────────────────────────────────────────────

/// Convert any decrypted payload into a valid `ServerStore`.
pub fn normalize_store(payload: &Value) -> ServerStore {
    let Some(object) = payload.as_object() else {
        return ServerStore::default();
    };

    if let Some(servers) = object.get("servers").and_then(Value::as_array) {
        return normalize_multi_server(object, servers);
    }

    if object.contains_key("baseUrl") && object.contains_key("apiKey") {
        return migrate_single_server(object);
    }

    ServerStore::default()
}

fn normalize_multi_server(object: &Map<String, Value>, servers: &[Value]) -> ServerStore {
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(servers.len());

    for (index, raw) in servers.iter().enumerate() {
        let mut server = normalize_server(raw, index);
        if !seen.insert(server.id.clone()) {
            let replacement = Uuid::new_v4().to_string();
            tracing::warn!(
                duplicate_id = %server.id,
                new_id = %replacement,
                "Duplicate server id in store, regenerating"
            );
            server.id = replacement.clone();
            seen.insert(replacement);
        }
        normalized.push(server);
    }

    let requested_active = object.get("activeServerId").and_then(Value::as_str);
    let active_server_id = match requested_active {
        Some(id) if normalized.iter().any(|server| server.id == id) => Some(id.to_string()),
        _ => normalized.first().map(|server| server.id.clone()),
    };

    let settings = object.get("appSettings");
    let app_settings = AppSettings {
        theme_mode: normalize_theme_mode(str_field(settings, "themeMode")),
        accent_color: normalize_accent_color(str_field(settings, "accentColor")),
    };

    ServerStore {
        active_server_id,
        servers: normalized,
        app_settings,
    }
}

fn migrate_single_server(object: &Map<String, Value>) -> ServerStore {
    let id = Uuid::new_v4().to_string();
    let server = StoredServer::new(
        id.clone(),
        LEGACY_SERVER_NAME.to_string(),
        DEFAULT_ACCENT_COLOR.to_string(),
        string_or_empty(object.get("baseUrl")),
        string_or_empty(object.get("apiKey")),
        true,
        string_list(object.get("scopes")),
        timestamp_or_now(object.get("createdAt")),
    );
    tracing::info!(server_id = %id, "Migrated single-server store layout");

    ServerStore {
        active_server_id: Some(id),
        servers: vec![server],
        app_settings: AppSettings::default(),
    }
}

/// Re-validate one server record. `index` drives the fallback display name.
pub fn normalize_server(raw: &Value, index: usize) -> StoredServer {
    let id = non_blank(raw.get("id"))
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let name = non_blank(raw.get("name"))
        .map(|name| name.trim().to_string())
        .unwrap_or_else(|| format!("Server {}", index + 1));

    StoredServer::new(
        id,
        name,
        normalize_accent_color(raw.get("accentColor").and_then(Value::as_str)),
        string_or_empty(raw.get("baseUrl")),
        string_or_empty(raw.get("apiKey")),
        raw.get("trustSelfSigned").and_then(Value::as_bool).unwrap_or(true),
        string_list(raw.get("scopes")),
        timestamp_or_now(raw.get("createdAt")),
    )
}

// ─── Field Helpers ───────────────────────────────────────────────────────────

fn str_field<'a>(parent: Option<&'a Value>, key: &str) -> Option<&'a str> {
    parent.and_then(|value| value.get(key)).and_then(Value::as_str)
}

fn non_blank(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
}

fn string_or_empty(value: Option<&Value>) -> String {
    value.and_then(Value::as_str).unwrap_or_default().to_string()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn timestamp_or_now(value: Option<&Value>) -> DateTime<Utc> {
    non_blank(value)
        .and_then(|text| DateTime::parse_from_rfc3339(text.trim()).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_short_hex_expands() {
        assert_eq!(normalize_accent_color(Some("#abc")), "#aabbcc");
        assert_eq!(normalize_accent_color(Some("#ABC")), "#aabbcc");
        assert_eq!(normalize_accent_color(Some("  #F0a ")), "#ff00aa");
    }

    #[test]
    fn test_long_hex_lowercased() {
        assert_eq!(normalize_accent_color(Some("#3B82F6")), "#3b82f6");
    }

    #[test]
    fn test_legacy_color_names_map() {
        assert_eq!(normalize_accent_color(Some("amber")), "#d97706");
        assert_eq!(normalize_accent_color(Some("Orange")), "#ea580c");
        assert_eq!(normalize_accent_color(Some("purple")), "#9333ea");
        assert_eq!(normalize_accent_color(Some("blue")), "#3b82f6");
        assert_eq!(normalize_accent_color(Some("green")), "#22c55e");
    }

    #[test]
    fn test_unrecognized_color_falls_back() {
        for raw in ["red", "#12", "#abcd", "#gggggg", "", "123456"] {
            assert_eq!(
                normalize_accent_color(Some(raw)),
                DEFAULT_ACCENT_COLOR,
                "{:?} should fall back to the default accent",
                raw
            );
        }
        assert_eq!(normalize_accent_color(None), DEFAULT_ACCENT_COLOR);
    }

    #[test]
    fn test_accent_validation() {
        assert!(is_valid_accent_color("#fff"));
        assert!(is_valid_accent_color("#A1B2C3"));
        assert!(is_valid_accent_color("green"));
        assert!(!is_valid_accent_color("#ffff"));
        assert!(!is_valid_accent_color("teal"));
    }

    #[test]
    fn test_theme_mode_normalization() {
        assert_eq!(normalize_theme_mode(Some("light")), ThemeMode::Light);
        assert_eq!(normalize_theme_mode(Some("dark")), ThemeMode::Dark);
        assert_eq!(normalize_theme_mode(Some("LIGHT")), ThemeMode::Dark);
        assert_eq!(normalize_theme_mode(None), ThemeMode::Dark);
    }

    #[test]
    fn test_single_server_layout_is_migrated() {
        let store = normalize_store(&json!({
            "baseUrl": "http://tower.local",
            "apiKey": "legacy-key",
            "scopes": ["read:docker"],
            "createdAt": "2024-03-01T10:00:00.000Z"
        }));

        assert_eq!(store.servers.len(), 1);
        let server = &store.servers[0];
        assert_eq!(server.name, LEGACY_SERVER_NAME);
        assert_eq!(server.base_url, "http://tower.local");
        assert_eq!(server.api_key(), "legacy-key");
        assert!(server.trust_self_signed);
        assert_eq!(server.scopes, vec!["read:docker"]);
        assert_eq!(server.created_at.to_rfc3339(), "2024-03-01T10:00:00+00:00");
        assert_eq!(store.active_server_id.as_deref(), Some(server.id.as_str()));
    }

    #[test]
    fn test_unknown_shape_is_default() {
        assert!(normalize_store(&json!([1, 2, 3])).servers.is_empty());
        assert!(normalize_store(&json!({"foo": "bar"})).servers.is_empty());
        assert_eq!(normalize_store(&json!(null)).app_settings, AppSettings::default());
    }

    #[test]
    fn test_server_fields_are_defaulted() {
        let store = normalize_store(&json!({
            "servers": [
                {"id": "  ", "baseUrl": "http://a", "apiKey": "k", "scopes": ["read:vms", 7, null]},
                {"id": "b", "name": "  Backup  ", "trustSelfSigned": false, "scopes": "bogus"}
            ]
        }));

        let first = &store.servers[0];
        assert!(!first.id.trim().is_empty(), "blank id must be regenerated");
        assert_eq!(first.name, "Server 1");
        assert!(first.trust_self_signed);
        assert_eq!(first.scopes, vec!["read:vms"]);
        assert_eq!(first.accent_color, DEFAULT_ACCENT_COLOR);

        let second = &store.servers[1];
        assert_eq!(second.name, "Backup");
        assert!(!second.trust_self_signed);
        assert!(second.scopes.is_empty());
        assert_eq!(second.api_key(), "");
    }

    #[test]
    fn test_dangling_active_id_is_reset() {
        let store = normalize_store(&json!({
            "activeServerId": "gone",
            "servers": [{"id": "a"}, {"id": "b"}]
        }));
        assert_eq!(store.active_server_id.as_deref(), Some("a"));

        let empty = normalize_store(&json!({"activeServerId": "gone", "servers": []}));
        assert!(empty.active_server_id.is_none());
    }

    #[test]
    fn test_valid_active_id_is_kept() {
        let store = normalize_store(&json!({
            "activeServerId": "b",
            "servers": [{"id": "a"}, {"id": "b"}],
            "appSettings": {"themeMode": "light", "accentColor": "blue"}
        }));
        assert_eq!(store.active_server_id.as_deref(), Some("b"));
        assert_eq!(store.app_settings.theme_mode, ThemeMode::Light);
        assert_eq!(store.app_settings.accent_color, "#3b82f6");
    }

    #[test]
    fn test_duplicate_ids_regenerated_for_later_entries() {
        let store = normalize_store(&json!({
            "activeServerId": "dup",
            "servers": [{"id": "dup", "name": "First"}, {"id": "dup", "name": "Second"}]
        }));

        assert_eq!(store.servers[0].id, "dup", "first occurrence keeps its id");
        assert_ne!(store.servers[1].id, "dup");
        assert_eq!(store.active_server_id.as_deref(), Some("dup"));
    }
}
