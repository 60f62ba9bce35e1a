// Unraid BFF — Request validation
//
// Request bodies arrive as loose JSON objects and are checked field by field,
// so each rejection names the offending field.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use reqwest::Url;
use serde_json::{Map, Value};
use thiserror::Error;
use zeroize::Zeroizing;

use super::error::ApiError;
use crate::store::{is_valid_accent_color, SettingsUpdate, ThemeMode};

const MAX_BASE_URL: usize = 2048;
const MAX_API_KEY: usize = 4096;
const MAX_NAME: usize = 120;
const MAX_SCOPE: usize = 128;
const MAX_ACCENT: usize = 32;
const MAX_ID: usize = 160;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(String);

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.0)
    }
}

fn fail<T>(message: impl Into<String>) -> Result<T, ValidationError> {
    Err(ValidationError(message.into()))
}

// ─── Body Extractor ──────────────────────────────────────────────────────────

/// A request body that parsed as a JSON object.
#[derive(Debug)]
pub struct JsonObject(pub Map<String, Value>);

impl<S> FromRequest<S> for JsonObject
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(request, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::PayloadTooLarge
            } else {
                ApiError::BadRequest("Request body must be a JSON object".to_string())
            }
        })?;
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            _ => Err(ApiError::BadRequest("Request body must be a JSON object".to_string())),
        }
    }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

pub struct ConnectionInput {
    pub base_url: String,
    pub api_key: Zeroizing<String>,
    pub trust_self_signed: bool,
}

pub struct ServerCreateInput {
    pub connection: ConnectionInput,
    pub name: Option<String>,
    pub accent_color: Option<String>,
    pub requested_scopes: Vec<String>,
}

pub struct ServerUpdateInput {
    /// `Some("")` asks for the upstream-resolved name.
    pub name: Option<String>,
    pub trust_self_signed: Option<bool>,
    pub accent_color: Option<String>,
    pub api_key: Option<Zeroizing<String>>,
}

// ─── Field Parsers ───────────────────────────────────────────────────────────

fn required_string(source: &Map<String, Value>, field: &str, max: usize) -> Result<String, ValidationError> {
    let Some(Value::String(raw)) = source.get(field) else {
        return fail(format!("{} is required", field));
    };
    let value = raw.trim();
    if value.is_empty() {
        return fail(format!("{} is required", field));
    }
    if value.chars().count() > max {
        return fail(format!("{} is too long", field));
    }
    Ok(value.to_string())
}

fn optional_string(
    source: &Map<String, Value>,
    field: &str,
    max: usize,
    allow_empty: bool,
) -> Result<Option<String>, ValidationError> {
    let Some(raw) = source.get(field) else {
        return Ok(None);
    };
    let Value::String(raw) = raw else {
        return fail(format!("{} must be a string", field));
    };
    let value = raw.trim();
    if value.is_empty() && !allow_empty {
        return fail(format!("{} cannot be empty", field));
    }
    if value.chars().count() > max {
        return fail(format!("{} is too long", field));
    }
    Ok(Some(value.to_string()))
}

fn optional_bool(source: &Map<String, Value>, field: &str) -> Result<Option<bool>, ValidationError> {
    match source.get(field) {
        None => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(*value)),
        Some(_) => fail(format!("{} must be a boolean", field)),
    }
}

fn scopes(source: &Map<String, Value>, field: &str) -> Result<Vec<String>, ValidationError> {
    let items = match source.get(field) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return fail(format!("{} must be an array of strings", field)),
    };

    let mut parsed = Vec::with_capacity(items.len());
    for item in items {
        let Value::String(raw) = item else {
            return fail(format!("{} must be an array of strings", field));
        };
        let scope = raw.trim();
        if scope.is_empty() {
            continue;
        }
        if scope.chars().count() > MAX_SCOPE {
            return fail(format!("{} contains a value that is too long", field));
        }
        parsed.push(scope.to_string());
    }
    Ok(parsed)
}

fn theme_mode(source: &Map<String, Value>, field: &str) -> Result<Option<ThemeMode>, ValidationError> {
    match source.get(field) {
        None => Ok(None),
        Some(Value::String(raw)) if raw == "dark" || raw == "light" => Ok(ThemeMode::parse(raw)),
        Some(_) => fail(format!("{} must be 'dark' or 'light'", field)),
    }
}

fn accent_color(source: &Map<String, Value>, field: &str) -> Result<Option<String>, ValidationError> {
    let Some(value) = optional_string(source, field, MAX_ACCENT, false)? else {
        return Ok(None);
    };
    let lowered = value.to_ascii_lowercase();
    if !is_valid_accent_color(&lowered) {
        return fail(format!("{} must be a valid color", field));
    }
    Ok(Some(lowered))
}

/// Accept only an http(s) origin and reduce it to `scheme://host[:port]`.
pub fn normalize_base_url(raw: &str) -> Result<String, ValidationError> {
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(_) => return fail("baseUrl must be a valid URL"),
    };
    if !matches!(url.scheme(), "http" | "https") {
        return fail("baseUrl must use http or https");
    }
    if !url.username().is_empty() || url.password().is_some() {
        return fail("baseUrl must not contain credentials");
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return fail("baseUrl must not contain a path, query or fragment");
    }
    let Some(host) = url.host_str() else {
        return fail("baseUrl must include a host");
    };

    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

/// Trimmed, non-blank id from a path segment.
pub fn parse_id(raw: &str, field: &str) -> Result<String, ValidationError> {
    let value = raw.trim();
    if value.is_empty() {
        return fail(format!("{} is required", field));
    }
    if value.chars().count() > MAX_ID {
        return fail(format!("{} is too long", field));
    }
    Ok(value.to_string())
}

// ─── Body Parsers ────────────────────────────────────────────────────────────

pub fn parse_connection(source: &Map<String, Value>) -> Result<ConnectionInput, ValidationError> {
    let base_url = normalize_base_url(&required_string(source, "baseUrl", MAX_BASE_URL)?)?;
    let api_key = Zeroizing::new(required_string(source, "apiKey", MAX_API_KEY)?);
    let trust_self_signed = optional_bool(source, "trustSelfSigned")?.unwrap_or(true);
    Ok(ConnectionInput {
        base_url,
        api_key,
        trust_self_signed,
    })
}

pub fn parse_server_create(source: &Map<String, Value>) -> Result<ServerCreateInput, ValidationError> {
    let connection = parse_connection(source)?;
    let name = optional_string(source, "name", MAX_NAME, true)?.filter(|name| !name.is_empty());
    let accent_color = accent_color(source, "accentColor")?;
    let requested_scopes = scopes(source, "requestedScopes")?;
    Ok(ServerCreateInput {
        connection,
        name,
        accent_color,
        requested_scopes,
    })
}

pub fn parse_api_key(source: &Map<String, Value>) -> Result<Zeroizing<String>, ValidationError> {
    Ok(Zeroizing::new(required_string(source, "apiKey", MAX_API_KEY)?))
}

pub fn parse_server_update(source: &Map<String, Value>) -> Result<ServerUpdateInput, ValidationError> {
    let input = ServerUpdateInput {
        name: optional_string(source, "name", MAX_NAME, true)?,
        trust_self_signed: optional_bool(source, "trustSelfSigned")?,
        accent_color: accent_color(source, "accentColor")?,
        api_key: optional_string(source, "apiKey", MAX_API_KEY, false)?.map(Zeroizing::new),
    };
    if input.name.is_none()
        && input.trust_self_signed.is_none()
        && input.accent_color.is_none()
        && input.api_key.is_none()
    {
        return fail("name, trustSelfSigned, accentColor or apiKey is required");
    }
    Ok(input)
}

pub fn parse_settings_update(source: &Map<String, Value>) -> Result<SettingsUpdate, ValidationError> {
    let update = SettingsUpdate {
        theme_mode: theme_mode(source, "themeMode")?,
        accent_color: accent_color(source, "accentColor")?,
    };
    if update.theme_mode.is_none() && update.accent_color.is_none() {
        return fail("themeMode or accentColor is required");
    }
    Ok(update)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
