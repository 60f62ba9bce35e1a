// Unraid BFF — Server & settings handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use super::error::ApiError;
use super::validation::{self, JsonObject};
use super::AppState;
use crate::gateway::{ConnectionTest, Endpoint};
use crate::scopes;
use crate::store::{AppSettings, NewServer, ServerSummary, ServerUpdate};

const NOT_FOUND: &str = "Server not found";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub configured: bool,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_write: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerList {
    pub active_server_id: Option<String>,
    pub servers: Vec<ServerSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCreated {
    pub ok: bool,
    pub server_id: String,
    pub activated: bool,
}

fn ok() -> Json<Value> {
    Json(json!({ "ok": true }))
}

pub async fn status(State(state): State<AppState>) -> Result<Json<ServerStatus>, ApiError> {
    let active = state
        .store
        .load_active()
        .map_err(|e| ApiError::store("Unable to read server credentials", e))?;

    Ok(Json(match active {
        Some(server) => ServerStatus {
            configured: true,
            can_write: Some(scopes::has_write_scopes(&server.scopes)),
            server: Some(server.summary()),
        },
        None => ServerStatus {
            configured: false,
            server: None,
            can_write: None,
        },
    }))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<ServerList>, ApiError> {
    let listing = state
        .store
        .list_all()
        .map_err(|e| ApiError::store("Unable to read server credentials", e))?;

    Ok(Json(ServerList {
        active_server_id: listing.active_server_id,
        servers: listing.servers.iter().map(|server| server.summary()).collect(),
    }))
}

pub async fn create(
    State(state): State<AppState>,
    JsonObject(body): JsonObject,
) -> Result<(StatusCode, Json<ServerCreated>), ApiError> {
    let input = validation::parse_server_create(&body)?;
    let connection = &input.connection;

    let name = match input.name {
        Some(name) => Some(name),
        None => {
            let endpoint = Endpoint::new(
                &connection.base_url,
                &connection.api_key,
                connection.trust_self_signed,
            );
            state.client.resolve_server_name(&endpoint).await
        }
    };

    let mut server = NewServer::new(connection.base_url.clone(), connection.api_key.to_string());
    server.name = name;
    server.accent_color = input.accent_color;
    server.trust_self_signed = Some(connection.trust_self_signed);
    server.scopes = input.requested_scopes;

    let context = "Unable to store server credentials";
    let saved = state.store.save(server).map_err(|e| ApiError::store(context, e))?;
    let activated = state
        .store
        .set_active(&saved.id)
        .map_err(|e| ApiError::store(context, e))?;

    Ok((
        StatusCode::CREATED,
        Json(ServerCreated {
            ok: true,
            server_id: saved.id,
            activated,
        }),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonObject(body): JsonObject,
) -> Result<Json<Value>, ApiError> {
    let id = validation::parse_id(&id, "Server id")?;
    let input = validation::parse_server_update(&body)?;
    let context = "Unable to update server";

    // A blank name asks for the name the server reports; keep the current
    // one when that lookup fails.
    let name = match input.name {
        Some(name) if name.is_empty() => {
            let server = state
                .store
                .load_by_id(&id)
                .map_err(|e| ApiError::store(context, e))?
                .ok_or(ApiError::NotFound(NOT_FOUND))?;
            state.client.resolve_server_name(&Endpoint::from(&server)).await
        }
        other => other,
    };

    let update = ServerUpdate {
        name,
        trust_self_signed: input.trust_self_signed,
        accent_color: input.accent_color,
        api_key: input.api_key.map(|key| key.to_string()),
    };
    let updated = state
        .store
        .update(&id, update)
        .map_err(|e| ApiError::store(context, e))?;
    if !updated {
        return Err(ApiError::NotFound(NOT_FOUND));
    }
    Ok(ok())
}

pub async fn activate(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let id = validation::parse_id(&id, "Server id")?;
    let switched = state
        .store
        .set_active(&id)
        .map_err(|e| ApiError::store("Unable to activate server", e))?;
    if !switched {
        return Err(ApiError::NotFound(NOT_FOUND));
    }
    Ok(ok())
}

pub async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let id = validation::parse_id(&id, "Server id")?;
    let removed = state
        .store
        .remove(&id)
        .map_err(|e| ApiError::store("Unable to delete server", e))?;
    if !removed {
        return Err(ApiError::NotFound(NOT_FOUND));
    }
    Ok(ok())
}

/// Try a candidate api key against a stored server's address and trust setting.
pub async fn test_key(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonObject(body): JsonObject,
) -> Result<Json<ConnectionTest>, ApiError> {
    let id = validation::parse_id(&id, "Server id")?;
    let api_key = validation::parse_api_key(&body)?;
    let server = state
        .store
        .load_by_id(&id)
        .map_err(|e| ApiError::store("Unable to read server credentials", e))?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;

    let endpoint = Endpoint::new(&server.base_url, &api_key, server.trust_self_signed);
    state
        .client
        .test_connection(&endpoint)
        .await
        .map(Json)
        .map_err(|e| ApiError::bad_gateway("Connection test failed", e))
}

pub async fn test_connection(
    State(state): State<AppState>,
    JsonObject(body): JsonObject,
) -> Result<Json<ConnectionTest>, ApiError> {
    let input = validation::parse_connection(&body)?;
    let endpoint = Endpoint::new(&input.base_url, &input.api_key, input.trust_self_signed);
    state
        .client
        .test_connection(&endpoint)
        .await
        .map(Json)
        .map_err(|e| ApiError::bad_gateway("Connection test failed", e))
}

// ─── App Settings ────────────────────────────────────────────────────────────

pub async fn get_settings(State(state): State<AppState>) -> Result<Json<AppSettings>, ApiError> {
    state
        .store
        .settings()
        .map(Json)
        .map_err(|e| ApiError::store("Unable to read app settings", e))
}

pub async fn put_settings(
    State(state): State<AppState>,
    JsonObject(body): JsonObject,
) -> Result<Json<AppSettings>, ApiError> {
    let update = validation::parse_settings_update(&body)?;
    state
        .store
        .update_settings(update)
        .map(Json)
        .map_err(|e| ApiError::store("Unable to update app settings", e))
}
