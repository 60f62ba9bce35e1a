// Unraid BFF — Read-only resource handlers
//
// Each handler reads the active server, runs one gateway fetch and returns
// the mapped response. Upstream failures surface as 500 with the gateway
// message as `detail`.

use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::error::ApiError;
use super::validation;
use super::AppState;
use crate::gateway::{Endpoint, GatewayError};
use crate::mapper::{ArrayResponse, DockerResponse, OverviewResponse, SharesResponse, VmsResponse};
use crate::store::StoredServer;

const ICON_CACHE_CONTROL: &str = "public, max-age=300";

fn active_server(state: &AppState, context: &'static str) -> Result<StoredServer, ApiError> {
    state
        .store
        .load_active()
        .map_err(|e| ApiError::store(context, e))?
        .ok_or_else(|| ApiError::upstream(context, GatewayError::NotConfigured))
}

pub async fn overview(State(state): State<AppState>) -> Result<Json<OverviewResponse>, ApiError> {
    let context = "Overview fetch failed";
    let server = active_server(&state, context)?;
    state
        .client
        .fetch_overview(&Endpoint::from(&server))
        .await
        .map(Json)
        .map_err(|e| ApiError::upstream(context, e))
}

pub async fn array(State(state): State<AppState>) -> Result<Json<ArrayResponse>, ApiError> {
    let context = "Array fetch failed";
    let server = active_server(&state, context)?;
    state
        .client
        .fetch_array(&Endpoint::from(&server))
        .await
        .map(Json)
        .map_err(|e| ApiError::upstream(context, e))
}

pub async fn docker(State(state): State<AppState>) -> Result<Json<DockerResponse>, ApiError> {
    let context = "Docker fetch failed";
    let server = active_server(&state, context)?;
    state
        .client
        .fetch_docker(&Endpoint::from(&server))
        .await
        .map(Json)
        .map_err(|e| ApiError::upstream(context, e))
}

pub async fn vms(State(state): State<AppState>) -> Result<Json<VmsResponse>, ApiError> {
    let context = "VM fetch failed";
    let server = active_server(&state, context)?;
    state
        .client
        .fetch_vms(&Endpoint::from(&server))
        .await
        .map(Json)
        .map_err(|e| ApiError::upstream(context, e))
}

pub async fn shares(State(state): State<AppState>) -> Result<Json<SharesResponse>, ApiError> {
    let context = "Shares fetch failed";
    let server = active_server(&state, context)?;
    state
        .client
        .fetch_shares(&Endpoint::from(&server))
        .await
        .map(Json)
        .map_err(|e| ApiError::upstream(context, e))
}

/// Container icon bytes, or a bare 404 for anything that goes wrong.
pub async fn docker_icon(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(id) = validation::parse_id(&id, "Container id") else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let server = match state.store.load_active() {
        Ok(Some(server)) => server,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Unable to read server credentials for icon");
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    match state.client.fetch_docker_icon(&Endpoint::from(&server), &id).await {
        Some(icon) => (
            [
                (CONTENT_TYPE, icon.content_type),
                (CACHE_CONTROL, ICON_CACHE_CONTROL.to_string()),
            ],
            icon.bytes,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
