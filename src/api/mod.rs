// Unraid BFF — HTTP API
//
// axum router for the PWA. Everything lives under `/api` except `/health`.
// Unsafe methods pass the CSRF double-submit check; write actions are also
// rate limited per client and scope-gated.

mod actions;
mod cors;
mod csrf;
mod error;
mod rate_limit;
mod resources;
mod servers;
mod validation;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

pub use cors::CorsPolicy;
pub use csrf::{CSRF_COOKIE, CSRF_HEADER};
pub use error::{ApiError, ErrorBody};
pub use rate_limit::RateLimiter;
pub use validation::{normalize_base_url, ValidationError};

use crate::config::Config;
use crate::gateway::{GatewayError, UnraidClient};
use crate::store::{AuditLog, CredentialStore};

/// Largest accepted request body.
pub const BODY_LIMIT: usize = 256 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub client: UnraidClient,
    pub audit: AuditLog,
    pub limiter: Arc<RateLimiter>,
    pub trust_proxy: bool,
    cors: CorsPolicy,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<dyn CredentialStore>, audit: AuditLog) -> Result<Self, GatewayError> {
        Ok(Self {
            store,
            client: UnraidClient::new(config.upstream_timeout)?,
            audit,
            limiter: Arc::new(RateLimiter::new(config.write_rate_limit, config.write_rate_window)),
            trust_proxy: config.trust_proxy,
            cors: CorsPolicy::new(&config.allowed_origins),
        })
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true, "service": "unraid-bff" }))
}

pub fn router(state: AppState) -> Router {
    let writes = Router::new()
        .route("/docker/{id}/{action}", post(actions::docker))
        .route("/vms/{id}/{action}", post(actions::vm))
        .route("/array/{action}", post(actions::array))
        .route("/notifications/{id}/archive", post(actions::archive_notification))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit::limit_writes));

    let api = Router::new()
        .route("/servers/status", get(servers::status))
        .route("/servers", get(servers::list).post(servers::create))
        .route("/servers/test", post(servers::test_connection))
        .route("/servers/{id}", put(servers::update).delete(servers::remove))
        .route("/servers/{id}/activate", post(servers::activate))
        .route("/servers/{id}/test-key", post(servers::test_key))
        .route("/settings/app", get(servers::get_settings).put(servers::put_settings))
        .route("/overview", get(resources::overview))
        .route("/array", get(resources::array))
        .route("/docker", get(resources::docker))
        .route("/docker/{id}/icon", get(resources::docker_icon))
        .route("/vms", get(resources::vms))
        .route("/shares", get(resources::shares))
        .merge(writes)
        .layer(middleware::from_fn(csrf::require_token))
        .layer(state.cors.clone().layer());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(middleware::from_fn(csrf::issue_token))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
