// Unraid BFF — Mock Unraid server for tests
//
// A loopback axum server that answers `/graphql` through a caller-supplied
// responder and serves a few fixed Docker icon files.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::oneshot;

pub(crate) type Responder = Arc<dyn Fn(&str, &Value) -> (StatusCode, Value) + Send + Sync>;

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub api_key: Option<String>,
    pub body: Value,
}

impl RecordedRequest {
    pub fn query(&self) -> &str {
        self.body.get("query").and_then(Value::as_str).unwrap_or_default()
    }
}

#[derive(Clone)]
struct MockState {
    responder: Responder,
    scopes_header: Option<&'static str>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    icon_keys: Arc<Mutex<Vec<Option<String>>>>,
}

pub(crate) struct MockUnraid {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    icon_keys: Arc<Mutex<Vec<Option<String>>>>,
    shutdown: Option<oneshot::Sender<()>>,
}

/// A 200 response wrapping `value` as GraphQL `data`.
pub(crate) fn data(value: Value) -> (StatusCode, Value) {
    (StatusCode::OK, json!({ "data": value }))
}

/// A 200 response carrying one GraphQL error.
pub(crate) fn gql_error(message: &str) -> (StatusCode, Value) {
    (StatusCode::OK, json!({ "errors": [{ "message": message }] }))
}

fn api_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn graphql(State(state): State<MockState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let api_key = api_key(&headers);
    let query = body
        .get("query")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let variables = body.get("variables").cloned().unwrap_or(Value::Null);
    state
        .requests
        .lock()
        .unwrap()
        .push(RecordedRequest { api_key, body });

    let (status, payload) = (state.responder)(&query, &variables);
    let mut response = (status, Json(payload)).into_response();
    if let Some(scopes) = state.scopes_header {
        response
            .headers_mut()
            .insert("x-unraid-scopes", scopes.parse().unwrap());
    }
    response
}

async fn icon(State(state): State<MockState>, headers: HeaderMap, Path(file): Path<String>) -> Response {
    state.icon_keys.lock().unwrap().push(api_key(&headers));
    match file.as_str() {
        "plex-icon.png" | "linuxserver-sonarr.png" => {
            ([("content-type", "image/png")], vec![0x89u8, b'P', b'N', b'G']).into_response()
        }
        "plex.png" => ([("content-type", "text/html")], "<html></html>").into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn custom_icon() -> Response {
    ([("content-type", "image/svg+xml")], "<svg/>").into_response()
}

impl MockUnraid {
    pub async fn spawn<F>(responder: F) -> Self
    where
        F: Fn(&str, &Value) -> (StatusCode, Value) + Send + Sync + 'static,
    {
        Self::spawn_with_scopes(None, responder).await
    }

    pub async fn spawn_with_scopes<F>(scopes_header: Option<&'static str>, responder: F) -> Self
    where
        F: Fn(&str, &Value) -> (StatusCode, Value) + Send + Sync + 'static,
    {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let icon_keys = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            responder: Arc::new(responder),
            scopes_header,
            requests: Arc::clone(&requests),
            icon_keys: Arc::clone(&icon_keys),
        };
        let app = Router::new()
            .route("/graphql", post(graphql))
            .route("/plugins/dynamix.docker.manager/images/{file}", get(icon))
            .route("/custom/icon.svg", get(custom_icon))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock unraid");
        let addr = listener.local_addr().expect("mock unraid addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Self {
            addr,
            requests,
            icon_keys,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `x-api-key` of every icon request, in arrival order.
    pub fn icon_api_keys(&self) -> Vec<Option<String>> {
        self.icon_keys.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.requests().iter().map(|r| r.query().to_string()).collect()
    }
}

impl Drop for MockUnraid {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
