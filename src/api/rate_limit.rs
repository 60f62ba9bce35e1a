// Unraid BFF — Write rate limiting
//
// Fixed-window counters per client address, shared by every action route.
// Expired windows are swept at most once per window length.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::error::ApiError;
use super::AppState;

struct Window {
    started: Instant,
    count: u32,
}

struct Windows {
    by_client: HashMap<String, Window>,
    last_sweep: Instant,
}

pub struct RateLimiter {
    limit: u32,
    window: Duration,
    state: Mutex<Windows>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            state: Mutex::new(Windows {
                by_client: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    /// Count one request for `client`; false once the window is exhausted.
    pub fn check(&self, client: &str) -> bool {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if now.saturating_duration_since(state.last_sweep) >= self.window {
            let window = self.window;
            state
                .by_client
                .retain(|_, entry| now.saturating_duration_since(entry.started) < window);
            state.last_sweep = now;
        }

        let entry = state.by_client.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.saturating_duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }
        if entry.count >= self.limit {
            return false;
        }
        entry.count += 1;
        true
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_client
            .len()
    }
}

/// Client identity: the first `x-forwarded-for` hop when proxies are
/// trusted, else the peer address.
fn client_key(request: &Request, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(forwarded) = forwarded {
            return forwarded.to_string();
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn limit_writes(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let client = client_key(&request, state.trust_proxy);
    if !state.limiter.check(&client) {
        tracing::warn!(client = %client, path = %request.uri().path(), "Write rate limit exceeded");
        return ApiError::RateLimited.into_response();
    }
    next.run(request).await
}
