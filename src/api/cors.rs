// Unraid BFF — CORS policy
//
// Credentialed cross-origin access for the configured origins, plus any
// origin whose host matches the host the request was addressed to.

use std::collections::HashSet;
use std::sync::Arc;

use axum::http::{request::Parts, HeaderMap, HeaderValue, Method};
use reqwest::Url;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_any: bool,
    origins: HashSet<String>,
}

impl CorsPolicy {
    /// `origins` are matched case-insensitively; `*` allows every origin.
    pub fn new(origins: &[String]) -> Self {
        let origins: HashSet<String> = origins.iter().map(|origin| origin.to_lowercase()).collect();
        Self {
            allow_any: origins.contains("*"),
            origins,
        }
    }

    pub fn allows(&self, origin: &str, headers: &HeaderMap) -> bool {
        self.allow_any || self.origins.contains(&origin.to_lowercase()) || is_same_origin(origin, headers)
    }

    pub fn layer(self) -> CorsLayer {
        let policy = Arc::new(self);
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, parts: &Parts| {
                origin
                    .to_str()
                    .is_ok_and(|origin| policy.allows(origin, &parts.headers))
            }))
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers(AllowHeaders::mirror_request())
    }
}

/// Host (and non-default port) the request was sent to.
fn request_host(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-host")
        .or_else(|| headers.get("host"))
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|host| host.trim().to_lowercase())
        .filter(|host| !host.is_empty())
}

fn is_same_origin(origin: &str, headers: &HeaderMap) -> bool {
    let Ok(url) = Url::parse(origin) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    let origin_host = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    request_host(headers).is_some_and(|requested| requested == origin_host.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_wildcard_allows_everything() {
        let policy = CorsPolicy::new(&["*".to_string()]);
        assert!(policy.allows("https://anywhere.example", &HeaderMap::new()));
    }

    #[test]
    fn test_listed_origins_are_case_insensitive() {
        let policy = CorsPolicy::new(&["https://PWA.example.com".to_string()]);
        assert!(policy.allows("https://pwa.example.com", &HeaderMap::new()));
        assert!(!policy.allows("https://evil.example.com", &HeaderMap::new()));
    }

    #[test]
    fn test_same_origin_via_host_headers() {
        let policy = CorsPolicy::new(&["https://pwa.example.com".to_string()]);
        assert!(policy.allows("http://tower.local:3001", &headers(&[("host", "Tower.local:3001")])));
        assert!(!policy.allows("http://tower.local:3002", &headers(&[("host", "tower.local:3001")])));
        assert!(policy.allows(
            "https://nas.example.net",
            &headers(&[("host", "127.0.0.1:3001"), ("x-forwarded-host", "nas.example.net, proxy")])
        ));
        assert!(!policy.allows("not a url", &headers(&[("host", "tower")])));
    }
}
