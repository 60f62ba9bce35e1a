// Unraid BFF — GraphQL Transport
//
// Two pre-built HTTP clients: one verifies TLS certificates, one accepts
// self-signed ones. Every call picks a client from the endpoint's trust flag,
// so requests to differently trusted servers can run concurrently.

use std::time::Duration;

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Url;
use serde_json::{json, Value};

use super::GatewayError;
use crate::store::StoredServer;

const API_KEY_HEADER: &str = "x-api-key";

/// Where and how to reach one Unraid server.
#[derive(Clone, Copy)]
pub struct Endpoint<'a> {
    pub base_url: &'a str,
    pub api_key: &'a str,
    pub trust_self_signed: bool,
}

impl<'a> Endpoint<'a> {
    pub fn new(base_url: &'a str, api_key: &'a str, trust_self_signed: bool) -> Self {
        Self {
            base_url,
            api_key,
            trust_self_signed,
        }
    }

    fn graphql_url(&self) -> String {
        format!("{}/graphql", self.base_url.trim_end_matches('/'))
    }

    /// True when `url` has this server's scheme, host and port.
    pub fn owns(&self, url: &str) -> bool {
        let (Ok(base), Ok(target)) = (Url::parse(self.base_url), Url::parse(url)) else {
            return false;
        };
        base.scheme() == target.scheme()
            && base.host_str().is_some()
            && base.host_str() == target.host_str()
            && base.port_or_known_default() == target.port_or_known_default()
    }
}

impl<'a> From<&'a StoredServer> for Endpoint<'a> {
    fn from(server: &'a StoredServer) -> Self {
        Self::new(&server.base_url, server.api_key(), server.trust_self_signed)
    }
}

impl std::fmt::Debug for Endpoint<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("trust_self_signed", &self.trust_self_signed)
            .finish()
    }
}

/// The `data` member of a successful GraphQL response plus its headers.
#[derive(Debug)]
pub struct GraphqlResponse {
    pub data: Value,
    pub headers: HeaderMap,
}

/// A binary image fetched from the server's web UI.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Clone)]
pub struct GraphqlTransport {
    strict: reqwest::Client,
    lenient: reqwest::Client,
}

impl GraphqlTransport {
    pub fn new(timeout: Duration) -> Result<Self, GatewayError> {
        let strict = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GatewayError::Client)?;
        let lenient = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(GatewayError::Client)?;
        Ok(Self { strict, lenient })
    }

    fn client(&self, trust_self_signed: bool) -> &reqwest::Client {
        if trust_self_signed {
            &self.lenient
        } else {
            &self.strict
        }
    }

    /// POST one GraphQL document and unwrap its `data`.
    pub async fn execute(
        &self,
        endpoint: &Endpoint<'_>,
        query: &str,
        variables: Value,
    ) -> Result<GraphqlResponse, GatewayError> {
        let response = self
            .client(endpoint.trust_self_signed)
            .post(endpoint.graphql_url())
            .header(API_KEY_HEADER, endpoint.api_key)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let payload: Value = response.json().await.unwrap_or_else(|_| json!({}));
        let messages = error_messages(&payload);

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "Unraid GraphQL request rejected");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                detail: messages.join(" | "),
            });
        }

        if let Some(errors) = payload.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let first = messages
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| "Unknown GraphQL error".to_string());
                return Err(GatewayError::Graphql(first));
            }
        }

        match payload.get("data") {
            Some(data) if !data.is_null() => Ok(GraphqlResponse {
                data: data.clone(),
                headers,
            }),
            _ => Err(GatewayError::MissingData),
        }
    }

    /// GET an image. Anything but a 2xx `image/*` response is "not found".
    ///
    /// The api key and the self-signed trust only apply on the server's own
    /// origin; other hosts get a plain request through the verifying client.
    pub async fn fetch_image(&self, endpoint: &Endpoint<'_>, url: &str) -> Option<ImageAsset> {
        let request = if endpoint.owns(url) {
            self.client(endpoint.trust_self_signed)
                .get(url)
                .header(API_KEY_HEADER, endpoint.api_key)
        } else {
            tracing::debug!(url, "Fetching off-origin icon without credentials");
            self.strict.get(url)
        };
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url, error = %e, "Icon request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            return None;
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        if !content_type.to_ascii_lowercase().starts_with("image/") {
            return None;
        }

        let bytes = response.bytes().await.ok()?;
        Some(ImageAsset {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

fn error_messages(payload: &Value) -> Vec<String> {
    payload
        .get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .filter_map(|error| error.get("message").and_then(Value::as_str))
                .filter(|message| !message.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::{data, MockUnraid};
    use axum::http::StatusCode;

    fn transport() -> GraphqlTransport {
        GraphqlTransport::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_execute_sends_key_and_returns_data() {
        let mock = MockUnraid::spawn(|_, _| data(json!({"__typename": "Query"}))).await;
        let base = mock.base_url();
        let endpoint = Endpoint::new(&base, "secret-key", false);

        let response = transport()
            .execute(&endpoint, "query Ping { __typename }", json!({}))
            .await
            .unwrap();

        assert_eq!(response.data["__typename"], "Query");
        let requests = mock.requests();
        assert_eq!(requests[0].api_key.as_deref(), Some("secret-key"));
        assert_eq!(requests[0].body["query"], "query Ping { __typename }");
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url() {
        let mock = MockUnraid::spawn(|_, _| data(json!({"ok": true}))).await;
        let base = format!("{}/", mock.base_url());
        let endpoint = Endpoint::new(&base, "k", true);

        let response = transport().execute(&endpoint, "query X { ok }", json!({})).await;
        assert!(response.is_ok(), "base url with trailing slash must resolve");
    }

    #[tokio::test]
    async fn test_non_success_status_joins_messages() {
        let mock = MockUnraid::spawn(|_, _| {
            (
                StatusCode::UNAUTHORIZED,
                json!({"errors": [{"message": "Invalid API key"}, {"message": "Forbidden"}]}),
            )
        })
        .await;
        let base = mock.base_url();

        let err = transport()
            .execute(&Endpoint::new(&base, "k", false), "query X { a }", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unraid request failed: 401 (Invalid API key | Forbidden)");
    }

    #[tokio::test]
    async fn test_graphql_errors_surface_first_message() {
        let mock = MockUnraid::spawn(|_, _| {
            (
                StatusCode::OK,
                json!({"errors": [{"message": "Cannot query field"}, {"message": "second"}], "data": null}),
            )
        })
        .await;
        let base = mock.base_url();

        let err = transport()
            .execute(&Endpoint::new(&base, "k", false), "query X { a }", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Graphql(ref m) if m == "Cannot query field"));
    }

    #[tokio::test]
    async fn test_missing_data() {
        let mock = MockUnraid::spawn(|_, _| (StatusCode::OK, json!({}))).await;
        let base = mock.base_url();

        let err = transport()
            .execute(&Endpoint::new(&base, "k", false), "query X { a }", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MissingData));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let endpoint = Endpoint::new("http://127.0.0.1:1", "k", false);
        let err = transport()
            .execute(&endpoint, "query X { a }", json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Unable to reach Unraid GraphQL endpoint: "));
    }

    #[tokio::test]
    async fn test_fetch_image_requires_image_content_type() {
        let mock = MockUnraid::spawn(|_, _| data(json!({}))).await;
        let base = mock.base_url();
        let endpoint = Endpoint::new(&base, "k", false);
        let transport = transport();

        let icon = transport
            .fetch_image(&endpoint, &format!("{}/plugins/dynamix.docker.manager/images/plex-icon.png", base))
            .await
            .expect("png icon should be returned");
        assert_eq!(icon.content_type, "image/png");
        assert!(!icon.bytes.is_empty());

        let html = transport
            .fetch_image(&endpoint, &format!("{}/plugins/dynamix.docker.manager/images/plex.png", base))
            .await;
        assert!(html.is_none(), "non-image content type is not an icon");

        let missing = transport
            .fetch_image(&endpoint, &format!("{}/plugins/dynamix.docker.manager/images/none.png", base))
            .await;
        assert!(missing.is_none());

        let unreachable = transport
            .fetch_image(&endpoint, "http://127.0.0.1:1/icon.png")
            .await;
        assert!(unreachable.is_none());
    }

    #[tokio::test]
    async fn test_fetch_image_keeps_key_on_server_origin() {
        let server = MockUnraid::spawn(|_, _| data(json!({}))).await;
        let other_host = MockUnraid::spawn(|_, _| data(json!({}))).await;
        let base = server.base_url();
        let endpoint = Endpoint::new(&base, "SECRET-KEY", true);
        let transport = transport();
        let path = "/plugins/dynamix.docker.manager/images/plex-icon.png";

        assert!(transport.fetch_image(&endpoint, &format!("{}{}", base, path)).await.is_some());
        assert_eq!(server.icon_api_keys(), vec![Some("SECRET-KEY".to_string())]);

        let foreign = transport
            .fetch_image(&endpoint, &format!("{}{}", other_host.base_url(), path))
            .await;
        assert!(foreign.is_some(), "off-origin icons are still fetched");
        assert_eq!(other_host.icon_api_keys(), vec![None]);
    }

    #[test]
    fn test_endpoint_owns_same_origin_only() {
        let endpoint = Endpoint::new("http://tower.local", "k", false);
        assert!(endpoint.owns("http://tower.local/plugins/icon.png"));
        assert!(endpoint.owns("http://TOWER.local:80/icon.png"));
        assert!(!endpoint.owns("https://tower.local/icon.png"));
        assert!(!endpoint.owns("http://tower.local:8080/icon.png"));
        assert!(!endpoint.owns("http://tower.local.evil.example/icon.png"));
        assert!(!endpoint.owns("not a url"));
    }

    #[test]
    fn test_endpoint_debug_redacts_key() {
        let endpoint = Endpoint::new("https://tower", "super-secret", true);
        let debug = format!("{:?}", endpoint);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
