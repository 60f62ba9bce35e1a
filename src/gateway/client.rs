// Unraid BFF — Unraid GraphQL client
//
// Typed operations over the transport: reads run their schema fallback
// chain and hand the raw `data` to the mappers; writes run their mutation
// candidate chain.

use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::actions::{ArrayAction, ContainerAction, VmAction};
use super::fallback::first_success;
use super::queries;
use super::transport::{Endpoint, GraphqlResponse, GraphqlTransport, ImageAsset};
use super::GatewayError;
use crate::mapper::{
    self, ArrayResponse, DockerResponse, OverviewResponse, SharesResponse, VmsResponse,
};
use crate::scopes;

/// Outcome of a successful `Ping` against a candidate endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTest {
    pub ok: bool,
    pub scopes: Vec<String>,
    pub missing_scopes: Vec<String>,
    pub can_write: bool,
}

struct Mutation {
    query: String,
    variables: Value,
}

impl Mutation {
    fn new(query: impl Into<String>, variables: Value) -> Self {
        Self {
            query: query.into(),
            variables,
        }
    }
}

#[derive(Clone)]
pub struct UnraidClient {
    transport: GraphqlTransport,
}

impl UnraidClient {
    pub fn new(timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            transport: GraphqlTransport::new(timeout)?,
        })
    }

    async fn request(
        &self,
        endpoint: &Endpoint<'_>,
        query: &str,
        variables: Value,
    ) -> Result<GraphqlResponse, GatewayError> {
        self.transport.execute(endpoint, query, variables).await
    }

    async fn query(&self, endpoint: &Endpoint<'_>, query: &str) -> Result<Value, GatewayError> {
        Ok(self.request(endpoint, query, json!({})).await?.data)
    }

    async fn query_chain(
        &self,
        endpoint: &Endpoint<'_>,
        candidates: &[&'static str],
    ) -> Result<Value, GatewayError> {
        first_success(candidates.to_vec(), |query| self.query(endpoint, query)).await
    }

    async fn mutate(
        &self,
        endpoint: &Endpoint<'_>,
        candidates: Vec<Mutation>,
    ) -> Result<(), GatewayError> {
        first_success(candidates, |mutation| async move {
            self.request(endpoint, &mutation.query, mutation.variables)
                .await
                .map(|_| ())
        })
        .await
    }

    // ─── Connection ──────────────────────────────────────────────────────

    pub async fn test_connection(&self, endpoint: &Endpoint<'_>) -> Result<ConnectionTest, GatewayError> {
        let response = self.request(endpoint, queries::PING, json!({})).await?;
        let mut hinted = scopes::scopes_from_headers(&response.headers);
        if hinted.is_empty() {
            hinted.push(scopes::DEFAULT_SCOPE.to_string());
        }
        let granted = scopes::dedupe(hinted);

        Ok(ConnectionTest {
            ok: true,
            missing_scopes: scopes::missing_recommended_scopes(&granted),
            can_write: scopes::has_write_scopes(&granted),
            scopes: granted,
        })
    }

    /// The server's configured name, else its hostname. `None` on any failure.
    pub async fn resolve_server_name(&self, endpoint: &Endpoint<'_>) -> Option<String> {
        let data = match self.query(endpoint, queries::RESOLVE_SERVER_NAME).await {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!(error = %e, "Server name lookup failed");
                return None;
            }
        };

        ["/vars/name", "/info/os/hostname"]
            .iter()
            .filter_map(|path| data.pointer(path).and_then(Value::as_str))
            .map(str::trim)
            .find(|name| !name.is_empty())
            .map(str::to_string)
    }

    // ─── Reads ───────────────────────────────────────────────────────────

    pub async fn fetch_overview(&self, endpoint: &Endpoint<'_>) -> Result<OverviewResponse, GatewayError> {
        let core = self.query_chain(endpoint, &queries::OVERVIEW_CORE).await?;

        let (overview, list, network, ups) = tokio::join!(
            self.query(endpoint, queries::NOTIFICATIONS_OVERVIEW),
            self.query_chain(endpoint, &queries::NOTIFICATIONS_LIST),
            self.query(endpoint, queries::NETWORK),
            self.query(endpoint, queries::UPS),
        );

        let overview = optional_section("notification overview", overview);
        let list = optional_section("notification list", list);
        let notifications = if overview.is_some() || list.is_some() {
            let mut merged = list
                .as_ref()
                .and_then(|data| data.get("notifications"))
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_else(Map::new);
            if let Some(unread) = overview
                .as_ref()
                .and_then(|data| data.pointer("/notifications/overview"))
            {
                merged.insert("overview".to_string(), unread.clone());
            }
            json!({ "notifications": merged })
        } else {
            Value::Null
        };

        let merged = json!({
            "core": core,
            "notifications": notifications,
            "network": optional_section("network", network),
            "ups": optional_section("ups", ups),
        });
        Ok(mapper::map_overview(&merged))
    }

    pub async fn fetch_array(&self, endpoint: &Endpoint<'_>) -> Result<ArrayResponse, GatewayError> {
        let data = self.query_chain(endpoint, &queries::ARRAY).await?;
        Ok(mapper::map_array(&data))
    }

    pub async fn fetch_docker(&self, endpoint: &Endpoint<'_>) -> Result<DockerResponse, GatewayError> {
        let data = self.query_chain(endpoint, &queries::DOCKER).await?;
        Ok(mapper::map_docker(&data))
    }

    pub async fn fetch_vms(&self, endpoint: &Endpoint<'_>) -> Result<VmsResponse, GatewayError> {
        let data = self.query(endpoint, queries::VMS).await?;
        Ok(mapper::map_vms(&data))
    }

    pub async fn fetch_shares(&self, endpoint: &Endpoint<'_>) -> Result<SharesResponse, GatewayError> {
        let data = self.query(endpoint, queries::SHARES).await?;
        Ok(mapper::map_shares(&data))
    }

    // ─── Writes ──────────────────────────────────────────────────────────

    pub async fn run_container_action(
        &self,
        endpoint: &Endpoint<'_>,
        container_id: &str,
        action: ContainerAction,
    ) -> Result<(), GatewayError> {
        match action {
            ContainerAction::Start | ContainerAction::Stop => {
                self.mutate(endpoint, container_mutations(container_id, action))
                    .await
            }
            ContainerAction::Restart => {
                let mut failures = Vec::new();
                if let Err(e) = self
                    .mutate(endpoint, container_mutations(container_id, ContainerAction::Stop))
                    .await
                {
                    tracing::warn!(container = container_id, error = %e, "Stop before restart failed");
                    failures.push(e.to_string());
                }
                match self
                    .mutate(endpoint, container_mutations(container_id, ContainerAction::Start))
                    .await
                {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        failures.push(e.to_string());
                        Err(GatewayError::AllCandidatesFailed(failures))
                    }
                }
            }
        }
    }

    pub async fn run_vm_action(
        &self,
        endpoint: &Endpoint<'_>,
        vm_id: &str,
        action: VmAction,
    ) -> Result<(), GatewayError> {
        let mut candidates = vec![Mutation::new(
            queries::vm_mutation(action.as_str()),
            json!({ "id": vm_id }),
        )];
        candidates.extend(queries::VM_LEGACY.iter().map(|query| {
            Mutation::new(*query, json!({ "id": vm_id, "action": action.legacy_verb() }))
        }));
        self.mutate(endpoint, candidates).await
    }

    pub async fn run_array_action(
        &self,
        endpoint: &Endpoint<'_>,
        action: ArrayAction,
    ) -> Result<(), GatewayError> {
        let candidates = vec![
            Mutation::new(
                queries::ARRAY_SET_STATE,
                json!({ "desiredState": action.desired_state() }),
            ),
            Mutation::new(queries::ARRAY_LEGACY, json!({ "action": action.as_str() })),
        ];
        self.mutate(endpoint, candidates).await
    }

    pub async fn archive_notification(
        &self,
        endpoint: &Endpoint<'_>,
        notification_id: &str,
    ) -> Result<(), GatewayError> {
        let candidates = vec![Mutation::new(
            queries::ARCHIVE_NOTIFICATION,
            json!({ "id": notification_id }),
        )];
        self.mutate(endpoint, candidates).await
    }

    // ─── Icons ───────────────────────────────────────────────────────────

    /// First image found among the container's icon candidates.
    pub async fn fetch_docker_icon(
        &self,
        endpoint: &Endpoint<'_>,
        container_id: &str,
    ) -> Option<ImageAsset> {
        let meta = match self
            .request(endpoint, queries::DOCKER_ICON_META, json!({ "id": container_id }))
            .await
        {
            Ok(response) => response.data,
            Err(e) => {
                tracing::debug!(container = container_id, error = %e, "Icon metadata lookup failed");
                return None;
            }
        };
        let container = meta
            .pointer("/docker/container")
            .filter(|value| value.is_object())?;

        for candidate in icon_candidates(container) {
            let url = absolute_url(endpoint.base_url, &candidate);
            if let Some(icon) = self.transport.fetch_image(endpoint, &url).await {
                return Some(icon);
            }
        }
        None
    }
}

fn optional_section(name: &str, result: Result<Value, GatewayError>) -> Option<Value> {
    match result {
        Ok(data) => Some(data),
        Err(e) => {
            tracing::debug!(section = name, error = %e, "Optional overview section unavailable");
            None
        }
    }
}

fn container_mutations(container_id: &str, action: ContainerAction) -> Vec<Mutation> {
    let current = match action {
        ContainerAction::Start => queries::DOCKER_START,
        _ => queries::DOCKER_STOP,
    };
    let verb = match action {
        ContainerAction::Start => "start",
        _ => "stop",
    };

    let mut candidates = vec![Mutation::new(current, json!({ "id": container_id }))];
    candidates.extend(
        queries::DOCKER_LEGACY
            .iter()
            .map(|query| Mutation::new(*query, json!({ "id": container_id, "action": verb }))),
    );
    candidates
}

const ICON_DIR: &str = "/plugins/dynamix.docker.manager/images";

/// Lowercase, drop one leading `/`, collapse disallowed runs to `-`.
fn sanitize_icon_slug(value: &str) -> String {
    let lower = value.to_lowercase();
    let trimmed = lower.strip_prefix('/').unwrap_or(&lower);

    let mut slug = String::with_capacity(trimmed.len());
    let mut in_run = false;
    for c in trimmed.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-') {
            slug.push(c);
            in_run = false;
        } else if !in_run {
            slug.push('-');
            in_run = true;
        }
    }
    slug
}

fn icon_candidates(container: &Value) -> Vec<String> {
    let image = container.get("image").and_then(Value::as_str).unwrap_or_default();
    let image_name = image
        .rsplit('/')
        .next()
        .and_then(|last| last.split(':').next())
        .unwrap_or_default();
    let label_icon = container
        .get("labels")
        .and_then(|labels| labels.get(mapper::ICON_LABEL))
        .and_then(Value::as_str)
        .unwrap_or_default();

    let name = sanitize_icon_slug(&mapper::primary_name(container));
    let image = sanitize_icon_slug(image_name);

    [
        label_icon.to_string(),
        format!("{}/{}-icon.png", ICON_DIR, name),
        format!("{}/{}.png", ICON_DIR, name),
        format!("{}/{}-icon.png", ICON_DIR, image),
        format!("{}/{}.png", ICON_DIR, image),
        format!("{}/{}.jpg", ICON_DIR, name),
        format!("{}/{}.jpg", ICON_DIR, image),
    ]
    .into_iter()
    .filter(|candidate| !candidate.is_empty())
    .collect()
}

fn absolute_url(base_url: &str, url_or_path: &str) -> String {
    let lower = url_or_path.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return url_or_path.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        url_or_path.strip_prefix('/').unwrap_or(url_or_path)
    )
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::{data, gql_error, MockUnraid};
    use crate::mapper::RunStatus;

    fn client() -> UnraidClient {
        UnraidClient::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_sanitize_icon_slug() {
        assert_eq!(sanitize_icon_slug("/Plex Media Server"), "plex-media-server");
        assert_eq!(sanitize_icon_slug("linuxserver/sonarr"), "linuxserver-sonarr");
        assert_eq!(sanitize_icon_slug("a-@@b"), "a--b");
        assert_eq!(sanitize_icon_slug("//x"), "-x");
    }

    #[test]
    fn test_icon_candidates_order() {
        let container = json!({
            "names": ["/Plex"],
            "image": "registry.local:5000/plexinc/pms-docker:latest",
            "labels": {"net.unraid.docker.icon": "https://cdn/icon.png"}
        });
        let candidates = icon_candidates(&container);
        assert_eq!(candidates[0], "https://cdn/icon.png");
        assert_eq!(candidates[1], "/plugins/dynamix.docker.manager/images/plex-icon.png");
        assert_eq!(candidates[3], "/plugins/dynamix.docker.manager/images/pms-docker-icon.png");
        assert_eq!(candidates[6], "/plugins/dynamix.docker.manager/images/pms-docker.jpg");
        assert_eq!(candidates.len(), 7);

        let unlabeled = icon_candidates(&json!({"names": ["/x"], "image": "x"}));
        assert_eq!(unlabeled.len(), 6, "blank label is dropped");
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(absolute_url("http://tower/", "/a/b.png"), "http://tower/a/b.png");
        assert_eq!(absolute_url("http://tower", "a.png"), "http://tower/a.png");
        assert_eq!(absolute_url("http://tower", "HTTPS://cdn/x.png"), "HTTPS://cdn/x.png");
    }

    #[tokio::test]
    async fn test_connection_reads_scope_headers() {
        let mock = MockUnraid::spawn_with_scopes(Some("read:docker, docker:update_any, read:docker"), |_, _| {
            data(json!({"__typename": "Query"}))
        })
        .await;
        let base = mock.base_url();

        let result = client()
            .test_connection(&Endpoint::new(&base, "k", false))
            .await
            .unwrap();
        assert!(result.ok);
        assert_eq!(result.scopes, vec!["read:docker", "docker:update_any"]);
        assert!(result.can_write);
        assert!(result.missing_scopes.contains(&"read:vms".to_string()));
    }

    #[tokio::test]
    async fn test_connection_defaults_to_monitoring_scope() {
        let mock = MockUnraid::spawn(|_, _| data(json!({"__typename": "Query"}))).await;
        let base = mock.base_url();

        let result = client()
            .test_connection(&Endpoint::new(&base, "k", false))
            .await
            .unwrap();
        assert_eq!(result.scopes, vec!["read:monitoring"]);
        assert!(result.missing_scopes.is_empty());
        assert!(result.can_write, "indeterminate scopes fail open");
    }

    #[tokio::test]
    async fn test_resolve_server_name_prefers_vars_then_hostname() {
        let named = MockUnraid::spawn(|_, _| {
            data(json!({"vars": {"name": "  Tower "}, "info": {"os": {"hostname": "host"}}}))
        })
        .await;
        let base = named.base_url();
        assert_eq!(
            client().resolve_server_name(&Endpoint::new(&base, "k", false)).await.as_deref(),
            Some("Tower")
        );

        let hostname = MockUnraid::spawn(|_, _| {
            data(json!({"vars": {"name": " "}, "info": {"os": {"hostname": "nas01"}}}))
        })
        .await;
        let base = hostname.base_url();
        assert_eq!(
            client().resolve_server_name(&Endpoint::new(&base, "k", false)).await.as_deref(),
            Some("nas01")
        );

        let failing = MockUnraid::spawn(|_, _| gql_error("nope")).await;
        let base = failing.base_url();
        assert!(client().resolve_server_name(&Endpoint::new(&base, "k", false)).await.is_none());
    }

    #[tokio::test]
    async fn test_docker_falls_back_through_variants() {
        let mock = MockUnraid::spawn(|query, _| {
            if query.contains("iconUrl") || query.contains("webUiUrl") {
                gql_error("Cannot query field")
            } else {
                data(json!({"docker": {"containers": [
                    {"id": "c1", "names": ["/plex"], "state": "RUNNING"}
                ]}}))
            }
        })
        .await;
        let base = mock.base_url();

        let docker = client()
            .fetch_docker(&Endpoint::new(&base, "k", false))
            .await
            .unwrap();
        assert_eq!(docker.containers[0].status, RunStatus::Running);
        assert_eq!(mock.queries().len(), 4, "all four variants are tried in order");
    }

    #[tokio::test]
    async fn test_array_failure_aggregates_messages() {
        let mock = MockUnraid::spawn(|query, _| {
            if query.starts_with("query ArrayFallback") {
                gql_error("fallback broke")
            } else {
                gql_error("primary broke")
            }
        })
        .await;
        let base = mock.base_url();

        let err = client()
            .fetch_array(&Endpoint::new(&base, "k", false))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "primary broke | fallback broke");
    }

    #[tokio::test]
    async fn test_overview_tolerates_missing_sections() {
        let mock = MockUnraid::spawn(|query, _| {
            if query.starts_with("query OverviewCore ") {
                gql_error("baseboard unknown")
            } else if query.starts_with("query OverviewCoreFallback") {
                data(json!({
                    "vars": {"name": "Tower", "regTy": "pro"},
                    "metrics": {"cpu": {"percentTotal": 12.6}}
                }))
            } else if query.starts_with("query OverviewNotificationsOverview") {
                data(json!({"notifications": {"overview": {"unread": {"info": 1, "warning": 0, "alert": 2, "total": 3}}}}))
            } else if query.starts_with("query OverviewNotificationsListFallback") {
                data(json!({"notifications": {"list": [{"id": "n1", "title": "Hot", "importance": "ALERT"}]}}))
            } else {
                gql_error("not supported")
            }
        })
        .await;
        let base = mock.base_url();

        let overview = client()
            .fetch_overview(&Endpoint::new(&base, "k", false))
            .await
            .unwrap();
        assert_eq!(overview.cpu_percent, 13);
        assert_eq!(overview.unread_notifications.alert, 2);
        assert_eq!(overview.notifications.len(), 1);
        assert!(overview.access_urls.is_empty());
        assert!(overview.ups.devices.is_empty());
    }

    #[tokio::test]
    async fn test_overview_core_failure_is_an_error() {
        let mock = MockUnraid::spawn(|_, _| gql_error("down")).await;
        let base = mock.base_url();

        let err = client()
            .fetch_overview(&Endpoint::new(&base, "k", false))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "down | down");
    }

    #[tokio::test]
    async fn test_vm_force_stop_uses_legacy_verb_on_fallback() {
        let mock = MockUnraid::spawn(|query, _| {
            if query.contains("vm { forceStop") {
                gql_error("Cannot query field vm")
            } else {
                data(json!({"vmAction": {"__typename": "Result"}}))
            }
        })
        .await;
        let base = mock.base_url();

        client()
            .run_vm_action(&Endpoint::new(&base, "k", false), "vm-1", VmAction::ForceStop)
            .await
            .unwrap();

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].body["variables"], json!({"id": "vm-1"}));
        assert_eq!(requests[1].body["variables"]["action"], "force-stop");
    }

    #[tokio::test]
    async fn test_array_action_sends_desired_state() {
        let mock = MockUnraid::spawn(|_, _| data(json!({"array": {"setState": {"id": "a"}}}))).await;
        let base = mock.base_url();

        client()
            .run_array_action(&Endpoint::new(&base, "k", false), ArrayAction::Stop)
            .await
            .unwrap();
        assert_eq!(mock.requests()[0].body["variables"]["desiredState"], "STOP");
    }

    #[tokio::test]
    async fn test_restart_attempts_start_after_failed_stop() {
        let mock = MockUnraid::spawn(|query, variables| {
            let is_stop = query.contains("stop(") || variables["action"] == "stop";
            if is_stop {
                gql_error("already stopped")
            } else {
                data(json!({"docker": {"start": {"id": "c1"}}}))
            }
        })
        .await;
        let base = mock.base_url();

        client()
            .run_container_action(&Endpoint::new(&base, "k", false), "c1", ContainerAction::Restart)
            .await
            .unwrap();
        let queries = mock.queries();
        assert_eq!(queries.len(), 4, "three stop candidates then one start");
        assert!(queries[3].contains("start(id: $id)"));
    }

    #[tokio::test]
    async fn test_restart_fails_when_start_fails() {
        let mock = MockUnraid::spawn(|_, _| gql_error("docker offline")).await;
        let base = mock.base_url();

        let err = client()
            .run_container_action(&Endpoint::new(&base, "k", false), "c1", ContainerAction::Restart)
            .await
            .unwrap_err();
        let message = err.to_string();
        assert_eq!(message.matches("docker offline").count(), 6);
    }

    #[tokio::test]
    async fn test_archive_notification() {
        let mock = MockUnraid::spawn(|_, _| data(json!({"archiveNotification": {"id": "n1"}}))).await;
        let base = mock.base_url();

        client()
            .archive_notification(&Endpoint::new(&base, "k", false), "n1")
            .await
            .unwrap();
        assert!(mock.queries()[0].starts_with("mutation ArchiveNotification"));
    }

    #[tokio::test]
    async fn test_docker_icon_resolution() {
        let mock = MockUnraid::spawn(|_, _| {
            data(json!({"docker": {"container": {"names": ["/Plex"], "image": "plexinc/pms:latest", "labels": {}}}}))
        })
        .await;
        let base = mock.base_url();

        let icon = client()
            .fetch_docker_icon(&Endpoint::new(&base, "k", false), "c1")
            .await
            .expect("plex-icon.png is served by the mock");
        assert_eq!(icon.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_docker_icon_label_and_missing_container() {
        let base_holder = std::sync::Arc::new(std::sync::Mutex::new(String::new()));
        let shared = std::sync::Arc::clone(&base_holder);
        let mock = MockUnraid::spawn(move |_, variables| {
            if variables["id"] == "gone" {
                data(json!({"docker": {"container": null}}))
            } else {
                let label = format!("{}/custom/icon.svg", shared.lock().unwrap());
                data(json!({"docker": {"container": {"names": ["/x"], "image": "x", "labels": {"net.unraid.docker.icon": label}}}}))
            }
        })
        .await;
        let base = mock.base_url();
        *base_holder.lock().unwrap() = base.clone();
        let endpoint = Endpoint::new(&base, "k", false);

        let icon = client().fetch_docker_icon(&endpoint, "c2").await.unwrap();
        assert_eq!(icon.content_type, "image/svg+xml");

        assert!(client().fetch_docker_icon(&endpoint, "gone").await.is_none());
    }

    #[tokio::test]
    async fn test_docker_icon_label_on_another_host_gets_no_api_key() {
        let label_host = MockUnraid::spawn(|_, _| data(json!({}))).await;
        let label = format!(
            "{}/plugins/dynamix.docker.manager/images/linuxserver-sonarr.png",
            label_host.base_url()
        );
        let mock = MockUnraid::spawn(move |_, _| {
            data(json!({"docker": {"container": {
                "names": ["/x"],
                "image": "x",
                "labels": {"net.unraid.docker.icon": label.clone()}
            }}}))
        })
        .await;
        let base = mock.base_url();
        let endpoint = Endpoint::new(&base, "SECRET-KEY", true);

        let icon = client().fetch_docker_icon(&endpoint, "c").await.unwrap();
        assert_eq!(icon.content_type, "image/png");
        assert_eq!(label_host.icon_api_keys(), vec![None]);
        assert_eq!(mock.requests()[0].api_key.as_deref(), Some("SECRET-KEY"));
    }
}
