// Unraid BFF — Docker mapping

use serde::Serialize;
use serde_json::Value;

use super::coerce::{array_of, format_epoch, normalize_run_state, string_or, truthy, RunStatus};

const WEBUI_LABEL: &str = "net.unraid.docker.webui";
pub(crate) const ICON_LABEL: &str = "net.unraid.docker.icon";

/// Ports listed before the summary is truncated.
const MAX_LISTED_PORTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DockerResponse {
    pub summary: DockerSummary,
    pub containers: Vec<DockerContainer>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerSummary {
    pub running: usize,
    pub stopped: usize,
    pub updates_available: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerContainer {
    pub id: String,
    pub name: String,
    pub image: String,
    pub icon_url: String,
    pub network: String,
    pub endpoint: String,
    pub ports: String,
    pub created_at: String,
    pub auto_start: bool,
    pub update_available: bool,
    pub rebuild_ready: bool,
    pub state_label: String,
    pub status: RunStatus,
}

pub fn map_docker(data: &Value) -> DockerResponse {
    let source = ["/containers", "/dockerContainers", "/docker/containers"]
        .iter()
        .find_map(|path| data.pointer(path).filter(|value| value.is_array()));

    let containers: Vec<DockerContainer> = array_of(source).iter().map(map_container).collect();

    let running = containers
        .iter()
        .filter(|c| c.status == RunStatus::Running)
        .count();
    let updates_available = containers
        .iter()
        .filter(|c| c.update_available || c.rebuild_ready)
        .count();

    DockerResponse {
        summary: DockerSummary {
            running,
            stopped: containers.len().saturating_sub(running),
            updates_available,
        },
        containers,
    }
}

/// `state` is authoritative; the legacy `status` string only fills in when
/// `state` is missing or unrecognized.
fn container_status(item: &Value) -> RunStatus {
    match normalize_run_state(&string_or(item.get("state"), "unknown")) {
        RunStatus::Unknown => normalize_run_state(&string_or(item.get("status"), "")),
        known => known,
    }
}

/// The first container name without Docker's leading slash.
pub(crate) fn primary_name(item: &Value) -> String {
    let first = array_of(item.get("names")).first();
    let name = string_or(first, "");
    name.strip_prefix('/').unwrap_or(&name).to_string()
}

fn map_container(item: &Value) -> DockerContainer {
    let labels = item.get("labels").filter(|value| value.is_object());
    let label = |key: &str| labels.and_then(|map| map.get(key));

    let preferred_name = primary_name(item);
    let endpoint = string_or(
        item.get("webUiUrl"),
        &string_or(item.get("endpoint"), &string_or(label(WEBUI_LABEL), "-")),
    );
    let network = string_or(
        item.get("network"),
        &string_or(item.pointer("/hostConfig/networkMode"), "bridge"),
    );

    DockerContainer {
        id: string_or(item.get("id"), "-"),
        name: if preferred_name.is_empty() {
            string_or(item.get("name"), "-")
        } else {
            preferred_name
        },
        image: string_or(item.get("image"), "-"),
        icon_url: string_or(item.get("iconUrl"), &string_or(label(ICON_LABEL), "")),
        network,
        endpoint,
        ports: summarize_ports(array_of(item.get("ports"))),
        created_at: format_epoch(item.get("created")),
        auto_start: truthy(item.get("autoStart")),
        update_available: truthy(item.get("isUpdateAvailable")),
        rebuild_ready: truthy(item.get("isRebuildReady")),
        state_label: string_or(item.get("state"), "UNKNOWN"),
        status: container_status(item),
    }
}

fn port_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(n) => n
            .as_f64()
            .filter(|port| port.is_finite() && *port > 0.0)
            .map(|port| (port.round() as u64).to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// `public->private/proto` for the first few mappings.
fn summarize_ports(ports: &[Value]) -> String {
    let listed: Vec<String> = ports
        .iter()
        .take(MAX_LISTED_PORTS)
        .filter_map(|port| {
            let private = port_value(port.get("privatePort"));
            let public = port_value(port.get("publicPort"));
            let protocol = string_or(port.get("type"), "tcp").to_lowercase();
            match (public, private) {
                (Some(public), Some(private)) => {
                    Some(format!("{}->{}/{}", public, private, protocol))
                }
                (Some(single), None) | (None, Some(single)) => {
                    Some(format!("{}/{}", single, protocol))
                }
                (None, None) => None,
            }
        })
        .collect();

    if listed.is_empty() {
        return "-".to_string();
    }
    let summary = listed.join(", ");
    if ports.len() > MAX_LISTED_PORTS {
        format!("{}...", summary)
    } else {
        summary
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
