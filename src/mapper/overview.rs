// Unraid BFF — Overview mapping
//
// Input is the merged result of the overview queries:
//   { core: {...}, notifications: {...}?, network: {...}?, ups: {...}? }
// Older releases answer the core fields at the top level, so `info`,
// `metrics`, `array` and `vars` are looked up under `core` first and then at
// the root.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use super::coerce::{
    array_of, capitalize, count_or, format_bytes, format_duration, format_kilobytes, format_uptime,
    number_or, ratio_percent, round_percent, string_or,
};
use super::ParityStatus;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    pub cpu_percent: u32,
    pub cpu_model: String,
    pub cpu_cores: u64,
    pub cpu_threads: u64,
    pub cpu_speed_ghz: f64,
    pub memory_percent: u32,
    pub memory_used: String,
    pub memory_total: String,
    pub memory_free: String,
    pub server_name: String,
    pub license_type: String,
    pub unraid_version: String,
    pub kernel_version: String,
    pub os_distro: String,
    pub os_type: String,
    pub hostname: String,
    pub motherboard: String,
    pub uptime: String,
    pub server_time: String,
    pub array_state: String,
    pub array_usage_percent: u32,
    pub array_used: String,
    pub array_free: String,
    pub array_total: String,
    pub parity: ParityStatus,
    pub last_parity_check: LastParityCheck,
    pub ups: UpsSummary,
    pub unread_notifications: UnreadNotifications,
    pub access_urls: Vec<AccessUrl>,
    pub notifications: Vec<NotificationItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastParityCheck {
    pub date: String,
    pub duration: String,
    pub speed: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpsSummary {
    pub devices: Vec<UpsDevice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsDevice {
    pub id: String,
    pub name: String,
    pub model: String,
    pub status: String,
    pub battery_level: f64,
    pub estimated_runtime_seconds: f64,
    pub battery_health: String,
    pub input_voltage: f64,
    pub output_voltage: f64,
    pub load_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnreadNotifications {
    pub info: u64,
    pub warning: u64,
    pub alert: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessUrl {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub ipv4: String,
    pub ipv6: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Warning,
    Alert,
}

impl NotificationKind {
    fn from_importance(importance: &str) -> Self {
        match importance.to_ascii_lowercase().as_str() {
            "alert" => Self::Alert,
            "info" => Self::Info,
            _ => Self::Warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub category: String,
    pub date: String,
    pub snippet: String,
}

/// Look up `section` under `core`, falling back to the root object.
fn section<'a>(data: &'a Value, name: &str) -> Option<&'a Value> {
    data.pointer(&format!("/core/{}", name))
        .filter(|value| !value.is_null())
        .or_else(|| data.get(name).filter(|value| !value.is_null()))
}

fn field<'a>(parent: Option<&'a Value>, path: &str) -> Option<&'a Value> {
    parent.and_then(|value| value.pointer(path))
}

/// Positive byte quantity or `-`.
fn bytes_or_dash(bytes: f64) -> String {
    if bytes > 0.0 {
        format_bytes(bytes)
    } else {
        "-".to_string()
    }
}

pub fn map_overview(data: &Value) -> OverviewResponse {
    let info = section(data, "info");
    let metrics = section(data, "metrics");
    let array = section(data, "array");
    let vars = section(data, "vars");
    let capacity = field(array, "/capacity/kilobytes");
    let parity_check = field(array, "/parityCheckStatus");

    let cpu_percent = number_or(
        field(metrics, "/cpu/percentTotal"),
        number_or(field(info, "/cpuUsage"), 0.0),
    );
    let memory_percent = number_or(
        field(metrics, "/memory/percentTotal"),
        number_or(field(info, "/memoryUsage"), 0.0),
    );
    let memory_used = number_or(
        field(metrics, "/memory/used"),
        number_or(field(info, "/memoryUsed"), 0.0),
    );
    let memory_total = number_or(
        field(metrics, "/memory/total"),
        number_or(field(info, "/memoryTotal"), 0.0),
    );
    let memory_free = number_or(field(metrics, "/memory/free"), 0.0);

    let array_used = number_or(field(capacity, "/used"), 0.0);
    let array_free = number_or(field(capacity, "/free"), 0.0);
    let array_total = number_or(field(capacity, "/total"), 0.0);

    let manufacturer = string_or(field(info, "/baseboard/manufacturer"), "");
    let model = string_or(field(info, "/baseboard/model"), "");
    let motherboard = format!("{} {}", manufacturer, model).trim().to_string();

    OverviewResponse {
        cpu_percent: round_percent(cpu_percent),
        cpu_model: string_or(
            field(info, "/cpu/brand"),
            &string_or(field(info, "/cpuModel"), "Unknown CPU"),
        ),
        cpu_cores: count_or(field(info, "/cpu/cores"), 0.0),
        cpu_threads: count_or(field(info, "/cpu/threads"), 0.0),
        cpu_speed_ghz: number_or(field(info, "/cpu/speed"), 0.0),
        memory_percent: round_percent(memory_percent),
        memory_used: bytes_or_dash(memory_used),
        memory_total: bytes_or_dash(memory_total),
        memory_free: bytes_or_dash(memory_free),
        server_name: string_or(field(vars, "/name"), "Unraid"),
        license_type: capitalize(field(vars, "/regTy")),
        unraid_version: string_or(field(vars, "/version"), "-"),
        kernel_version: string_or(field(info, "/os/kernel"), "-"),
        os_distro: string_or(field(info, "/os/distro"), "-"),
        os_type: string_or(field(info, "/os/platform"), "-"),
        hostname: string_or(field(info, "/os/hostname"), "-"),
        motherboard: if motherboard.is_empty() {
            "-".to_string()
        } else {
            motherboard
        },
        uptime: format_uptime(field(info, "/os/uptime")),
        server_time: string_or(field(info, "/time"), "-"),
        array_state: string_or(field(array, "/state"), "-"),
        array_usage_percent: ratio_percent(array_used, array_total),
        array_used: format_kilobytes(array_used),
        array_free: format_kilobytes(array_free),
        array_total: format_kilobytes(array_total),
        parity: ParityStatus::from_value(parity_check),
        last_parity_check: LastParityCheck {
            date: string_or(field(parity_check, "/date"), "-"),
            duration: format_duration(field(parity_check, "/duration")),
            speed: string_or(field(parity_check, "/speed"), "-"),
        },
        ups: UpsSummary {
            devices: array_of(data.pointer("/ups/upsDevices"))
                .iter()
                .map(map_ups_device)
                .collect(),
        },
        unread_notifications: map_unread(data.pointer("/notifications/notifications/overview/unread")),
        access_urls: array_of(data.pointer("/network/network/accessUrls"))
            .iter()
            .map(|item| AccessUrl {
                kind: string_or(item.get("type"), "-"),
                name: string_or(item.get("name"), "-"),
                ipv4: string_or(item.get("ipv4"), "-"),
                ipv6: string_or(item.get("ipv6"), "-"),
            })
            .collect(),
        notifications: notification_source(data)
            .iter()
            .map(map_notification)
            .collect(),
    }
}

fn map_ups_device(device: &Value) -> UpsDevice {
    UpsDevice {
        id: string_or(device.get("id"), "-"),
        name: string_or(device.get("name"), "-"),
        model: string_or(device.get("model"), "-"),
        status: string_or(device.get("status"), "-"),
        battery_level: number_or(device.pointer("/battery/chargeLevel"), 0.0),
        estimated_runtime_seconds: number_or(device.pointer("/battery/estimatedRuntime"), 0.0),
        battery_health: string_or(device.pointer("/battery/health"), "-"),
        input_voltage: number_or(device.pointer("/power/inputVoltage"), 0.0),
        output_voltage: number_or(device.pointer("/power/outputVoltage"), 0.0),
        load_percentage: number_or(device.pointer("/power/loadPercentage"), 0.0),
    }
}

fn map_unread(unread: Option<&Value>) -> UnreadNotifications {
    UnreadNotifications {
        info: count_or(field(unread, "/info"), 0.0),
        warning: count_or(field(unread, "/warning"), 0.0),
        alert: count_or(field(unread, "/alert"), 0.0),
        total: count_or(field(unread, "/total"), 0.0),
    }
}

/// `warningsAndAlerts` from current releases, `list` from the filtered fallback.
fn notification_source(data: &Value) -> &[Value] {
    let current = data.pointer("/notifications/notifications/warningsAndAlerts");
    if current.is_some_and(Value::is_array) {
        return array_of(current);
    }
    array_of(data.pointer("/notifications/notifications/list"))
}

fn map_notification(item: &Value) -> NotificationItem {
    let importance = string_or(item.get("importance"), "warning");
    NotificationItem {
        id: string_or(item.get("id"), "-"),
        kind: NotificationKind::from_importance(&importance),
        title: string_or(item.get("title"), "Notification"),
        category: importance,
        date: string_or(item.get("timestamp"), &Utc::now().to_rfc3339()),
        snippet: string_or(item.get("description"), ""),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
