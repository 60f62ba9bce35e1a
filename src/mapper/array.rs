// Unraid BFF — Array mapping

use serde::Serialize;
use serde_json::Value;

use super::coerce::{
    array_of, count_or, format_bytes, format_kilobytes, format_temperature, number_or,
    ratio_percent, round_percent, string_or, to_number,
};
use super::ParityStatus;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayResponse {
    pub state: String,
    pub capacity: ArrayCapacity,
    pub parity: ParityStatus,
    pub devices: Vec<ArrayDevice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayCapacity {
    pub used: String,
    pub free: String,
    pub total: String,
    pub usage_percent: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceRole {
    Parity,
    Array,
    Pool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskType {
    Array,
    Pool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayDevice {
    pub id: String,
    pub role: DeviceRole,
    pub disk_type: DiskType,
    pub is_parity: bool,
    pub pool: String,
    pub filesystem: String,
    pub temp: String,
    pub size: String,
    pub used: String,
    pub errors: u64,
    pub free: String,
    pub usage_percent: u32,
}

/// Which structural list a device came from.
#[derive(Clone, Copy, PartialEq, Eq)]
enum SourceList {
    Parities,
    Disks,
    Caches,
    Untyped,
}

pub fn map_array(data: &Value) -> ArrayResponse {
    let root = data.get("array");
    let get = |path: &str| root.and_then(|value| value.pointer(path));

    let used_kb = number_or(get("/capacity/kilobytes/used"), 0.0);
    let free_kb = number_or(get("/capacity/kilobytes/free"), 0.0);
    let total_kb = number_or(get("/capacity/kilobytes/total"), 0.0);

    ArrayResponse {
        state: string_or(get("/state"), "-"),
        capacity: ArrayCapacity {
            used: format_kilobytes(used_kb),
            free: format_kilobytes(free_kb),
            total: format_kilobytes(total_kb),
            usage_percent: ratio_percent(used_kb, total_kb),
        },
        parity: ParityStatus::from_value(get("/parityCheckStatus")),
        devices: device_sources(data)
            .into_iter()
            .map(|(item, source)| map_device(item, source))
            .collect(),
    }
}

/// Structural lists (`parities`/`disks`/`caches`) win over flat device lists.
fn device_sources(data: &Value) -> Vec<(&Value, SourceList)> {
    let parities = array_of(data.pointer("/array/parities"));
    let disks = array_of(data.pointer("/array/disks"));
    let caches = array_of(data.pointer("/array/caches"));

    if !parities.is_empty() || !disks.is_empty() || !caches.is_empty() {
        return parities
            .iter()
            .map(|item| (item, SourceList::Parities))
            .chain(disks.iter().map(|item| (item, SourceList::Disks)))
            .chain(caches.iter().map(|item| (item, SourceList::Caches)))
            .collect();
    }

    let flat = ["/devices", "/arrayDevices", "/array/devices"]
        .iter()
        .find_map(|path| data.pointer(path).filter(|value| value.is_array()));
    array_of(flat)
        .iter()
        .map(|item| (item, SourceList::Untyped))
        .collect()
}

/// List membership decides the role; `type` only classifies flat-list devices.
fn device_role(item: &Value, source: SourceList) -> DeviceRole {
    match source {
        SourceList::Parities => DeviceRole::Parity,
        SourceList::Disks => DeviceRole::Array,
        SourceList::Caches => DeviceRole::Pool,
        SourceList::Untyped => match string_or(item.get("type"), "").to_ascii_uppercase().as_str() {
            "PARITY" => DeviceRole::Parity,
            "CACHE" => DeviceRole::Pool,
            _ => DeviceRole::Array,
        },
    }
}

fn map_device(item: &Value, source: SourceList) -> ArrayDevice {
    let role = device_role(item, source);
    let is_parity = role == DeviceRole::Parity;
    let disk_type = if role == DeviceRole::Pool {
        DiskType::Pool
    } else {
        DiskType::Array
    };
    let role_label = match role {
        DeviceRole::Parity => "parity",
        DeviceRole::Array => "array",
        DeviceRole::Pool => "pool",
    };

    let size_kb = number_or(item.get("size"), 0.0);
    let used_kb = number_or(item.get("used"), number_or(item.get("fsUsed"), 0.0));
    let free_kb = number_or(item.get("free"), number_or(item.get("fsFree"), 0.0));
    let usage_percent = match to_number(item.get("usagePercent")) {
        Some(reported) => round_percent(reported),
        None => ratio_percent(used_kb, size_kb),
    };

    ArrayDevice {
        id: string_or(item.get("id"), "-"),
        role,
        disk_type,
        is_parity,
        pool: string_or(item.get("pool"), role_label),
        filesystem: string_or(
            item.get("filesystem"),
            &string_or(item.get("fsType"), "unknown"),
        ),
        temp: format_temperature(item.get("temp")),
        size: format_bytes(size_kb * 1024.0),
        used: format_bytes(used_kb * 1024.0),
        errors: count_or(item.get("errors"), number_or(item.get("numErrors"), 0.0)),
        free: format_bytes(free_kb * 1024.0),
        usage_percent,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
