// Unraid BFF — Share mapping
//
// Share sizes are reported in kilobytes.

use serde::Serialize;
use serde_json::Value;

use super::coerce::{array_of, format_kilobytes, number_or, ratio_percent, string_or, truthy};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharesResponse {
    pub shares: Vec<Share>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Share {
    pub id: String,
    pub name: String,
    pub allocator: String,
    pub split_level: String,
    pub size: String,
    pub used: String,
    pub free: String,
    pub cached: String,
    pub usage_percent: u32,
    pub location: String,
}

fn disk_list(value: Option<&Value>) -> Vec<&str> {
    array_of(value)
        .iter()
        .filter_map(Value::as_str)
        .filter(|disk| !disk.trim().is_empty())
        .collect()
}

pub fn map_shares(data: &Value) -> SharesResponse {
    let shares = array_of(data.get("shares"))
        .iter()
        .map(|share| {
            let size = number_or(share.get("size"), 0.0);
            let used = number_or(share.get("used"), 0.0);
            let free = number_or(share.get("free"), 0.0);
            let denominator = if size > 0.0 { size } else { used + free };

            let include = disk_list(share.get("include"));
            let exclude = disk_list(share.get("exclude"));
            let location = if !include.is_empty() {
                format!("Include: {}", include.join(", "))
            } else if !exclude.is_empty() {
                format!("Exclude: {}", exclude.join(", "))
            } else {
                "All disks".to_string()
            };

            let cached = match share.get("cache") {
                None | Some(Value::Null) => "-",
                cache if truthy(cache) => "yes",
                _ => "no",
            };

            Share {
                id: string_or(share.get("id"), "-"),
                name: string_or(share.get("name"), "-"),
                allocator: string_or(share.get("allocator"), "-"),
                split_level: string_or(share.get("splitLevel"), "-"),
                size: format_kilobytes(size),
                used: format_kilobytes(used),
                free: format_kilobytes(free),
                cached: cached.to_string(),
                usage_percent: ratio_percent(used, denominator),
                location,
            }
        })
        .collect();

    SharesResponse { shares }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
