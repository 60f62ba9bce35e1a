// Unraid BFF — Value coercion and display formatting
//
// Upstream fields arrive as numbers, numeric strings, nulls or not at all,
// depending on the Unraid release. These helpers never fail: every absent or
// malformed input collapses to a caller-chosen fallback.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use serde_json::Value;

const BYTE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// A finite number from a JSON number or a trimmed numeric string.
pub fn to_number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

pub fn number_or(value: Option<&Value>, fallback: f64) -> f64 {
    to_number(value).unwrap_or(fallback)
}

/// Non-negative whole count.
pub fn count_or(value: Option<&Value>, fallback: f64) -> u64 {
    number_or(value, fallback).max(0.0).round() as u64
}

/// A non-empty string, or `fallback`.
pub fn string_or(value: Option<&Value>, fallback: &str) -> String {
    match value {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => fallback.to_string(),
    }
}

/// JavaScript-style truthiness for loosely typed flags.
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// The array at `value`, or an empty slice.
pub fn array_of(value: Option<&Value>) -> &[Value] {
    value.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

/// Round to the nearest integer and clamp to `[0, 100]`.
pub fn round_percent(value: f64) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u32
}

/// `used / total` as a clamped percentage; 0 when `total` is not positive.
pub fn ratio_percent(used: f64, total: f64) -> u32 {
    if total > 0.0 {
        round_percent(used / total * 100.0)
    } else {
        0
    }
}

// ─── Sizes ───────────────────────────────────────────────────────────────────

/// Base-1024 size with one decimal below 100 in the chosen unit.
pub fn format_bytes(bytes: f64) -> String {
    let mut current = bytes.max(0.0);
    let mut unit = 0;
    while current >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        current /= 1024.0;
        unit += 1;
    }
    if current >= 100.0 {
        format!("{:.0} {}", current, BYTE_UNITS[unit])
    } else {
        format!("{:.1} {}", current, BYTE_UNITS[unit])
    }
}

/// A kilobyte quantity, or `-` when it is not positive.
pub fn format_kilobytes(kilobytes: f64) -> String {
    if kilobytes > 0.0 {
        format_bytes(kilobytes * 1024.0)
    } else {
        "-".to_string()
    }
}

// ─── Time ────────────────────────────────────────────────────────────────────

fn format_uptime_seconds(total: f64) -> String {
    if !total.is_finite() || total <= 0.0 {
        return "-".to_string();
    }
    let total = total.floor() as u64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Uptime from seconds or from a boot timestamp.
pub fn format_uptime(value: Option<&Value>) -> String {
    format_uptime_at(value, Utc::now())
}

pub fn format_uptime_at(value: Option<&Value>, now: DateTime<Utc>) -> String {
    match value {
        Some(Value::Number(n)) => n.as_f64().map_or("-".to_string(), format_uptime_seconds),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return "-".to_string();
            }
            if trimmed.chars().all(|c| c.is_ascii_digit()) {
                return trimmed
                    .parse::<f64>()
                    .map_or("-".to_string(), format_uptime_seconds);
            }
            match DateTime::parse_from_rfc3339(trimmed) {
                Ok(booted) => {
                    let elapsed = now.signed_duration_since(booted.with_timezone(&Utc));
                    format_uptime_seconds(elapsed.num_seconds() as f64)
                }
                Err(_) => "-".to_string(),
            }
        }
        _ => "-".to_string(),
    }
}

/// Parity-check duration in seconds.
pub fn format_duration(value: Option<&Value>) -> String {
    let seconds = number_or(value, 0.0);
    if seconds <= 0.0 {
        return "-".to_string();
    }
    let seconds = seconds.floor() as u64;
    let hours = seconds / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let rest = seconds % 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, rest)
    } else {
        format!("{}s", rest)
    }
}

/// Unix seconds rendered in the server's local time zone.
pub fn format_epoch(value: Option<&Value>) -> String {
    let seconds = number_or(value, 0.0);
    if seconds <= 0.0 {
        return "-".to_string();
    }
    DateTime::from_timestamp(seconds as i64, 0)
        .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

// ─── Labels ──────────────────────────────────────────────────────────────────

/// `PRO` → `Pro`.
pub fn capitalize(value: Option<&Value>) -> String {
    let raw = string_or(value, "-");
    if raw == "-" {
        return raw;
    }
    let lower = raw.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => lower,
    }
}

pub fn format_temperature(value: Option<&Value>) -> String {
    match to_number(value) {
        Some(celsius) if celsius > 0.0 => format!("{} C", celsius.round() as i64),
        _ => "-".to_string(),
    }
}

/// Collapsed run state shared by containers and VMs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Stopped,
    Unknown,
}

/// Case-insensitive state synonym mapping. Paused is not a run state.
pub fn normalize_run_state(raw: &str) -> RunStatus {
    match raw.trim().to_ascii_lowercase().as_str() {
        "running" => RunStatus::Running,
        "stopped" | "exited" | "shutoff" => RunStatus::Stopped,
        _ => RunStatus::Unknown,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_number_accepts_numeric_strings() {
        assert_eq!(to_number(Some(&json!(42))), Some(42.0));
        assert_eq!(to_number(Some(&json!(" 7.5 "))), Some(7.5));
        assert_eq!(to_number(Some(&json!("abc"))), None);
        assert_eq!(to_number(Some(&json!(""))), None);
        assert_eq!(to_number(Some(&json!(true))), None);
        assert_eq!(to_number(None), None);
        assert_eq!(number_or(Some(&json!("inf")), 3.0), 3.0, "non-finite falls back");
    }

    #[test]
    fn test_string_or() {
        assert_eq!(string_or(Some(&json!("x")), "-"), "x");
        assert_eq!(string_or(Some(&json!("")), "-"), "-");
        assert_eq!(string_or(Some(&json!(5)), "-"), "-");
    }

    #[test]
    fn test_truthy() {
        assert!(truthy(Some(&json!(true))));
        assert!(truthy(Some(&json!(1))));
        assert!(truthy(Some(&json!("yes"))));
        assert!(!truthy(Some(&json!(0))));
        assert!(!truthy(Some(&json!(""))));
        assert!(!truthy(Some(&Value::Null)));
        assert!(!truthy(None));
    }

    #[test]
    fn test_round_percent_clamps() {
        assert_eq!(round_percent(33.8), 34);
        assert_eq!(round_percent(140.0), 100);
        assert_eq!(round_percent(-5.0), 0);
        assert_eq!(round_percent(f64::NAN), 0);
        assert_eq!(ratio_percent(1.0, 0.0), 0);
        assert_eq!(ratio_percent(1.0, 4.0), 25);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0.0), "0.0 B");
        assert_eq!(format_bytes(512.0), "512 B");
        assert_eq!(format_bytes(1536.0), "1.5 KB");
        assert_eq!(format_bytes(150.0 * 1024.0 * 1024.0), "150 MB");
        assert_eq!(format_bytes(2.0 * 1024f64.powi(4)), "2.0 TB");
        assert_eq!(format_kilobytes(0.0), "-");
        assert_eq!(format_kilobytes(1024.0), "1.0 MB");
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Some(&json!(90_061))), "1d 1h");
        assert_eq!(format_uptime(Some(&json!("7260"))), "2h 1m");
        assert_eq!(format_uptime(Some(&json!(300))), "5m");
        assert_eq!(format_uptime(Some(&json!(0))), "-");
        assert_eq!(format_uptime(Some(&json!("garbage"))), "-");
        assert_eq!(format_uptime(None), "-");
    }

    #[test]
    fn test_format_uptime_from_boot_timestamp() {
        let now = DateTime::parse_from_rfc3339("2024-05-03T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let booted = json!("2024-05-01T10:00:00Z");
        assert_eq!(format_uptime_at(Some(&booted), now), "2d 2h");

        let future = json!("2024-05-04T10:00:00Z");
        assert_eq!(format_uptime_at(Some(&future), now), "-");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Some(&json!(3_725))), "1h 2m");
        assert_eq!(format_duration(Some(&json!(125))), "2m 5s");
        assert_eq!(format_duration(Some(&json!(42))), "42s");
        assert_eq!(format_duration(Some(&json!(-1))), "-");
    }

    #[test]
    fn test_format_epoch() {
        assert_eq!(format_epoch(Some(&json!(0))), "-");
        assert_eq!(format_epoch(None), "-");
        assert_ne!(format_epoch(Some(&json!(1_700_000_000))), "-");
    }

    #[test]
    fn test_labels() {
        assert_eq!(capitalize(Some(&json!("PRO"))), "Pro");
        assert_eq!(capitalize(None), "-");
        assert_eq!(format_temperature(Some(&json!(38.6))), "39 C");
        assert_eq!(format_temperature(Some(&json!(0))), "-");
        assert_eq!(format_temperature(Some(&json!("n/a"))), "-");
    }

    #[test]
    fn test_normalize_run_state() {
        assert_eq!(normalize_run_state("RUNNING"), RunStatus::Running);
        assert_eq!(normalize_run_state("exited"), RunStatus::Stopped);
        assert_eq!(normalize_run_state("SHUTOFF"), RunStatus::Stopped);
        assert_eq!(normalize_run_state("paused"), RunStatus::Unknown);
        assert_eq!(normalize_run_state(""), RunStatus::Unknown);
    }
}
