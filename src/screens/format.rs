//! Display formatting for counters and backend timestamps

use chrono::{DateTime, Local, NaiveDateTime};

/// Compact a counter: 12345 -> "1.2W", 1500 -> "1.5K"
#[must_use]
pub fn compact_count(n: i64) -> String {
    if n >= 10_000 {
        format!("{:.1}W", n as f64 / 10_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

/// Parse the timestamp shapes the backend emits, in local time
#[must_use]
pub fn parse_backend_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Absolute form used on history records: `YYYY-MM-DD HH:MM`
#[must_use]
pub fn format_datetime(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return "未知时间".to_string();
    };

    parse_backend_time(raw).map_or_else(
        || "时间格式错误".to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M").to_string(),
    )
}

/// Relative form: "刚刚", "N分钟前", then `MM-DD HH:MM`
#[must_use]
pub fn format_relative(at: NaiveDateTime, now: NaiveDateTime) -> String {
    let minutes = (now - at).num_minutes();

    if minutes < 1 {
        "刚刚".to_string()
    } else if minutes < 60 {
        format!("{minutes}分钟前")
    } else {
        at.format("%m-%d %H:%M").to_string()
    }
}
