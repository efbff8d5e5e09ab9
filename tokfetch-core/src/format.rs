use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use tracing::warn;

/// Renders a duration in seconds as `M:SS`.
pub fn format_duration(seconds: f64) -> String {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    };
    let minutes = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{minutes}:{secs:02}")
}

/// Abbreviates a counter, e.g. `1500` becomes `1.5K`.
pub fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

fn video_id_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/video/(\d+)").expect("valid regex"))
}

/// Pulls the numeric id out of a `/video/<digits>` path segment.
pub fn video_id_from_url(page_url: &str) -> Option<String> {
    video_id_regex()
        .captures(page_url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Like [`video_id_from_url`], but falls back to the current Unix time in
/// milliseconds. The fallback id is not stable across calls.
pub fn derive_video_id(page_url: &str) -> String {
    video_id_from_url(page_url).unwrap_or_else(|| {
        let id = Utc::now().timestamp_millis().to_string();
        warn!(url = %page_url, id = %id, "no numeric video id in url, using timestamp");
        id
    })
}
