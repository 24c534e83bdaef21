//! Duration parsing utilities.

use anyhow::Context;
use std::time::Duration;

/// Parse a duration string like "1h", "30m", "300s", "300" into a `Duration`.
/// Supports:
/// - Plain numbers (interpreted as seconds): "300"
/// - Milliseconds suffix: "500ms"
/// - Seconds suffix: "300s"
/// - Minutes suffix: "30m"
/// - Hours suffix: "1h"
/// - Days suffix: "2d"
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    // "ms" before "m" and "s"
    if let Some(num_str) = s.strip_suffix("ms") {
        return Ok(Duration::from_millis(parse_number(num_str, "milliseconds")?));
    }

    let (num_str, unit, secs_per_unit) = if let Some(n) = s.strip_suffix('d') {
        (n, "days", 86_400)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, "hours", 3600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, "minutes", 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, "seconds", 1)
    } else {
        (s, "duration", 1)
    };

    let value = parse_number(num_str, unit)?;
    let secs = value
        .checked_mul(secs_per_unit)
        .with_context(|| format!("Duration too large: {s}"))?;
    Ok(Duration::from_secs(secs))
}

fn parse_number(num_str: &str, unit: &str) -> anyhow::Result<u64> {
    num_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid {unit} value: {num_str}"))
}
