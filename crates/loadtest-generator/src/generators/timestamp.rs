//! Timestamp generators.

use chrono::{DateTime, Utc};

/// The current UTC timestamp, truncated to millisecond precision.
///
/// Phoenix `TIMESTAMP` columns are bound as epoch milliseconds, so
/// truncating here keeps the generated row equal to what is written.
pub fn generate_timestamp_now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Wall-clock milliseconds since the Unix epoch.
pub fn generate_epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}
