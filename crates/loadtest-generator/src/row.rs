//! The synthetic row written by the load test.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Length of the random `name` field.
pub const NAME_LENGTH: usize = 15;

/// Length of the random `description` field.
pub const DESCRIPTION_LENGTH: usize = 100;

/// One generated row. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Sequence number supplied by the producer.
    pub id: i64,
    pub name: String,
    /// Wall-clock milliseconds at generation time.
    pub session_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub description: String,
}
