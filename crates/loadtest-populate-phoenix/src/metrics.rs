//! Per-task reports and the run report.

use crate::config::RunConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// What one producer did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerReport {
    pub lane_id: usize,
    pub rows_produced: u64,
    /// False when the producer was interrupted or its consumer went away.
    pub sentinel_sent: bool,
}

impl ProducerReport {
    pub fn new(lane_id: usize) -> Self {
        Self {
            lane_id,
            rows_produced: 0,
            sentinel_sent: false,
        }
    }
}

/// Why a consumer loop ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "message", rename_all = "snake_case")]
pub enum ConsumerExit {
    /// Saw the sentinel after every row of the lane.
    Sentinel,
    /// A lane wait was cancelled.
    Interrupted,
    /// Every sender of the lane is gone.
    LaneClosed,
    /// A row failed to execute; the loop stopped without it.
    StatementFailed(String),
    /// Could not connect or prepare the upsert; no row was taken.
    SetupFailed(String),
}

/// What one consumer did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerReport {
    pub lane_id: usize,
    pub tenant_id: String,
    pub table: String,
    pub rows_executed: u64,
    /// Successful commits, periodic and final.
    pub commits: u64,
    pub failed_commits: u64,
    pub exit: ConsumerExit,
}

impl ConsumerReport {
    pub fn new(lane_id: usize, tenant_id: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            lane_id,
            tenant_id: tenant_id.into(),
            table: table.into(),
            rows_executed: 0,
            commits: 0,
            failed_commits: 0,
            exit: ConsumerExit::Sentinel,
        }
    }
}

/// Summary of a whole run, written to `--metrics-file` as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub endpoint: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub lane_count: usize,
    pub rows_per_lane: u64,
    pub batch_size: u64,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    pub rows_produced: u64,
    pub rows_executed: u64,
    pub commits: u64,
    pub failed_commits: u64,
    pub rows_per_second: f64,
    pub producers: Vec<ProducerReport>,
    pub consumers: Vec<ConsumerReport>,
    /// Tasks that panicked or were aborted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub task_failures: Vec<String>,
}

impl RunReport {
    /// Aggregate task reports. Reports are ordered by lane.
    pub fn new(
        config: &RunConfig,
        started_at: DateTime<Utc>,
        duration: Duration,
        mut producers: Vec<ProducerReport>,
        mut consumers: Vec<ConsumerReport>,
        task_failures: Vec<String>,
    ) -> Self {
        producers.sort_by_key(|p| p.lane_id);
        consumers.sort_by_key(|c| c.lane_id);

        let rows_executed = consumers.iter().map(|c| c.rows_executed).sum();
        Self {
            endpoint: config.endpoint.clone(),
            started_at,
            completed_at: Utc::now(),
            lane_count: config.lane_count,
            rows_per_lane: config.rows_per_lane,
            batch_size: config.batch_size,
            duration_ms: duration.as_millis() as u64,
            rows_produced: producers.iter().map(|p| p.rows_produced).sum(),
            rows_executed,
            commits: consumers.iter().map(|c| c.commits).sum(),
            failed_commits: consumers.iter().map(|c| c.failed_commits).sum(),
            rows_per_second: rows_per_second(rows_executed, duration),
            producers,
            consumers,
            task_failures,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Every lane delivered all its rows and saw its sentinel.
    pub fn is_complete(&self) -> bool {
        self.task_failures.is_empty()
            && self.consumers.len() == self.lane_count
            && self
                .consumers
                .iter()
                .all(|c| c.exit == ConsumerExit::Sentinel && c.rows_executed == self.rows_per_lane)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), crate::error::PhoenixPopulatorError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Calculate rows per second.
pub fn rows_per_second(rows: u64, duration: Duration) -> f64 {
    if duration.as_secs_f64() > 0.0 {
        rows as f64 / duration.as_secs_f64()
    } else {
        0.0
    }
}
