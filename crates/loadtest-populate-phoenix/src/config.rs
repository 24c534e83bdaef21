//! Immutable run configuration.

use crate::args::PhoenixPopulateArgs;
use crate::ddl::{table_name, tenant_id, DEFAULT_TABLE_PREFIX, DEFAULT_TENANT_PREFIX};
use crate::error::PhoenixPopulatorError;
use loadtest_populate::{DEFAULT_BATCH_SIZE, DEFAULT_LANE_CAPACITY, DEFAULT_ROWS_PER_LANE};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Largest buffer a bounded tokio channel accepts.
pub const MAX_LANE_CAPACITY: usize = Semaphore::MAX_PERMITS;

/// Rows of work given to one lane before any task starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkAssignment {
    pub lane_id: usize,
    pub row_count: u64,
}

/// Everything a run needs, fixed before the first task is spawned.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub endpoint: String,
    /// Rows each lane produces.
    pub rows_per_lane: u64,
    pub lane_count: usize,
    /// Rows executed between periodic commits.
    pub batch_size: u64,
    pub lane_capacity: usize,
    pub table_prefix: String,
    pub tenant_prefix: String,
    /// Base seed for per-lane generators; entropy when `None`.
    pub seed: Option<u64>,
    /// Cancel the run when this elapses.
    pub timeout: Option<Duration>,
}

impl RunConfig {
    /// Configuration with default batching for `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            rows_per_lane: DEFAULT_ROWS_PER_LANE,
            lane_count: default_lane_count(),
            batch_size: DEFAULT_BATCH_SIZE,
            lane_capacity: DEFAULT_LANE_CAPACITY,
            table_prefix: DEFAULT_TABLE_PREFIX.to_string(),
            tenant_prefix: DEFAULT_TENANT_PREFIX.to_string(),
            seed: None,
            timeout: None,
        }
    }

    /// Build the configuration from parsed CLI arguments.
    ///
    /// `timeout` is parsed by the caller so this crate stays free of the
    /// duration syntax.
    pub fn from_args(
        args: &PhoenixPopulateArgs,
        timeout: Option<Duration>,
    ) -> Result<Self, PhoenixPopulatorError> {
        let common = &args.common;
        let config = Self {
            endpoint: args.endpoint.clone(),
            rows_per_lane: common.row_count,
            lane_count: common.lanes.unwrap_or_else(default_lane_count),
            batch_size: common.batch_size,
            lane_capacity: common.lane_capacity,
            table_prefix: args.table_prefix.clone(),
            tenant_prefix: args.tenant_prefix.clone(),
            seed: common.seed,
            timeout,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_rows_per_lane(mut self, rows: u64) -> Self {
        self.rows_per_lane = rows;
        self
    }

    pub fn with_lane_count(mut self, lanes: usize) -> Self {
        self.lane_count = lanes;
        self
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_lane_capacity(mut self, capacity: usize) -> Self {
        self.lane_capacity = capacity;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Reject configurations that cannot make progress.
    pub fn validate(&self) -> Result<(), PhoenixPopulatorError> {
        if self.endpoint.trim().is_empty() {
            return Err(PhoenixPopulatorError::Config(
                "endpoint must not be empty".to_string(),
            ));
        }
        if self.lane_count == 0 {
            return Err(PhoenixPopulatorError::Config(
                "lane count must be greater than 0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(PhoenixPopulatorError::Config(
                "batch size must be greater than 0".to_string(),
            ));
        }
        if self.lane_capacity == 0 {
            return Err(PhoenixPopulatorError::Config(
                "lane capacity must be greater than 0".to_string(),
            ));
        }
        if self.lane_capacity > MAX_LANE_CAPACITY {
            return Err(PhoenixPopulatorError::Config(format!(
                "lane capacity must be at most {MAX_LANE_CAPACITY}"
            )));
        }
        Ok(())
    }

    /// Total rows across all lanes.
    pub fn total_rows(&self) -> u64 {
        self.rows_per_lane.saturating_mul(self.lane_count as u64)
    }

    /// One producer and one consumer per lane.
    pub fn task_count(&self) -> usize {
        self.lane_count * 2
    }

    /// Rows between two info-level status lines.
    pub fn status_interval(&self) -> u64 {
        self.batch_size.saturating_mul(10)
    }

    pub fn assignments(&self) -> Vec<WorkAssignment> {
        (0..self.lane_count)
            .map(|lane_id| WorkAssignment {
                lane_id,
                row_count: self.rows_per_lane,
            })
            .collect()
    }

    pub fn table_for(&self, lane_id: usize) -> String {
        table_name(&self.table_prefix, lane_id)
    }

    pub fn tenant_for(&self, lane_id: usize) -> String {
        tenant_id(&self.tenant_prefix, lane_id)
    }
}

/// Half the available CPUs, at least one.
pub fn default_lane_count() -> usize {
    (num_cpus::get() / 2).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: PhoenixPopulateArgs,
    }

    #[test]
    fn test_defaults() {
        let config = RunConfig::new("http://pqs:8765");
        assert_eq!(config.rows_per_lane, 100_000);
        assert_eq!(config.batch_size, 5000);
        assert_eq!(config.lane_capacity, 100);
        assert!(config.lane_count >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let base = RunConfig::new("http://pqs:8765");
        assert!(base.clone().with_batch_size(0).validate().is_err());
        assert!(base.clone().with_lane_count(0).validate().is_err());
        assert!(base.clone().with_lane_capacity(0).validate().is_err());
        assert!(RunConfig::new(" ").validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_lane_capacity() {
        let base = RunConfig::new("http://pqs:8765");
        assert!(base
            .clone()
            .with_lane_capacity(MAX_LANE_CAPACITY)
            .validate()
            .is_ok());

        let err = base
            .clone()
            .with_lane_capacity(MAX_LANE_CAPACITY + 1)
            .validate()
            .unwrap_err();
        assert!(matches!(err, PhoenixPopulatorError::Config(_)));
        assert!(base.with_lane_capacity(usize::MAX).validate().is_err());
    }

    #[test]
    fn test_assignments_and_names() {
        let config = RunConfig::new("http://pqs:8765")
            .with_lane_count(3)
            .with_rows_per_lane(10);

        let assignments = config.assignments();
        assert_eq!(assignments.len(), 3);
        assert_eq!(
            assignments[2],
            WorkAssignment {
                lane_id: 2,
                row_count: 10
            }
        );
        assert_eq!(config.total_rows(), 30);
        assert_eq!(config.task_count(), 6);
        assert_eq!(config.table_for(1), "loadtest_1");
        assert_eq!(config.tenant_for(1), "test1");
    }

    #[test]
    fn test_from_args() {
        let cli = TestCli::try_parse_from([
            "test",
            "http://pqs:8765",
            "10",
            "2",
            "--batch-size",
            "5",
            "--table-prefix",
            "perf_",
        ])
        .unwrap();
        let config = RunConfig::from_args(&cli.args, Some(Duration::from_secs(30))).unwrap();

        assert_eq!(config.rows_per_lane, 10);
        assert_eq!(config.lane_count, 2);
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.table_for(0), "perf_0");
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_from_args_rejects_zero_batch() {
        let cli = TestCli::try_parse_from(["test", "http://pqs:8765", "--batch-size", "0"]).unwrap();
        assert!(RunConfig::from_args(&cli.args, None).is_err());
    }
}
