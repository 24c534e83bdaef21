//! Common CLI argument definitions shared by all populators.

use clap::Args;
use std::path::PathBuf;

/// Rows generated per lane when none are given.
pub const DEFAULT_ROWS_PER_LANE: u64 = 100_000;

/// Rows executed between two periodic commits.
pub const DEFAULT_BATCH_SIZE: u64 = 5000;

/// Capacity of each producer/consumer lane.
pub const DEFAULT_LANE_CAPACITY: usize = 100;

/// Common arguments shared by all populators.
///
/// The row and lane counts are positional so they follow the endpoint the
/// populator declares before flattening this struct:
/// `<ENDPOINT> [ROWS] [LANES]`.
#[derive(Args, Clone, Debug)]
pub struct CommonPopulateArgs {
    /// Number of rows to generate per lane (each lane writes its own table)
    #[arg(value_name = "ROWS", default_value_t = DEFAULT_ROWS_PER_LANE)]
    pub row_count: u64,

    /// Number of producer/consumer lanes (default: available CPUs / 2)
    #[arg(value_name = "LANES")]
    pub lanes: Option<usize>,

    /// Rows executed between two commits
    #[arg(long, env = "LOADTEST_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: u64,

    /// Capacity of each lane between producer and consumer
    #[arg(long, env = "LOADTEST_LANE_CAPACITY", default_value_t = DEFAULT_LANE_CAPACITY)]
    pub lane_capacity: usize,

    /// Random seed for reproducible string payloads (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Abort the run after this long, e.g. "300", "30s", "10m", "1h"
    #[arg(long)]
    pub timeout: Option<String>,

    /// Dry-run mode: run the whole pipeline against an in-memory backend
    #[arg(long)]
    pub dry_run: bool,

    /// Write the run report as JSON to this file
    #[arg(long, value_name = "PATH")]
    pub metrics_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        endpoint: String,
        #[command(flatten)]
        common: CommonPopulateArgs,
    }

    #[test]
    fn test_defaults() {
        let cli = TestCli::try_parse_from(["test", "http://pqs:8765"]).unwrap();
        assert_eq!(cli.endpoint, "http://pqs:8765");
        assert_eq!(cli.common.row_count, DEFAULT_ROWS_PER_LANE);
        assert_eq!(cli.common.lanes, None);
        assert_eq!(cli.common.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(cli.common.lane_capacity, DEFAULT_LANE_CAPACITY);
        assert!(!cli.common.dry_run);
    }

    #[test]
    fn test_positional_rows_and_lanes() {
        let cli = TestCli::try_parse_from(["test", "http://pqs:8765", "10", "2", "--batch-size", "5"])
            .unwrap();
        assert_eq!(cli.common.row_count, 10);
        assert_eq!(cli.common.lanes, Some(2));
        assert_eq!(cli.common.batch_size, 5);
    }

    #[test]
    fn test_endpoint_required() {
        assert!(TestCli::try_parse_from(["test"]).is_err());
    }
}
