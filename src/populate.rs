//! `populate` command runner.

use crate::config::parse_duration;
use anyhow::Context;
use loadtest_populate_phoenix::{PhoenixPopulateArgs, PhoenixPopulator, RunConfig, RunReport};
use phoenix_client::Connector;
use std::io::Write;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Build the validated run configuration from CLI arguments.
pub fn build_config(args: &PhoenixPopulateArgs) -> anyhow::Result<RunConfig> {
    let timeout = args
        .common
        .timeout
        .as_deref()
        .map(parse_duration)
        .transpose()
        .context("Invalid --timeout")?;
    Ok(RunConfig::from_args(args, timeout)?)
}

/// Parameter header printed before the run starts.
pub fn write_header<W: Write>(out: &mut W, config: &RunConfig, dry_run: bool) -> std::io::Result<()> {
    writeln!(out, "================ Load test parameters ================")?;
    if dry_run {
        writeln!(out, "Mode: dry-run (in-memory backend)")?;
    }
    writeln!(out, "Endpoint: {}", config.endpoint)?;
    writeln!(out, "Number of tasks: {}", config.task_count())?;
    writeln!(out, "Number of lanes (tables): {}", config.lane_count)?;
    writeln!(out, "Rows in each table: {}", config.rows_per_lane)?;
    writeln!(out, "Total rows: {}", config.total_rows())?;
    writeln!(out, "Batch size: {}", config.batch_size)?;
    writeln!(out, "=======================================================")?;
    Ok(())
}

/// Run the load test and report the elapsed time.
///
/// The report is written to `metrics_file` as JSON when given.
pub async fn run_populate<C, W>(
    connector: C,
    config: RunConfig,
    cancel: CancellationToken,
    metrics_file: Option<&Path>,
    out: &mut W,
) -> anyhow::Result<RunReport>
where
    C: Connector + Clone + 'static,
    W: Write,
{
    let populator = PhoenixPopulator::new(connector, config)?;
    let report = populator
        .run(cancel)
        .await
        .context("Load test run failed")?;

    writeln!(
        out,
        "All tasks finished, total time: {} milliseconds.",
        report.duration_ms
    )?;
    writeln!(
        out,
        "Rows executed: {} ({:.2} rows/sec, {} commits, {} failed commits)",
        report.rows_executed, report.rows_per_second, report.commits, report.failed_commits
    )?;

    if let Some(path) = metrics_file {
        report
            .write_to(path)
            .with_context(|| format!("Failed to write metrics to {path:?}"))?;
        info!("Metrics written to {:?}", path);
    }

    Ok(report)
}

/// Cancel the returned token on Ctrl+C.
pub fn setup_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let handler_token = token.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received interrupt signal (Ctrl+C), stopping all lanes");
                handler_token.cancel();
            }
            Err(e) => tracing::warn!("Failed to install Ctrl+C handler: {}", e),
        }
    });

    token
}
