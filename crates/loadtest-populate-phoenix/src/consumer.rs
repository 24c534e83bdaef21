//! Consumer task: drains one lane into batched upserts.

use crate::ddl::{bind_row, upsert_sql};
use crate::error::LaneError;
use crate::lane::{LaneItem, LaneReceiver};
use crate::metrics::{ConsumerExit, ConsumerReport};
use loadtest_generator::Row;
use phoenix_client::{ClientError, Connection, Connector, PreparedStatement};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Per-lane settings of a consumer.
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    pub lane_id: usize,
    pub endpoint: String,
    pub tenant_id: String,
    pub table: String,
    /// Rows between periodic commits.
    pub batch_size: u64,
    /// Rows between status lines.
    pub status_interval: u64,
}

/// Drain `receiver` into `settings.table` on a tenant connection.
///
/// Every `batch_size` executed rows are committed. Whatever ends the loop,
/// one more commit covers the rows since the last periodic one, then the
/// statement and the connection are closed.
pub async fn run_consumer<C: Connector>(
    connector: &C,
    settings: &ConsumerSettings,
    mut receiver: LaneReceiver,
    cancel: CancellationToken,
) -> ConsumerReport {
    let mut report = ConsumerReport::new(settings.lane_id, &settings.tenant_id, &settings.table);

    let mut conn = match connector
        .connect(&settings.endpoint, Some(&settings.tenant_id))
        .await
    {
        Ok(conn) => conn,
        Err(e) => {
            error!(
                "Consumer {} could not connect as tenant {}: {}",
                settings.lane_id, settings.tenant_id, e
            );
            report.exit = ConsumerExit::SetupFailed(e.to_string());
            return report;
        }
    };

    if let Err(e) = conn.set_auto_commit(false).await {
        warn!(
            "Consumer {} could not disable auto-commit: {}",
            settings.lane_id, e
        );
    }

    let mut statement = match conn.prepare(&upsert_sql(&settings.table)).await {
        Ok(statement) => statement,
        Err(e) => {
            error!(
                "Consumer {} could not prepare upsert into {}: {}",
                settings.lane_id, settings.table, e
            );
            report.exit = ConsumerExit::SetupFailed(e.to_string());
            close_connection(conn, settings.lane_id).await;
            return report;
        }
    };

    report.exit = loop {
        let row = match receiver.take(&cancel).await {
            Ok(LaneItem::Row(row)) => row,
            Ok(LaneItem::Sentinel) => break ConsumerExit::Sentinel,
            Err(LaneError::Interrupted) => break ConsumerExit::Interrupted,
            Err(LaneError::Closed) => break ConsumerExit::LaneClosed,
        };

        if let Err(e) = execute_row(&mut statement, &row).await {
            error!(
                "Consumer {} failed on row {}: {}",
                settings.lane_id, row.id, e
            );
            break ConsumerExit::StatementFailed(e.to_string());
        }
        report.rows_executed += 1;

        if report.rows_executed % settings.batch_size == 0 {
            commit(&mut conn, &mut report).await;
            debug!("+ lane {} committed {} rows", settings.lane_id, report.rows_executed);
        }
        if report.rows_executed % settings.status_interval == 0 {
            info!(
                "{}={} ({} rows executed)",
                settings.lane_id,
                receiver.depth(),
                report.rows_executed
            );
        }
    };

    commit(&mut conn, &mut report).await;

    if let Err(e) = statement.close().await {
        warn!("Consumer {} could not close statement: {}", settings.lane_id, e);
    }
    close_connection(conn, settings.lane_id).await;

    match &report.exit {
        ConsumerExit::Sentinel => debug!(
            "Consumer {} finished: {} rows, {} commits",
            report.lane_id, report.rows_executed, report.commits
        ),
        exit => warn!(
            "Consumer {} stopped early after {} rows: {:?}",
            report.lane_id, report.rows_executed, exit
        ),
    }
    report
}

async fn execute_row<S: PreparedStatement>(statement: &mut S, row: &Row) -> Result<u64, ClientError> {
    bind_row(statement, row)?;
    statement.execute().await
}

/// Commit failures are counted and logged, never fatal.
async fn commit<Conn: Connection>(conn: &mut Conn, report: &mut ConsumerReport) {
    match conn.commit().await {
        Ok(()) => report.commits += 1,
        Err(e) => {
            warn!("Consumer {} commit failed: {}", report.lane_id, e);
            report.failed_commits += 1;
        }
    }
}

async fn close_connection<Conn: Connection>(conn: Conn, lane_id: usize) {
    if let Err(e) = conn.close().await {
        warn!("Consumer {} could not close connection: {}", lane_id, e);
    }
}
