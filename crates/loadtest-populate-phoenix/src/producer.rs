//! Producer task: generates the rows of one lane.

use crate::config::WorkAssignment;
use crate::error::LaneError;
use crate::lane::{LaneItem, LaneSender};
use crate::metrics::ProducerReport;
use loadtest_generator::RowGenerator;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Generate `assignment.row_count` rows into the lane, then the sentinel.
///
/// Sequence numbers run from 0. If a put fails the producer stops at once
/// and the sentinel is never sent.
pub async fn run_producer(
    assignment: WorkAssignment,
    sender: LaneSender,
    mut generator: RowGenerator,
    cancel: CancellationToken,
) -> ProducerReport {
    let mut report = ProducerReport::new(assignment.lane_id);

    for row in generator.rows(assignment.row_count) {
        if let Err(e) = sender.put(LaneItem::Row(row), &cancel).await {
            log_stopped(&report, e);
            return report;
        }
        report.rows_produced += 1;
    }

    match sender.put(LaneItem::Sentinel, &cancel).await {
        Ok(()) => {
            report.sentinel_sent = true;
            debug!(
                "Producer {} finished after {} rows",
                report.lane_id, report.rows_produced
            );
        }
        Err(e) => log_stopped(&report, e),
    }
    report
}

fn log_stopped(report: &ProducerReport, error: LaneError) {
    warn!(
        "Producer {} stopped after {} rows without sending the sentinel: {}",
        report.lane_id, report.rows_produced, error
    );
}
