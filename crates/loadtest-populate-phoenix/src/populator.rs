//! Coordinator: provisions lane tables, runs the producer/consumer pairs and
//! reports throughput.

use crate::config::RunConfig;
use crate::consumer::{run_consumer, ConsumerSettings};
use crate::ddl::create_table_sql;
use crate::error::PhoenixPopulatorError;
use crate::lane::Lane;
use crate::metrics::{ConsumerReport, ProducerReport, RunReport};
use crate::producer::run_producer;
use chrono::Utc;
use loadtest_generator::RowGenerator;
use phoenix_client::{ClientError, Connection, Connector};
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

enum TaskOutcome {
    Producer(ProducerReport),
    Consumer(ConsumerReport),
}

/// Phoenix populator running one producer and one consumer per lane.
pub struct PhoenixPopulator<C> {
    connector: C,
    config: RunConfig,
}

impl<C> PhoenixPopulator<C>
where
    C: Connector + Clone + 'static,
{
    /// Create a populator. The configuration is validated here.
    pub fn new(connector: C, config: RunConfig) -> Result<Self, PhoenixPopulatorError> {
        config.validate()?;
        Ok(Self { connector, config })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Create every lane table on a non-tenant connection.
    ///
    /// The DDL is idempotent, so provisioning an existing table is a no-op.
    pub async fn provision(&self) -> Result<(), PhoenixPopulatorError> {
        let mut conn = self
            .connector
            .connect(&self.config.endpoint, None)
            .await
            .map_err(|e| {
                PhoenixPopulatorError::Connection(format!("{}: {e}", self.config.endpoint))
            })?;

        let provisioned = self.create_tables(&mut conn).await;
        if let Err(e) = conn.close().await {
            warn!("Could not close provisioning connection: {}", e);
        }
        provisioned?;
        Ok(())
    }

    async fn create_tables(&self, conn: &mut C::Connection) -> Result<(), ClientError> {
        for lane_id in 0..self.config.lane_count {
            let table = self.config.table_for(lane_id);
            let sql = create_table_sql(&table);
            info!("Creating table: {}", table);
            debug!("DDL: {}", sql);
            conn.execute(&sql).await?;
        }
        conn.commit().await
    }

    /// Provision the tables, then run every lane to completion.
    ///
    /// A failing lane does not stop the others. Cancelling `cancel`, or the
    /// configured timeout expiring, interrupts every lane wait so the run
    /// always returns.
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunReport, PhoenixPopulatorError> {
        self.provision().await?;

        let run_token = cancel.child_token();
        let watchdog = self.config.timeout.map(|timeout| {
            let token = run_token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(timeout) => {
                        warn!("Run timeout of {:?} reached, cancelling all lanes", timeout);
                        token.cancel();
                    }
                    _ = token.cancelled() => {}
                }
            })
        });

        let started_at = Utc::now();
        let start_time = Instant::now();

        // Lanes live until every task has finished.
        let mut lanes: Vec<Lane> = (0..self.config.lane_count)
            .map(|lane_id| Lane::new(lane_id, self.config.lane_capacity))
            .collect();

        let mut tasks = JoinSet::new();
        for (lane, assignment) in lanes.iter_mut().zip(self.config.assignments()) {
            let Some(receiver) = lane.take_receiver() else {
                continue;
            };
            let settings = ConsumerSettings {
                lane_id: assignment.lane_id,
                endpoint: self.config.endpoint.clone(),
                tenant_id: self.config.tenant_for(assignment.lane_id),
                table: self.config.table_for(assignment.lane_id),
                batch_size: self.config.batch_size,
                status_interval: self.config.status_interval(),
            };
            let connector = self.connector.clone();
            let token = run_token.clone();
            tasks.spawn(async move {
                TaskOutcome::Consumer(run_consumer(&connector, &settings, receiver, token).await)
            });

            let generator = RowGenerator::for_lane(self.config.seed, assignment.lane_id);
            let producer = run_producer(assignment, lane.sender(), generator, run_token.clone());
            tasks.spawn(async move { TaskOutcome::Producer(producer.await) });
        }
        info!("Started {} tasks on {} lanes", tasks.len(), lanes.len());

        let mut producers = Vec::with_capacity(lanes.len());
        let mut consumers = Vec::with_capacity(lanes.len());
        let mut task_failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(TaskOutcome::Producer(report)) => producers.push(report),
                Ok(TaskOutcome::Consumer(report)) => consumers.push(report),
                Err(e) => {
                    error!("Task failed: {}", e);
                    task_failures.push(e.to_string());
                }
            }
        }
        drop(lanes);

        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }

        let report = RunReport::new(
            &self.config,
            started_at,
            start_time.elapsed(),
            producers,
            consumers,
            task_failures,
        );

        info!(
            "Population complete: {} rows in {:?} ({:.2} rows/sec)",
            report.rows_executed,
            report.duration(),
            report.rows_per_second
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phoenix_client::MemoryConnector;

    #[test]
    fn test_rejects_invalid_config() {
        let config = RunConfig::new("mem").with_batch_size(0);
        assert!(PhoenixPopulator::new(MemoryConnector::new(), config).is_err());
    }

    #[tokio::test]
    async fn test_provision_creates_one_table_per_lane() {
        let connector = MemoryConnector::new();
        let config = RunConfig::new("mem").with_lane_count(3);
        let populator = PhoenixPopulator::new(connector.clone(), config).unwrap();

        populator.provision().await.unwrap();

        assert_eq!(
            connector.table_names(),
            vec!["LOADTEST_0", "LOADTEST_1", "LOADTEST_2"]
        );
        let session = &connector.sessions()[0];
        assert_eq!(session.tenant_id, None);
        assert_eq!(session.commits, 1);
        assert!(session.closed);
    }

    #[tokio::test]
    async fn test_provision_fails_when_unreachable() {
        let connector = MemoryConnector::new().refuse_connections();
        let populator = PhoenixPopulator::new(connector, RunConfig::new("mem")).unwrap();

        let result = populator.provision().await;
        assert!(matches!(result, Err(PhoenixPopulatorError::Connection(_))));
    }
}
