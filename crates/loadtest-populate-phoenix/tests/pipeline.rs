//! End-to-end lane pipeline tests against the in-memory backend.

use loadtest_generator::RowGenerator;
use loadtest_populate_phoenix::{
    run_consumer, run_producer, ConsumerExit, ConsumerSettings, Lane, PhoenixPopulator, RunConfig,
    WorkAssignment,
};
use phoenix_client::MemoryConnector;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn config(lanes: usize, rows: u64, batch_size: u64) -> RunConfig {
    RunConfig::new("mem")
        .with_lane_count(lanes)
        .with_rows_per_lane(rows)
        .with_batch_size(batch_size)
        .with_seed(42)
}

#[tokio::test]
async fn two_lanes_ten_rows_batch_five() {
    let connector = MemoryConnector::new();
    let populator = PhoenixPopulator::new(connector.clone(), config(2, 10, 5)).unwrap();

    let report = populator.run(CancellationToken::new()).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.rows_produced, 20);
    assert_eq!(report.rows_executed, 20);
    for (lane_id, consumer) in report.consumers.iter().enumerate() {
        assert_eq!(consumer.lane_id, lane_id);
        assert_eq!(consumer.exit, ConsumerExit::Sentinel);
        assert_eq!(consumer.rows_executed, 10);
        // two periodic commits, then a final one covering zero rows
        assert_eq!(consumer.commits, 3);
    }
    for producer in &report.producers {
        assert!(producer.sentinel_sent);
    }

    for lane_id in 0..2 {
        let table = connector.table(&format!("loadtest_{lane_id}")).unwrap();
        assert_eq!(table.committed_rows, 10);

        let session = connector.session_for_tenant(&format!("test{lane_id}")).unwrap();
        assert_eq!(session.executed_rows, 10);
        assert_eq!(session.commits, 3);
        assert_eq!(session.pending_rows(), 0);
        assert!(session.closed);
    }
}

#[tokio::test]
async fn commits_are_floor_rows_over_batch_plus_one() {
    let connector = MemoryConnector::new();
    let populator = PhoenixPopulator::new(connector.clone(), config(1, 23, 5)).unwrap();

    let report = populator.run(CancellationToken::new()).await.unwrap();

    assert_eq!(report.consumers[0].rows_executed, 23);
    assert_eq!(report.consumers[0].commits, 23 / 5 + 1);
    assert_eq!(connector.committed_rows(), 23);
}

#[tokio::test]
async fn small_lane_capacity_preserves_all_rows() {
    let connector = MemoryConnector::new();
    let populator = PhoenixPopulator::new(
        connector.clone(),
        config(3, 50, 7).with_lane_capacity(1),
    )
    .unwrap();

    let report = populator.run(CancellationToken::new()).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(connector.committed_rows(), 150);
}

#[tokio::test]
async fn provisioning_twice_is_idempotent() {
    let connector = MemoryConnector::new();
    let populator = PhoenixPopulator::new(connector.clone(), config(2, 0, 5)).unwrap();

    populator.provision().await.unwrap();
    populator.provision().await.unwrap();

    assert_eq!(connector.table_names(), vec!["LOADTEST_0", "LOADTEST_1"]);
    assert_eq!(connector.ddl_statements(), 4);
}

#[tokio::test]
async fn rerun_against_existing_tables() {
    let connector = MemoryConnector::new();
    let populator = PhoenixPopulator::new(connector.clone(), config(1, 5, 5)).unwrap();

    populator.run(CancellationToken::new()).await.unwrap();
    let report = populator.run(CancellationToken::new()).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(connector.table_names().len(), 1);
}

#[tokio::test]
async fn statement_failure_is_local_to_its_lane() {
    // the 3rd execution overall fails; lanes run concurrently, so only
    // the number of affected lanes is fixed
    let connector = MemoryConnector::new().fail_execute_at(3);
    let populator = PhoenixPopulator::new(connector.clone(), config(2, 10, 5)).unwrap();

    let report = populator.run(CancellationToken::new()).await.unwrap();

    let failed: Vec<_> = report
        .consumers
        .iter()
        .filter(|c| matches!(c.exit, ConsumerExit::StatementFailed(_)))
        .collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].rows_executed < 10);

    let healthy: Vec<_> = report
        .consumers
        .iter()
        .filter(|c| c.exit == ConsumerExit::Sentinel)
        .collect();
    assert_eq!(healthy.len(), 1);
    assert_eq!(healthy[0].rows_executed, 10);

    assert!(!report.is_complete());
    assert_eq!(report.rows_executed, 10 + failed[0].rows_executed);
    assert_eq!(connector.committed_rows(), report.rows_executed);
    assert!(connector.sessions().iter().all(|s| s.closed));
}

#[tokio::test]
async fn unreachable_endpoint_aborts_the_run() {
    let connector = MemoryConnector::new().refuse_connections();
    let populator = PhoenixPopulator::new(connector, config(2, 10, 5)).unwrap();

    assert!(populator.run(CancellationToken::new()).await.is_err());
}

#[tokio::test]
async fn cancellation_ends_the_run() {
    let connector = MemoryConnector::new();
    let populator = PhoenixPopulator::new(connector.clone(), config(2, 1_000_000, 1000)).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = tokio::time::timeout(Duration::from_secs(10), populator.run(cancel))
        .await
        .expect("run did not return after cancellation")
        .unwrap();

    assert!(!report.is_complete());
    for consumer in &report.consumers {
        assert_eq!(consumer.exit, ConsumerExit::Interrupted);
    }
    for producer in &report.producers {
        assert!(!producer.sentinel_sent);
    }
}

#[tokio::test]
async fn run_timeout_releases_blocked_consumers() {
    let connector = MemoryConnector::new();
    let populator = PhoenixPopulator::new(
        connector,
        config(1, u64::MAX, 1000).with_timeout(Duration::from_millis(100)),
    )
    .unwrap();

    let report = tokio::time::timeout(Duration::from_secs(10), populator.run(CancellationToken::new()))
        .await
        .expect("run did not honour its timeout")
        .unwrap();

    assert!(!report.is_complete());
    assert!(!report.producers[0].sentinel_sent);
}

#[tokio::test]
async fn interrupted_producer_leaves_consumer_waiting() {
    let connector = MemoryConnector::new();
    PhoenixPopulator::new(connector.clone(), config(1, 10, 5))
        .unwrap()
        .provision()
        .await
        .unwrap();

    let mut lane = Lane::new(0, 3);
    let producer_cancel = CancellationToken::new();
    let producer = tokio::spawn(run_producer(
        WorkAssignment {
            lane_id: 0,
            row_count: 10,
        },
        lane.sender(),
        RowGenerator::new(1),
        producer_cancel.clone(),
    ));
    while lane.depth() < 3 {
        tokio::task::yield_now().await;
    }
    producer_cancel.cancel();

    let producer_report = producer.await.unwrap();
    assert_eq!(producer_report.rows_produced, 3);
    assert!(!producer_report.sentinel_sent);

    let settings = ConsumerSettings {
        lane_id: 0,
        endpoint: "mem".to_string(),
        tenant_id: "test0".to_string(),
        table: "loadtest_0".to_string(),
        batch_size: 5,
        status_interval: 50,
    };
    let receiver = lane.take_receiver().unwrap();
    let waited = tokio::time::timeout(
        Duration::from_millis(200),
        run_consumer(&connector, &settings, receiver, CancellationToken::new()),
    )
    .await;

    assert!(waited.is_err(), "consumer finished without a sentinel");
    let session = connector.session_for_tenant("test0").unwrap();
    assert_eq!(session.executed_rows, 3);
    assert_eq!(session.commits, 0);
}
