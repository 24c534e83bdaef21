//! Phoenix populator for the load testing harness.
//!
//! This crate provides the `PhoenixPopulator`, which writes synthetic rows
//! into one multi-tenant Phoenix table per lane. Each lane pairs a producer
//! task that generates rows with a consumer task that upserts them over its
//! own tenant connection, committing in fixed-size batches.
//!
//! # Architecture
//!
//! ```text
//!                    PhoenixPopulator
//!                           │
//!          ┌────────────────┼────────────────┐
//!          ▼                ▼                ▼
//!     provision()      lane 0 ... n     RunReport
//!    (DDL, global          │
//!     connection)          │
//!              ┌───────────┴───────────┐
//!              ▼                       ▼
//!     ┌─────────────────┐     ┌─────────────────┐
//!     │    Producer     │     │    Consumer     │
//!     │                 │     │                 │
//!     │ - RowGenerator  │────▶│ - tenant conn   │
//!     │ - rows, then    │Lane │ - upsert, commit│
//!     │   Sentinel      │     │   every batch   │
//!     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use loadtest_populate_phoenix::{PhoenixPopulator, RunConfig};
//! use phoenix_client::AvaticaConnector;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = RunConfig::new("http://localhost:8765")
//!         .with_lane_count(4)
//!         .with_rows_per_lane(100_000);
//!     let populator = PhoenixPopulator::new(AvaticaConnector::new(), config)?;
//!
//!     let report = populator.run(CancellationToken::new()).await?;
//!     println!("{} rows at {:.0} rows/sec", report.rows_executed, report.rows_per_second);
//!     Ok(())
//! }
//! ```

pub mod args;
pub mod config;
pub mod consumer;
pub mod ddl;
pub mod error;
pub mod lane;
pub mod metrics;
pub mod populator;
pub mod producer;

// Re-exports for convenience
pub use args::{CommonPopulateArgs, PhoenixPopulateArgs};
pub use config::{default_lane_count, RunConfig, WorkAssignment, MAX_LANE_CAPACITY};
pub use consumer::{run_consumer, ConsumerSettings};
pub use error::{LaneError, PhoenixPopulatorError};
pub use lane::{Lane, LaneItem, LaneReceiver, LaneSender};
pub use metrics::{ConsumerExit, ConsumerReport, ProducerReport, RunReport};
pub use populator::PhoenixPopulator;
pub use producer::run_producer;
