//! Phoenix load test library.
//!
//! Command runners behind the `phoenix-loadtest` binary. The populate
//! pipeline itself lives in `loadtest_populate_phoenix`; the database client
//! in `phoenix_client`.
//!
//! # Commands
//!
//! - `populate` - multi-lane write load test, see [`populate`]
//! - `metadata` - table listing and column inspection, see [`metadata`]
//! - `smoke` / `tenants` - short scripted sessions, see [`demo`]
//!
//! # CLI Usage
//!
//! ```bash
//! # 4 lanes of 100k rows each against a Query Server
//! phoenix-loadtest populate http://localhost:8765 100000 4
//!
//! # Same pipeline against the in-memory backend
//! phoenix-loadtest populate http://localhost:8765 1000 2 --dry-run
//!
//! # Tables in schemas starting with DEMO
//! phoenix-loadtest metadata http://localhost:8765 --schema-pattern 'DEMO%'
//! ```

pub mod config;
pub mod demo;
pub mod metadata;
pub mod populate;

pub use demo::{run_smoke, run_tenants, SmokeArgs, TenantsArgs};
pub use metadata::{run_metadata, MetadataArgs};
pub use populate::{build_config, run_populate, setup_shutdown_handler, write_header};
