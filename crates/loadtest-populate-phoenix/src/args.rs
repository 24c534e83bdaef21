//! CLI argument definitions for the Phoenix populator.

use crate::ddl::{DEFAULT_TABLE_PREFIX, DEFAULT_TENANT_PREFIX};
use clap::Args;

pub use loadtest_populate::CommonPopulateArgs;

/// Phoenix-specific populate arguments.
#[derive(Args, Clone, Debug)]
pub struct PhoenixPopulateArgs {
    /// Phoenix Query Server endpoint (e.g., http://localhost:8765 or
    /// jdbc:phoenix:thin:url=http://localhost:8765;serialization=JSON)
    #[arg(value_name = "ENDPOINT", env = "PHOENIX_ENDPOINT")]
    pub endpoint: String,

    #[command(flatten)]
    pub common: CommonPopulateArgs,

    /// Prefix of the per-lane table names (lane index is appended)
    #[arg(long, default_value = DEFAULT_TABLE_PREFIX)]
    pub table_prefix: String,

    /// Prefix of the per-lane tenant ids (lane index is appended)
    #[arg(long, default_value = DEFAULT_TENANT_PREFIX)]
    pub tenant_prefix: String,
}
