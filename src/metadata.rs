//! `metadata` command: table listing and result-set column inspection.

use anyhow::Context;
use clap::Args;
use phoenix_client::{ColumnMetadata, Connection, Connector, TableFilter};
use std::io::Write;

/// Options of the `metadata` command.
#[derive(Args, Clone, Debug)]
pub struct MetadataArgs {
    /// Phoenix Query Server endpoint
    #[arg(value_name = "ENDPOINT", env = "PHOENIX_ENDPOINT")]
    pub endpoint: String,

    /// Schema name pattern (SQL LIKE syntax)
    #[arg(long, default_value = "%")]
    pub schema_pattern: String,

    /// Table name pattern (SQL LIKE syntax)
    #[arg(long, default_value = "%")]
    pub table_pattern: String,

    /// Table types to list (repeatable)
    #[arg(long = "table-type", default_value = "TABLE")]
    pub table_types: Vec<String>,

    /// Run this query and print the metadata of its columns
    #[arg(long, value_name = "SQL")]
    pub describe: Option<String>,
}

impl MetadataArgs {
    pub fn filter(&self) -> TableFilter {
        self.table_types.iter().fold(
            TableFilter::new()
                .schema_pattern(&self.schema_pattern)
                .table_pattern(&self.table_pattern),
            |filter, t| filter.table_type(t),
        )
    }
}

/// Print matching tables and, with `--describe`, the query's columns.
pub async fn run_metadata<C: Connector, W: Write>(
    connector: &C,
    args: &MetadataArgs,
    out: &mut W,
) -> anyhow::Result<()> {
    let mut conn = connector
        .connect(&args.endpoint, None)
        .await
        .with_context(|| format!("Failed to connect to {}", args.endpoint))?;

    let result = inspect(&mut conn, args, out).await;
    if let Err(e) = conn.close().await {
        tracing::warn!("Failed to close connection: {}", e);
    }
    result
}

async fn inspect<Conn: Connection, W: Write>(
    conn: &mut Conn,
    args: &MetadataArgs,
    out: &mut W,
) -> anyhow::Result<()> {
    let tables = conn
        .tables(&args.filter())
        .await
        .context("Failed to list tables")?;
    for table in &tables {
        writeln!(out, "table: {}", table.qualified_name())?;
    }
    tracing::info!("{} tables matched", tables.len());

    if let Some(sql) = &args.describe {
        let result = conn
            .query(sql)
            .await
            .with_context(|| format!("Failed to run query: {sql}"))?;
        for (i, column) in result.columns.iter().enumerate() {
            write!(out, "{}", describe_column(i + 1, column))?;
        }
    }
    Ok(())
}

/// Column description block, one attribute per line. `index` is 1-based.
pub fn describe_column(index: usize, column: &ColumnMetadata) -> String {
    format!(
        "Column Index: {index}\n\
         Column Name: {}\n\
         Column Type: {} ({})\n\
         Table Name: {}\n\
         Schema Name: {}\n\
         Column Precision: {}\n\
         Column Scale: {}\n\
         Column Nullable: {}\n",
        column.name,
        column.type_id,
        column.type_name,
        column.table_name,
        column.schema_name,
        column.precision,
        column.scale,
        column.nullable,
    )
}
