//! Command-line interface for phoenix-loadtest
//!
//! # Usage Examples
//!
//! ## Load Test
//! ```bash
//! # 100000 rows into each of 4 lane tables
//! phoenix-loadtest populate http://localhost:8765 100000 4
//!
//! # Thin JDBC URL, smaller batches, stop after ten minutes
//! phoenix-loadtest populate "jdbc:phoenix:thin:url=http://localhost:8765;serialization=JSON" \
//!   --batch-size 1000 --timeout 10m --metrics-file metrics.json
//! ```
//!
//! ## Diagnostics
//! ```bash
//! phoenix-loadtest metadata http://localhost:8765 --schema-pattern 'DEMO%' \
//!   --describe "select 1 from DEMO.AAAA"
//! phoenix-loadtest smoke http://localhost:8765
//! phoenix-loadtest tenants http://localhost:8765 --tenant acme --tenant globex
//! ```

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use loadtest_populate_phoenix::PhoenixPopulateArgs;
use phoenix_client::{AvaticaConnector, MemoryConnector};
use phoenix_loadtest::{
    build_config, run_metadata, run_populate, run_smoke, run_tenants, setup_shutdown_handler,
    write_header, MetadataArgs, SmokeArgs, TenantsArgs,
};

#[derive(Parser)]
#[command(name = "phoenix-loadtest")]
#[command(about = "Write load test and diagnostics for Apache Phoenix")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate rows on producer tasks and upsert them in batches, one table per lane
    Populate {
        #[command(flatten)]
        args: PhoenixPopulateArgs,
    },

    /// List tables and describe query result columns
    Metadata {
        #[command(flatten)]
        args: MetadataArgs,
    },

    /// Create a small table, write two rows and read them back
    Smoke {
        #[command(flatten)]
        args: SmokeArgs,
    },

    /// Show tenant isolation on a multi-tenant table
    Tenants {
        #[command(flatten)]
        args: TenantsArgs,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            // Usage errors, including a missing endpoint, exit with 1
            let _ = e.print();
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Populate { args } => populate(args),
        Commands::Metadata { args } => {
            let connector = AvaticaConnector::new()?;
            runtime(None)?.block_on(run_metadata(&connector, &args, &mut std::io::stdout()))
        }
        Commands::Smoke { args } => {
            let connector = AvaticaConnector::new()?;
            runtime(None)?.block_on(run_smoke(&connector, &args, &mut std::io::stdout()))
        }
        Commands::Tenants { args } => {
            let connector = AvaticaConnector::new()?;
            runtime(None)?.block_on(run_tenants(&connector, &args, &mut std::io::stdout()))
        }
    }
}

fn populate(args: PhoenixPopulateArgs) -> anyhow::Result<()> {
    let config = build_config(&args)?;
    let dry_run = args.common.dry_run;
    let metrics_file = args.common.metrics_file.as_deref();

    let mut stdout = std::io::stdout();
    write_header(&mut stdout, &config, dry_run)?;

    // One worker thread per producer and per consumer
    let runtime = runtime(Some(config.task_count()))?;
    runtime.block_on(async {
        let cancel = setup_shutdown_handler();
        if dry_run {
            run_populate(MemoryConnector::new(), config, cancel, metrics_file, &mut stdout).await?;
        } else {
            let connector = AvaticaConnector::new()?;
            run_populate(connector, config, cancel, metrics_file, &mut stdout).await?;
        }
        anyhow::Ok(())
    })
}

fn runtime(worker_threads: Option<usize>) -> anyhow::Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(threads) = worker_threads {
        builder.worker_threads(threads);
    }
    builder
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")
}
