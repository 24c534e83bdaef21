//! `smoke` and `tenants` commands: short scripted sessions against a server.

use anyhow::Context;
use clap::Args;
use phoenix_client::{Connection, Connector, ResultSet};
use std::io::Write;

/// Table used by the smoke test.
pub const SMOKE_TABLE: &str = "loadtest_smoke";

/// Multi-tenant table used by the tenant isolation demo.
pub const TENANT_TABLE: &str = "allstarfull";

#[derive(Args, Clone, Debug)]
pub struct SmokeArgs {
    /// Phoenix Query Server endpoint
    #[arg(value_name = "ENDPOINT", env = "PHOENIX_ENDPOINT")]
    pub endpoint: String,
}

#[derive(Args, Clone, Debug)]
pub struct TenantsArgs {
    /// Phoenix Query Server endpoint
    #[arg(value_name = "ENDPOINT", env = "PHOENIX_ENDPOINT")]
    pub endpoint: String,

    /// Tenant to write and read as (repeatable)
    #[arg(long = "tenant", default_values_t = ["tenant1".to_string(), "tenant2".to_string()])]
    pub tenants: Vec<String>,
}

/// Create a table, upsert two rows, commit, and read them back.
pub async fn run_smoke<C: Connector, W: Write>(
    connector: &C,
    args: &SmokeArgs,
    out: &mut W,
) -> anyhow::Result<()> {
    let mut conn = connector
        .connect(&args.endpoint, None)
        .await
        .with_context(|| format!("Failed to connect to {}", args.endpoint))?;

    let result = smoke(&mut conn, out).await;
    close_quietly(conn).await;
    result
}

async fn smoke<Conn: Connection, W: Write>(conn: &mut Conn, out: &mut W) -> anyhow::Result<()> {
    writeln!(out, "==> create table")?;
    conn.execute(&format!(
        "create table if not exists {SMOKE_TABLE} (mykey integer not null primary key, mycolumn varchar)"
    ))
    .await
    .context("Failed to create smoke table")?;

    writeln!(out, "==> insert data")?;
    for (key, value) in [(1, "Hello"), (2, "World!")] {
        conn.execute(&format!(
            "upsert into {SMOKE_TABLE} values ({key},'{value}')"
        ))
        .await
        .context("Failed to upsert smoke row")?;
    }
    conn.commit().await.context("Failed to commit smoke rows")?;

    writeln!(out, "==> query data")?;
    let result = conn
        .query(&format!("select * from {SMOKE_TABLE}"))
        .await
        .context("Failed to query smoke table")?;
    for row in 0..result.rows.len() {
        if let Some(value) = result.get(row, "mycolumn") {
            writeln!(out, "{value}")?;
        }
    }
    Ok(())
}

/// Write rows as each tenant, then show what every tenant can read.
///
/// The table is `MULTI_TENANT`, so each tenant connection fills the leading
/// tenant column implicitly and only sees its own rows.
pub async fn run_tenants<C: Connector, W: Write>(
    connector: &C,
    args: &TenantsArgs,
    out: &mut W,
) -> anyhow::Result<()> {
    let mut admin = connector
        .connect(&args.endpoint, None)
        .await
        .with_context(|| format!("Failed to connect to {}", args.endpoint))?;
    let created = create_tenant_table(&mut admin).await;
    close_quietly(admin).await;
    created?;

    let mut sessions = Vec::with_capacity(args.tenants.len());
    let result = match write_as_tenants(connector, args, out, &mut sessions).await {
        Ok(()) => read_as_tenants(&mut sessions, out).await,
        Err(e) => Err(e),
    };
    for (_, conn) in sessions {
        close_quietly(conn).await;
    }
    result
}

async fn create_tenant_table<Conn: Connection>(admin: &mut Conn) -> anyhow::Result<()> {
    admin
        .execute(&format!(
            "create table if not exists {TENANT_TABLE} (\
             tenantid varchar not null, playerID varchar not null, yearID char(4) not null, \
             gameNum integer, gameID char(15), teamID char(10), lgID char(5), GP integer, \
             startingPos integer, \
             CONSTRAINT pk PRIMARY KEY (tenantid, playerID, yearID)) \
             SALT_BUCKETS=3, MULTI_TENANT=true"
        ))
        .await
        .context("Failed to create tenant table")?;
    admin.commit().await.context("Failed to commit tenant table")?;
    Ok(())
}

/// Tenant `i` writes `i + 1` rows. Every opened connection lands in
/// `sessions`, including one whose writes failed.
async fn write_as_tenants<'a, C: Connector, W: Write>(
    connector: &C,
    args: &'a TenantsArgs,
    out: &mut W,
    sessions: &mut Vec<(&'a str, C::Connection)>,
) -> anyhow::Result<()> {
    for (i, tenant) in args.tenants.iter().enumerate() {
        let mut conn = connector
            .connect(&args.endpoint, Some(tenant.as_str()))
            .await
            .with_context(|| format!("Failed to connect as tenant {tenant}"))?;
        let written = write_tenant_rows(&mut conn, tenant, i, out).await;
        sessions.push((tenant.as_str(), conn));
        written?;
    }
    Ok(())
}

async fn write_tenant_rows<Conn: Connection, W: Write>(
    conn: &mut Conn,
    tenant: &str,
    index: usize,
    out: &mut W,
) -> anyhow::Result<()> {
    writeln!(out, "==> insert {tenant} data")?;
    for game in 0..=index {
        let year = 1955 + 10 * index + game;
        conn.execute(&format!(
            "upsert into {TENANT_TABLE}(playerID,yearID,gameNum,gameID,teamID,lgID,GP) \
             values ('player{game}','{year}',{game},'ALS{year}0712','ML1','NL',1)"
        ))
        .await
        .with_context(|| format!("Failed to upsert as tenant {tenant}"))?;
    }
    conn.commit()
        .await
        .with_context(|| format!("Failed to commit as tenant {tenant}"))?;
    Ok(())
}

async fn read_as_tenants<Conn: Connection, W: Write>(
    sessions: &mut [(&str, Conn)],
    out: &mut W,
) -> anyhow::Result<()> {
    for (tenant, conn) in sessions.iter_mut() {
        writeln!(out, "==> query {tenant} data")?;
        let result = conn
            .query(&format!("select * from {TENANT_TABLE}"))
            .await
            .with_context(|| format!("Failed to query as tenant {tenant}"))?;
        write_rows(out, &result)?;
    }
    Ok(())
}

async fn close_quietly<Conn: Connection>(conn: Conn) {
    if let Err(e) = conn.close().await {
        tracing::warn!("Failed to close connection: {}", e);
    }
}

/// Column count line followed by one space-separated line per row.
fn write_rows<W: Write>(out: &mut W, result: &ResultSet) -> std::io::Result<()> {
    writeln!(out, "==>{}", result.column_count())?;
    for row in &result.rows {
        let line: Vec<String> = row.iter().map(ToString::to_string).collect();
        writeln!(out, "{}", line.join(" "))?;
    }
    Ok(())
}
