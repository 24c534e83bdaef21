//! Collaborator traits.
//!
//! The load test and the diagnostic commands only ever see these traits, so
//! the same code drives the Avatica client and the in-memory backend. Call
//! sites use generics, and every call is statically dispatched.

use crate::error::ClientError;
use crate::value::{ResultSet, SqlValue, TableFilter, TableInfo};

/// Opens connections to a Phoenix endpoint.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// Connection type produced by this connector.
    type Connection: Connection;

    /// Open a connection, optionally scoped to a tenant.
    ///
    /// Tenant-scoped connections only see rows of that tenant in
    /// `MULTI_TENANT` tables, and the tenant column is filled implicitly.
    async fn connect(
        &self,
        endpoint: &str,
        tenant_id: Option<&str>,
    ) -> Result<Self::Connection, ClientError>;
}

/// A single open connection. Never shared between tasks.
#[async_trait::async_trait]
pub trait Connection: Send {
    /// Prepared statement type produced by [`Connection::prepare`].
    type Statement: PreparedStatement;

    /// Execute a DDL or DML statement and return the update count.
    async fn execute(&mut self, sql: &str) -> Result<u64, ClientError>;

    /// Prepare a parameterised statement (`?` placeholders).
    async fn prepare(&mut self, sql: &str) -> Result<Self::Statement, ClientError>;

    /// Execute a query and collect the full result.
    async fn query(&mut self, sql: &str) -> Result<ResultSet, ClientError>;

    /// List tables matching a catalog/schema/name pattern.
    async fn tables(&mut self, filter: &TableFilter) -> Result<Vec<TableInfo>, ClientError>;

    async fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), ClientError>;

    async fn commit(&mut self) -> Result<(), ClientError>;

    async fn rollback(&mut self) -> Result<(), ClientError>;

    /// Close the connection. Uncommitted work is discarded.
    async fn close(self) -> Result<(), ClientError>;
}

/// A statement prepared on one connection.
#[async_trait::async_trait]
pub trait PreparedStatement: Send {
    /// Bind a value to a 1-based parameter index.
    fn bind(&mut self, index: usize, value: SqlValue) -> Result<(), ClientError>;

    /// Execute with the currently bound values and return the update count.
    async fn execute(&mut self) -> Result<u64, ClientError>;

    async fn close(self) -> Result<(), ClientError>;
}
