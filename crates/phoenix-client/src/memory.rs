//! In-process stand-in for a Phoenix Query Server.
//!
//! `MemoryConnector` understands just enough SQL to back the load test:
//! `create table [if not exists]`, `drop table [if exists]` and
//! `upsert into`; `execute` rejects anything else. Rows are not stored,
//! only counted, with the same transactional split as Phoenix (executed
//! rows stay pending on the connection until `commit`). Every connector clone shares the same state,
//! so tests can inspect what a run did after it finished.
//!
//! Failure injection:
//!
//! - [`MemoryConnector::fail_execute_at`] fails the Nth prepared-statement
//!   execution (1-based, counted across all connections)
//! - [`MemoryConnector::fail_commit_at`] fails the Nth commit call the same
//!   way, leaving the pending rows in place
//! - [`MemoryConnector::refuse_connections`] makes `connect` fail

use crate::error::ClientError;
use crate::traits::{Connection, Connector, PreparedStatement};
use crate::value::{like_match, ResultSet, SqlValue, TableFilter, TableInfo};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Per-table counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableState {
    /// DDL text the table was created with.
    pub ddl: String,
    /// Rows made durable by a commit.
    pub committed_rows: u64,
}

/// Per-connection counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub tenant_id: Option<String>,
    pub auto_commit: bool,
    /// Successful prepared-statement executions.
    pub executed_rows: u64,
    /// Successful commit calls, including ones with nothing pending.
    pub commits: u64,
    pub rollbacks: u64,
    pub closed: bool,
    /// Executed but not yet committed rows, per table.
    pending: BTreeMap<String, u64>,
}

impl SessionStats {
    pub fn pending_rows(&self) -> u64 {
        self.pending.values().sum()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: BTreeMap<String, TableState>,
    sessions: Vec<SessionStats>,
    ddl_statements: u64,
    prepared_executions: u64,
    fail_execute_at: Option<u64>,
    commit_calls: u64,
    fail_commit_at: Option<u64>,
    refuse_connections: bool,
}

/// Connector whose connections all share one in-memory state.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        lock_state(&self.state)
    }

    /// Fail the `n`th prepared execution (1-based, across all connections).
    pub fn fail_execute_at(self, n: u64) -> Self {
        self.lock().fail_execute_at = Some(n);
        self
    }

    /// Fail the `n`th commit call (1-based, across all connections).
    pub fn fail_commit_at(self, n: u64) -> Self {
        self.lock().fail_commit_at = Some(n);
        self
    }

    /// Make every subsequent `connect` fail with a connection error.
    pub fn refuse_connections(self) -> Self {
        self.lock().refuse_connections = true;
        self
    }

    /// Names of all tables, upper-cased as Phoenix reports them.
    pub fn table_names(&self) -> Vec<String> {
        self.lock().tables.keys().cloned().collect()
    }

    pub fn table(&self, name: &str) -> Option<TableState> {
        self.lock().tables.get(&normalize_identifier(name)).cloned()
    }

    /// Number of DDL statements executed, successful or not.
    pub fn ddl_statements(&self) -> u64 {
        self.lock().ddl_statements
    }

    /// Snapshot of every connection ever opened, in open order.
    pub fn sessions(&self) -> Vec<SessionStats> {
        self.lock().sessions.clone()
    }

    /// Snapshot of the most recent connection opened for `tenant_id`.
    pub fn session_for_tenant(&self, tenant_id: &str) -> Option<SessionStats> {
        self.lock()
            .sessions
            .iter()
            .rev()
            .find(|s| s.tenant_id.as_deref() == Some(tenant_id))
            .cloned()
    }

    /// Total committed rows across all tables.
    pub fn committed_rows(&self) -> u64 {
        self.lock().tables.values().map(|t| t.committed_rows).sum()
    }
}

fn lock_state(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Unquoted Phoenix identifiers are case-insensitive and stored upper-case.
fn normalize_identifier(name: &str) -> String {
    name.trim_matches('"').to_ascii_uppercase()
}

/// Leading keywords and the identifier that follows them, e.g.
/// `("CREATE TABLE IF NOT EXISTS", "T1")`.
fn parse_target(sql: &str, prefixes: &[&'static str]) -> Option<(&'static str, String)> {
    let words: Vec<&str> = sql.split_whitespace().collect();
    prefixes.iter().find_map(|prefix| {
        let keyword_count = prefix.split_whitespace().count();
        let matches = words.len() > keyword_count
            && prefix
                .split_whitespace()
                .zip(&words)
                .all(|(k, w)| k.eq_ignore_ascii_case(w));
        if !matches {
            return None;
        }
        let name = words[keyword_count]
            .split('(')
            .next()
            .filter(|n| !n.is_empty())?;
        Some((*prefix, normalize_identifier(name)))
    })
}

#[async_trait::async_trait]
impl Connector for MemoryConnector {
    type Connection = MemoryConnection;

    async fn connect(
        &self,
        endpoint: &str,
        tenant_id: Option<&str>,
    ) -> Result<MemoryConnection, ClientError> {
        let mut state = self.lock();
        if state.refuse_connections {
            return Err(ClientError::Connection(format!(
                "{endpoint} refused the connection"
            )));
        }
        state.sessions.push(SessionStats {
            tenant_id: tenant_id.map(str::to_string),
            auto_commit: true,
            ..SessionStats::default()
        });
        let session = state.sessions.len() - 1;
        debug!("Opened in-memory session {} (tenant: {:?})", session, tenant_id);

        Ok(MemoryConnection {
            state: Arc::clone(&self.state),
            session,
        })
    }
}

/// One in-memory session.
pub struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
    session: usize,
}

impl MemoryConnection {
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        lock_state(&self.state)
    }
}

/// Record one executed upsert on `session`, committing at once in auto-commit mode.
fn record_upsert(state: &mut MemoryState, session: usize, table: &str) -> Result<(), ClientError> {
    if !state.tables.contains_key(table) {
        return Err(ClientError::TableNotFound(table.to_string()));
    }
    let auto_commit = state.sessions[session].auto_commit;
    if auto_commit {
        if let Some(t) = state.tables.get_mut(table) {
            t.committed_rows += 1;
        }
    } else {
        *state.sessions[session]
            .pending
            .entry(table.to_string())
            .or_default() += 1;
    }
    state.sessions[session].executed_rows += 1;
    Ok(())
}

#[async_trait::async_trait]
impl Connection for MemoryConnection {
    type Statement = MemoryStatement;

    async fn execute(&mut self, sql: &str) -> Result<u64, ClientError> {
        const CREATE: &str = "create table";
        const CREATE_IF_ABSENT: &str = "create table if not exists";
        const DROP: &str = "drop table";
        const DROP_IF_EXISTS: &str = "drop table if exists";
        const UPSERT: &str = "upsert into";

        let Some((keyword, table)) = parse_target(
            sql,
            &[CREATE_IF_ABSENT, CREATE, DROP_IF_EXISTS, DROP, UPSERT],
        ) else {
            return Err(ClientError::Statement(format!(
                "unsupported statement for the in-memory backend: {sql}"
            )));
        };

        let mut state = self.lock();
        match keyword {
            CREATE_IF_ABSENT | CREATE => {
                state.ddl_statements += 1;
                if state.tables.contains_key(&table) {
                    if keyword == CREATE {
                        return Err(ClientError::Statement(format!(
                            "table {table} already exists"
                        )));
                    }
                    return Ok(0);
                }
                state.tables.insert(
                    table,
                    TableState {
                        ddl: sql.to_string(),
                        committed_rows: 0,
                    },
                );
                Ok(0)
            }
            DROP_IF_EXISTS | DROP => {
                state.ddl_statements += 1;
                if state.tables.remove(&table).is_none() && keyword == DROP {
                    return Err(ClientError::TableNotFound(table));
                }
                Ok(0)
            }
            _ => {
                record_upsert(&mut state, self.session, &table)?;
                Ok(1)
            }
        }
    }

    async fn prepare(&mut self, sql: &str) -> Result<MemoryStatement, ClientError> {
        let (_, table) = parse_target(sql, &["upsert into"]).ok_or_else(|| {
            ClientError::Statement(format!("only upsert statements can be prepared: {sql}"))
        })?;
        if !self.lock().tables.contains_key(&table) {
            return Err(ClientError::TableNotFound(table));
        }
        let parameter_count = sql.matches('?').count();
        Ok(MemoryStatement {
            state: Arc::clone(&self.state),
            session: self.session,
            table,
            parameters: vec![None; parameter_count],
        })
    }

    async fn query(&mut self, sql: &str) -> Result<ResultSet, ClientError> {
        debug!("In-memory backend does not store rows, returning empty result for: {}", sql);
        Ok(ResultSet::default())
    }

    async fn tables(&mut self, filter: &TableFilter) -> Result<Vec<TableInfo>, ClientError> {
        let state = self.lock();
        Ok(state
            .tables
            .keys()
            .map(|qualified| match qualified.split_once('.') {
                Some((schema, name)) => (Some(schema.to_string()), name.to_string()),
                None => (None, qualified.clone()),
            })
            .filter(|(schema, name)| {
                let schema_ok = filter
                    .schema_pattern
                    .as_deref()
                    .map_or(true, |p| like_match(p, schema.as_deref().unwrap_or_default()));
                let table_ok = filter
                    .table_pattern
                    .as_deref()
                    .map_or(true, |p| like_match(p, name));
                let type_ok = filter.table_types.is_empty()
                    || filter
                        .table_types
                        .iter()
                        .any(|t| t.eq_ignore_ascii_case("TABLE"));
                schema_ok && table_ok && type_ok
            })
            .map(|(schema, name)| TableInfo {
                catalog: None,
                schema,
                name,
                table_type: "TABLE".to_string(),
            })
            .collect())
    }

    async fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), ClientError> {
        let session = self.session;
        self.lock().sessions[session].auto_commit = auto_commit;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), ClientError> {
        let session = self.session;
        let mut state = self.lock();
        state.commit_calls += 1;
        if state.fail_commit_at == Some(state.commit_calls) {
            return Err(ClientError::Statement(format!(
                "injected failure on commit {}",
                state.commit_calls
            )));
        }
        let pending = std::mem::take(&mut state.sessions[session].pending);
        for (table, rows) in pending {
            if let Some(t) = state.tables.get_mut(&table) {
                t.committed_rows += rows;
            }
        }
        state.sessions[session].commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), ClientError> {
        let session = self.session;
        let mut state = self.lock();
        state.sessions[session].pending.clear();
        state.sessions[session].rollbacks += 1;
        Ok(())
    }

    async fn close(self) -> Result<(), ClientError> {
        let session = self.session;
        let mut state = self.lock();
        state.sessions[session].pending.clear();
        state.sessions[session].closed = true;
        Ok(())
    }
}

/// A prepared upsert against one in-memory table.
pub struct MemoryStatement {
    state: Arc<Mutex<MemoryState>>,
    session: usize,
    table: String,
    parameters: Vec<Option<SqlValue>>,
}

#[async_trait::async_trait]
impl PreparedStatement for MemoryStatement {
    fn bind(&mut self, index: usize, value: SqlValue) -> Result<(), ClientError> {
        let len = self.parameters.len();
        let slot = index
            .checked_sub(1)
            .and_then(|i| self.parameters.get_mut(i))
            .ok_or_else(|| {
                ClientError::Parameter(format!("parameter index {index} out of range 1..={len}"))
            })?;
        *slot = Some(value);
        Ok(())
    }

    async fn execute(&mut self) -> Result<u64, ClientError> {
        if let Some(i) = self.parameters.iter().position(Option::is_none) {
            return Err(ClientError::Parameter(format!(
                "parameter {} is not bound",
                i + 1
            )));
        }

        let mut state = lock_state(&self.state);
        state.prepared_executions += 1;
        if state.fail_execute_at == Some(state.prepared_executions) {
            return Err(ClientError::Statement(format!(
                "injected failure on execution {}",
                state.prepared_executions
            )));
        }
        record_upsert(&mut state, self.session, &self.table)?;
        Ok(1)
    }

    async fn close(self) -> Result<(), ClientError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DDL: &str = "create table if not exists t1 (id bigint not null primary key, name varchar)";

    #[tokio::test]
    async fn test_create_if_absent_is_idempotent() {
        let connector = MemoryConnector::new();
        let mut conn = connector.connect("mem", None).await.unwrap();
        conn.execute(DDL).await.unwrap();
        conn.execute(DDL).await.unwrap();
        assert_eq!(connector.table_names(), vec!["T1".to_string()]);
        assert_eq!(connector.ddl_statements(), 2);
    }

    #[tokio::test]
    async fn test_plain_create_fails_when_present() {
        let connector = MemoryConnector::new();
        let mut conn = connector.connect("mem", None).await.unwrap();
        conn.execute(DDL).await.unwrap();
        let err = conn
            .execute("CREATE TABLE t1 (id bigint not null primary key)")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Statement(_)));
    }

    #[tokio::test]
    async fn test_pending_rows_become_durable_on_commit() {
        let connector = MemoryConnector::new();
        let mut conn = connector.connect("mem", Some("tenant0")).await.unwrap();
        conn.execute(DDL).await.unwrap();
        conn.set_auto_commit(false).await.unwrap();

        let mut stmt = conn.prepare("upsert into t1 (id, name) values (?, ?)").await.unwrap();
        for i in 0..3 {
            stmt.bind(1, SqlValue::BigInt(i)).unwrap();
            stmt.bind(2, SqlValue::from("x")).unwrap();
            stmt.execute().await.unwrap();
        }
        assert_eq!(connector.table("t1").unwrap().committed_rows, 0);
        assert_eq!(connector.session_for_tenant("tenant0").unwrap().pending_rows(), 3);

        conn.commit().await.unwrap();
        assert_eq!(connector.table("T1").unwrap().committed_rows, 3);

        let session = connector.session_for_tenant("tenant0").unwrap();
        assert_eq!(session.commits, 1);
        assert_eq!(session.executed_rows, 3);
        assert_eq!(session.pending_rows(), 0);
    }

    #[tokio::test]
    async fn test_close_discards_pending_rows() {
        let connector = MemoryConnector::new();
        let mut conn = connector.connect("mem", None).await.unwrap();
        conn.execute(DDL).await.unwrap();
        conn.set_auto_commit(false).await.unwrap();
        conn.execute("upsert into t1 (id, name) values (1, 'a')").await.unwrap();
        conn.close().await.unwrap();

        assert_eq!(connector.committed_rows(), 0);
        assert!(connector.sessions()[0].closed);
    }

    #[tokio::test]
    async fn test_auto_commit_commits_immediately() {
        let connector = MemoryConnector::new();
        let mut conn = connector.connect("mem", None).await.unwrap();
        conn.execute(DDL).await.unwrap();
        conn.execute("upsert into t1 (id, name) values (1, 'a')").await.unwrap();
        assert_eq!(connector.committed_rows(), 1);
    }

    #[tokio::test]
    async fn test_prepare_unknown_table() {
        let connector = MemoryConnector::new();
        let mut conn = connector.connect("mem", None).await.unwrap();
        let result = conn.prepare("upsert into missing (id) values (?)").await;
        assert!(matches!(result, Err(ClientError::TableNotFound(t)) if t == "MISSING"));
    }

    #[tokio::test]
    async fn test_injected_execute_failure() {
        let connector = MemoryConnector::new().fail_execute_at(2);
        let mut conn = connector.connect("mem", None).await.unwrap();
        conn.execute(DDL).await.unwrap();
        let mut stmt = conn.prepare("upsert into t1 (id, name) values (?, ?)").await.unwrap();
        stmt.bind(1, SqlValue::BigInt(1)).unwrap();
        stmt.bind(2, SqlValue::from("a")).unwrap();

        assert!(stmt.execute().await.is_ok());
        assert!(matches!(stmt.execute().await, Err(ClientError::Statement(_))));
        assert!(stmt.execute().await.is_ok());
        assert_eq!(connector.sessions()[0].executed_rows, 2);
    }

    #[tokio::test]
    async fn test_injected_commit_failure_keeps_pending_rows() {
        let connector = MemoryConnector::new().fail_commit_at(1);
        let mut conn = connector.connect("mem", None).await.unwrap();
        conn.execute(DDL).await.unwrap();
        conn.set_auto_commit(false).await.unwrap();
        conn.execute("upsert into t1 (id, name) values (1, 'a')").await.unwrap();

        assert!(matches!(conn.commit().await, Err(ClientError::Statement(_))));
        assert_eq!(connector.committed_rows(), 0);
        assert_eq!(connector.sessions()[0].pending_rows(), 1);

        tokio_test::assert_ok!(conn.commit().await);
        assert_eq!(connector.committed_rows(), 1);
        assert_eq!(connector.sessions()[0].commits, 1);
    }

    #[tokio::test]
    async fn test_unknown_statement_is_rejected() {
        let connector = MemoryConnector::new();
        let mut conn = connector.connect("mem", None).await.unwrap();
        for sql in ["selct * from t1", "delete from t1", ""] {
            let result = conn.execute(sql).await;
            assert!(matches!(result, Err(ClientError::Statement(_))), "{sql}: {result:?}");
        }
        assert_eq!(connector.ddl_statements(), 0);
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let connector = MemoryConnector::new().refuse_connections();
        let result = connector.connect("mem", None).await;
        assert!(matches!(result, Err(ClientError::Connection(_))));
    }

    #[tokio::test]
    async fn test_bind_out_of_range() {
        let connector = MemoryConnector::new();
        let mut conn = connector.connect("mem", None).await.unwrap();
        conn.execute(DDL).await.unwrap();
        let mut stmt = conn.prepare("upsert into t1 (id, name) values (?, ?)").await.unwrap();
        tokio_test::assert_err!(stmt.bind(0, SqlValue::Null));
        tokio_test::assert_err!(stmt.bind(3, SqlValue::Null));
        tokio_test::assert_err!(stmt.execute().await);
        tokio_test::assert_ok!(stmt.bind(1, SqlValue::BigInt(1)));
    }

    #[tokio::test]
    async fn test_tables_filter() {
        let connector = MemoryConnector::new();
        let mut conn = connector.connect("mem", None).await.unwrap();
        conn.execute("create table if not exists demo.aaaa (k integer primary key)")
            .await
            .unwrap();
        conn.execute("create table if not exists demo_ad.aaaa (k integer primary key)")
            .await
            .unwrap();
        conn.execute(DDL).await.unwrap();

        let filter = TableFilter::new().schema_pattern("DEMO%").table_type("TABLE");
        let tables = conn.tables(&filter).await.unwrap();
        let names: Vec<String> = tables.iter().map(TableInfo::qualified_name).collect();
        assert_eq!(names, vec!["DEMO.AAAA".to_string(), "DEMO_AD.AAAA".to_string()]);

        let all = conn.tables(&TableFilter::new()).await.unwrap();
        assert_eq!(all.len(), 3);
    }
}
