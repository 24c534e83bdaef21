//! HTTP transport and trait implementations for the Query Server.

use super::protocol::{
    decode_cell, ConnectionProperties, Frame, Request, Response, ResultSetResponse,
    StatementHandle, TypedValue, TENANT_ID_PROPERTY,
};
use crate::endpoint::Endpoint;
use crate::error::ClientError;
use crate::traits::{Connection, Connector, PreparedStatement};
use crate::value::{ColumnMetadata, ResultSet, SqlValue, TableFilter, TableInfo};
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

/// Default per-request HTTP timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Rows requested per frame for queries and metadata calls.
const FRAME_SIZE: i32 = 1000;

#[derive(Clone)]
struct Transport {
    http: Client,
    url: String,
}

impl Transport {
    async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        debug!("Avatica {} -> {}", request.name(), self.url);

        let http_response = self.http.post(&self.url).json(request).send().await?;
        let status = http_response.status();
        let body = http_response.text().await?;

        let response: Response = serde_json::from_str(&body).map_err(|e| {
            ClientError::Protocol(format!(
                "could not decode {} response (HTTP {status}): {e}",
                request.name()
            ))
        })?;

        match response {
            Response::Error(err) => Err(err.into()),
            other => Ok(other),
        }
    }
}

fn unexpected(expected: &str, got: &Response) -> ClientError {
    ClientError::Protocol(format!(
        "expected {expected} response, got {}",
        got.name()
    ))
}

/// Connector for a live Phoenix Query Server.
#[derive(Clone)]
pub struct AvaticaConnector {
    http: Client,
}

impl AvaticaConnector {
    pub fn new() -> Result<Self, ClientError> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl Connector for AvaticaConnector {
    type Connection = AvaticaConnection;

    async fn connect(
        &self,
        endpoint: &str,
        tenant_id: Option<&str>,
    ) -> Result<AvaticaConnection, ClientError> {
        let endpoint = Endpoint::parse(endpoint)?;
        let transport = Transport {
            http: self.http.clone(),
            url: endpoint.url,
        };

        let connection_id = uuid::Uuid::new_v4().to_string();
        let mut info_props = BTreeMap::new();
        if let Some(tenant) = tenant_id {
            info_props.insert(TENANT_ID_PROPERTY.to_string(), tenant.to_string());
        }

        let request = Request::OpenConnection {
            connection_id: connection_id.clone(),
            info: info_props,
        };
        match transport.send(&request).await {
            Ok(Response::OpenConnection {}) => {}
            Ok(other) => return Err(unexpected("openConnection", &other)),
            Err(ClientError::Http(e)) => {
                return Err(ClientError::Connection(format!(
                    "Query Server at {} is unreachable: {e}",
                    transport.url
                )))
            }
            Err(e) => return Err(e),
        }

        info!(
            "Opened Phoenix connection {} to {} (tenant: {})",
            connection_id,
            transport.url,
            tenant_id.unwrap_or("<none>")
        );

        Ok(AvaticaConnection {
            transport,
            connection_id,
        })
    }
}

/// One server-side Avatica connection.
pub struct AvaticaConnection {
    transport: Transport,
    connection_id: String,
}

impl AvaticaConnection {
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    async fn create_statement(&self) -> Result<u32, ClientError> {
        let request = Request::CreateStatement {
            connection_id: self.connection_id.clone(),
        };
        match self.transport.send(&request).await? {
            Response::CreateStatement { statement_id, .. } => Ok(statement_id),
            other => Err(unexpected("createStatement", &other)),
        }
    }

    async fn close_statement(&self, statement_id: u32) -> Result<(), ClientError> {
        let request = Request::CloseStatement {
            connection_id: self.connection_id.clone(),
            statement_id,
        };
        match self.transport.send(&request).await? {
            Response::CloseStatement {} => Ok(()),
            other => Err(unexpected("closeStatement", &other)),
        }
    }

    async fn prepare_and_execute(
        &self,
        statement_id: u32,
        sql: &str,
    ) -> Result<ResultSetResponse, ClientError> {
        let request = Request::PrepareAndExecute {
            connection_id: self.connection_id.clone(),
            statement_id,
            sql: sql.to_string(),
            max_row_count: -1,
            max_rows_in_first_frame: FRAME_SIZE,
        };
        match self.transport.send(&request).await? {
            Response::ExecuteResults {
                missing_statement: true,
                ..
            } => Err(ClientError::Protocol(format!(
                "statement {statement_id} is unknown to the server"
            ))),
            Response::ExecuteResults { results, .. } => results
                .into_iter()
                .next()
                .ok_or_else(|| ClientError::Protocol("executeResults without results".to_string())),
            other => Err(unexpected("executeResults", &other)),
        }
    }

    /// Run `sql` on a fresh statement and close it afterwards, even on failure.
    async fn with_statement(&self, sql: &str) -> Result<ResultSet, ClientError> {
        let statement_id = self.create_statement().await?;
        let outcome = match self.prepare_and_execute(statement_id, sql).await {
            Ok(result) => self.materialize(result).await,
            Err(e) => Err(e),
        };
        if let Err(e) = self.close_statement(statement_id).await {
            debug!("Failed to close statement {}: {}", statement_id, e);
        }
        outcome
    }

    /// Turn a result-set response into rows, fetching continuation frames.
    async fn materialize(&self, result: ResultSetResponse) -> Result<ResultSet, ClientError> {
        let columns: Vec<ColumnMetadata> = result
            .signature
            .as_ref()
            .map(|s| s.columns.iter().map(ColumnMetadata::from).collect())
            .unwrap_or_default();

        let mut rows = Vec::new();
        let mut frame = match result.first_frame {
            Some(frame) => frame,
            None => return Ok(ResultSet { columns, rows }),
        };

        loop {
            let fetched = frame.rows.len() as u64;
            rows.extend(frame.rows.iter().map(|row| decode_row(&columns, row)));
            if frame.done {
                break;
            }
            frame = self
                .fetch(result.statement_id, frame.offset + fetched)
                .await?;
        }

        Ok(ResultSet { columns, rows })
    }

    async fn fetch(&self, statement_id: u32, offset: u64) -> Result<Frame, ClientError> {
        let request = Request::Fetch {
            connection_id: self.connection_id.clone(),
            statement_id,
            offset,
            fetch_max_row_count: FRAME_SIZE,
        };
        match self.transport.send(&request).await? {
            Response::Fetch { frame } => Ok(frame),
            other => Err(unexpected("fetch", &other)),
        }
    }
}

fn decode_row(columns: &[ColumnMetadata], row: &[serde_json::Value]) -> Vec<SqlValue> {
    row.iter()
        .enumerate()
        .map(|(i, cell)| {
            let type_id = columns.get(i).map(|c| c.type_id).unwrap_or_default();
            decode_cell(type_id, cell)
        })
        .collect()
}

fn text_cell(rs: &ResultSet, row: usize, column: &str) -> Option<String> {
    match rs.get(row, column) {
        Some(SqlValue::Varchar(s)) => Some(s.clone()),
        _ => None,
    }
}

#[async_trait::async_trait]
impl Connection for AvaticaConnection {
    type Statement = AvaticaStatement;

    async fn execute(&mut self, sql: &str) -> Result<u64, ClientError> {
        let statement_id = self.create_statement().await?;
        let outcome = self.prepare_and_execute(statement_id, sql).await;
        if let Err(e) = self.close_statement(statement_id).await {
            debug!("Failed to close statement {}: {}", statement_id, e);
        }
        Ok(outcome?.update_count.max(0) as u64)
    }

    async fn prepare(&mut self, sql: &str) -> Result<AvaticaStatement, ClientError> {
        let request = Request::Prepare {
            connection_id: self.connection_id.clone(),
            sql: sql.to_string(),
            max_row_count: -1,
        };
        let handle = match self.transport.send(&request).await? {
            Response::Prepare { statement } => statement,
            other => return Err(unexpected("prepare", &other)),
        };

        let parameter_count = handle
            .signature
            .get("parameters")
            .and_then(|p| p.as_array())
            .map(|p| p.len());

        debug!(
            "Prepared statement {} on {} ({:?} parameters)",
            handle.id, self.connection_id, parameter_count
        );

        Ok(AvaticaStatement {
            transport: self.transport.clone(),
            parameters: vec![None; parameter_count.unwrap_or_default()],
            parameter_count,
            handle,
        })
    }

    async fn query(&mut self, sql: &str) -> Result<ResultSet, ClientError> {
        self.with_statement(sql).await
    }

    async fn tables(&mut self, filter: &TableFilter) -> Result<Vec<TableInfo>, ClientError> {
        let request = Request::GetTables {
            connection_id: self.connection_id.clone(),
            catalog: filter.catalog.clone(),
            schema_pattern: filter.schema_pattern.clone(),
            table_name_pattern: filter.table_pattern.clone(),
            type_list: (!filter.table_types.is_empty()).then(|| filter.table_types.clone()),
        };
        let result = match self.transport.send(&request).await? {
            Response::ResultSet(result) => result,
            other => return Err(unexpected("resultSet", &other)),
        };
        let rs = self.materialize(result).await?;

        Ok((0..rs.rows.len())
            .filter_map(|row| {
                Some(TableInfo {
                    catalog: text_cell(&rs, row, "TABLE_CAT"),
                    schema: text_cell(&rs, row, "TABLE_SCHEM"),
                    name: text_cell(&rs, row, "TABLE_NAME")?,
                    table_type: text_cell(&rs, row, "TABLE_TYPE").unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), ClientError> {
        let request = Request::ConnectionSync {
            connection_id: self.connection_id.clone(),
            conn_props: ConnectionProperties::auto_commit(auto_commit),
        };
        match self.transport.send(&request).await? {
            Response::ConnectionSync {} => Ok(()),
            other => Err(unexpected("connectionSync", &other)),
        }
    }

    async fn commit(&mut self) -> Result<(), ClientError> {
        let request = Request::Commit {
            connection_id: self.connection_id.clone(),
        };
        match self.transport.send(&request).await? {
            Response::Commit {} => Ok(()),
            other => Err(unexpected("commit", &other)),
        }
    }

    async fn rollback(&mut self) -> Result<(), ClientError> {
        let request = Request::Rollback {
            connection_id: self.connection_id.clone(),
        };
        match self.transport.send(&request).await? {
            Response::Rollback {} => Ok(()),
            other => Err(unexpected("rollback", &other)),
        }
    }

    async fn close(self) -> Result<(), ClientError> {
        let request = Request::CloseConnection {
            connection_id: self.connection_id.clone(),
        };
        match self.transport.send(&request).await? {
            Response::CloseConnection {} => {
                debug!("Closed Phoenix connection {}", self.connection_id);
                Ok(())
            }
            other => Err(unexpected("closeConnection", &other)),
        }
    }
}

/// A server-side prepared statement.
pub struct AvaticaStatement {
    transport: Transport,
    handle: StatementHandle,
    parameters: Vec<Option<SqlValue>>,
    /// Declared parameter count when the server reported one.
    parameter_count: Option<usize>,
}

#[async_trait::async_trait]
impl PreparedStatement for AvaticaStatement {
    fn bind(&mut self, index: usize, value: SqlValue) -> Result<(), ClientError> {
        if index == 0 {
            return Err(ClientError::Parameter(
                "parameter indexes start at 1".to_string(),
            ));
        }
        match self.parameter_count {
            Some(count) if index > count => {
                return Err(ClientError::Parameter(format!(
                    "parameter index {index} exceeds parameter count {count}"
                )))
            }
            _ => {}
        }
        if self.parameters.len() < index {
            self.parameters.resize(index, None);
        }
        self.parameters[index - 1] = Some(value);
        Ok(())
    }

    async fn execute(&mut self) -> Result<u64, ClientError> {
        let parameter_values = self
            .parameters
            .iter()
            .enumerate()
            .map(|(i, p)| {
                p.as_ref()
                    .map(TypedValue::from)
                    .ok_or_else(|| ClientError::Parameter(format!("parameter {} is not bound", i + 1)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let request = Request::Execute {
            statement_handle: self.handle.clone(),
            parameter_values,
            max_row_count: -1,
        };
        match self.transport.send(&request).await? {
            Response::ExecuteResults {
                missing_statement: true,
                ..
            } => Err(ClientError::Protocol(format!(
                "prepared statement {} is unknown to the server",
                self.handle.id
            ))),
            Response::ExecuteResults { results, .. } => Ok(results
                .first()
                .map(|r| r.update_count.max(0) as u64)
                .unwrap_or_default()),
            other => Err(unexpected("executeResults", &other)),
        }
    }

    async fn close(self) -> Result<(), ClientError> {
        let request = Request::CloseStatement {
            connection_id: self.handle.connection_id.clone(),
            statement_id: self.handle.id,
        };
        match self.transport.send(&request).await? {
            Response::CloseStatement {} => Ok(()),
            other => Err(unexpected("closeStatement", &other)),
        }
    }
}
