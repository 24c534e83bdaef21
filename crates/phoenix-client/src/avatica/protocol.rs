//! Avatica JSON wire messages.
//!
//! Every request is a JSON object POSTed to the Query Server root, tagged by
//! a `request` field. Every response is tagged by a `response` field. Only
//! the messages this client sends are modelled; unknown response fields are
//! ignored.

use crate::error::ClientError;
use crate::value::{sql_types, ColumnMetadata, Nullability, SqlValue};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Connection property carrying the tenant for `MULTI_TENANT` tables.
pub const TENANT_ID_PROPERTY: &str = "TenantId";

/// Requests understood by the Query Server.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "request", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    OpenConnection {
        connection_id: String,
        info: BTreeMap<String, String>,
    },
    ConnectionSync {
        connection_id: String,
        conn_props: ConnectionProperties,
    },
    CreateStatement {
        connection_id: String,
    },
    PrepareAndExecute {
        connection_id: String,
        statement_id: u32,
        sql: String,
        max_row_count: i64,
        max_rows_in_first_frame: i32,
    },
    Prepare {
        connection_id: String,
        sql: String,
        max_row_count: i64,
    },
    Execute {
        statement_handle: StatementHandle,
        parameter_values: Vec<TypedValue>,
        max_row_count: i64,
    },
    Fetch {
        connection_id: String,
        statement_id: u32,
        offset: u64,
        fetch_max_row_count: i32,
    },
    GetTables {
        connection_id: String,
        catalog: Option<String>,
        schema_pattern: Option<String>,
        table_name_pattern: Option<String>,
        type_list: Option<Vec<String>>,
    },
    Commit {
        connection_id: String,
    },
    Rollback {
        connection_id: String,
    },
    CloseStatement {
        connection_id: String,
        statement_id: u32,
    },
    CloseConnection {
        connection_id: String,
    },
}

impl Request {
    /// Wire name, used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Request::OpenConnection { .. } => "openConnection",
            Request::ConnectionSync { .. } => "connectionSync",
            Request::CreateStatement { .. } => "createStatement",
            Request::PrepareAndExecute { .. } => "prepareAndExecute",
            Request::Prepare { .. } => "prepare",
            Request::Execute { .. } => "execute",
            Request::Fetch { .. } => "fetch",
            Request::GetTables { .. } => "getTables",
            Request::Commit { .. } => "commit",
            Request::Rollback { .. } => "rollback",
            Request::CloseStatement { .. } => "closeStatement",
            Request::CloseConnection { .. } => "closeConnection",
        }
    }
}

/// Connection properties sent with `connectionSync`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProperties {
    conn_props: &'static str,
    pub auto_commit: Option<bool>,
    pub read_only: Option<bool>,
    pub transaction_isolation: Option<i32>,
    pub catalog: Option<String>,
    pub schema: Option<String>,
    dirty: bool,
}

impl ConnectionProperties {
    pub fn auto_commit(auto_commit: bool) -> Self {
        Self {
            conn_props: "connPropsImpl",
            auto_commit: Some(auto_commit),
            read_only: None,
            transaction_isolation: None,
            catalog: None,
            schema: None,
            dirty: true,
        }
    }
}

/// Handle returned by `prepare` and echoed back on `execute`.
///
/// The signature is kept as raw JSON so it round-trips unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementHandle {
    pub connection_id: String,
    pub id: u32,
    #[serde(default)]
    pub signature: JsonValue,
}

/// A parameter value in Avatica's `TypedValue` JSON form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedValue {
    #[serde(rename = "type")]
    pub rep: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<JsonValue>,
}

impl From<&SqlValue> for TypedValue {
    fn from(value: &SqlValue) -> Self {
        let (rep, value) = match value {
            SqlValue::Null => ("NULL", None),
            SqlValue::Boolean(b) => ("BOOLEAN", Some(JsonValue::from(*b))),
            SqlValue::Integer(i) => ("INTEGER", Some(JsonValue::from(*i))),
            SqlValue::BigInt(i) => ("LONG", Some(JsonValue::from(*i))),
            SqlValue::Double(d) => ("DOUBLE", Some(JsonValue::from(*d))),
            SqlValue::Varchar(s) => ("STRING", Some(JsonValue::from(s.as_str()))),
            // Timestamps travel as epoch milliseconds
            SqlValue::Timestamp(ts) => ("JAVA_SQL_TIMESTAMP", Some(JsonValue::from(ts.timestamp_millis()))),
        };
        TypedValue { rep, value }
    }
}

/// Responses from the Query Server.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "response", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Response {
    OpenConnection {},
    ConnectionSync {},
    CreateStatement {
        connection_id: String,
        statement_id: u32,
    },
    ExecuteResults {
        #[serde(default)]
        missing_statement: bool,
        #[serde(default)]
        results: Vec<ResultSetResponse>,
    },
    ResultSet(ResultSetResponse),
    Prepare {
        statement: StatementHandle,
    },
    Fetch {
        frame: Frame,
    },
    Commit {},
    Rollback {},
    CloseStatement {},
    CloseConnection {},
    Error(ErrorResponse),
}

impl Response {
    pub fn name(&self) -> &'static str {
        match self {
            Response::OpenConnection {} => "openConnection",
            Response::ConnectionSync {} => "connectionSync",
            Response::CreateStatement { .. } => "createStatement",
            Response::ExecuteResults { .. } => "executeResults",
            Response::ResultSet(_) => "resultSet",
            Response::Prepare { .. } => "prepare",
            Response::Fetch { .. } => "fetch",
            Response::Commit {} => "commit",
            Response::Rollback {} => "rollback",
            Response::CloseStatement {} => "closeStatement",
            Response::CloseConnection {} => "closeConnection",
            Response::Error(_) => "error",
        }
    }
}

/// One result of `prepareAndExecute`/`execute`, or the body of a metadata call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSetResponse {
    pub connection_id: String,
    pub statement_id: u32,
    #[serde(default)]
    pub own_statement: bool,
    #[serde(default)]
    pub signature: Option<Signature>,
    #[serde(default)]
    pub first_frame: Option<Frame>,
    /// `-1` for result sets, otherwise the DML/DDL update count.
    #[serde(default = "no_update_count")]
    pub update_count: i64,
}

fn no_update_count() -> i64 {
    -1
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    #[serde(default)]
    pub columns: Vec<ColumnSignature>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSignature {
    #[serde(default)]
    pub ordinal: i32,
    #[serde(default)]
    pub nullable: i32,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub column_name: Option<String>,
    #[serde(default)]
    pub schema_name: Option<String>,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub precision: i32,
    #[serde(default)]
    pub scale: i32,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnType {
    pub id: i32,
    pub name: String,
}

impl From<&ColumnSignature> for ColumnMetadata {
    fn from(col: &ColumnSignature) -> Self {
        let name = col.column_name.clone().unwrap_or_default();
        ColumnMetadata {
            label: col.label.clone().unwrap_or_else(|| name.clone()),
            name,
            type_id: col.column_type.id,
            type_name: col.column_type.name.clone(),
            table_name: col.table_name.clone().unwrap_or_default(),
            schema_name: col.schema_name.clone().unwrap_or_default(),
            precision: col.precision,
            scale: col.scale,
            nullable: Nullability::from(col.nullable),
        }
    }
}

/// A page of rows.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub done: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rows: Vec<Vec<JsonValue>>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Vec<JsonValue>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Vec<JsonValue>>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[serde(default)]
    pub exceptions: Vec<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub error_code: i32,
    #[serde(default)]
    pub sql_state: Option<String>,
}

impl From<ErrorResponse> for ClientError {
    fn from(err: ErrorResponse) -> Self {
        let message = err
            .error_message
            .or_else(|| err.exceptions.first().map(|e| e.lines().next().unwrap_or(e).to_string()))
            .unwrap_or_else(|| "unknown server error".to_string());
        ClientError::Server {
            message,
            sql_state: err.sql_state,
            code: err.error_code,
        }
    }
}

/// Convert a JSON cell into a typed value using the column's SQL type.
pub fn decode_cell(type_id: i32, cell: &JsonValue) -> SqlValue {
    if cell.is_null() {
        return SqlValue::Null;
    }
    match type_id {
        sql_types::BOOLEAN => cell.as_bool().map(SqlValue::Boolean),
        sql_types::TINYINT | sql_types::SMALLINT | sql_types::INTEGER => cell
            .as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .map(SqlValue::Integer),
        sql_types::BIGINT => cell.as_i64().map(SqlValue::BigInt),
        sql_types::FLOAT | sql_types::DOUBLE | sql_types::DECIMAL => {
            cell.as_f64().map(SqlValue::Double)
        }
        sql_types::TIMESTAMP | sql_types::TIME => cell
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(SqlValue::Timestamp),
        // DATE arrives as days since the epoch
        sql_types::DATE => cell.as_i64().and_then(|days| {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
            let date = epoch.checked_add_signed(chrono::Duration::days(days))?;
            Some(SqlValue::Timestamp(date.and_hms_opt(0, 0, 0)?.and_utc()))
        }),
        _ => None,
    }
    .unwrap_or_else(|| decode_untyped(cell))
}

fn decode_untyped(cell: &JsonValue) -> SqlValue {
    match cell {
        JsonValue::Null => SqlValue::Null,
        JsonValue::Bool(b) => SqlValue::Boolean(*b),
        JsonValue::Number(n) => n
            .as_i64()
            .map(SqlValue::BigInt)
            .or_else(|| n.as_f64().map(SqlValue::Double))
            .unwrap_or(SqlValue::Null),
        JsonValue::String(s) => SqlValue::Varchar(s.clone()),
        other => SqlValue::Varchar(other.to_string()),
    }
}
