//! Error types for the Phoenix client.

use thiserror::Error;

/// Errors returned by connectors, connections and statements.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The endpoint string could not be understood.
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// The Query Server could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server rejected a request.
    #[error("Server error{}: {message}", sql_state.as_ref().map(|s| format!(" (SQLSTATE {s})")).unwrap_or_default())]
    Server {
        message: String,
        sql_state: Option<String>,
        code: i32,
    },

    /// The server answered with something this client does not understand.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A parameter index was out of range or a parameter was left unbound.
    #[error("Parameter error: {0}")]
    Parameter(String),

    /// Statement execution failed in the in-memory backend.
    #[error("Statement error: {0}")]
    Statement(String),

    /// Table does not exist.
    #[error("Table '{0}' not found")]
    TableNotFound(String),
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Protocol(e.to_string())
    }
}
