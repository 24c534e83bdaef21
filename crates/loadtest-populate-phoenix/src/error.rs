//! Error types for the Phoenix populator.

use phoenix_client::ClientError;
use thiserror::Error;

/// Errors that can end a populate run or a single consumer.
#[derive(Error, Debug)]
pub enum PhoenixPopulatorError {
    /// Connection, DDL or statement error reported by the client.
    #[error("Phoenix error: {0}")]
    Phoenix(#[from] ClientError),

    /// Invalid run configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Could not reach the endpoint while provisioning tables.
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by a lane wait.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneError {
    /// The wait was cancelled before it could complete.
    #[error("lane wait interrupted")]
    Interrupted,

    /// The other side of the lane is gone.
    #[error("lane closed")]
    Closed,
}
