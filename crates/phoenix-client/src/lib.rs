//! Client for Apache Phoenix reached through the Phoenix Query Server.
//!
//! This crate defines the database collaborator used by the load test and
//! the diagnostic commands. Callers program against three traits:
//!
//! - [`Connector`] opens a connection to an endpoint, optionally scoped to a
//!   tenant identifier
//! - [`Connection`] executes DDL/DML, prepares statements, runs queries,
//!   inspects metadata and controls the unit of work
//! - [`PreparedStatement`] binds positional parameters and executes
//!
//! Two implementations are provided:
//!
//! - [`AvaticaConnector`] talks to a live Query Server over HTTP using the
//!   Avatica JSON wire protocol
//! - [`MemoryConnector`] keeps everything in process and is used for dry
//!   runs and tests
//!
//! # Example
//!
//! ```rust,no_run
//! use phoenix_client::{AvaticaConnector, Connection, Connector};
//!
//! # async fn demo() -> Result<(), phoenix_client::ClientError> {
//! let connector = AvaticaConnector::new()?;
//! let mut conn = connector
//!     .connect("jdbc:phoenix:thin:url=http://localhost:8765;serialization=JSON", Some("tenant1"))
//!     .await?;
//! conn.execute("upsert into t (id, name) values (1, 'a')").await?;
//! conn.commit().await?;
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod avatica;
pub mod endpoint;
pub mod error;
pub mod memory;
pub mod traits;
pub mod value;

pub use avatica::AvaticaConnector;
pub use endpoint::Endpoint;
pub use error::ClientError;
pub use memory::MemoryConnector;
pub use traits::{Connection, Connector, PreparedStatement};
pub use value::{ColumnMetadata, Nullability, ResultSet, SqlValue, TableFilter, TableInfo};
