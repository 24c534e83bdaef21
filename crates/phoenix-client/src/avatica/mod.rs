//! Phoenix Query Server client speaking the Avatica JSON protocol.

mod client;
pub mod protocol;

pub use client::{AvaticaConnection, AvaticaConnector, AvaticaStatement};
