//! Configuration helpers shared by the CLI commands.

pub mod duration;

pub use duration::parse_duration;
