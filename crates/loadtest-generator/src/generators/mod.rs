//! Field generators for the synthetic row.
//!
//! Strings come from the caller's RNG so a seeded generator reproduces
//! them; timestamps always come from the wall clock.

pub mod string;
pub mod timestamp;
