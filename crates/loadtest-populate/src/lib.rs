//! Common types and utilities for loadtest populators.
//!
//! This crate provides the argument types shared by the lane-based
//! populators, so every populator exposes the same CLI for row counts,
//! lane counts and batching.

pub mod args;

pub use args::{CommonPopulateArgs, DEFAULT_BATCH_SIZE, DEFAULT_LANE_CAPACITY, DEFAULT_ROWS_PER_LANE};
