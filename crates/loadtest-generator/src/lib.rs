//! Row generator for the Phoenix load test.
//!
//! This crate provides the `RowGenerator` which produces synthetic rows for
//! the load test tables. Every row has the same shape; only the payload is
//! random.
//!
//! # Architecture
//!
//! ```text
//!   seq (from the producer)
//!        │
//!        ▼
//! ┌─────────────────┐
//! │  RowGenerator   │
//! │                 │
//! │  - rng (StdRng) │
//! └────────┬────────┘
//!          │
//!          ▼
//!    Row { id, name, session_id, created_at, updated_at, description }
//! ```
//!
//! Each producer owns its own generator, so no random source is shared
//! between tasks. Generators built from the same seed produce the same
//! strings; timestamps and `session_id` always come from the wall clock.
//!
//! # Example
//!
//! ```rust
//! use loadtest_generator::RowGenerator;
//!
//! let mut generator = RowGenerator::new(42);
//! let row = generator.generate(0);
//! assert_eq!(row.id, 0);
//! assert_eq!(row.name.len(), 15);
//! assert_eq!(row.description.len(), 100);
//! ```

pub mod generator;
pub mod generators;
pub mod row;

// Re-exports for convenience
pub use generator::{RowGenerator, RowIterator};
pub use row::{Row, DESCRIPTION_LENGTH, NAME_LENGTH};
