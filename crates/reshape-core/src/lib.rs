//! # reshape-core
//!
//! Core layer for Reshape: table storage and chunked execution primitives.
//!
//! This crate provides the relational building blocks the reshape engine runs
//! on. It depends only on `reshape-common`.
//!
//! ## Modules
//!
//! - [`storage`] - Immutable in-memory tables and their partitioning
//! - [`execution`] - Execution primitives (DataChunk, ValueVector, Expr, Operators)

pub mod execution;
pub mod storage;

// Re-export commonly used types
pub use execution::operators::{Operator, OperatorError, OperatorResult};
pub use execution::{CancellationToken, DataChunk, DataChunkBuilder, ValueVector};
pub use storage::Table;
