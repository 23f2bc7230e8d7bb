//! Chunked, pull-based query execution.
//!
//! Operators exchange [`DataChunk`]s: a batch of equally long
//! [`ValueVector`] columns plus an optional [`SelectionVector`] marking the
//! rows that survived filtering.

mod cancel;
pub mod chunk;
pub mod expression;
pub mod operators;
mod selection;
mod vector;

pub use cancel::CancellationToken;
pub use chunk::{DataChunk, DataChunkBuilder};
pub use expression::{BinaryOp, Expr, ScalarFunction, UnaryOp};
pub use selection::SelectionVector;
pub use vector::ValueVector;

/// Default number of rows per chunk.
pub const DEFAULT_CHUNK_CAPACITY: usize = 2048;
