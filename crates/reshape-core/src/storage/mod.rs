//! In-memory table storage.
//!
//! Tables are immutable columnar snapshots. Queries share them through
//! `Arc<Table>` and split them into contiguous row ranges for parallel
//! pipelines.

mod table;

pub use table::Table;
