//! Scan operator for reading data from storage.

use std::ops::Range;
use std::sync::Arc;

use super::{Operator, OperatorResult};
use crate::execution::{CancellationToken, DEFAULT_CHUNK_CAPACITY, DataChunk, ValueVector};
use crate::storage::Table;

/// A scan operator that reads a contiguous row range of a table.
pub struct ScanOperator {
    /// The table to scan.
    table: Arc<Table>,
    /// Rows this scan covers.
    range: Range<usize>,
    /// Current position in the scan.
    position: usize,
    /// Chunk capacity.
    chunk_capacity: usize,
    /// Checked once per chunk.
    cancel: Option<CancellationToken>,
}

impl ScanOperator {
    /// Creates a scan over every row of `table`.
    #[must_use]
    pub fn new(table: Arc<Table>) -> Self {
        let range = 0..table.row_count();
        Self::with_range(table, range)
    }

    /// Creates a scan over a row range of `table`.
    #[must_use]
    pub fn with_range(table: Arc<Table>, range: Range<usize>) -> Self {
        let end = range.end.min(table.row_count());
        let start = range.start.min(end);
        Self {
            table,
            range: start..end,
            position: start,
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
            cancel: None,
        }
    }

    /// Sets the chunk capacity.
    #[must_use]
    pub fn with_chunk_capacity(mut self, capacity: usize) -> Self {
        self.chunk_capacity = capacity.max(1);
        self
    }

    /// Aborts the scan with `Cancelled` once `token` fires.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl Operator for ScanOperator {
    fn next(&mut self) -> OperatorResult {
        if let Some(token) = &self.cancel {
            token.check()?;
        }
        if self.position >= self.range.end {
            return Ok(None);
        }

        let start = self.position;
        let end = (start + self.chunk_capacity).min(self.range.end);
        let columns = self
            .table
            .schema()
            .fields()
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let values = self
                    .table
                    .column(i)
                    .map(|c| c[start..end].to_vec())
                    .unwrap_or_default();
                ValueVector::from_values(field.data_type.clone(), values)
            })
            .collect();

        self.position = end;
        let mut chunk = DataChunk::from_columns(columns);
        // Zero-column tables still carry a row count.
        chunk.set_count(end - start);
        Ok(Some(chunk))
    }

    fn reset(&mut self) {
        self.position = self.range.start;
    }

    fn name(&self) -> &'static str {
        "Scan"
    }
}
