//! Values operator for emitting pre-built chunks.

use super::{Operator, OperatorResult};
use crate::execution::DataChunk;
use reshape_common::types::{LogicalType, Value};

/// Emits a fixed list of chunks. Used for inline relations and as a leaf
/// in tests.
pub struct ValuesOperator {
    chunks: Vec<DataChunk>,
    position: usize,
}

impl ValuesOperator {
    /// Creates an operator that yields `chunks` in order.
    #[must_use]
    pub fn new(chunks: Vec<DataChunk>) -> Self {
        Self {
            chunks,
            position: 0,
        }
    }

    /// Creates an operator yielding a single chunk built from `rows`.
    #[must_use]
    pub fn from_rows(types: &[LogicalType], rows: Vec<Vec<Value>>) -> Self {
        Self::new(vec![DataChunk::from_rows(types, rows)])
    }
}

impl Operator for ValuesOperator {
    fn next(&mut self) -> OperatorResult {
        let chunk = self.chunks.get(self.position).cloned();
        if chunk.is_some() {
            self.position += 1;
        }
        Ok(chunk)
    }

    fn reset(&mut self) {
        self.position = 0;
    }

    fn name(&self) -> &'static str {
        "Values"
    }
}
