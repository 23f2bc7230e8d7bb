//! Distinct operator for removing duplicate rows.

use super::{Operator, OperatorResult};
use crate::execution::{DataChunk, SelectionVector};
use reshape_common::types::Value;
use reshape_common::utils::hash::FastHashSet;

/// Removes duplicate rows, keeping the first occurrence.
///
/// Output order is the first-seen order of the input. `NULL` equals `NULL`
/// for the purpose of duplicate detection.
pub struct DistinctOperator {
    child: Box<dyn Operator>,
    seen: FastHashSet<Vec<Value>>,
}

impl DistinctOperator {
    /// Creates a new distinct operator.
    #[must_use]
    pub fn new(child: Box<dyn Operator>) -> Self {
        Self {
            child,
            seen: FastHashSet::default(),
        }
    }

    fn filter_chunk(&mut self, chunk: &DataChunk) -> Vec<usize> {
        chunk
            .selected_indices()
            .filter(|&row| self.seen.insert(chunk.row(row)))
            .collect()
    }
}

impl Operator for DistinctOperator {
    fn next(&mut self) -> OperatorResult {
        while let Some(mut chunk) = self.child.next()? {
            let fresh = self.filter_chunk(&chunk);
            if !fresh.is_empty() {
                chunk.set_selection(SelectionVector::new(fresh));
                return Ok(Some(chunk));
            }
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.child.reset();
        self.seen.clear();
    }

    fn name(&self) -> &'static str {
        "Distinct"
    }
}
