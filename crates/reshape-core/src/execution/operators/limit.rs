//! Limit operator for skipping and limiting rows.

use super::{Operator, OperatorResult};
use crate::execution::SelectionVector;

/// Skips the first `offset` rows and then passes at most `limit` rows.
pub struct LimitOperator {
    child: Box<dyn Operator>,
    offset: usize,
    limit: Option<usize>,
    skipped: usize,
    emitted: usize,
}

impl LimitOperator {
    /// Creates a new limit operator. `limit = None` only skips.
    #[must_use]
    pub fn new(child: Box<dyn Operator>, offset: usize, limit: Option<usize>) -> Self {
        Self {
            child,
            offset,
            limit,
            skipped: 0,
            emitted: 0,
        }
    }
}

impl Operator for LimitOperator {
    fn next(&mut self) -> OperatorResult {
        loop {
            if self.limit.is_some_and(|l| self.emitted >= l) {
                return Ok(None);
            }
            let Some(mut chunk) = self.child.next()? else {
                return Ok(None);
            };

            let mut keep = Vec::with_capacity(chunk.row_count());
            for row in chunk.selected_indices() {
                if self.skipped < self.offset {
                    self.skipped += 1;
                    continue;
                }
                if self.limit.is_some_and(|l| self.emitted >= l) {
                    break;
                }
                keep.push(row);
                self.emitted += 1;
            }
            if keep.is_empty() {
                continue;
            }
            chunk.set_selection(SelectionVector::new(keep));
            return Ok(Some(chunk));
        }
    }

    fn reset(&mut self) {
        self.child.reset();
        self.skipped = 0;
        self.emitted = 0;
    }

    fn name(&self) -> &'static str {
        "Limit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::DataChunk;
    use crate::execution::operators::{ValuesOperator, collect_rows};
    use reshape_common::types::{LogicalType, Value};

    fn input() -> ValuesOperator {
        let chunk = |range: std::ops::Range<i64>| {
            DataChunk::from_rows(
                &[LogicalType::Int64],
                range.map(|i| vec![Value::Int64(i)]).collect(),
            )
        };
        ValuesOperator::new(vec![chunk(0..3), chunk(3..6), chunk(6..9)])
    }

    #[test]
    fn test_offset_and_limit_span_chunks() {
        let mut limit = LimitOperator::new(Box::new(input()), 2, Some(4));
        let rows = collect_rows(&mut limit).unwrap();
        assert_eq!(
            rows,
            (2..6).map(|i| vec![Value::Int64(i)]).collect::<Vec<_>>()
        );

        limit.reset();
        assert_eq!(collect_rows(&mut limit).unwrap().len(), 4);
    }

    #[test]
    fn test_limit_zero() {
        let mut limit = LimitOperator::new(Box::new(input()), 0, Some(0));
        assert!(limit.next().unwrap().is_none());
    }
}
