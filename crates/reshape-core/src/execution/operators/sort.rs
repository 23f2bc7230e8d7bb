//! Sort operator for ordering results.

use std::cmp::Ordering;

use super::{Operator, OperatorResult};
use crate::execution::{DEFAULT_CHUNK_CAPACITY, DataChunk};
use reshape_common::types::{LogicalType, Value};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending; NULL sorts first.
    #[default]
    Ascending,
    /// Descending; NULL sorts last.
    Descending,
}

/// A sort key: an input column and a direction.
#[derive(Debug, Clone, Copy)]
pub struct SortKey {
    /// Column index.
    pub column: usize,
    /// Direction.
    pub direction: SortDirection,
}

impl SortKey {
    /// Creates an ascending key.
    #[must_use]
    pub fn ascending(column: usize) -> Self {
        Self {
            column,
            direction: SortDirection::Ascending,
        }
    }

    /// Creates a descending key.
    #[must_use]
    pub fn descending(column: usize) -> Self {
        Self {
            column,
            direction: SortDirection::Descending,
        }
    }
}

/// Compares two rows by a list of keys. Ties keep their input order when
/// used with a stable sort.
fn compare_rows(keys: &[SortKey], a: &[Value], b: &[Value]) -> Ordering {
    for key in keys {
        let (Some(x), Some(y)) = (a.get(key.column), b.get(key.column)) else {
            continue;
        };
        let ord = match key.direction {
            SortDirection::Ascending => x.total_cmp(y),
            SortDirection::Descending => y.total_cmp(x),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// A blocking operator that materializes its input and emits it sorted.
pub struct SortOperator {
    child: Box<dyn Operator>,
    keys: Vec<SortKey>,
    types: Vec<LogicalType>,
    sorted: Option<std::vec::IntoIter<Vec<Value>>>,
}

impl SortOperator {
    /// Creates a new sort operator.
    #[must_use]
    pub fn new(child: Box<dyn Operator>, keys: Vec<SortKey>, types: Vec<LogicalType>) -> Self {
        Self {
            child,
            keys,
            types,
            sorted: None,
        }
    }
}

impl Operator for SortOperator {
    fn next(&mut self) -> OperatorResult {
        if self.sorted.is_none() {
            let mut rows = Vec::new();
            while let Some(chunk) = self.child.next()? {
                rows.extend(chunk.rows());
            }
            rows.sort_by(|a, b| compare_rows(&self.keys, a, b));
            self.sorted = Some(rows.into_iter());
        }

        let Some(iter) = self.sorted.as_mut() else {
            return Ok(None);
        };
        let batch: Vec<Vec<Value>> = iter.take(DEFAULT_CHUNK_CAPACITY).collect();
        if batch.is_empty() {
            return Ok(None);
        }
        Ok(Some(DataChunk::from_rows(&self.types, batch)))
    }

    fn reset(&mut self) {
        self.child.reset();
        self.sorted = None;
    }

    fn name(&self) -> &'static str {
        "Sort"
    }
}
