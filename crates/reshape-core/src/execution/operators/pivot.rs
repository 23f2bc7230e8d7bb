//! Pivot operator: expands bucket lists into wide rows.
//!
//! The input is one row per group: the grouping columns followed by one
//! fixed-length list per using aggregate, where element `d` holds the
//! aggregate for domain entry `d`. The output replaces the lists with
//! `domain_len * using_count` scalar cells, domain-major.

use std::sync::Arc;

use super::{Operator, OperatorError, OperatorResult};
use crate::execution::{DataChunk, DataChunkBuilder};
use reshape_common::types::{LogicalType, Value};

/// Streaming pivot expansion. One chunk in, one chunk out.
pub struct PivotOperator {
    child: Box<dyn Operator>,
    group_count: usize,
    using_count: usize,
    domain_len: usize,
    output_types: Vec<LogicalType>,
}

impl PivotOperator {
    /// Creates a new pivot operator.
    #[must_use]
    pub fn new(
        child: Box<dyn Operator>,
        group_count: usize,
        using_count: usize,
        domain_len: usize,
        output_types: Vec<LogicalType>,
    ) -> Self {
        debug_assert_eq!(output_types.len(), group_count + domain_len * using_count);
        Self {
            child,
            group_count,
            using_count,
            domain_len,
            output_types,
        }
    }

    fn expand(&self, input: &DataChunk) -> Result<DataChunk, OperatorError> {
        let mut out = DataChunkBuilder::with_capacity(&self.output_types, input.row_count());
        let mut lists: Vec<Option<Arc<[Value]>>> = Vec::with_capacity(self.using_count);

        for row in input.selected_indices() {
            let mut cells = Vec::with_capacity(self.output_types.len());
            for c in 0..self.group_count {
                cells.push(column_value(input, c, row)?);
            }

            lists.clear();
            for u in 0..self.using_count {
                lists.push(match column_value(input, self.group_count + u, row)? {
                    Value::Null => None,
                    Value::List(items) => Some(items),
                    other => {
                        return Err(OperatorError::TypeMismatch {
                            expected: "LIST".to_string(),
                            found: other.type_name().to_string(),
                        });
                    }
                });
            }

            // Missing list, missing element and NULL element all read as NULL.
            for d in 0..self.domain_len {
                for list in &lists {
                    cells.push(
                        list.as_ref()
                            .and_then(|items| items.get(d))
                            .cloned()
                            .unwrap_or_default(),
                    );
                }
            }
            out.push_row(cells);
        }
        Ok(out.finish())
    }
}

fn column_value(chunk: &DataChunk, column: usize, row: usize) -> Result<Value, OperatorError> {
    chunk
        .column(column)
        .ok_or_else(|| OperatorError::ColumnNotFound(format!("column {column}")))
        .map(|c| c.get_value(row).unwrap_or_default())
}

impl Operator for PivotOperator {
    fn next(&mut self) -> OperatorResult {
        while let Some(input) = self.child.next()? {
            if input.is_empty() {
                continue;
            }
            return self.expand(&input).map(Some);
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.child.reset();
    }

    fn name(&self) -> &'static str {
        "Pivot"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::operators::{ValuesOperator, collect_rows};

    fn list(items: &[Option<i64>]) -> Value {
        Value::from(items.iter().map(|v| Value::from(*v)).collect::<Vec<_>>())
    }

    #[test]
    fn test_expand_single_using() {
        let child = ValuesOperator::from_rows(
            &[LogicalType::String, LogicalType::list_of(LogicalType::Int64)],
            vec![
                vec![Value::from("NL"), list(&[Some(1005), Some(1065), None])],
                vec![Value::from("US"), list(&[Some(8015), Some(8675), Some(8804)])],
            ],
        );
        let mut pivot = PivotOperator::new(
            Box::new(child),
            1,
            1,
            3,
            vec![
                LogicalType::String,
                LogicalType::Int64,
                LogicalType::Int64,
                LogicalType::Int64,
            ],
        );

        let rows = collect_rows(&mut pivot).unwrap();
        assert_eq!(
            rows[0],
            vec![
                Value::from("NL"),
                Value::Int64(1005),
                Value::Int64(1065),
                Value::Null
            ]
        );
        assert_eq!(rows[1][3], Value::Int64(8804));
    }

    #[test]
    fn test_expand_multiple_using_is_domain_major() {
        let child = ValuesOperator::from_rows(
            &[LogicalType::Any, LogicalType::Any],
            vec![vec![list(&[Some(1), Some(2)]), Value::Null]],
        );
        let mut pivot = PivotOperator::new(Box::new(child), 0, 2, 2, vec![LogicalType::Int64; 4]);
        assert_eq!(
            collect_rows(&mut pivot).unwrap(),
            vec![vec![
                Value::Int64(1),
                Value::Null,
                Value::Int64(2),
                Value::Null
            ]]
        );
    }

    #[test]
    fn test_non_list_is_type_mismatch() {
        let child = ValuesOperator::from_rows(&[LogicalType::Int64], vec![vec![Value::Int64(3)]]);
        let mut pivot = PivotOperator::new(Box::new(child), 0, 1, 1, vec![LogicalType::Int64]);
        assert!(matches!(
            pivot.next(),
            Err(OperatorError::TypeMismatch { .. })
        ));
    }
}
