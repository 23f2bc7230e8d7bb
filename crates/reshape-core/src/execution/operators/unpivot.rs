//! Unpivot operator: folds column families into long rows.

use super::{Operator, OperatorError, OperatorResult};
use crate::execution::{DataChunk, DataChunkBuilder};
use reshape_common::types::{LogicalType, Value};

/// One family of folded columns, all producing a single value column.
#[derive(Debug, Clone)]
pub struct FoldFamily {
    /// Input column per fold position.
    pub columns: Vec<usize>,
    /// Type every folded value is cast to.
    pub target: LogicalType,
}

/// Emits, for every input row and every fold position, the kept columns,
/// the position's label and one value per family.
pub struct UnpivotOperator {
    child: Box<dyn Operator>,
    keep: Vec<usize>,
    families: Vec<FoldFamily>,
    labels: Vec<Value>,
    include_nulls: bool,
    output_types: Vec<LogicalType>,
}

impl UnpivotOperator {
    /// Creates a new unpivot operator. Every family must have one column
    /// per label.
    #[must_use]
    pub fn new(
        child: Box<dyn Operator>,
        keep: Vec<usize>,
        families: Vec<FoldFamily>,
        labels: Vec<String>,
        include_nulls: bool,
        output_types: Vec<LogicalType>,
    ) -> Self {
        debug_assert!(families.iter().all(|f| f.columns.len() == labels.len()));
        Self {
            child,
            keep,
            families,
            labels: labels.into_iter().map(Value::from).collect(),
            include_nulls,
            output_types,
        }
    }

    fn fold(&self, input: &DataChunk) -> Result<DataChunk, OperatorError> {
        let mut out = DataChunkBuilder::with_capacity(
            &self.output_types,
            input.row_count() * self.labels.len(),
        );
        let mut values = Vec::with_capacity(self.families.len());

        for row in input.selected_indices() {
            for (position, label) in self.labels.iter().enumerate() {
                values.clear();
                for family in &self.families {
                    let value = cell(input, family.columns[position], row)?;
                    let cast = value.cast(&family.target).ok_or_else(|| {
                        OperatorError::TypeMismatch {
                            expected: family.target.to_string(),
                            found: value.type_name().to_string(),
                        }
                    })?;
                    values.push(cast);
                }

                if !self.include_nulls && values.iter().all(Value::is_null) {
                    continue;
                }

                let mut cells = Vec::with_capacity(self.output_types.len());
                for &c in &self.keep {
                    cells.push(cell(input, c, row)?);
                }
                cells.push(label.clone());
                cells.extend(values.drain(..));
                out.push_row(cells);
            }
        }
        Ok(out.finish())
    }
}

fn cell(chunk: &DataChunk, column: usize, row: usize) -> Result<Value, OperatorError> {
    chunk
        .column(column)
        .ok_or_else(|| OperatorError::ColumnNotFound(format!("column {column}")))
        .map(|c| c.get_value(row).unwrap_or_default())
}

impl Operator for UnpivotOperator {
    fn next(&mut self) -> OperatorResult {
        while let Some(input) = self.child.next()? {
            let out = self.fold(&input)?;
            if out.row_count() > 0 {
                return Ok(Some(out));
            }
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.child.reset();
    }

    fn name(&self) -> &'static str {
        "Unpivot"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::operators::{ValuesOperator, collect_rows};

    fn sales() -> ValuesOperator {
        ValuesOperator::from_rows(
            &[
                LogicalType::Int64,
                LogicalType::String,
                LogicalType::Int64,
                LogicalType::Int64,
            ],
            vec![
                vec![
                    Value::Int64(1),
                    Value::from("electronics"),
                    Value::Int64(1),
                    Value::Int64(2),
                ],
                vec![
                    Value::Int64(2),
                    Value::from("clothes"),
                    Value::Null,
                    Value::Null,
                ],
            ],
        )
    }

    fn operator(include_nulls: bool) -> UnpivotOperator {
        UnpivotOperator::new(
            Box::new(sales()),
            vec![0, 1],
            vec![FoldFamily {
                columns: vec![2, 3],
                target: LogicalType::Int64,
            }],
            vec!["jan".to_string(), "feb".to_string()],
            include_nulls,
            vec![
                LogicalType::Int64,
                LogicalType::String,
                LogicalType::String,
                LogicalType::Int64,
            ],
        )
    }

    #[test]
    fn test_unpivot_excludes_nulls() {
        let rows = collect_rows(&mut operator(false)).unwrap();
        assert_eq!(
            rows,
            vec![
                vec![
                    Value::Int64(1),
                    Value::from("electronics"),
                    Value::from("jan"),
                    Value::Int64(1)
                ],
                vec![
                    Value::Int64(1),
                    Value::from("electronics"),
                    Value::from("feb"),
                    Value::Int64(2)
                ],
            ]
        );
    }

    #[test]
    fn test_unpivot_include_nulls() {
        let rows = collect_rows(&mut operator(true)).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3][2], Value::from("feb"));
        assert_eq!(rows[3][3], Value::Null);
    }

    #[test]
    fn test_multi_family_keeps_partially_null_rows() {
        let child = ValuesOperator::from_rows(
            &vec![LogicalType::Int64; 4],
            vec![vec![
                Value::Int64(10),
                Value::Null,
                Value::Null,
                Value::Int64(20),
            ]],
        );
        let mut op = UnpivotOperator::new(
            Box::new(child),
            Vec::new(),
            vec![
                FoldFamily {
                    columns: vec![0, 1],
                    target: LogicalType::Float64,
                },
                FoldFamily {
                    columns: vec![2, 3],
                    target: LogicalType::Int64,
                },
            ],
            vec!["q1".to_string(), "q2".to_string()],
            false,
            vec![
                LogicalType::String,
                LogicalType::Float64,
                LogicalType::Int64,
            ],
        );
        assert_eq!(
            collect_rows(&mut op).unwrap(),
            vec![
                vec![Value::from("q1"), Value::Float64(10.0), Value::Null],
                vec![Value::from("q2"), Value::Null, Value::Int64(20)],
            ]
        );
    }
}
