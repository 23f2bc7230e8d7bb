//! Project operator for selecting and transforming columns.

use super::{Operator, OperatorResult};
use crate::execution::{DataChunk, Expr};
use reshape_common::types::LogicalType;

/// A project operator that evaluates one expression per output column.
pub struct ProjectOperator {
    /// Child operator to read from.
    child: Box<dyn Operator>,
    /// Projection expressions.
    projections: Vec<Expr>,
    /// Output column types.
    output_types: Vec<LogicalType>,
}

impl ProjectOperator {
    /// Creates a new project operator.
    #[must_use]
    pub fn new(
        child: Box<dyn Operator>,
        projections: Vec<Expr>,
        output_types: Vec<LogicalType>,
    ) -> Self {
        debug_assert_eq!(projections.len(), output_types.len());
        Self {
            child,
            projections,
            output_types,
        }
    }

    /// Creates a project operator that selects specific columns.
    #[must_use]
    pub fn select_columns(
        child: Box<dyn Operator>,
        columns: Vec<usize>,
        types: Vec<LogicalType>,
    ) -> Self {
        let projections = columns.into_iter().map(Expr::Column).collect();
        Self::new(child, projections, types)
    }
}

impl Operator for ProjectOperator {
    fn next(&mut self) -> OperatorResult {
        let Some(input) = self.child.next()? else {
            return Ok(None);
        };

        let mut output = DataChunk::with_capacity(&self.output_types, input.row_count());
        for (i, expr) in self.projections.iter().enumerate() {
            for row in input.selected_indices() {
                let value = expr.evaluate(&input, row)?;
                if let Some(column) = output.column_mut(i) {
                    column.push_value(value);
                }
            }
        }

        output.set_count(input.row_count());
        Ok(Some(output))
    }

    fn reset(&mut self) {
        self.child.reset();
    }

    fn name(&self) -> &'static str {
        "Project"
    }
}
