//! Filter operator for applying predicates.

use super::{Operator, OperatorError, OperatorResult};
use crate::execution::{DataChunk, Expr, SelectionVector};
use reshape_common::types::Value;

/// A predicate for filtering rows.
pub trait Predicate: Send + Sync {
    /// Evaluates the predicate for a row. NULL counts as false.
    fn evaluate(&self, chunk: &DataChunk, row: usize) -> Result<bool, OperatorError>;
}

/// A predicate backed by a boolean expression.
pub struct ExpressionPredicate {
    expr: Expr,
}

impl ExpressionPredicate {
    /// Creates a predicate from an expression.
    #[must_use]
    pub fn new(expr: Expr) -> Self {
        Self { expr }
    }
}

impl Predicate for ExpressionPredicate {
    fn evaluate(&self, chunk: &DataChunk, row: usize) -> Result<bool, OperatorError> {
        match self.expr.evaluate(chunk, row)? {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(OperatorError::TypeMismatch {
                expected: "BOOLEAN".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }
}

/// A filter operator that applies a predicate to filter rows.
pub struct FilterOperator {
    /// Child operator to read from.
    child: Box<dyn Operator>,
    /// Predicate to apply.
    predicate: Box<dyn Predicate>,
}

impl FilterOperator {
    /// Creates a new filter operator.
    #[must_use]
    pub fn new(child: Box<dyn Operator>, predicate: Box<dyn Predicate>) -> Self {
        Self { child, predicate }
    }
}

impl Operator for FilterOperator {
    fn next(&mut self) -> OperatorResult {
        // Skip chunks where nothing passes
        while let Some(mut chunk) = self.child.next()? {
            let mut passing = Vec::with_capacity(chunk.row_count());
            for row in chunk.selected_indices() {
                if self.predicate.evaluate(&chunk, row)? {
                    passing.push(row);
                }
            }
            if passing.is_empty() {
                continue;
            }
            chunk.set_selection(SelectionVector::new(passing));
            return Ok(Some(chunk));
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.child.reset();
    }

    fn name(&self) -> &'static str {
        "Filter"
    }
}
