//! Physical operators for query execution.
//!
//! This module provides the physical operators that form the execution tree:
//!
//! - Scan: Read a row range of a table
//! - Values: Emit pre-built chunks
//! - Filter: Apply predicates to filter rows
//! - Project: Evaluate expressions into new columns
//! - Aggregate: Group by and aggregation functions, partitioned and merged
//! - Distinct: First-seen duplicate elimination
//! - Join: Hash join (inner and left outer)
//! - Sort: Order results by keys
//! - Limit: Skip and limit rows
//! - Gather: Run partition pipelines in parallel, yield in partition order
//! - Pivot: Expand positional bucket lists into wide rows
//! - Unpivot: Fold column families into long rows

mod aggregate;
mod distinct;
mod filter;
mod gather;
mod join;
mod limit;
mod pivot;
mod project;
mod scan;
mod sort;
mod unpivot;
mod values;

pub use aggregate::{
    AggregateExpr, AggregateFunction, AggregateState, AggregationTable, HashAggregateOperator,
};
pub use distinct::DistinctOperator;
pub use filter::{ExpressionPredicate, FilterOperator, Predicate};
pub use gather::GatherOperator;
pub use join::{HashJoinOperator, JoinType};
pub use limit::LimitOperator;
pub use pivot::PivotOperator;
pub use project::ProjectOperator;
pub use scan::ScanOperator;
pub use sort::{SortDirection, SortKey, SortOperator};
pub use unpivot::{FoldFamily, UnpivotOperator};
pub use values::ValuesOperator;

use reshape_common::types::Value;
use thiserror::Error;

use super::DataChunk;

/// Result of executing an operator.
pub type OperatorResult = Result<Option<DataChunk>, OperatorError>;

/// Error during operator execution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperatorError {
    /// Type mismatch during execution.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected type name.
        expected: String,
        /// Found type name.
        found: String,
    },
    /// Column not found.
    #[error("column not found: {0}")]
    ColumnNotFound(String),
    /// Integer arithmetic overflowed.
    #[error("numeric overflow: {0}")]
    Overflow(String),
    /// The query was cancelled.
    #[error("query cancelled")]
    Cancelled,
    /// Execution error.
    #[error("execution error: {0}")]
    Execution(String),
}

/// Trait for physical operators.
pub trait Operator: Send + Sync {
    /// Returns the next chunk of data, or None if exhausted.
    fn next(&mut self) -> OperatorResult;

    /// Resets the operator to its initial state.
    fn reset(&mut self);

    /// Returns the name of this operator for debugging.
    fn name(&self) -> &'static str;
}

/// Pulls every chunk from `op` and materializes the visible rows.
pub fn collect_rows(op: &mut dyn Operator) -> Result<Vec<Vec<Value>>, OperatorError> {
    let mut rows = Vec::new();
    while let Some(chunk) = op.next()? {
        rows.extend(chunk.rows());
    }
    Ok(rows)
}

impl From<OperatorError> for reshape_common::Error {
    fn from(err: OperatorError) -> Self {
        match err {
            OperatorError::TypeMismatch { expected, found } => Self::TypeMismatch { expected, found },
            OperatorError::ColumnNotFound(name) => Self::ColumnNotFound(name),
            OperatorError::Overflow(msg) => Self::Overflow(msg),
            OperatorError::Cancelled => Self::Cancelled,
            OperatorError::Execution(msg) => Self::Execution(msg),
        }
    }
}
