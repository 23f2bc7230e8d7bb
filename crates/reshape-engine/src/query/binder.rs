//! Name resolution.
//!
//! Turns logical expressions, which refer to columns by name, into
//! executable [`Expr`]s that refer to columns by position in an input
//! [`Schema`].

use reshape_common::types::{LogicalType, Schema};
use reshape_common::utils::error::{Error, Result};
use reshape_core::execution::operators::{
    AggregateExpr as PhysicalAggregate, AggregateFunction as PhysicalFunction,
};
use reshape_core::execution::{Expr, ScalarFunction};

use super::plan::{AggregateExpr, AggregateFunction, LogicalExpression};

/// Resolves `name` to its position in `schema`.
///
/// # Errors
///
/// Returns `ColumnNotFound` if no column has that name.
pub fn resolve_column(schema: &Schema, name: &str) -> Result<usize> {
    schema
        .index_of(name)
        .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
}

/// Binds an expression against `schema`.
///
/// # Errors
///
/// Returns `ColumnNotFound` for unknown columns and `Planning` for unknown
/// functions.
pub fn bind_expression(expr: &LogicalExpression, schema: &Schema) -> Result<Expr> {
    Ok(match expr {
        LogicalExpression::Column(name) => Expr::Column(resolve_column(schema, name)?),
        LogicalExpression::Literal(value) => Expr::Literal(value.clone()),
        LogicalExpression::Binary { left, op, right } => Expr::binary(
            bind_expression(left, schema)?,
            *op,
            bind_expression(right, schema)?,
        ),
        LogicalExpression::Unary { op, operand } => {
            Expr::unary(*op, bind_expression(operand, schema)?)
        }
        LogicalExpression::FunctionCall { name, args } => {
            let function = ScalarFunction::from_name(name)
                .ok_or_else(|| Error::Planning(format!("unknown function: {name}")))?;
            Expr::Function {
                function,
                args: bind_all(args, schema)?,
            }
        }
        LogicalExpression::Cast { expr, to } => Expr::Cast {
            expr: Box::new(bind_expression(expr, schema)?),
            to: to.clone(),
        },
        LogicalExpression::DomainIndex { args, domain } => {
            if args.len() != domain.arity() {
                return Err(Error::Internal(format!(
                    "pivot slot has {} arguments for a domain of arity {}",
                    args.len(),
                    domain.arity()
                )));
            }
            Expr::DomainIndex {
                args: bind_all(args, schema)?,
                domain: domain.clone(),
            }
        }
    })
}

fn bind_all(args: &[LogicalExpression], schema: &Schema) -> Result<Vec<Expr>> {
    args.iter().map(|a| bind_expression(a, schema)).collect()
}

/// Binds an aggregate against `schema`.
///
/// # Errors
///
/// Returns an error if an argument does not bind, or if an aggregate other
/// than `count` has no argument.
pub fn bind_aggregate(agg: &AggregateExpr, schema: &Schema) -> Result<PhysicalAggregate> {
    let input = agg
        .expression
        .as_ref()
        .map(|e| bind_expression(e, schema))
        .transpose()?;

    let bound = match (agg.function, input) {
        (AggregateFunction::Count, None) => PhysicalAggregate::count_star(),
        (AggregateFunction::PositionalList { len }, Some(input)) => {
            let position = agg
                .position
                .as_ref()
                .ok_or_else(|| Error::Internal("positional_list without a slot".to_string()))?;
            PhysicalAggregate::positional_list(input, bind_expression(position, schema)?, len)
        }
        (function, Some(input)) => PhysicalAggregate::new(convert_aggregate_function(function), input),
        (function, None) => {
            return Err(Error::Planning(format!(
                "aggregate {} requires an argument",
                function.name()
            )));
        }
    };
    Ok(bound.with_distinct(agg.distinct))
}

/// Converts a logical aggregate function to its physical counterpart.
#[must_use]
pub fn convert_aggregate_function(function: AggregateFunction) -> PhysicalFunction {
    match function {
        AggregateFunction::Count => PhysicalFunction::Count,
        AggregateFunction::Sum => PhysicalFunction::Sum,
        AggregateFunction::Avg => PhysicalFunction::Avg,
        AggregateFunction::Min => PhysicalFunction::Min,
        AggregateFunction::Max => PhysicalFunction::Max,
        AggregateFunction::First => PhysicalFunction::First,
        AggregateFunction::List => PhysicalFunction::List,
        AggregateFunction::PositionalList { len } => PhysicalFunction::PositionalList { len },
    }
}

/// Result type of `expr` over `schema`.
///
/// # Errors
///
/// Returns an error if the expression does not bind.
pub fn expression_type(expr: &LogicalExpression, schema: &Schema) -> Result<LogicalType> {
    Ok(bind_expression(expr, schema)?.output_type(&schema.types()))
}
