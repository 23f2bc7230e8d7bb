//! Physical expressions evaluated against chunk rows.

use std::cmp::Ordering;
use std::sync::Arc;

use reshape_common::types::{Domain, DomainTuple, LogicalType, Value};

use super::DataChunk;
use super::operators::OperatorError;

/// Binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// Equality comparison (=).
    Eq,
    /// Inequality comparison (<>).
    Ne,
    /// Less than (<).
    Lt,
    /// Less than or equal (<=).
    Le,
    /// Greater than (>).
    Gt,
    /// Greater than or equal (>=).
    Ge,
    /// Logical AND.
    And,
    /// Logical OR.
    Or,
    /// Addition (+).
    Add,
    /// Subtraction (-).
    Sub,
    /// Multiplication (*).
    Mul,
    /// Division (/).
    Div,
    /// Modulo (%).
    Mod,
    /// String concatenation (||).
    Concat,
}

impl BinaryOp {
    fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }
}

/// Unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical NOT.
    Not,
    /// Numeric negation.
    Neg,
    /// IS NULL check.
    IsNull,
    /// IS NOT NULL check.
    IsNotNull,
}

/// Built-in scalar functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarFunction {
    /// Lower-cases a string.
    Lower,
    /// Upper-cases a string.
    Upper,
    /// Character length of a string or element count of a list.
    Length,
    /// Absolute value.
    Abs,
    /// First non-NULL argument.
    Coalesce,
    /// Concatenation of the non-NULL arguments' text.
    Concat,
}

impl ScalarFunction {
    /// Looks a function up by its SQL name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "lower" => Some(Self::Lower),
            "upper" => Some(Self::Upper),
            "length" | "len" => Some(Self::Length),
            "abs" => Some(Self::Abs),
            "coalesce" => Some(Self::Coalesce),
            "concat" => Some(Self::Concat),
            _ => None,
        }
    }
}

/// A bound expression over the columns of an input chunk.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Input column by position.
    Column(usize),
    /// Constant.
    Literal(Value),
    /// Binary operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Unary operation.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },
    /// Scalar function call.
    Function {
        /// Function.
        function: ScalarFunction,
        /// Arguments.
        args: Vec<Expr>,
    },
    /// Type cast.
    Cast {
        /// Expression to cast.
        expr: Box<Expr>,
        /// Target type.
        to: LogicalType,
    },
    /// Position of the argument tuple in a pivot domain, or NULL if the
    /// tuple is not a member.
    DomainIndex {
        /// One expression per domain component.
        args: Vec<Expr>,
        /// The bound domain.
        domain: Arc<Domain>,
    },
}

impl Expr {
    /// Builds a binary expression.
    #[must_use]
    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Builds a unary expression.
    #[must_use]
    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Evaluates the expression for physical row `row` of `chunk`.
    pub fn evaluate(&self, chunk: &DataChunk, row: usize) -> Result<Value, OperatorError> {
        match self {
            Self::Column(index) => {
                let column = chunk
                    .column(*index)
                    .ok_or_else(|| OperatorError::ColumnNotFound(format!("column {index}")))?;
                Ok(column.get_value(row).unwrap_or_default())
            }
            Self::Literal(value) => Ok(value.clone()),
            Self::Binary { op, left, right } => {
                let l = left.evaluate(chunk, row)?;
                let r = right.evaluate(chunk, row)?;
                eval_binary(*op, &l, &r)
            }
            Self::Unary { op, operand } => eval_unary(*op, operand.evaluate(chunk, row)?),
            Self::Function { function, args } => {
                let values = args
                    .iter()
                    .map(|a| a.evaluate(chunk, row))
                    .collect::<Result<Vec<_>, _>>()?;
                eval_function(*function, values)
            }
            Self::Cast { expr, to } => {
                let value = expr.evaluate(chunk, row)?;
                value.cast(to).ok_or_else(|| OperatorError::TypeMismatch {
                    expected: to.to_string(),
                    found: value.to_string(),
                })
            }
            Self::DomainIndex { args, domain } => {
                let tuple = args
                    .iter()
                    .map(|a| a.evaluate(chunk, row))
                    .collect::<Result<DomainTuple, _>>()?;
                Ok(domain
                    .position_of(&tuple)
                    .map_or(Value::Null, |pos| Value::Int64(pos as i64)))
            }
        }
    }

    /// Infers the result type given the input column types.
    #[must_use]
    pub fn output_type(&self, input: &[LogicalType]) -> LogicalType {
        match self {
            Self::Column(index) => input.get(*index).cloned().unwrap_or(LogicalType::Any),
            Self::Literal(value) => value.logical_type(),
            Self::Binary { op, left, right } => {
                if op.is_comparison() || matches!(op, BinaryOp::And | BinaryOp::Or) {
                    return LogicalType::Bool;
                }
                if *op == BinaryOp::Concat {
                    return LogicalType::String;
                }
                match (left.output_type(input), right.output_type(input)) {
                    (LogicalType::Int64, LogicalType::Int64) => LogicalType::Int64,
                    (l, r) if l.is_numeric() && r.is_numeric() => LogicalType::Float64,
                    (LogicalType::Null, t) | (t, LogicalType::Null) if t.is_numeric() => t,
                    _ => LogicalType::Any,
                }
            }
            Self::Unary { op, operand } => match op {
                UnaryOp::Neg => operand.output_type(input),
                UnaryOp::Not | UnaryOp::IsNull | UnaryOp::IsNotNull => LogicalType::Bool,
            },
            Self::Function { function, args } => match function {
                ScalarFunction::Lower | ScalarFunction::Upper | ScalarFunction::Concat => {
                    LogicalType::String
                }
                ScalarFunction::Length => LogicalType::Int64,
                ScalarFunction::Abs => args
                    .first()
                    .map_or(LogicalType::Any, |a| a.output_type(input)),
                ScalarFunction::Coalesce => args
                    .iter()
                    .map(|a| a.output_type(input))
                    .try_fold(LogicalType::Null, |acc, t| acc.common_supertype(&t))
                    .unwrap_or(LogicalType::Any),
            },
            Self::Cast { to, .. } => to.clone(),
            Self::DomainIndex { .. } => LogicalType::Int64,
        }
    }
}

fn type_error(expected: &str, found: &Value) -> OperatorError {
    OperatorError::TypeMismatch {
        expected: expected.to_string(),
        found: found.type_name().to_string(),
    }
}

fn eval_binary(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, OperatorError> {
    match op {
        BinaryOp::And => match (l, r) {
            (Value::Bool(false), _) | (_, Value::Bool(false)) => Ok(Value::Bool(false)),
            (Value::Bool(true), Value::Bool(true)) => Ok(Value::Bool(true)),
            (Value::Null | Value::Bool(_), Value::Null | Value::Bool(_)) => Ok(Value::Null),
            (Value::Bool(_) | Value::Null, other) | (other, _) => Err(type_error("BOOLEAN", other)),
        },
        BinaryOp::Or => match (l, r) {
            (Value::Bool(true), _) | (_, Value::Bool(true)) => Ok(Value::Bool(true)),
            (Value::Bool(false), Value::Bool(false)) => Ok(Value::Bool(false)),
            (Value::Null | Value::Bool(_), Value::Null | Value::Bool(_)) => Ok(Value::Null),
            (Value::Bool(_) | Value::Null, other) | (other, _) => Err(type_error("BOOLEAN", other)),
        },
        _ if l.is_null() || r.is_null() => Ok(Value::Null),
        op if op.is_comparison() => {
            let comparable = matches!(
                (l, r),
                (
                    Value::Int64(_) | Value::Float64(_),
                    Value::Int64(_) | Value::Float64(_)
                ) | (Value::Bool(_), Value::Bool(_))
                    | (Value::String(_), Value::String(_))
                    | (Value::List(_), Value::List(_))
            );
            if !comparable {
                return Err(OperatorError::TypeMismatch {
                    expected: l.type_name().to_string(),
                    found: r.type_name().to_string(),
                });
            }
            let ord = l.total_cmp(r);
            let result = match op {
                BinaryOp::Eq => ord == Ordering::Equal,
                BinaryOp::Ne => ord != Ordering::Equal,
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::Le => ord != Ordering::Greater,
                BinaryOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::Concat => Ok(Value::from(format!("{l}{r}"))),
        _ => eval_arithmetic(op, l, r),
    }
}

fn eval_arithmetic(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, OperatorError> {
    if let (Value::Int64(a), Value::Int64(b)) = (l, r) {
        let (a, b) = (*a, *b);
        let result = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Div if b == 0 => return Ok(Value::Null),
            BinaryOp::Div => a.checked_div(b),
            BinaryOp::Mod if b == 0 => return Ok(Value::Null),
            BinaryOp::Mod => a.checked_rem(b),
            _ => return Err(OperatorError::Execution(format!("{op:?} is not arithmetic"))),
        };
        return result
            .map(Value::Int64)
            .ok_or_else(|| OperatorError::Overflow(format!("{a} {op:?} {b}")));
    }

    let a = l.to_f64().ok_or_else(|| type_error("numeric", l))?;
    let b = r.to_f64().ok_or_else(|| type_error("numeric", r))?;
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div if b == 0.0 => return Ok(Value::Null),
        BinaryOp::Div => a / b,
        BinaryOp::Mod if b == 0.0 => return Ok(Value::Null),
        BinaryOp::Mod => a % b,
        _ => return Err(OperatorError::Execution(format!("{op:?} is not arithmetic"))),
    };
    Ok(Value::Float64(result))
}

fn eval_unary(op: UnaryOp, value: Value) -> Result<Value, OperatorError> {
    match op {
        UnaryOp::IsNull => Ok(Value::Bool(value.is_null())),
        UnaryOp::IsNotNull => Ok(Value::Bool(!value.is_null())),
        UnaryOp::Not => match value {
            Value::Null => Ok(Value::Null),
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(type_error("BOOLEAN", &other)),
        },
        UnaryOp::Neg => match value {
            Value::Null => Ok(Value::Null),
            Value::Int64(i) => i
                .checked_neg()
                .map(Value::Int64)
                .ok_or_else(|| OperatorError::Overflow(format!("-({i})"))),
            Value::Float64(f) => Ok(Value::Float64(-f)),
            other => Err(type_error("numeric", &other)),
        },
    }
}

fn eval_function(function: ScalarFunction, args: Vec<Value>) -> Result<Value, OperatorError> {
    let first = || args.first().cloned().unwrap_or_default();
    match function {
        ScalarFunction::Coalesce => Ok(args.into_iter().find(|v| !v.is_null()).unwrap_or_default()),
        ScalarFunction::Concat => Ok(Value::from(
            args.iter()
                .filter(|v| !v.is_null())
                .map(ToString::to_string)
                .collect::<String>(),
        )),
        ScalarFunction::Lower | ScalarFunction::Upper => match first() {
            Value::Null => Ok(Value::Null),
            Value::String(s) => Ok(Value::from(if function == ScalarFunction::Lower {
                s.to_lowercase()
            } else {
                s.to_uppercase()
            })),
            other => Err(type_error("VARCHAR", &other)),
        },
        ScalarFunction::Length => match first() {
            Value::Null => Ok(Value::Null),
            Value::String(s) => Ok(Value::Int64(s.chars().count() as i64)),
            Value::List(items) => Ok(Value::Int64(items.len() as i64)),
            other => Err(type_error("VARCHAR", &other)),
        },
        ScalarFunction::Abs => match first() {
            Value::Null => Ok(Value::Null),
            Value::Int64(i) => i
                .checked_abs()
                .map(Value::Int64)
                .ok_or_else(|| OperatorError::Overflow(format!("abs({i})"))),
            Value::Float64(f) => Ok(Value::Float64(f.abs())),
            other => Err(type_error("numeric", &other)),
        },
    }
}
