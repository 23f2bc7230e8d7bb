//! Logical query plan representation.
//!
//! The logical plan is the intermediate representation handed to the
//! planner. PIVOT and UNPIVOT are ordinary operators in the tree and can be
//! nested under, or on top of, any other operator.

use std::fmt;
use std::sync::Arc;

use reshape_common::types::{Domain, LogicalType, Schema, Value};

pub use reshape_core::execution::{BinaryOp, UnaryOp};

/// A logical query plan.
#[derive(Debug, Clone)]
pub struct LogicalPlan {
    /// The root operator of the plan.
    pub root: LogicalOperator,
}

impl LogicalPlan {
    /// Creates a new logical plan with the given root operator.
    #[must_use]
    pub fn new(root: LogicalOperator) -> Self {
        Self { root }
    }
}

impl From<LogicalOperator> for LogicalPlan {
    fn from(root: LogicalOperator) -> Self {
        Self::new(root)
    }
}

/// A logical operator in the query plan.
#[derive(Debug, Clone)]
pub enum LogicalOperator {
    /// Scan a catalog table.
    Scan(ScanOp),

    /// Inline rows.
    Values(ValuesOp),

    /// Filter rows based on a predicate.
    Filter(FilterOp),

    /// Compute output columns.
    Project(ProjectOp),

    /// Aggregate with grouping.
    Aggregate(AggregateOp),

    /// Sort results.
    Sort(SortOp),

    /// Skip and limit results.
    Limit(LimitOp),

    /// Join two inputs.
    Join(JoinOp),

    /// Remove duplicate results.
    Distinct(DistinctOp),

    /// Long-to-wide reshape with a data-dependent output schema.
    Pivot(PivotOp),

    /// Wide-to-long reshape.
    Unpivot(UnpivotOp),

    /// Expansion of bucket lists into pivot cells. Produced by the pivot
    /// rewrite; not meant to be built by hand.
    PivotExpand(PivotExpandOp),
}

impl LogicalOperator {
    /// Scans the named table.
    #[must_use]
    pub fn scan(table: impl Into<String>) -> Self {
        Self::Scan(ScanOp {
            table: table.into(),
        })
    }

    /// Inline rows with the given schema.
    #[must_use]
    pub fn values(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self::Values(ValuesOp { schema, rows })
    }

    /// Keeps rows where `predicate` is true.
    #[must_use]
    pub fn filter(self, predicate: LogicalExpression) -> Self {
        Self::Filter(FilterOp {
            predicate,
            input: Box::new(self),
        })
    }

    /// Computes the given projections.
    #[must_use]
    pub fn project(self, projections: Vec<Projection>) -> Self {
        Self::Project(ProjectOp {
            projections,
            input: Box::new(self),
        })
    }

    /// Groups by `group_by` and computes `aggregates`.
    #[must_use]
    pub fn aggregate(self, group_by: Vec<LogicalExpression>, aggregates: Vec<AggregateExpr>) -> Self {
        Self::Aggregate(AggregateOp {
            group_by,
            aggregates,
            input: Box::new(self),
        })
    }

    /// Sorts by the given keys.
    #[must_use]
    pub fn sort(self, keys: Vec<SortKey>) -> Self {
        Self::Sort(SortOp {
            keys,
            input: Box::new(self),
        })
    }

    /// Keeps at most `count` rows.
    #[must_use]
    pub fn limit(self, count: usize) -> Self {
        Self::Limit(LimitOp {
            offset: 0,
            count: Some(count),
            input: Box::new(self),
        })
    }

    /// Removes duplicate rows.
    #[must_use]
    pub fn distinct(self) -> Self {
        Self::Distinct(DistinctOp {
            input: Box::new(self),
        })
    }

    /// Equi-joins with `right` on pairs of (left column, right column).
    #[must_use]
    pub fn join(self, right: LogicalOperator, join_type: JoinType, on: &[(&str, &str)]) -> Self {
        Self::Join(JoinOp {
            left: Box::new(self),
            right: Box::new(right),
            join_type,
            conditions: on
                .iter()
                .map(|(l, r)| JoinCondition {
                    left: (*l).to_string(),
                    right: (*r).to_string(),
                })
                .collect(),
        })
    }
}

/// Scan a catalog table.
#[derive(Debug, Clone)]
pub struct ScanOp {
    /// Table name.
    pub table: String,
}

/// Inline rows.
#[derive(Debug, Clone)]
pub struct ValuesOp {
    /// Schema of the rows.
    pub schema: Schema,
    /// The rows.
    pub rows: Vec<Vec<Value>>,
}

/// Filter rows based on a predicate.
#[derive(Debug, Clone)]
pub struct FilterOp {
    /// The filter predicate.
    pub predicate: LogicalExpression,
    /// Input operator.
    pub input: Box<LogicalOperator>,
}

/// Compute output columns.
#[derive(Debug, Clone)]
pub struct ProjectOp {
    /// Columns to project.
    pub projections: Vec<Projection>,
    /// Input operator.
    pub input: Box<LogicalOperator>,
}

/// A single projection.
#[derive(Debug, Clone)]
pub struct Projection {
    /// Expression to compute.
    pub expression: LogicalExpression,
    /// Output name; defaults to the expression's canonical text.
    pub alias: Option<String>,
}

impl Projection {
    /// Projects a column under its own name.
    #[must_use]
    pub fn column(name: impl Into<String>) -> Self {
        Self {
            expression: LogicalExpression::column(name),
            alias: None,
        }
    }

    /// Projects an expression under `alias`.
    #[must_use]
    pub fn aliased(expression: LogicalExpression, alias: impl Into<String>) -> Self {
        Self {
            expression,
            alias: Some(alias.into()),
        }
    }

    /// Output column name.
    #[must_use]
    pub fn output_name(&self) -> String {
        self.alias
            .clone()
            .unwrap_or_else(|| self.expression.to_string())
    }
}

/// Aggregate with grouping.
#[derive(Debug, Clone)]
pub struct AggregateOp {
    /// Group by expressions.
    pub group_by: Vec<LogicalExpression>,
    /// Aggregate functions.
    pub aggregates: Vec<AggregateExpr>,
    /// Input operator.
    pub input: Box<LogicalOperator>,
}

/// An aggregate expression.
#[derive(Debug, Clone)]
pub struct AggregateExpr {
    /// Aggregate function.
    pub function: AggregateFunction,
    /// Expression to aggregate. `None` with `Count` means `count(*)`.
    pub expression: Option<LogicalExpression>,
    /// Slot index argument of `PositionalList`.
    pub position: Option<LogicalExpression>,
    /// Whether to use DISTINCT.
    pub distinct: bool,
    /// Alias for the result.
    pub alias: Option<String>,
}

impl AggregateExpr {
    /// Creates `function(expression)`.
    #[must_use]
    pub fn new(function: AggregateFunction, expression: LogicalExpression) -> Self {
        Self {
            function,
            expression: Some(expression),
            position: None,
            distinct: false,
            alias: None,
        }
    }

    /// Creates `count(*)`.
    #[must_use]
    pub fn count_star() -> Self {
        Self {
            function: AggregateFunction::Count,
            expression: None,
            position: None,
            distinct: false,
            alias: None,
        }
    }

    /// Shorthand for `sum(column)`.
    #[must_use]
    pub fn sum(column: impl Into<String>) -> Self {
        Self::new(AggregateFunction::Sum, LogicalExpression::column(column))
    }

    /// Creates a positional list writing `expression` at `position`.
    #[must_use]
    pub fn positional_list(
        expression: LogicalExpression,
        position: LogicalExpression,
        len: usize,
    ) -> Self {
        Self {
            function: AggregateFunction::PositionalList { len },
            expression: Some(expression),
            position: Some(position),
            distinct: false,
            alias: None,
        }
    }

    /// Sets the DISTINCT modifier.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Sets the alias.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Output column name: the alias, or the canonical text.
    #[must_use]
    pub fn output_name(&self) -> String {
        self.alias.clone().unwrap_or_else(|| self.to_string())
    }
}

impl fmt::Display for AggregateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.function.name())?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        match &self.expression {
            Some(expr) => write!(f, "{expr}")?,
            None => write!(f, "*")?,
        }
        if let Some(position) = &self.position {
            write!(f, ", {position}")?;
        }
        write!(f, ")")
    }
}

/// Aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    /// Count rows (`count(*)`) or non-NULL values.
    Count,
    /// Sum values.
    Sum,
    /// Average values.
    Avg,
    /// Minimum value.
    Min,
    /// Maximum value.
    Max,
    /// First value.
    First,
    /// Collect into list.
    List,
    /// Fixed-length list indexed by a slot argument.
    PositionalList {
        /// List length.
        len: usize,
    },
}

impl AggregateFunction {
    /// SQL name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::First => "first",
            Self::List => "list",
            Self::PositionalList { .. } => "positional_list",
        }
    }

    /// Looks a user-facing aggregate up by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(Self::Count),
            "sum" => Some(Self::Sum),
            "avg" | "mean" => Some(Self::Avg),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "first" => Some(Self::First),
            "list" => Some(Self::List),
            _ => None,
        }
    }
}

/// Sort results.
#[derive(Debug, Clone)]
pub struct SortOp {
    /// Sort keys, most significant first.
    pub keys: Vec<SortKey>,
    /// Input operator.
    pub input: Box<LogicalOperator>,
}

/// A sort key.
#[derive(Debug, Clone)]
pub struct SortKey {
    /// Column to sort by.
    pub column: String,
    /// Direction.
    pub order: SortOrder,
}

impl SortKey {
    /// Ascending key.
    #[must_use]
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: SortOrder::Ascending,
        }
    }

    /// Descending key.
    #[must_use]
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: SortOrder::Descending,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending.
    Ascending,
    /// Descending.
    Descending,
}

/// Skip and limit results.
#[derive(Debug, Clone)]
pub struct LimitOp {
    /// Rows to skip.
    pub offset: usize,
    /// Maximum rows to return.
    pub count: Option<usize>,
    /// Input operator.
    pub input: Box<LogicalOperator>,
}

/// Join two inputs.
#[derive(Debug, Clone)]
pub struct JoinOp {
    /// Left (probe) input.
    pub left: Box<LogicalOperator>,
    /// Right (build) input.
    pub right: Box<LogicalOperator>,
    /// Join type.
    pub join_type: JoinType,
    /// Equality conditions.
    pub conditions: Vec<JoinCondition>,
}

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// Inner join.
    Inner,
    /// Left outer join.
    Left,
}

/// An equality join condition between two columns.
#[derive(Debug, Clone)]
pub struct JoinCondition {
    /// Left column.
    pub left: String,
    /// Right column.
    pub right: String,
}

/// Remove duplicate results.
#[derive(Debug, Clone)]
pub struct DistinctOp {
    /// Input operator.
    pub input: Box<LogicalOperator>,
}

/// A PIVOT request.
///
/// At least one of `on`, `using` and `group_by` must be present.
#[derive(Debug, Clone)]
pub struct PivotOp {
    /// Source relation.
    pub input: Box<LogicalOperator>,
    /// Expressions whose values become columns. `None` degenerates into a
    /// grouped aggregation.
    pub on: Option<Vec<PivotOn>>,
    /// Aggregates computed per cell. Empty means `count(*)`.
    pub using: Vec<AggregateExpr>,
    /// Grouping expressions. `None` groups by every source column not
    /// referenced by `on` or `using`.
    pub group_by: Option<Vec<LogicalExpression>>,
}

impl PivotOp {
    /// Starts a pivot over `input`.
    #[must_use]
    pub fn new(input: LogicalOperator) -> Self {
        Self {
            input: Box::new(input),
            on: None,
            using: Vec::new(),
            group_by: None,
        }
    }

    /// Adds an `on` expression whose values are discovered by scanning.
    #[must_use]
    pub fn on(self, expression: LogicalExpression) -> Self {
        self.push_on(PivotOn::new(expression))
    }

    /// Adds an `on` expression with an explicit value list.
    #[must_use]
    pub fn on_in<V: Into<Value>>(
        self,
        expression: LogicalExpression,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(|v| PivotValue::new(v.into())).collect();
        self.push_on(PivotOn::new(expression).with_values(values))
    }

    /// Adds a fully specified `on` entry.
    #[must_use]
    pub fn on_entry(self, on: PivotOn) -> Self {
        self.push_on(on)
    }

    /// Replaces the whole `on` clause.
    #[must_use]
    pub fn with_on(mut self, on: Option<Vec<PivotOn>>) -> Self {
        self.on = on;
        self
    }

    /// Adds a using aggregate.
    #[must_use]
    pub fn using(mut self, aggregate: AggregateExpr) -> Self {
        self.using.push(aggregate);
        self
    }

    /// Adds an explicit grouping expression.
    #[must_use]
    pub fn group_by(mut self, expression: LogicalExpression) -> Self {
        self.group_by.get_or_insert_with(Vec::new).push(expression);
        self
    }

    /// Finishes the request.
    #[must_use]
    pub fn build(self) -> LogicalOperator {
        LogicalOperator::Pivot(self)
    }

    fn push_on(mut self, on: PivotOn) -> Self {
        self.on.get_or_insert_with(Vec::new).push(on);
        self
    }
}

/// One `on` entry of a PIVOT.
#[derive(Debug, Clone)]
pub struct PivotOn {
    /// Expression whose values become columns.
    pub expression: LogicalExpression,
    /// Explicit `IN` list. Values outside it contribute to no column.
    pub values: Option<Vec<PivotValue>>,
    /// Ordering of this component within the domain.
    pub order: Option<SortOrder>,
}

impl PivotOn {
    /// Creates an entry without explicit values.
    #[must_use]
    pub fn new(expression: LogicalExpression) -> Self {
        Self {
            expression,
            values: None,
            order: None,
        }
    }

    /// Sets the explicit `IN` list.
    #[must_use]
    pub fn with_values(mut self, values: Vec<PivotValue>) -> Self {
        self.values = Some(values);
        self
    }

    /// Sets the ordering.
    #[must_use]
    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }
}

/// An explicit pivot value with an optional column alias.
#[derive(Debug, Clone)]
pub struct PivotValue {
    /// The value.
    pub value: Value,
    /// Column name used instead of the rendered value.
    pub alias: Option<String>,
}

impl PivotValue {
    /// An unaliased value.
    #[must_use]
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            alias: None,
        }
    }

    /// An aliased value.
    #[must_use]
    pub fn aliased(value: impl Into<Value>, alias: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            alias: Some(alias.into()),
        }
    }
}

/// An UNPIVOT request.
#[derive(Debug, Clone)]
pub struct UnpivotOp {
    /// Source relation.
    pub input: Box<LogicalOperator>,
    /// Columns to fold.
    pub fold: FoldSpec,
    /// Name of the produced label column.
    pub name_column: String,
    /// Names of the produced value columns, one per family.
    pub value_columns: Vec<String>,
    /// Emit rows whose folded values are all NULL.
    pub include_nulls: bool,
}

impl UnpivotOp {
    /// Folds the given families.
    #[must_use]
    pub fn new(
        input: LogicalOperator,
        families: Vec<Vec<FoldColumn>>,
        name_column: impl Into<String>,
        value_columns: Vec<String>,
    ) -> Self {
        Self {
            input: Box::new(input),
            fold: FoldSpec::Families(families),
            name_column: name_column.into(),
            value_columns,
            include_nulls: false,
        }
    }

    /// Folds every column except `keep` into one value column.
    #[must_use]
    pub fn all_except(
        input: LogicalOperator,
        keep: Vec<String>,
        name_column: impl Into<String>,
        value_column: impl Into<String>,
    ) -> Self {
        Self {
            input: Box::new(input),
            fold: FoldSpec::AllExcept(keep),
            name_column: name_column.into(),
            value_columns: vec![value_column.into()],
            include_nulls: false,
        }
    }

    /// Sets the null policy.
    #[must_use]
    pub fn include_nulls(mut self, include: bool) -> Self {
        self.include_nulls = include;
        self
    }

    /// Finishes the request.
    #[must_use]
    pub fn build(self) -> LogicalOperator {
        LogicalOperator::Unpivot(self)
    }
}

/// Which columns an UNPIVOT folds.
#[derive(Debug, Clone)]
pub enum FoldSpec {
    /// Equal-length families; family `k` feeds value column `k`.
    Families(Vec<Vec<FoldColumn>>),
    /// Every column not listed, as a single family.
    AllExcept(Vec<String>),
}

/// A folded column with an optional label.
#[derive(Debug, Clone)]
pub struct FoldColumn {
    /// Source column name.
    pub column: String,
    /// Label emitted in the name column.
    pub label: Option<String>,
}

impl FoldColumn {
    /// An unlabeled column.
    #[must_use]
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            label: None,
        }
    }

    /// A labeled column.
    #[must_use]
    pub fn labeled(column: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            label: Some(label.into()),
        }
    }
}

impl From<&str> for FoldColumn {
    fn from(column: &str) -> Self {
        Self::new(column)
    }
}

/// Bucket-list expansion produced by the pivot rewrite.
#[derive(Debug, Clone)]
pub struct PivotExpandOp {
    /// Input producing group columns followed by one list per using.
    pub input: Box<LogicalOperator>,
    /// Number of leading group columns.
    pub group_count: usize,
    /// Number of list columns.
    pub using_count: usize,
    /// Length of every list.
    pub domain_len: usize,
    /// Output column names.
    pub names: Vec<String>,
}

/// A logical expression.
#[derive(Debug, Clone)]
pub enum LogicalExpression {
    /// Column reference by name.
    Column(String),

    /// Literal value.
    Literal(Value),

    /// Binary operation.
    Binary {
        /// Left operand.
        left: Box<LogicalExpression>,
        /// Operator.
        op: BinaryOp,
        /// Right operand.
        right: Box<LogicalExpression>,
    },

    /// Unary operation.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<LogicalExpression>,
    },

    /// Function call.
    FunctionCall {
        /// Function name.
        name: String,
        /// Arguments.
        args: Vec<LogicalExpression>,
    },

    /// Type cast.
    Cast {
        /// Expression to cast.
        expr: Box<LogicalExpression>,
        /// Target type.
        to: LogicalType,
    },

    /// Domain position of the argument tuple, or NULL.
    DomainIndex {
        /// One argument per domain component.
        args: Vec<LogicalExpression>,
        /// The bound domain.
        domain: Arc<Domain>,
    },
}

impl LogicalExpression {
    /// Column reference.
    #[must_use]
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    /// Literal.
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Binary expression.
    #[must_use]
    pub fn binary(left: LogicalExpression, op: BinaryOp, right: LogicalExpression) -> Self {
        Self::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Function call.
    #[must_use]
    pub fn call(name: impl Into<String>, args: Vec<LogicalExpression>) -> Self {
        Self::FunctionCall {
            name: name.into(),
            args,
        }
    }

    /// `self = other`.
    #[must_use]
    pub fn eq(self, other: LogicalExpression) -> Self {
        Self::binary(self, BinaryOp::Eq, other)
    }

    /// `self IS NOT NULL`.
    #[must_use]
    pub fn is_not_null(self) -> Self {
        Self::Unary {
            op: UnaryOp::IsNotNull,
            operand: Box::new(self),
        }
    }

    /// Appends every column name this expression references.
    pub fn collect_columns(&self, out: &mut Vec<String>) {
        match self {
            Self::Column(name) => out.push(name.clone()),
            Self::Literal(_) => {}
            Self::Binary { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Self::Unary { operand, .. } => operand.collect_columns(out),
            Self::Cast { expr, .. } => expr.collect_columns(out),
            Self::FunctionCall { args, .. } | Self::DomainIndex { args, .. } => {
                for arg in args {
                    arg.collect_columns(out);
                }
            }
        }
    }
}

fn binary_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Eq => "=",
        BinaryOp::Ne => "<>",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::And => "AND",
        BinaryOp::Or => "OR",
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Concat => "||",
    }
}

fn fmt_operand(f: &mut fmt::Formatter<'_>, expr: &LogicalExpression) -> fmt::Result {
    if matches!(expr, LogicalExpression::Binary { .. }) {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

fn fmt_args(f: &mut fmt::Formatter<'_>, args: &[LogicalExpression]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

/// Canonical text, used for default column names and expression matching.
impl fmt::Display for LogicalExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(name) => write!(f, "{name}"),
            Self::Literal(Value::String(s)) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Literal(value) => write!(f, "{value}"),
            Self::Binary { left, op, right } => {
                fmt_operand(f, left)?;
                write!(f, " {} ", binary_symbol(*op))?;
                fmt_operand(f, right)
            }
            Self::Unary { op, operand } => match op {
                UnaryOp::Not => {
                    write!(f, "NOT ")?;
                    fmt_operand(f, operand)
                }
                UnaryOp::Neg => {
                    write!(f, "-")?;
                    fmt_operand(f, operand)
                }
                UnaryOp::IsNull => {
                    fmt_operand(f, operand)?;
                    write!(f, " IS NULL")
                }
                UnaryOp::IsNotNull => {
                    fmt_operand(f, operand)?;
                    write!(f, " IS NOT NULL")
                }
            },
            Self::FunctionCall { name, args } => {
                write!(f, "{}(", name.to_ascii_lowercase())?;
                fmt_args(f, args)?;
                write!(f, ")")
            }
            Self::Cast { expr, to } => write!(f, "CAST({expr} AS {to})"),
            Self::DomainIndex { args, .. } => {
                write!(f, "pivot_slot(")?;
                fmt_args(f, args)?;
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pivot_builder() {
        let op = PivotOp::new(LogicalOperator::scan("cities"))
            .on(LogicalExpression::column("year"))
            .using(AggregateExpr::sum("population"))
            .group_by(LogicalExpression::column("country"));

        let on = op.on.as_ref().unwrap();
        assert_eq!(on.len(), 1);
        assert!(on[0].values.is_none());
        assert_eq!(op.group_by.as_ref().unwrap().len(), 1);

        if let LogicalOperator::Pivot(pivot) = op.build() {
            if let LogicalOperator::Scan(scan) = pivot.input.as_ref() {
                assert_eq!(scan.table, "cities");
            } else {
                panic!("Expected Scan");
            }
        } else {
            panic!("Expected Pivot");
        }
    }

    #[test]
    fn test_canonical_text() {
        assert_eq!(AggregateExpr::sum("population").to_string(), "sum(population)");
        assert_eq!(AggregateExpr::count_star().to_string(), "count(*)");
        assert_eq!(
            AggregateExpr::new(AggregateFunction::Count, LogicalExpression::column("x"))
                .distinct()
                .to_string(),
            "count(DISTINCT x)"
        );

        let expr = LogicalExpression::binary(
            LogicalExpression::binary(
                LogicalExpression::column("a"),
                BinaryOp::Add,
                LogicalExpression::literal(1),
            ),
            BinaryOp::Mul,
            LogicalExpression::call("LOWER", vec![LogicalExpression::literal("it's")]),
        );
        assert_eq!(expr.to_string(), "(a + 1) * lower('it''s')");
        assert_eq!(
            LogicalExpression::column("x").is_not_null().to_string(),
            "x IS NOT NULL"
        );
    }

    #[test]
    fn test_collect_columns() {
        let expr = LogicalExpression::call(
            "coalesce",
            vec![
                LogicalExpression::column("a"),
                LogicalExpression::binary(
                    LogicalExpression::column("b"),
                    BinaryOp::Add,
                    LogicalExpression::literal(1),
                ),
            ],
        );
        let mut cols = Vec::new();
        expr.collect_columns(&mut cols);
        assert_eq!(cols, vec!["a", "b"]);
    }

    #[test]
    fn test_unpivot_builder() {
        let op = UnpivotOp::new(
            LogicalOperator::scan("sales"),
            vec![vec![FoldColumn::from("jan"), FoldColumn::labeled("feb", "February")]],
            "month",
            vec!["sales".to_string()],
        )
        .include_nulls(true);

        assert!(op.include_nulls);
        match &op.fold {
            FoldSpec::Families(families) => {
                assert_eq!(families[0][1].label.as_deref(), Some("February"));
            }
            FoldSpec::AllExcept(_) => panic!("Expected Families"),
        }
    }
}
