//! Hash aggregation with partial tables and a deterministic merge.
//!
//! Each input partition is folded into its own [`AggregationTable`]. The
//! tables are then merged in partition order, so group order is the
//! first-seen order of a sequential scan regardless of how many partitions
//! ran in parallel.

use std::cmp::Ordering;

use rayon::prelude::*;
use smallvec::SmallVec;

use super::{Operator, OperatorError, OperatorResult};
use crate::execution::{DEFAULT_CHUNK_CAPACITY, DataChunk, Expr};
use reshape_common::types::{LogicalType, Value};
use reshape_common::utils::hash::{FastIndexMap, FastIndexSet};

/// Grouping key of one aggregation group.
type GroupKey = SmallVec<[Value; 4]>;

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    /// `count(*)`: number of rows.
    CountStar,
    /// `count(x)`: number of non-NULL values.
    Count,
    /// Sum of non-NULL values. Int64 sums are overflow-checked.
    Sum,
    /// Mean of non-NULL values.
    Avg,
    /// Smallest non-NULL value.
    Min,
    /// Largest non-NULL value.
    Max,
    /// First value seen, NULL included.
    First,
    /// Every value in arrival order.
    List,
    /// A fixed-length list where each value is written at the index given
    /// by a second argument. Unwritten slots stay NULL.
    PositionalList {
        /// Length of the produced list.
        len: usize,
    },
}

impl AggregateFunction {
    /// SQL name of the function.
    #[must_use]
    pub fn sql_name(self) -> &'static str {
        match self {
            Self::CountStar | Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::First => "first",
            Self::List => "list",
            Self::PositionalList { .. } => "positional_list",
        }
    }

    /// Result type given the argument type.
    #[must_use]
    pub fn output_type(self, input: &LogicalType) -> LogicalType {
        match self {
            Self::CountStar | Self::Count => LogicalType::Int64,
            Self::Avg => LogicalType::Float64,
            Self::Sum => match input {
                LogicalType::Int64 | LogicalType::Bool => LogicalType::Int64,
                LogicalType::Float64 => LogicalType::Float64,
                _ => LogicalType::Any,
            },
            Self::Min | Self::Max | Self::First => input.clone(),
            Self::List | Self::PositionalList { .. } => LogicalType::list_of(input.clone()),
        }
    }
}

/// A bound aggregate: function, argument, and modifiers.
#[derive(Debug, Clone)]
pub struct AggregateExpr {
    /// Function to compute.
    pub function: AggregateFunction,
    /// Argument. `None` only for `count(*)`.
    pub input: Option<Expr>,
    /// Slot index argument of `positional_list`.
    pub position: Option<Expr>,
    /// Feed each distinct argument value once.
    pub distinct: bool,
}

impl AggregateExpr {
    /// Creates an aggregate over `input`.
    #[must_use]
    pub fn new(function: AggregateFunction, input: Expr) -> Self {
        Self {
            function,
            input: Some(input),
            position: None,
            distinct: false,
        }
    }

    /// Creates `count(*)`.
    #[must_use]
    pub fn count_star() -> Self {
        Self {
            function: AggregateFunction::CountStar,
            input: None,
            position: None,
            distinct: false,
        }
    }

    /// Creates a positional list aggregate writing `input` at `position`.
    #[must_use]
    pub fn positional_list(input: Expr, position: Expr, len: usize) -> Self {
        Self {
            function: AggregateFunction::PositionalList { len },
            input: Some(input),
            position: Some(position),
            distinct: false,
        }
    }

    /// Sets the DISTINCT modifier.
    #[must_use]
    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    /// Result type given the input column types.
    #[must_use]
    pub fn output_type(&self, input: &[LogicalType]) -> LogicalType {
        let arg = self
            .input
            .as_ref()
            .map_or(LogicalType::Any, |e| e.output_type(input));
        self.function.output_type(&arg)
    }

    fn initial_state(&self) -> AggregateState {
        let state = match self.function {
            AggregateFunction::CountStar | AggregateFunction::Count => AggregateState::Count(0),
            AggregateFunction::Sum => AggregateState::Sum(None),
            AggregateFunction::Avg => AggregateState::Avg { sum: 0.0, count: 0 },
            AggregateFunction::Min => AggregateState::Min(None),
            AggregateFunction::Max => AggregateState::Max(None),
            AggregateFunction::First => AggregateState::First(None),
            AggregateFunction::List => AggregateState::List(Vec::new()),
            AggregateFunction::PositionalList { len } => {
                AggregateState::Positional(vec![Value::Null; len])
            }
        };
        if self.distinct && self.function != AggregateFunction::CountStar {
            AggregateState::Distinct {
                inner: Box::new(state),
                seen: FastIndexSet::default(),
            }
        } else {
            state
        }
    }
}

/// Running state of one aggregate for one group.
#[derive(Debug, Clone)]
pub enum AggregateState {
    /// Row or value count.
    Count(i64),
    /// Running sum; `None` until the first non-NULL value.
    Sum(Option<Value>),
    /// Running sum and count for the mean.
    Avg {
        /// Sum of the values seen.
        sum: f64,
        /// Number of values seen.
        count: i64,
    },
    /// Running minimum.
    Min(Option<Value>),
    /// Running maximum.
    Max(Option<Value>),
    /// First value; `Some(Null)` if the first value was NULL.
    First(Option<Value>),
    /// Collected values.
    List(Vec<Value>),
    /// Fixed-length slots.
    Positional(Vec<Value>),
    /// DISTINCT wrapper: values already fed to `inner`.
    Distinct {
        /// Wrapped state.
        inner: Box<AggregateState>,
        /// Distinct values in first-seen order.
        seen: FastIndexSet<Value>,
    },
}

impl AggregateState {
    /// Folds one input row. `value` is NULL for `count(*)`; `position` is
    /// only used by positional lists.
    ///
    /// # Errors
    ///
    /// Returns an error on Int64 overflow or a non-numeric sum argument.
    pub fn update(
        &mut self,
        function: AggregateFunction,
        value: Value,
        position: &Value,
    ) -> Result<(), OperatorError> {
        match self {
            Self::Count(n) => {
                if function == AggregateFunction::CountStar || !value.is_null() {
                    *n += 1;
                }
            }
            Self::Sum(acc) => {
                if !value.is_null() {
                    *acc = Some(match acc.take() {
                        None => numeric(value)?,
                        Some(current) => add(&current, &value)?,
                    });
                }
            }
            Self::Avg { sum, count } => {
                if !value.is_null() {
                    *sum += numeric(value)?.to_f64().unwrap_or_default();
                    *count += 1;
                }
            }
            Self::Min(acc) => keep_extreme(acc, value, Ordering::Less),
            Self::Max(acc) => keep_extreme(acc, value, Ordering::Greater),
            Self::First(acc) => {
                if acc.is_none() {
                    *acc = Some(value);
                }
            }
            Self::List(items) => items.push(value),
            Self::Positional(slots) => {
                if value.is_null() {
                    return Ok(());
                }
                let index = match position {
                    Value::Null => return Ok(()),
                    Value::Int64(i) => usize::try_from(*i).ok(),
                    other => {
                        return Err(OperatorError::TypeMismatch {
                            expected: "BIGINT".to_string(),
                            found: other.type_name().to_string(),
                        });
                    }
                };
                if let Some(slot) = index.and_then(|i| slots.get_mut(i)) {
                    *slot = value;
                }
            }
            Self::Distinct { inner, seen } => {
                if !value.is_null() && seen.insert(value.clone()) {
                    inner.update(function, value, position)?;
                }
            }
        }
        Ok(())
    }

    /// Merges a partial state computed over a later partition.
    ///
    /// # Errors
    ///
    /// Returns an error on Int64 overflow.
    pub fn merge(&mut self, function: AggregateFunction, other: Self) -> Result<(), OperatorError> {
        match (self, other) {
            (Self::Count(a), Self::Count(b)) => *a += b,
            (Self::Sum(a), Self::Sum(b)) => {
                if let Some(b) = b {
                    *a = Some(match a.take() {
                        None => b,
                        Some(current) => add(&current, &b)?,
                    });
                }
            }
            (
                Self::Avg { sum, count },
                Self::Avg {
                    sum: other_sum,
                    count: other_count,
                },
            ) => {
                *sum += other_sum;
                *count += other_count;
            }
            (Self::Min(a), Self::Min(b)) => {
                if let Some(b) = b {
                    keep_extreme(a, b, Ordering::Less);
                }
            }
            (Self::Max(a), Self::Max(b)) => {
                if let Some(b) = b {
                    keep_extreme(a, b, Ordering::Greater);
                }
            }
            (Self::First(a), Self::First(b)) => {
                if a.is_none() {
                    *a = b;
                }
            }
            (Self::List(a), Self::List(b)) => a.extend(b),
            (Self::Positional(a), Self::Positional(b)) => {
                // Slots are placed by index, so arrival order never matters.
                for (slot, value) in a.iter_mut().zip(b) {
                    if !value.is_null() {
                        *slot = value;
                    }
                }
            }
            (Self::Distinct { inner, seen }, Self::Distinct { seen: other_seen, .. }) => {
                for value in other_seen {
                    if seen.insert(value.clone()) {
                        inner.update(function, value, &Value::Null)?;
                    }
                }
            }
            (state, other) => {
                return Err(OperatorError::Execution(format!(
                    "cannot merge aggregate state {other:?} into {state:?}"
                )));
            }
        }
        Ok(())
    }

    /// Produces the final value.
    #[must_use]
    pub fn finalize(self) -> Value {
        match self {
            Self::Count(n) => Value::Int64(n),
            Self::Sum(acc) | Self::Min(acc) | Self::Max(acc) | Self::First(acc) => {
                acc.unwrap_or_default()
            }
            Self::Avg { count: 0, .. } => Value::Null,
            #[allow(clippy::cast_precision_loss)]
            Self::Avg { sum, count } => Value::Float64(sum / count as f64),
            Self::List(items) if items.is_empty() => Value::Null,
            Self::List(items) | Self::Positional(items) => Value::from(items),
            Self::Distinct { inner, .. } => inner.finalize(),
        }
    }
}

fn numeric(value: Value) -> Result<Value, OperatorError> {
    match value {
        Value::Int64(_) | Value::Float64(_) => Ok(value),
        Value::Bool(b) => Ok(Value::Int64(i64::from(b))),
        other => Err(OperatorError::TypeMismatch {
            expected: "numeric".to_string(),
            found: other.type_name().to_string(),
        }),
    }
}

fn add(a: &Value, b: &Value) -> Result<Value, OperatorError> {
    match (a, numeric(b.clone())?) {
        (Value::Int64(x), Value::Int64(y)) => x
            .checked_add(y)
            .map(Value::Int64)
            .ok_or_else(|| OperatorError::Overflow(format!("sum exceeded BIGINT range ({x} + {y})"))),
        (x, y) => Ok(Value::Float64(
            x.to_f64().unwrap_or_default() + y.to_f64().unwrap_or_default(),
        )),
    }
}

fn keep_extreme(acc: &mut Option<Value>, value: Value, wanted: Ordering) {
    if value.is_null() {
        return;
    }
    if acc
        .as_ref()
        .is_none_or(|current| value.total_cmp(current) == wanted)
    {
        *acc = Some(value);
    }
}

/// A partial aggregation over one partition.
#[derive(Debug, Clone)]
pub struct AggregationTable {
    group_by: Vec<Expr>,
    aggregates: Vec<AggregateExpr>,
    groups: FastIndexMap<GroupKey, Vec<AggregateState>>,
}

impl AggregationTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new(group_by: Vec<Expr>, aggregates: Vec<AggregateExpr>) -> Self {
        Self {
            group_by,
            aggregates,
            groups: FastIndexMap::default(),
        }
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if no group has been seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Folds the visible rows of `chunk` into the table.
    ///
    /// # Errors
    ///
    /// Returns an error if an expression or aggregate update fails.
    pub fn consume(&mut self, chunk: &DataChunk) -> Result<(), OperatorError> {
        for row in chunk.selected_indices() {
            let key = self
                .group_by
                .iter()
                .map(|e| e.evaluate(chunk, row))
                .collect::<Result<GroupKey, _>>()?;

            let states = self.groups.entry(key).or_insert_with(|| {
                self.aggregates
                    .iter()
                    .map(AggregateExpr::initial_state)
                    .collect()
            });

            for (agg, state) in self.aggregates.iter().zip(states.iter_mut()) {
                let value = match &agg.input {
                    Some(e) => e.evaluate(chunk, row)?,
                    None => Value::Null,
                };
                let position = match &agg.position {
                    Some(e) => e.evaluate(chunk, row)?,
                    None => Value::Null,
                };
                state.update(agg.function, value, &position)?;
            }
        }
        Ok(())
    }

    /// Merges a table built over a later partition. Groups new to `self`
    /// are appended after the existing ones.
    ///
    /// # Errors
    ///
    /// Returns an error if a state merge fails.
    pub fn merge(&mut self, other: AggregationTable) -> Result<(), OperatorError> {
        for (key, other_states) in other.groups {
            match self.groups.get_mut(&key) {
                Some(states) => {
                    for ((agg, state), other) in
                        self.aggregates.iter().zip(states.iter_mut()).zip(other_states)
                    {
                        state.merge(agg.function, other)?;
                    }
                }
                None => {
                    self.groups.insert(key, other_states);
                }
            }
        }
        Ok(())
    }

    /// Finalizes every group into output rows: group key values followed
    /// by one value per aggregate. Without grouping columns an empty input
    /// still yields one row.
    #[must_use]
    pub fn finish(self) -> Vec<Vec<Value>> {
        if self.groups.is_empty() && self.group_by.is_empty() {
            return vec![
                self.aggregates
                    .iter()
                    .map(|a| a.initial_state().finalize())
                    .collect(),
            ];
        }
        self.groups
            .into_iter()
            .map(|(key, states)| {
                let mut row: Vec<Value> = key.into_iter().collect();
                row.extend(states.into_iter().map(AggregateState::finalize));
                row
            })
            .collect()
    }
}

/// Aggregation operator over one or more input partitions.
pub struct HashAggregateOperator {
    children: Vec<Box<dyn Operator>>,
    group_by: Vec<Expr>,
    aggregates: Vec<AggregateExpr>,
    output_types: Vec<LogicalType>,
    result: Option<std::vec::IntoIter<Vec<Value>>>,
}

impl HashAggregateOperator {
    /// Creates an aggregation over a single input.
    #[must_use]
    pub fn new(
        child: Box<dyn Operator>,
        group_by: Vec<Expr>,
        aggregates: Vec<AggregateExpr>,
        output_types: Vec<LogicalType>,
    ) -> Self {
        Self::parallel(vec![child], group_by, aggregates, output_types)
    }

    /// Creates an aggregation that folds each child on its own rayon task
    /// and merges the partial tables in child order.
    #[must_use]
    pub fn parallel(
        children: Vec<Box<dyn Operator>>,
        group_by: Vec<Expr>,
        aggregates: Vec<AggregateExpr>,
        output_types: Vec<LogicalType>,
    ) -> Self {
        Self {
            children,
            group_by,
            aggregates,
            output_types,
            result: None,
        }
    }

    fn build_partial(&self, child: &mut Box<dyn Operator>) -> Result<AggregationTable, OperatorError> {
        let mut table = AggregationTable::new(self.group_by.clone(), self.aggregates.clone());
        while let Some(chunk) = child.next()? {
            table.consume(&chunk)?;
        }
        Ok(table)
    }

    fn aggregate(&mut self) -> Result<Vec<Vec<Value>>, OperatorError> {
        let mut children = std::mem::take(&mut self.children);
        let partials = if children.len() == 1 {
            children
                .iter_mut()
                .map(|c| self.build_partial(c))
                .collect::<Result<Vec<_>, _>>()
        } else {
            let this = &*self;
            children
                .par_iter_mut()
                .map(|c| this.build_partial(c))
                .collect::<Result<Vec<_>, _>>()
        };
        self.children = children;

        let mut partials = partials?.into_iter();
        let mut table = partials.next().unwrap_or_else(|| {
            AggregationTable::new(self.group_by.clone(), self.aggregates.clone())
        });
        for partial in partials {
            table.merge(partial)?;
        }
        Ok(table.finish())
    }
}

impl Operator for HashAggregateOperator {
    fn next(&mut self) -> OperatorResult {
        if self.result.is_none() {
            let rows = self.aggregate()?;
            self.result = Some(rows.into_iter());
        }

        let Some(rows) = self.result.as_mut() else {
            return Ok(None);
        };
        let batch: Vec<Vec<Value>> = rows.take(DEFAULT_CHUNK_CAPACITY).collect();
        if batch.is_empty() {
            return Ok(None);
        }
        Ok(Some(DataChunk::from_rows(&self.output_types, batch)))
    }

    fn reset(&mut self) {
        for child in &mut self.children {
            child.reset();
        }
        self.result = None;
    }

    fn name(&self) -> &'static str {
        "HashAggregate"
    }
}
