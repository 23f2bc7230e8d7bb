//! Pivot value domain resolution.
//!
//! Binds the closed set of `ON` value tuples before the pivot plan can be
//! built. Explicit `IN` lists are expanded directly; anything else runs a
//! parallel distinct scan over the source partitions and merges the
//! per-partition results at a single barrier, in partition order, so the
//! domain is the first-seen order of a sequential scan.

use std::cmp::Ordering;

use crossbeam::channel;
use reshape_common::types::{Domain, DomainBuilder, DomainTuple, LogicalType, Value};
use reshape_common::utils::error::{Error, Result};
use reshape_common::utils::hash::FastHashMap;
use reshape_core::execution::operators::{DistinctOperator, Operator, ProjectOperator};
use reshape_core::execution::{CancellationToken, Expr};
use tracing::{debug, warn};

use super::naming::render_value;
use crate::config::{Config, DomainOrder};
use crate::query::plan::{PivotOn, SortOrder};

/// One `ON` entry after binding against the source schema.
#[derive(Debug, Clone)]
pub struct BoundOn {
    /// Bound expression.
    pub expr: Expr,
    /// Its result type.
    pub data_type: LogicalType,
    /// Explicit values, cast to `data_type`, with their aliases.
    pub values: Option<Vec<(Value, Option<String>)>>,
    /// Requested ordering.
    pub order: Option<SortOrder>,
}

impl BoundOn {
    /// Casts the explicit values of `on` to `data_type`.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if an explicit value cannot be cast.
    pub fn new(on: &PivotOn, expr: Expr, data_type: LogicalType) -> Result<Self> {
        let values = on
            .values
            .as_ref()
            .map(|values| {
                values
                    .iter()
                    .map(|v| Ok((cast_explicit(&v.value, &data_type)?, v.alias.clone())))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;
        Ok(Self {
            expr,
            data_type,
            values,
            order: on.order,
        })
    }

    fn explicit_position(&self, value: &Value) -> Option<usize> {
        self.values
            .as_ref()
            .and_then(|values| values.iter().position(|(v, _)| v == value))
    }
}

fn cast_explicit(value: &Value, target: &LogicalType) -> Result<Value> {
    if value.is_null() || matches!(target, LogicalType::Any | LogicalType::Null) {
        return Ok(value.clone());
    }
    let mismatch = || Error::TypeMismatch {
        expected: target.to_string(),
        found: format!("{} {value}", value.type_name()),
    };
    let cast = value.cast(target).ok_or_else(mismatch)?;
    // Strings are parsed, so only non-text values must survive the way back.
    if !matches!(value, Value::String(_)) && cast.cast(&value.logical_type()).as_ref() != Some(value)
    {
        return Err(mismatch());
    }
    Ok(cast)
}

/// Builds pivot domains.
pub struct DomainResolver<'a> {
    config: &'a Config,
    cancel: &'a CancellationToken,
}

impl<'a> DomainResolver<'a> {
    /// Creates a resolver honoring `config`'s limit and ordering.
    #[must_use]
    pub fn new(config: &'a Config, cancel: &'a CancellationToken) -> Self {
        Self { config, cancel }
    }

    /// Resolves the domain of `on` over the source `partitions`.
    ///
    /// The partitions are only scanned if some entry lacks an explicit
    /// value list.
    ///
    /// # Errors
    ///
    /// Returns `EmptyOnClause` for an empty `on`, `UnboundedDomain` when the
    /// scan or the explicit cross product exceeds the configured limit, `Cancelled` if the session was
    /// cancelled, and any error raised while scanning.
    pub fn resolve(&self, on: &[BoundOn], partitions: Vec<Box<dyn Operator>>) -> Result<Domain> {
        if on.is_empty() {
            return Err(Error::EmptyOnClause);
        }

        let mut builder = if on.iter().all(|o| o.values.is_some()) {
            self.cross_product(on)?
        } else {
            let mut builder = self.scan(on, partitions)?;
            if on.iter().any(|o| o.values.is_some()) {
                builder.retain(|tuple| {
                    on.iter()
                        .zip(tuple)
                        .all(|(o, v)| o.values.is_none() || o.explicit_position(v).is_some())
                });
            }
            builder
        };

        let sorted = self.config.domain_order == DomainOrder::Sorted;
        if sorted || on.iter().any(|o| o.order.is_some() || o.values.is_some()) {
            let ranks = first_seen_ranks(&builder);
            builder.sort_by(|a, b| compare_tuples(on, sorted, &ranks, a, b));
        }

        let domain = builder.finish();
        debug!(entries = domain.len(), arity = domain.arity(), "pivot domain resolved");
        Ok(domain)
    }

    fn cross_product(&self, on: &[BoundOn]) -> Result<DomainBuilder> {
        let limit = self.config.pivot_column_limit;
        let lists: Vec<&[(Value, Option<String>)]> = on
            .iter()
            .map(|o| o.values.as_deref().unwrap_or_default())
            .collect();
        let mut builder = Domain::builder(on.len());
        if lists.iter().any(|l| l.is_empty()) {
            return Ok(builder);
        }

        // Odometer over the lists, last component fastest.
        let mut cursor = vec![0usize; lists.len()];
        loop {
            let picked: Vec<&(Value, Option<String>)> =
                cursor.iter().zip(&lists).map(|(&i, l)| &l[i]).collect();
            let label = picked.iter().any(|(_, alias)| alias.is_some()).then(|| {
                picked
                    .iter()
                    .map(|(v, alias)| alias.clone().unwrap_or_else(|| render_value(v)))
                    .collect::<Vec<_>>()
                    .join("_")
            });
            builder.push(picked.iter().map(|(v, _)| v.clone()), label)?;
            if builder.len() > limit {
                return Err(Error::UnboundedDomain { limit });
            }

            let mut k = cursor.len();
            loop {
                if k == 0 {
                    return Ok(builder);
                }
                k -= 1;
                cursor[k] += 1;
                if cursor[k] < lists[k].len() {
                    break;
                }
                cursor[k] = 0;
            }
        }
    }

    fn scan(&self, on: &[BoundOn], partitions: Vec<Box<dyn Operator>>) -> Result<DomainBuilder> {
        let limit = self.config.pivot_column_limit;
        let exprs: Vec<Expr> = on.iter().map(|o| o.expr.clone()).collect();
        let types: Vec<LogicalType> = on.iter().map(|o| o.data_type.clone()).collect();
        let partition_count = partitions.len();
        debug!(partitions = partition_count, "pivot distinct scan");

        let (tx, rx) = channel::unbounded::<(usize, Result<Vec<DomainTuple>>)>();
        rayon::scope(|scope| {
            for (index, child) in partitions.into_iter().enumerate() {
                let tx = tx.clone();
                let exprs = exprs.clone();
                let types = types.clone();
                scope.spawn(move |_| {
                    let result = distinct_tuples(child, exprs, types, limit);
                    // The receiver outlives the scope.
                    let _ = tx.send((index, result));
                });
            }
        });
        drop(tx);

        // Barrier: every partition has reported.
        let mut results: Vec<(usize, Result<Vec<DomainTuple>>)> = rx.iter().collect();
        self.cancel.check()?;
        if results.len() != partition_count {
            return Err(Error::Internal(format!(
                "distinct scan reported {} of {partition_count} partitions",
                results.len()
            )));
        }
        results.sort_by_key(|(index, _)| *index);

        let mut builder = Domain::builder(on.len());
        for (_, tuples) in results {
            for tuple in tuples? {
                builder.push(tuple, None)?;
                if builder.len() > limit {
                    return Err(Error::UnboundedDomain { limit });
                }
            }
        }
        if builder.len().saturating_mul(10) >= limit.saturating_mul(9) {
            warn!(entries = builder.len(), limit, "pivot domain is close to the column limit");
        }
        Ok(builder)
    }
}

fn distinct_tuples(
    child: Box<dyn Operator>,
    exprs: Vec<Expr>,
    types: Vec<LogicalType>,
    limit: usize,
) -> Result<Vec<DomainTuple>> {
    let project = ProjectOperator::new(child, exprs, types);
    let mut distinct = DistinctOperator::new(Box::new(project));
    let mut tuples = Vec::new();
    while let Some(chunk) = distinct.next()? {
        for row in chunk.rows() {
            tuples.push(row.into_iter().collect());
        }
        if tuples.len() > limit {
            return Err(Error::UnboundedDomain { limit });
        }
    }
    Ok(tuples)
}

/// Per component, the position at which each value first appears.
fn first_seen_ranks(builder: &DomainBuilder) -> Vec<FastHashMap<Value, usize>> {
    let mut ranks: Vec<FastHashMap<Value, usize>> = Vec::new();
    for tuple in builder.tuples() {
        ranks.resize_with(tuple.len(), FastHashMap::default);
        for (rank, value) in ranks.iter_mut().zip(tuple) {
            let next = rank.len();
            rank.entry(value.clone()).or_insert(next);
        }
    }
    ranks
}

fn compare_tuples(
    on: &[BoundOn],
    sorted: bool,
    ranks: &[FastHashMap<Value, usize>],
    a: &[Value],
    b: &[Value],
) -> Ordering {
    for (i, ((o, x), y)) in on.iter().zip(a).zip(b).enumerate() {
        let ordering = match o.order {
            Some(SortOrder::Ascending) => x.total_cmp(y),
            Some(SortOrder::Descending) => y.total_cmp(x),
            None if o.values.is_some() => o.explicit_position(x).cmp(&o.explicit_position(y)),
            None if sorted => x.total_cmp(y),
            None => ranks
                .get(i)
                .map_or(Ordering::Equal, |rank| rank.get(x).cmp(&rank.get(y))),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
