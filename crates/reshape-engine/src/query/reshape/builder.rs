//! PIVOT binding and rewrite.
//!
//! A pivot is bound in two phases. The first resolves the domain and the
//! output columns, which fixes the output schema. The second rewrites the
//! request into ordinary relational operators:
//!
//! ```text
//! PivotExpand
//!   Aggregate(group_by; positional_list(agg_u, slot))
//!     Aggregate(group_by, slot; agg_u)
//!       Filter(pivot_slot(on...) IS NOT NULL)
//!         source
//! ```

use std::sync::Arc;

use reshape_common::types::{Domain, Field, LogicalType, Schema};
use reshape_common::utils::error::{Error, Result};
use reshape_core::execution::CancellationToken;
use reshape_core::execution::operators::Operator;
use tracing::debug;

use super::domain::{BoundOn, DomainResolver};
use super::naming::{OutputColumn, quote_identifier, resolve_columns};
use crate::config::Config;
use crate::query::binder::{bind_aggregate, bind_expression, expression_type};
use crate::query::plan::{
    AggregateExpr, LogicalExpression, LogicalOperator, PivotExpandOp, PivotOp, Projection,
};

/// A pivot whose domain and output schema are fixed.
#[derive(Debug, Clone)]
pub struct BoundPivot {
    /// The resolved domain.
    pub domain: Arc<Domain>,
    /// Generated columns, in output order after the grouping columns.
    pub columns: Vec<OutputColumn>,
    /// Full output schema.
    pub schema: Schema,
    /// The rewritten plan producing rows of `schema`.
    pub plan: LogicalOperator,
}

/// Binds PIVOT requests against their source.
pub struct PivotBuilder<'a> {
    config: &'a Config,
    cancel: &'a CancellationToken,
}

impl<'a> PivotBuilder<'a> {
    /// Creates a builder.
    #[must_use]
    pub fn new(config: &'a Config, cancel: &'a CancellationToken) -> Self {
        Self { config, cancel }
    }

    /// Binds `pivot` over a source with schema `source`.
    ///
    /// `partitions` plans the source for the distinct scan; it is only
    /// called when some `ON` entry has no explicit value list.
    ///
    /// # Errors
    ///
    /// Returns every planning error of a PIVOT: an empty request, an empty
    /// `ON` clause, ambiguous default grouping, unknown columns, domain
    /// resolution failures and column name collisions.
    pub fn bind(
        &self,
        pivot: &PivotOp,
        source: &Schema,
        partitions: impl FnOnce() -> Result<Vec<Box<dyn Operator>>>,
    ) -> Result<BoundPivot> {
        if pivot.on.is_none() && pivot.using.is_empty() && pivot.group_by.is_none() {
            return Err(Error::Planning(
                "PIVOT requires at least one of ON, USING or GROUP BY".to_string(),
            ));
        }
        if pivot.on.as_ref().is_some_and(Vec::is_empty) {
            return Err(Error::EmptyOnClause);
        }

        let using = if pivot.using.is_empty() {
            vec![AggregateExpr::count_star()]
        } else {
            pivot.using.clone()
        };
        let group_by = match &pivot.group_by {
            Some(group_by) => group_by.clone(),
            None => default_group_by(pivot, &using, source)?,
        };
        let group_names: Vec<String> = group_by.iter().map(ToString::to_string).collect();

        let source_types = source.types();
        let mut fields = Vec::with_capacity(group_by.len());
        for (expr, name) in group_by.iter().zip(&group_names) {
            fields.push(Field::new(name.clone(), expression_type(expr, source)?));
        }
        let using_types = using
            .iter()
            .map(|agg| Ok(bind_aggregate(agg, source)?.output_type(&source_types)))
            .collect::<Result<Vec<LogicalType>>>()?;

        let Some(on) = &pivot.on else {
            let domain = Arc::new(Domain::unit());
            let columns = resolve_columns(&domain, &using, false, &group_names)?;
            fields.extend(
                columns
                    .iter()
                    .map(|c| Field::new(c.name.clone(), using_types[c.using_index].clone())),
            );
            return Ok(BoundPivot {
                domain,
                columns,
                schema: Schema::new(fields),
                plan: pivot.input.as_ref().clone().aggregate(group_by, using),
            });
        };

        let bound_on = on
            .iter()
            .map(|o| {
                let expr = bind_expression(&o.expression, source)?;
                let data_type = expr.output_type(&source_types);
                BoundOn::new(o, expr, data_type)
            })
            .collect::<Result<Vec<_>>>()?;
        let partitions = if bound_on.iter().all(|o| o.values.is_some()) {
            Vec::new()
        } else {
            partitions()?
        };
        let domain = Arc::new(DomainResolver::new(self.config, self.cancel).resolve(&bound_on, partitions)?);
        let columns = resolve_columns(&domain, &using, true, &group_names)?;
        debug!(
            columns = %columns.iter().map(|c| quote_identifier(&c.name)).collect::<Vec<_>>().join(", "),
            "pivot output columns"
        );

        fields.extend(
            columns
                .iter()
                .map(|c| Field::new(c.name.clone(), using_types[c.using_index].clone())),
        );
        let schema = Schema::new(fields);
        let plan = rewrite(pivot, source, group_by, using, &domain, schema.names())?;

        Ok(BoundPivot {
            domain,
            columns,
            schema,
            plan,
        })
    }
}

/// Every source column not referenced by an `ON` or `USING` expression, in
/// source order.
fn default_group_by(
    pivot: &PivotOp,
    using: &[AggregateExpr],
    source: &Schema,
) -> Result<Vec<LogicalExpression>> {
    let mut referenced = Vec::new();
    for on in pivot.on.iter().flatten() {
        let text = on.expression.to_string();
        if using
            .iter()
            .filter_map(|agg| agg.expression.as_ref())
            .any(|arg| arg.to_string() == text)
        {
            return Err(Error::AmbiguousPivotExpression(text));
        }
        on.expression.collect_columns(&mut referenced);
    }
    for agg in using {
        if let Some(expr) = &agg.expression {
            expr.collect_columns(&mut referenced);
        }
    }
    for name in &referenced {
        if !source.contains(name) {
            return Err(Error::ColumnNotFound(name.clone()));
        }
    }

    Ok(source
        .names()
        .into_iter()
        .filter(|name| !referenced.iter().any(|r| r == name))
        .map(LogicalExpression::column)
        .collect())
}

/// `base`, suffixed with `_1`, `_2`, .. until it is not in `taken`.
fn fresh_name(base: &str, taken: &[String]) -> String {
    let mut name = base.to_string();
    let mut suffix = 0;
    while taken.iter().any(|t| *t == name) {
        suffix += 1;
        name = format!("{base}_{suffix}");
    }
    name
}

fn rewrite(
    pivot: &PivotOp,
    source: &Schema,
    group_by: Vec<LogicalExpression>,
    using: Vec<AggregateExpr>,
    domain: &Arc<Domain>,
    names: Vec<&str>,
) -> Result<LogicalOperator> {
    let on = pivot
        .on
        .as_ref()
        .ok_or_else(|| Error::Internal("pivot rewrite without ON".to_string()))?;
    let slot = LogicalExpression::DomainIndex {
        args: on.iter().map(|o| o.expression.clone()).collect(),
        domain: domain.clone(),
    };
    let group_count = group_by.len();
    let using_count = using.len();

    // Intermediate columns share a namespace with the grouping columns.
    let mut taken: Vec<String> = source.names().into_iter().map(str::to_string).collect();
    taken.extend(group_by.iter().map(ToString::to_string));
    let using_names: Vec<String> = (0..using_count)
        .map(|u| {
            let name = fresh_name(&format!("__using_{u}"), &taken);
            taken.push(name.clone());
            name
        })
        .collect();

    let filtered = pivot
        .input
        .as_ref()
        .clone()
        .filter(slot.clone().is_not_null());
    // The slot groups under its canonical text unless a source column
    // already has that name; then it is projected under a fresh one.
    let (filtered, slot_group, slot_name) = if taken.contains(&slot.to_string()) {
        let slot_name = fresh_name("__pivot_slot", &taken);
        let mut projections: Vec<Projection> =
            source.names().into_iter().map(Projection::column).collect();
        projections.push(Projection::aliased(slot, slot_name.clone()));
        (
            filtered.project(projections),
            LogicalExpression::column(slot_name.clone()),
            slot_name,
        )
    } else {
        let slot_name = slot.to_string();
        (filtered, slot, slot_name)
    };

    let outer_groups: Vec<LogicalExpression> = group_by
        .iter()
        .map(|g| LogicalExpression::column(g.to_string()))
        .collect();
    let outer_aggs = using_names
        .iter()
        .map(|name| {
            AggregateExpr::positional_list(
                LogicalExpression::column(name.clone()),
                LogicalExpression::column(slot_name.clone()),
                domain.len(),
            )
            .with_alias(name.clone())
        })
        .collect();

    let mut inner_groups = group_by;
    inner_groups.push(slot_group);
    let inner_aggs = using
        .into_iter()
        .zip(&using_names)
        .map(|(agg, name)| agg.with_alias(name.clone()))
        .collect();

    let buckets = filtered
        .aggregate(inner_groups, inner_aggs)
        .aggregate(outer_groups, outer_aggs);

    Ok(LogicalOperator::PivotExpand(PivotExpandOp {
        input: Box::new(buckets),
        group_count,
        using_count,
        domain_len: domain.len(),
        names: names.into_iter().map(str::to_string).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::plan::{AggregateFunction, PivotOn};
    use reshape_common::types::Value;

    fn source() -> Schema {
        Schema::new(vec![
            Field::new("country", LogicalType::String),
            Field::new("name", LogicalType::String),
            Field::new("year", LogicalType::Int64),
            Field::new("population", LogicalType::Int64),
        ])
    }

    fn bind(pivot: &PivotOp) -> Result<BoundPivot> {
        let config = Config::default();
        let cancel = CancellationToken::new();
        PivotBuilder::new(&config, &cancel).bind(pivot, &source(), || Ok(Vec::new()))
    }

    fn scan() -> LogicalOperator {
        LogicalOperator::scan("cities")
    }

    #[test]
    fn test_explicit_domain_schema() {
        let pivot = PivotOp::new(scan())
            .on_in(LogicalExpression::column("year"), [2000, 2010])
            .using(AggregateExpr::sum("population"))
            .group_by(LogicalExpression::column("country"));
        let bound = bind(&pivot).unwrap();

        assert_eq!(bound.domain.len(), 2);
        assert_eq!(bound.schema.names(), vec!["country", "2000", "2010"]);
        assert_eq!(bound.schema.field(1).unwrap().data_type, LogicalType::Int64);
        match &bound.plan {
            LogicalOperator::PivotExpand(expand) => {
                assert_eq!(expand.group_count, 1);
                assert_eq!(expand.using_count, 1);
                assert_eq!(expand.domain_len, 2);
                assert!(matches!(expand.input.as_ref(), LogicalOperator::Aggregate(_)));
            }
            other => panic!("Expected PivotExpand, got {other:?}"),
        }
    }

    #[test]
    fn test_default_group_by_excludes_referenced_columns() {
        let pivot = PivotOp::new(scan())
            .on_in(LogicalExpression::column("year"), [2000])
            .using(AggregateExpr::sum("population"));
        let bound = bind(&pivot).unwrap();
        assert_eq!(bound.schema.names(), vec!["country", "name", "2000"]);
    }

    #[test]
    fn test_empty_using_counts_rows() {
        let pivot = PivotOp::new(scan())
            .on_in(LogicalExpression::column("year"), [2000])
            .group_by(LogicalExpression::column("country"));
        let bound = bind(&pivot).unwrap();
        assert_eq!(bound.schema.names(), vec!["country", "2000"]);
        assert_eq!(bound.schema.field(1).unwrap().data_type, LogicalType::Int64);
    }

    #[test]
    fn test_no_on_is_grouped_aggregate() {
        let pivot = PivotOp::new(scan())
            .using(AggregateExpr::sum("population").with_alias("total"))
            .group_by(LogicalExpression::column("country"));
        let bound = bind(&pivot).unwrap();
        assert_eq!(bound.domain.len(), 1);
        assert_eq!(bound.schema.names(), vec!["country", "total"]);
        assert!(matches!(bound.plan, LogicalOperator::Aggregate(_)));
    }

    #[test]
    fn test_request_validation() {
        let empty = PivotOp::new(scan());
        assert!(matches!(bind(&empty), Err(Error::Planning(_))));

        let empty_on = PivotOp::new(scan()).with_on(Some(Vec::new()));
        assert!(matches!(bind(&empty_on), Err(Error::EmptyOnClause)));
    }

    #[test]
    fn test_ambiguous_expression() {
        let pivot = PivotOp::new(scan())
            .on_in(LogicalExpression::column("population"), [1])
            .using(AggregateExpr::sum("population"));
        assert!(matches!(
            bind(&pivot),
            Err(Error::AmbiguousPivotExpression(text)) if text == "population"
        ));

        // Explicit grouping lifts the ambiguity.
        let grouped = PivotOp::new(scan())
            .on_in(LogicalExpression::column("population"), [1])
            .using(AggregateExpr::sum("population"))
            .group_by(LogicalExpression::column("country"));
        assert!(bind(&grouped).is_ok());
    }

    #[test]
    fn test_group_name_collision() {
        let pivot = PivotOp::new(scan())
            .on_entry(
                PivotOn::new(LogicalExpression::column("name"))
                    .with_values(vec![crate::query::plan::PivotValue::new("country")]),
            )
            .using(AggregateExpr::new(
                AggregateFunction::Max,
                LogicalExpression::column("population"),
            ))
            .group_by(LogicalExpression::column("country"));
        assert!(matches!(
            bind(&pivot),
            Err(Error::DuplicateColumnName(name)) if name == "country"
        ));
    }

    #[test]
    fn test_fresh_name() {
        let taken = vec!["__using_0".to_string(), "__using_0_1".to_string()];
        assert_eq!(fresh_name("__using_0", &taken), "__using_0_2");
        assert_eq!(fresh_name("__using_1", &taken), "__using_1");
    }

    #[test]
    fn test_intermediate_names_avoid_source_columns() {
        let source = Schema::new(vec![
            Field::new("__using_0", LogicalType::String),
            Field::new("pivot_slot(year)", LogicalType::Int64),
            Field::new("year", LogicalType::Int64),
            Field::new("p", LogicalType::Int64),
        ]);
        let pivot = PivotOp::new(scan())
            .on_in(LogicalExpression::column("year"), [2000])
            .using(AggregateExpr::sum("p"));
        let config = Config::default();
        let cancel = CancellationToken::new();
        let bound = PivotBuilder::new(&config, &cancel)
            .bind(&pivot, &source, || Ok(Vec::new()))
            .unwrap();
        assert_eq!(
            bound.schema.names(),
            vec!["__using_0", "pivot_slot(year)", "2000"]
        );

        let LogicalOperator::PivotExpand(expand) = &bound.plan else {
            panic!("Expected PivotExpand, got {:?}", bound.plan);
        };
        let LogicalOperator::Aggregate(outer) = expand.input.as_ref() else {
            panic!("Expected outer Aggregate");
        };
        assert_eq!(outer.aggregates[0].output_name(), "__using_0_1");
        let LogicalOperator::Aggregate(inner) = outer.input.as_ref() else {
            panic!("Expected inner Aggregate");
        };
        assert_eq!(inner.group_by[2].to_string(), "__pivot_slot");
        assert!(matches!(inner.input.as_ref(), LogicalOperator::Project(_)));
    }

    #[test]
    fn test_unknown_columns() {
        let pivot = PivotOp::new(scan())
            .on_in(LogicalExpression::column("month"), [Value::Int64(1)])
            .using(AggregateExpr::sum("population"))
            .group_by(LogicalExpression::column("country"));
        assert!(matches!(bind(&pivot), Err(Error::ColumnNotFound(_))));

        let inferred = PivotOp::new(scan())
            .on_in(LogicalExpression::column("month"), [Value::Int64(1)]);
        assert!(matches!(bind(&inferred), Err(Error::ColumnNotFound(_))));
    }
}
