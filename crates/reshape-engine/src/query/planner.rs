//! Converts logical plans into physical operator trees.
//!
//! Row-wise operators (scan, filter, project, unpivot) are planned once per
//! table partition so each pipeline runs independently. Aggregation merges
//! the partitions at a barrier; order-sensitive operators gather them first.

use std::sync::Arc;

use reshape_common::types::{Field, LogicalType, Schema};
use reshape_common::utils::error::{Error, Result};
use reshape_core::execution::CancellationToken;
use reshape_core::execution::operators::{
    DistinctOperator, ExpressionPredicate, FilterOperator, GatherOperator, HashAggregateOperator,
    HashJoinOperator, JoinType as PhysicalJoinType, LimitOperator, Operator, PivotOperator,
    ProjectOperator, ScanOperator, SortKey as PhysicalSortKey, SortOperator, UnpivotOperator,
};
use reshape_core::storage::Table;
use tracing::debug;

use super::binder::{bind_aggregate, bind_expression, resolve_column};
use super::plan::{
    AggregateOp, FilterOp, JoinOp, JoinType, LimitOp, LogicalOperator, LogicalPlan, PivotExpandOp,
    PivotOp, ProjectOp, SortOp, SortOrder, UnpivotOp,
};
use super::reshape::{PivotBuilder, bind_unpivot};
use crate::catalog::Catalog;
use crate::config::Config;

/// A physical plan ready for execution.
pub struct PhysicalPlan {
    /// The root physical operator.
    pub operator: Box<dyn Operator>,
    /// Output schema.
    pub schema: Schema,
}

/// Independent pipelines over disjoint row ranges, in row order.
struct Pipelines {
    partitions: Vec<Box<dyn Operator>>,
    schema: Schema,
}

impl Pipelines {
    fn single(operator: Box<dyn Operator>, schema: Schema) -> Self {
        Self {
            partitions: vec![operator],
            schema,
        }
    }

    /// Extends every pipeline with the same operator.
    fn map(self, schema: Schema, mut f: impl FnMut(Box<dyn Operator>) -> Box<dyn Operator>) -> Self {
        Self {
            partitions: self.partitions.into_iter().map(&mut f).collect(),
            schema,
        }
    }

    /// Merges the pipelines into one stream in partition order.
    fn gather(mut self) -> (Box<dyn Operator>, Schema) {
        let operator = if self.partitions.len() == 1 {
            self.partitions.remove(0)
        } else {
            Box::new(GatherOperator::new(self.partitions))
        };
        (operator, self.schema)
    }
}

/// Converts logical plans to physical operators.
pub struct Planner {
    catalog: Arc<Catalog>,
    config: Config,
    cancel: CancellationToken,
}

impl Planner {
    /// Creates a planner reading tables from `catalog`.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, config: Config, cancel: CancellationToken) -> Self {
        Self {
            catalog,
            config,
            cancel,
        }
    }

    /// Plans a logical plan into a physical operator tree.
    ///
    /// PIVOT domains are resolved here, so planning may scan data.
    ///
    /// # Errors
    ///
    /// Returns an error if planning fails.
    pub fn plan(&self, logical_plan: &LogicalPlan) -> Result<PhysicalPlan> {
        let (operator, schema) = self.plan_operator(&logical_plan.root)?.gather();
        Ok(PhysicalPlan { operator, schema })
    }

    fn plan_operator(&self, op: &LogicalOperator) -> Result<Pipelines> {
        match op {
            LogicalOperator::Scan(scan) => {
                let table = self.catalog.get(&scan.table)?;
                Ok(self.plan_table(table))
            }
            LogicalOperator::Values(values) => {
                let table = Table::from_rows("values", values.schema.clone(), values.rows.clone())?;
                Ok(self.plan_table(Arc::new(table)))
            }
            LogicalOperator::Filter(filter) => self.plan_filter(filter),
            LogicalOperator::Project(project) => self.plan_project(project),
            LogicalOperator::Aggregate(agg) => self.plan_aggregate(agg),
            LogicalOperator::Sort(sort) => self.plan_sort(sort),
            LogicalOperator::Limit(limit) => self.plan_limit(limit),
            LogicalOperator::Join(join) => self.plan_join(join),
            LogicalOperator::Distinct(distinct) => {
                let (input, schema) = self.plan_operator(&distinct.input)?.gather();
                Ok(Pipelines::single(Box::new(DistinctOperator::new(input)), schema))
            }
            LogicalOperator::Pivot(pivot) => self.plan_pivot(pivot),
            LogicalOperator::Unpivot(unpivot) => self.plan_unpivot(unpivot),
            LogicalOperator::PivotExpand(expand) => self.plan_pivot_expand(expand),
        }
    }

    fn plan_table(&self, table: Arc<Table>) -> Pipelines {
        let ranges = table.partitions(self.config.threads);
        debug!(table = table.name(), partitions = ranges.len(), "planning scan");
        Pipelines {
            schema: table.schema().clone(),
            partitions: ranges
                .into_iter()
                .map(|range| {
                    Box::new(
                        ScanOperator::with_range(table.clone(), range)
                            .with_chunk_capacity(self.config.chunk_capacity)
                            .with_cancellation(self.cancel.clone()),
                    ) as Box<dyn Operator>
                })
                .collect(),
        }
    }

    fn plan_filter(&self, filter: &FilterOp) -> Result<Pipelines> {
        let input = self.plan_operator(&filter.input)?;
        let predicate = bind_expression(&filter.predicate, &input.schema)?;
        let schema = input.schema.clone();
        Ok(input.map(schema, |child| {
            Box::new(FilterOperator::new(
                child,
                Box::new(ExpressionPredicate::new(predicate.clone())),
            ))
        }))
    }

    fn plan_project(&self, project: &ProjectOp) -> Result<Pipelines> {
        let input = self.plan_operator(&project.input)?;
        let input_types = input.schema.types();
        let exprs = project
            .projections
            .iter()
            .map(|p| bind_expression(&p.expression, &input.schema))
            .collect::<Result<Vec<_>>>()?;
        let types: Vec<LogicalType> = exprs.iter().map(|e| e.output_type(&input_types)).collect();
        let schema = unique_schema(
            project.projections.iter().map(super::plan::Projection::output_name),
            &types,
        )?;
        Ok(input.map(schema, |child| {
            Box::new(ProjectOperator::new(child, exprs.clone(), types.clone()))
        }))
    }

    fn plan_aggregate(&self, agg: &AggregateOp) -> Result<Pipelines> {
        let input = self.plan_operator(&agg.input)?;
        let input_types = input.schema.types();
        let group_by = agg
            .group_by
            .iter()
            .map(|g| bind_expression(g, &input.schema))
            .collect::<Result<Vec<_>>>()?;
        let aggregates = agg
            .aggregates
            .iter()
            .map(|a| bind_aggregate(a, &input.schema))
            .collect::<Result<Vec<_>>>()?;

        let types: Vec<LogicalType> = group_by
            .iter()
            .map(|g| g.output_type(&input_types))
            .chain(aggregates.iter().map(|a| a.output_type(&input_types)))
            .collect();
        let names = agg
            .group_by
            .iter()
            .map(ToString::to_string)
            .chain(agg.aggregates.iter().map(super::plan::AggregateExpr::output_name));
        let schema = unique_schema(names, &types)?;

        debug!(
            partitions = input.partitions.len(),
            groups = group_by.len(),
            aggregates = aggregates.len(),
            "planning aggregate"
        );
        let operator =
            HashAggregateOperator::parallel(input.partitions, group_by, aggregates, types);
        Ok(Pipelines::single(Box::new(operator), schema))
    }

    fn plan_sort(&self, sort: &SortOp) -> Result<Pipelines> {
        let (input, schema) = self.plan_operator(&sort.input)?.gather();
        let keys = sort
            .keys
            .iter()
            .map(|k| {
                let column = resolve_column(&schema, &k.column)?;
                Ok(match k.order {
                    SortOrder::Ascending => PhysicalSortKey::ascending(column),
                    SortOrder::Descending => PhysicalSortKey::descending(column),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let operator = SortOperator::new(input, keys, schema.types());
        Ok(Pipelines::single(Box::new(operator), schema))
    }

    fn plan_limit(&self, limit: &LimitOp) -> Result<Pipelines> {
        let (input, schema) = self.plan_operator(&limit.input)?.gather();
        let operator = LimitOperator::new(input, limit.offset, limit.count);
        Ok(Pipelines::single(Box::new(operator), schema))
    }

    fn plan_join(&self, join: &JoinOp) -> Result<Pipelines> {
        let (left, left_schema) = self.plan_operator(&join.left)?.gather();
        let (right, right_schema) = self.plan_operator(&join.right)?.gather();
        if join.conditions.is_empty() {
            return Err(Error::Planning("join requires at least one condition".to_string()));
        }

        let mut probe_keys = Vec::with_capacity(join.conditions.len());
        let mut build_keys = Vec::with_capacity(join.conditions.len());
        for condition in &join.conditions {
            probe_keys.push(resolve_column(&left_schema, &condition.left)?);
            build_keys.push(resolve_column(&right_schema, &condition.right)?);
        }

        let schema = left_schema.join(&right_schema);
        let join_type = match join.join_type {
            JoinType::Inner => PhysicalJoinType::Inner,
            JoinType::Left => PhysicalJoinType::Left,
        };
        let operator = HashJoinOperator::new(
            left,
            right,
            probe_keys,
            build_keys,
            join_type,
            schema.types(),
            right_schema.len(),
        );
        Ok(Pipelines::single(Box::new(operator), schema))
    }

    fn plan_pivot(&self, pivot: &PivotOp) -> Result<Pipelines> {
        let source = self.plan_operator(&pivot.input)?;
        let source_schema = source.schema.clone();
        let bound = PivotBuilder::new(&self.config, &self.cancel).bind(
            pivot,
            &source_schema,
            move || Ok(source.partitions),
        )?;
        debug!(
            domain = bound.domain.len(),
            columns = bound.columns.len(),
            "pivot bound"
        );

        let planned = self.plan_operator(&bound.plan)?;
        if planned.schema.types() != bound.schema.types() {
            return Err(Error::Internal(format!(
                "pivot plan produces {:?}, expected {:?}",
                planned.schema.types(),
                bound.schema.types()
            )));
        }
        // The rewritten plan names group expressions by their text; the
        // bound schema carries the user-facing names.
        Ok(Pipelines {
            partitions: planned.partitions,
            schema: bound.schema,
        })
    }

    fn plan_unpivot(&self, unpivot: &UnpivotOp) -> Result<Pipelines> {
        let input = self.plan_operator(&unpivot.input)?;
        let bound = bind_unpivot(unpivot, &input.schema)?;
        let types = bound.schema.types();
        debug!(
            positions = bound.labels.len(),
            families = bound.families.len(),
            partitions = input.partitions.len(),
            "planning unpivot"
        );
        Ok(input.map(bound.schema.clone(), |child| {
            Box::new(UnpivotOperator::new(
                child,
                bound.keep.clone(),
                bound.families.clone(),
                bound.labels.clone(),
                bound.include_nulls,
                types.clone(),
            ))
        }))
    }

    fn plan_pivot_expand(&self, expand: &PivotExpandOp) -> Result<Pipelines> {
        let (input, input_schema) = self.plan_operator(&expand.input)?.gather();
        let input_types = input_schema.types();
        if input_types.len() != expand.group_count + expand.using_count {
            return Err(Error::Internal(format!(
                "pivot expansion expects {} input columns, found {}",
                expand.group_count + expand.using_count,
                input_types.len()
            )));
        }

        let cell_types: Vec<LogicalType> = input_types[expand.group_count..]
            .iter()
            .map(|t| t.element_type().cloned().unwrap_or(LogicalType::Any))
            .collect();
        let mut types = input_types[..expand.group_count].to_vec();
        for _ in 0..expand.domain_len {
            types.extend(cell_types.iter().cloned());
        }
        if expand.names.len() != types.len() {
            return Err(Error::Internal(format!(
                "pivot expansion has {} names for {} columns",
                expand.names.len(),
                types.len()
            )));
        }

        let schema = Schema::new(
            expand
                .names
                .iter()
                .zip(&types)
                .map(|(name, t)| Field::new(name.clone(), t.clone()))
                .collect(),
        );
        let operator = PivotOperator::new(
            input,
            expand.group_count,
            expand.using_count,
            expand.domain_len,
            types,
        );
        Ok(Pipelines::single(Box::new(operator), schema))
    }
}

fn unique_schema(names: impl Iterator<Item = String>, types: &[LogicalType]) -> Result<Schema> {
    let schema = Schema::new(
        names
            .zip(types)
            .map(|(name, t)| Field::new(name, t.clone()))
            .collect(),
    );
    if let Some(dup) = schema.duplicate_name() {
        return Err(Error::DuplicateColumnName(dup.to_string()));
    }
    Ok(schema)
}
