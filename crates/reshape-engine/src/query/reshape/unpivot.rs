//! UNPIVOT binding.
//!
//! Resolves fold families to input positions, computes each family's value
//! type and the label of every fold position. Unlike a pivot, the output
//! schema depends only on the input schema.

use reshape_common::types::{Field, LogicalType, Schema};
use reshape_common::utils::error::{Error, Result};
use reshape_common::utils::hash::FastHashSet;
use reshape_core::execution::operators::FoldFamily;

use crate::query::binder::resolve_column;
use crate::query::plan::{FoldColumn, FoldSpec, UnpivotOp};

/// An UNPIVOT bound against its input schema.
#[derive(Debug, Clone)]
pub struct BoundUnpivot {
    /// Input columns carried through, in input order.
    pub keep: Vec<usize>,
    /// Folded families.
    pub families: Vec<FoldFamily>,
    /// One label per fold position.
    pub labels: Vec<String>,
    /// Emit rows whose folded values are all NULL.
    pub include_nulls: bool,
    /// Output schema: kept columns, the name column, then value columns.
    pub schema: Schema,
}

/// Binds `unpivot` against `input`.
///
/// # Errors
///
/// Returns `UnpivotArityMismatch` when families differ in length or do not
/// match the value columns, `ColumnNotFound` for unknown columns,
/// `DuplicateColumnName` when a column is folded twice or output names
/// collide, `IncompatibleFoldType` when a family has no common type, and
/// `Planning` when there is nothing to fold.
pub fn bind_unpivot(unpivot: &UnpivotOp, input: &Schema) -> Result<BoundUnpivot> {
    let families: Vec<Vec<FoldColumn>> = match &unpivot.fold {
        FoldSpec::Families(families) => families.clone(),
        FoldSpec::AllExcept(keep) => {
            for name in keep {
                resolve_column(input, name)?;
            }
            vec![
                input
                    .names()
                    .into_iter()
                    .filter(|name| !keep.iter().any(|k| k == name))
                    .map(FoldColumn::new)
                    .collect(),
            ]
        }
    };

    let width = families.first().map_or(0, Vec::len);
    for family in &families {
        if family.len() != width {
            return Err(Error::UnpivotArityMismatch {
                expected: width,
                found: family.len(),
            });
        }
    }
    if unpivot.value_columns.len() != families.len() {
        return Err(Error::UnpivotArityMismatch {
            expected: families.len(),
            found: unpivot.value_columns.len(),
        });
    }
    if width == 0 {
        return Err(Error::Planning("UNPIVOT has no columns to fold".to_string()));
    }

    let mut folded: FastHashSet<usize> = FastHashSet::default();
    let mut bound = Vec::with_capacity(families.len());
    for family in &families {
        let mut columns = Vec::with_capacity(width);
        let mut target = LogicalType::Null;
        for fold in family {
            let index = resolve_column(input, &fold.column)?;
            if !folded.insert(index) {
                return Err(Error::DuplicateColumnName(fold.column.clone()));
            }
            let found = &input.fields()[index].data_type;
            target = target
                .common_supertype(found)
                .ok_or_else(|| Error::IncompatibleFoldType {
                    column: fold.column.clone(),
                    expected: target.to_string(),
                    found: found.to_string(),
                })?;
            columns.push(index);
        }
        bound.push(FoldFamily { columns, target });
    }

    let labels = (0..width)
        .map(|i| {
            families
                .iter()
                .find_map(|f| f[i].label.clone())
                .unwrap_or_else(|| {
                    families
                        .iter()
                        .map(|f| f[i].column.as_str())
                        .collect::<Vec<_>>()
                        .join("_")
                })
        })
        .collect();

    let keep: Vec<usize> = (0..input.len()).filter(|i| !folded.contains(i)).collect();
    let mut fields: Vec<Field> = keep.iter().map(|&i| input.fields()[i].clone()).collect();
    fields.push(Field::new(unpivot.name_column.clone(), LogicalType::String));
    for (name, family) in unpivot.value_columns.iter().zip(&bound) {
        fields.push(Field::new(name.clone(), family.target.clone()));
    }
    let schema = Schema::new(fields);
    if let Some(dup) = schema.duplicate_name() {
        return Err(Error::DuplicateColumnName(dup.to_string()));
    }

    Ok(BoundUnpivot {
        keep,
        families: bound,
        labels,
        include_nulls: unpivot.include_nulls,
        schema,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::plan::LogicalOperator;

    fn sales() -> Schema {
        Schema::new(vec![
            Field::new("empid", LogicalType::Int64),
            Field::new("jan", LogicalType::Int64),
            Field::new("feb", LogicalType::Float64),
            Field::new("jan_units", LogicalType::Int64),
            Field::new("feb_units", LogicalType::Int64),
            Field::new("note", LogicalType::String),
        ])
    }

    fn single(columns: &[&str]) -> UnpivotOp {
        UnpivotOp::new(
            LogicalOperator::scan("sales"),
            vec![columns.iter().map(|c| FoldColumn::new(*c)).collect()],
            "month",
            vec!["sales".to_string()],
        )
    }

    #[test]
    fn test_single_family() {
        let bound = bind_unpivot(&single(&["jan", "feb"]), &sales()).unwrap();
        assert_eq!(bound.keep, vec![0, 3, 4, 5]);
        assert_eq!(bound.labels, vec!["jan", "feb"]);
        assert_eq!(bound.families[0].target, LogicalType::Float64);
        assert_eq!(
            bound.schema.names(),
            vec!["empid", "jan_units", "feb_units", "note", "month", "sales"]
        );
        assert!(!bound.include_nulls);
    }

    #[test]
    fn test_multi_family_labels() {
        let unpivot = UnpivotOp::new(
            LogicalOperator::scan("sales"),
            vec![
                vec![FoldColumn::new("jan"), FoldColumn::new("feb")],
                vec![
                    FoldColumn::labeled("jan_units", "January"),
                    FoldColumn::new("feb_units"),
                ],
            ],
            "month",
            vec!["amount".to_string(), "units".to_string()],
        );
        let bound = bind_unpivot(&unpivot, &sales()).unwrap();
        assert_eq!(bound.labels, vec!["January", "feb_feb_units"]);
        assert_eq!(bound.keep, vec![0, 5]);
        assert_eq!(bound.families[1].target, LogicalType::Int64);
    }

    #[test]
    fn test_all_except() {
        let schema = Schema::new(vec![
            Field::new("empid", LogicalType::Int64),
            Field::new("jan", LogicalType::Int64),
            Field::new("feb", LogicalType::Int64),
        ]);
        let unpivot = UnpivotOp::all_except(
            LogicalOperator::scan("sales"),
            vec!["empid".to_string()],
            "month",
            "sales",
        );
        let bound = bind_unpivot(&unpivot, &schema).unwrap();
        assert_eq!(bound.labels, vec!["jan", "feb"]);
        assert_eq!(bound.keep, vec![0]);
    }

    #[test]
    fn test_arity_mismatch() {
        let unpivot = UnpivotOp::new(
            LogicalOperator::scan("sales"),
            vec![
                vec!["jan".into(), "feb".into(), "empid".into()],
                vec!["jan_units".into(), "feb_units".into()],
            ],
            "month",
            vec!["a".to_string(), "b".to_string()],
        );
        assert!(matches!(
            bind_unpivot(&unpivot, &sales()),
            Err(Error::UnpivotArityMismatch {
                expected: 3,
                found: 2
            })
        ));

        let mut values = single(&["jan", "feb"]);
        values.value_columns.push("extra".to_string());
        assert!(matches!(
            bind_unpivot(&values, &sales()),
            Err(Error::UnpivotArityMismatch {
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn test_bind_errors() {
        assert!(matches!(
            bind_unpivot(&single(&["jan", "note"]), &sales()),
            Err(Error::IncompatibleFoldType { column, .. }) if column == "note"
        ));
        assert!(matches!(
            bind_unpivot(&single(&["jan", "mar"]), &sales()),
            Err(Error::ColumnNotFound(_))
        ));
        assert!(matches!(
            bind_unpivot(&single(&["jan", "jan"]), &sales()),
            Err(Error::DuplicateColumnName(_))
        ));
        assert!(matches!(
            bind_unpivot(&single(&[]), &sales()),
            Err(Error::Planning(_))
        ));

        let mut collide = single(&["jan", "feb"]);
        collide.name_column = "empid".to_string();
        assert!(matches!(
            bind_unpivot(&collide, &sales()),
            Err(Error::DuplicateColumnName(name)) if name == "empid"
        ));
    }
}
