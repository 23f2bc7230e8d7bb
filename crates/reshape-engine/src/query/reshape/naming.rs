//! Output column naming for PIVOT.
//!
//! A pivot produces one column per (domain entry, using aggregate) pair.
//! Names are derived from the rendered domain entry and the aggregate's
//! name, and must be unique across the whole output, grouping columns
//! included.

use std::sync::OnceLock;

use regex::Regex;
use reshape_common::types::{Domain, Value};
use reshape_common::utils::error::{Error, Result};
use reshape_common::utils::hash::FastHashSet;

use crate::query::plan::AggregateExpr;

/// One generated pivot column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputColumn {
    /// Column name.
    pub name: String,
    /// Position of the domain entry feeding this column.
    pub domain_index: usize,
    /// Position of the using aggregate feeding this column.
    pub using_index: usize,
}

/// Renders one domain component.
#[must_use]
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.to_string(),
        other => other.to_string(),
    }
}

/// Renders a domain entry: its label, or its components joined with `_`.
#[must_use]
pub fn render_entry(tuple: &[Value], label: Option<&str>) -> String {
    match label {
        Some(label) => label.to_string(),
        None => tuple.iter().map(render_value).collect::<Vec<_>>().join("_"),
    }
}

/// Name contributed by a using aggregate.
#[must_use]
pub fn using_name(agg: &AggregateExpr) -> String {
    agg.output_name()
}

/// Derives the generated columns, domain-major with using order nested.
///
/// `has_on` is false for a pivot without an `ON` clause, where the domain is
/// the unit domain and columns are named by the aggregates alone.
///
/// # Errors
///
/// Returns `InvalidColumnName` for an empty name and `DuplicateColumnName`
/// when two columns, or a column and a grouping column, share a name.
pub fn resolve_columns(
    domain: &Domain,
    using: &[AggregateExpr],
    has_on: bool,
    group_names: &[String],
) -> Result<Vec<OutputColumn>> {
    let using_names: Vec<String> = using.iter().map(using_name).collect();
    let bare_domain = using.len() == 1 && using[0].alias.is_none();

    let mut seen: FastHashSet<String> = group_names.iter().cloned().collect();
    let mut columns = Vec::with_capacity(domain.len() * using.len());

    for (domain_index, (tuple, label)) in domain.iter().enumerate() {
        let entry = render_entry(tuple, label);
        for (using_index, using) in using_names.iter().enumerate() {
            let name = if !has_on {
                using.clone()
            } else if bare_domain {
                entry.clone()
            } else {
                format!("{entry}_{using}")
            };

            if name.is_empty() {
                return Err(Error::InvalidColumnName(name));
            }
            if !seen.insert(name.clone()) {
                return Err(Error::DuplicateColumnName(name));
            }
            columns.push(OutputColumn {
                name,
                domain_index,
                using_index,
            });
        }
    }
    Ok(columns)
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is a valid regex")
    })
}

/// Returns true if `name` needs no quoting.
#[must_use]
pub fn is_plain_identifier(name: &str) -> bool {
    identifier_pattern().is_match(name)
}

/// Quotes `name` unless it is a plain identifier. Embedded quotes are
/// doubled.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    if is_plain_identifier(name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::plan::{AggregateFunction, LogicalExpression};

    fn years() -> Domain {
        let mut builder = Domain::builder(1);
        builder.push([Value::Int64(2000)], None).unwrap();
        builder.push([Value::Int64(2010)], None).unwrap();
        builder.finish()
    }

    fn names(columns: &[OutputColumn]) -> Vec<&str> {
        columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_single_using_uses_domain_only() {
        let cols = resolve_columns(
            &years(),
            &[AggregateExpr::sum("population")],
            true,
            &["country".to_string()],
        )
        .unwrap();
        assert_eq!(names(&cols), vec!["2000", "2010"]);
        assert_eq!(cols[1].domain_index, 1);
    }

    #[test]
    fn test_multiple_using_nested_in_domain() {
        let using = [
            AggregateExpr::sum("population").with_alias("total"),
            AggregateExpr::new(AggregateFunction::Max, LogicalExpression::column("population")),
        ];
        let cols = resolve_columns(&years(), &using, true, &[]).unwrap();
        assert_eq!(
            names(&cols),
            vec![
                "2000_total",
                "2000_max(population)",
                "2010_total",
                "2010_max(population)"
            ]
        );
        assert_eq!(cols[3].using_index, 1);
    }

    #[test]
    fn test_aliased_single_using_is_suffixed() {
        let using = [AggregateExpr::sum("population").with_alias("pop")];
        let cols = resolve_columns(&years(), &using, true, &[]).unwrap();
        assert_eq!(names(&cols), vec!["2000_pop", "2010_pop"]);
    }

    #[test]
    fn test_no_on_uses_aggregate_names() {
        let using = [AggregateExpr::count_star(), AggregateExpr::sum("x")];
        let cols = resolve_columns(&Domain::unit(), &using, false, &[]).unwrap();
        assert_eq!(names(&cols), vec!["count(*)", "sum(x)"]);
    }

    #[test]
    fn test_labels_and_nulls() {
        let mut builder = Domain::builder(2);
        builder
            .push([Value::from("NL"), Value::Null], None)
            .unwrap();
        builder
            .push([Value::from("US"), Value::Bool(true)], Some("usa".to_string()))
            .unwrap();
        let cols =
            resolve_columns(&builder.finish(), &[AggregateExpr::count_star()], true, &[]).unwrap();
        assert_eq!(names(&cols), vec!["NL_NULL", "usa"]);
    }

    #[test]
    fn test_collision_with_group_column() {
        let mut builder = Domain::builder(1);
        builder.push([Value::from("country")], None).unwrap();
        let err = resolve_columns(
            &builder.finish(),
            &[AggregateExpr::count_star()],
            true,
            &["country".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateColumnName(name) if name == "country"));
    }

    #[test]
    fn test_collision_between_entries() {
        let mut builder = Domain::builder(1);
        builder.push([Value::Int64(1)], None).unwrap();
        builder.push([Value::from("1")], None).unwrap();
        let err =
            resolve_columns(&builder.finish(), &[AggregateExpr::count_star()], true, &[]).unwrap_err();
        assert!(matches!(err, Error::DuplicateColumnName(_)));
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut builder = Domain::builder(1);
        builder.push([Value::from("")], None).unwrap();
        let err =
            resolve_columns(&builder.finish(), &[AggregateExpr::count_star()], true, &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidColumnName(_)));
    }

    #[test]
    fn test_quote_identifier() {
        assert!(is_plain_identifier("pop_2000"));
        assert!(!is_plain_identifier("2000"));
        assert_eq!(quote_identifier("total"), "total");
        assert_eq!(quote_identifier("sum(x)"), "\"sum(x)\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
