//! Parsing of the textual command-line arguments into plan pieces.

use std::sync::OnceLock;

use anyhow::{Result, anyhow, bail};
use regex::Regex;
use reshape_common::types::Value;
use reshape_engine::query::LogicalExpression;
use reshape_engine::query::plan::{
    AggregateExpr, AggregateFunction, FoldColumn, PivotOn, PivotValue, SortOrder,
};

fn aggregate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?i)^\s*([a-z_][a-z0-9_]*)\s*\(\s*(distinct\s+)?([^()]*?)\s*\)\s*(?:as\s+("[^"]+"|[a-z_][a-z0-9_]*))?\s*$"#,
        )
        .expect("aggregate pattern is valid")
    })
}

/// Parses `function([DISTINCT] column | *) [AS alias]`.
pub fn parse_aggregate(text: &str) -> Result<AggregateExpr> {
    let captures = aggregate_pattern()
        .captures(text)
        .ok_or_else(|| anyhow!("cannot parse aggregate '{text}', expected e.g. sum(x) AS total"))?;

    let name = &captures[1];
    let function = AggregateFunction::from_name(name)
        .ok_or_else(|| anyhow!("unknown aggregate function '{name}'"))?;
    let distinct = captures.get(2).is_some();
    let argument = &captures[3];

    let mut aggregate = match argument {
        "*" if function == AggregateFunction::Count && !distinct => AggregateExpr::count_star(),
        "*" => bail!("only count accepts *"),
        "" => bail!("aggregate '{text}' has no argument"),
        column => AggregateExpr::new(function, LogicalExpression::column(unquote(column))),
    };
    if distinct {
        aggregate = aggregate.distinct();
    }
    if let Some(alias) = captures.get(4) {
        aggregate = aggregate.with_alias(unquote(alias.as_str()));
    }
    Ok(aggregate)
}

/// Parses `column [ASC|DESC]` together with an optional explicit value list.
pub fn parse_on(text: &str, values: Option<&str>) -> Result<PivotOn> {
    let mut parts = text.split_whitespace();
    let column = parts
        .next()
        .ok_or_else(|| anyhow!("--on needs a column name"))?;
    let order = match parts.next().map(str::to_ascii_lowercase).as_deref() {
        None => None,
        Some("asc") => Some(SortOrder::Ascending),
        Some("desc") => Some(SortOrder::Descending),
        Some(other) => bail!("unexpected '{other}' in --on '{text}', expected ASC or DESC"),
    };
    if let Some(extra) = parts.next() {
        bail!("unexpected '{extra}' in --on '{text}'");
    }

    let mut on = PivotOn::new(LogicalExpression::column(unquote(column)));
    if let Some(order) = order {
        on = on.with_order(order);
    }
    if let Some(values) = values {
        on = on.with_values(parse_values(values)?);
    }
    Ok(on)
}

/// Parses `v1,v2=alias,NULL`. Values stay strings and are cast to the
/// type of the pivoted expression during binding.
pub fn parse_values(text: &str) -> Result<Vec<PivotValue>> {
    text.split(',')
        .map(|item| {
            let (raw, alias) = match item.split_once('=') {
                Some((raw, alias)) => (raw.trim(), Some(alias.trim())),
                None => (item.trim(), None),
            };
            if raw.is_empty() {
                bail!("empty value in list '{text}'");
            }
            let value = if raw.eq_ignore_ascii_case("null") {
                Value::Null
            } else {
                Value::from(unquote(raw))
            };
            Ok(match alias {
                Some(alias) if !alias.is_empty() => PivotValue::aliased(value, alias),
                Some(_) => bail!("empty alias in list '{text}'"),
                None => PivotValue::new(value),
            })
        })
        .collect()
}

/// Parses one fold family: `col,col:label,..`.
pub fn parse_family(text: &str) -> Result<Vec<FoldColumn>> {
    text.split(',')
        .map(|item| {
            let item = item.trim();
            match item.split_once(':') {
                Some((column, label)) if !column.trim().is_empty() => {
                    Ok(FoldColumn::labeled(column.trim(), label.trim()))
                }
                None if !item.is_empty() => Ok(FoldColumn::new(item)),
                _ => bail!("empty column in fold family '{text}'"),
            }
        })
        .collect()
}

fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}
