//! Pivot command.

use anyhow::{Result, bail};
use reshape_engine::query::plan::PivotOp;
use reshape_engine::query::{LogicalExpression, LogicalOperator, LogicalPlan};
use reshape_engine::{Config, DomainOrder};
use tracing::debug;

use super::parse;
use crate::input::{INPUT_TABLE, Input};
use crate::output::{self, Format};
use crate::{OutputFormat, PivotArgs};

/// Builds the pivot plan described by the arguments.
fn build_plan(args: &PivotArgs) -> Result<LogicalPlan> {
    if args.values.len() > args.on.len() {
        bail!(
            "{} --in lists given for {} --on columns",
            args.values.len(),
            args.on.len()
        );
    }

    let mut pivot = PivotOp::new(LogicalOperator::scan(INPUT_TABLE));
    for (i, on) in args.on.iter().enumerate() {
        let values = args.values.get(i).map(String::as_str);
        pivot = pivot.on_entry(parse::parse_on(on, values)?);
    }
    for using in &args.using {
        pivot = pivot.using(parse::parse_aggregate(using)?);
    }
    for column in &args.group_by {
        pivot = pivot.group_by(LogicalExpression::column(column.as_str()));
    }
    Ok(LogicalPlan::new(pivot.build()))
}

/// Run the pivot command.
pub fn run(args: &PivotArgs, config: Config, format: OutputFormat, quiet: bool) -> Result<()> {
    let plan = build_plan(args)?;
    let config = if args.sort {
        config.with_domain_order(DomainOrder::Sorted)
    } else {
        config
    };

    let db = Input::load(&args.file)?.into_database(config)?;
    let result = db.execute(&plan)?;
    debug!(columns = result.column_count(), rows = result.row_count(), "pivot done");

    let fmt: Format = format.into();
    output::print_result(&result, fmt, quiet)
}
