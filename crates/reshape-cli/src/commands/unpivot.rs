//! Unpivot command.

use anyhow::Result;
use reshape_engine::Config;
use reshape_engine::query::plan::UnpivotOp;
use reshape_engine::query::{LogicalOperator, LogicalPlan};
use tracing::debug;

use super::parse;
use crate::input::{INPUT_TABLE, Input};
use crate::output::{self, Format};
use crate::{OutputFormat, UnpivotArgs};

/// Builds the unpivot plan described by the arguments.
///
/// Without `--fold`, every column not named by `--keep` is folded into the
/// first `--value` column.
fn build_plan(args: &UnpivotArgs) -> Result<LogicalPlan> {
    let input = LogicalOperator::scan(INPUT_TABLE);
    let unpivot = if args.fold.is_empty() {
        let value = args.value.first().cloned().unwrap_or_else(|| "value".to_string());
        UnpivotOp::all_except(input, args.keep.clone(), args.name.as_str(), value)
    } else {
        let families = args
            .fold
            .iter()
            .map(|family| parse::parse_family(family))
            .collect::<Result<Vec<_>>>()?;
        UnpivotOp::new(input, families, args.name.as_str(), args.value.clone())
    };
    Ok(LogicalPlan::new(unpivot.include_nulls(args.include_nulls).build()))
}

/// Run the unpivot command.
pub fn run(args: &UnpivotArgs, config: Config, format: OutputFormat, quiet: bool) -> Result<()> {
    let plan = build_plan(args)?;
    let db = Input::load(&args.file)?.into_database(config)?;
    let result = db.execute(&plan)?;
    debug!(rows = result.row_count(), "unpivot done");

    let fmt: Format = format.into();
    output::print_result(&result, fmt, quiet)
}
