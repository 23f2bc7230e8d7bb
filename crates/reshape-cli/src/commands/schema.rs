//! Input schema command.

use std::path::Path;

use anyhow::Result;
use comfy_table::Cell;
use serde::Serialize;

use crate::OutputFormat;
use crate::input::Input;
use crate::output::{self, Format};

/// Schema output.
#[derive(Serialize)]
struct SchemaOutput {
    rows: usize,
    columns: Vec<ColumnOutput>,
}

/// Column information.
#[derive(Serialize)]
struct ColumnOutput {
    name: String,
    data_type: String,
    nulls: usize,
}

/// Run the schema command.
pub fn run(path: &Path, format: OutputFormat, quiet: bool) -> Result<()> {
    let input = Input::load(path)?;
    let output = SchemaOutput {
        rows: input.rows.len(),
        columns: input
            .schema
            .fields()
            .iter()
            .enumerate()
            .map(|(i, field)| ColumnOutput {
                name: field.name.clone(),
                data_type: field.data_type.to_string(),
                nulls: input.rows.iter().filter(|row| row[i].is_null()).count(),
            })
            .collect(),
    };

    let fmt: Format = format.into();
    match fmt {
        Format::Json => {
            if !quiet {
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
        }
        Format::Table => {
            if !quiet {
                let mut table = output::create_table();
                output::add_header(&mut table, &["Column", "Type", "Nulls"]);
                for column in &output.columns {
                    table.add_row(vec![
                        Cell::new(&column.name),
                        Cell::new(&column.data_type),
                        Cell::new(column.nulls),
                    ]);
                }
                println!("{table}");
                output::status(&format!("({} rows)", output.rows), quiet);
            }
        }
    }

    Ok(())
}
