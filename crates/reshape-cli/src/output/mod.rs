//! Output formatting for CLI commands.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use reshape_engine::QueryResult;
use serde_json::{Map, Value as JsonValue};

/// Output format selection.
#[derive(Clone, Copy)]
pub enum Format {
    Table,
    Json,
}

impl From<crate::OutputFormat> for Format {
    fn from(f: crate::OutputFormat) -> Self {
        match f {
            crate::OutputFormat::Table => Format::Table,
            crate::OutputFormat::Json => Format::Json,
        }
    }
}

/// Create a styled table with consistent formatting.
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
    table
}

/// Add a header row to a table.
pub fn add_header<S: AsRef<str>>(table: &mut Table, headers: &[S]) {
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h.as_ref()).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );
}

/// Converts a result into a JSON array of objects keyed by column name.
pub fn result_to_json(result: &QueryResult) -> Result<JsonValue> {
    let mut records = Vec::with_capacity(result.row_count());
    for row in result.iter() {
        let mut record = Map::new();
        for (name, value) in result.columns.iter().zip(row) {
            record.insert(name.clone(), serde_json::to_value(value)?);
        }
        records.push(JsonValue::Object(record));
    }
    Ok(JsonValue::Array(records))
}

/// Print a query result as a table or JSON.
pub fn print_result(result: &QueryResult, format: Format, quiet: bool) -> Result<()> {
    if quiet {
        return Ok(());
    }

    match format {
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(&result_to_json(result)?)?);
        }
        Format::Table => {
            let mut table = create_table();
            add_header(&mut table, &result.columns);
            for row in result.iter() {
                table.add_row(row.iter().map(|v| {
                    if v.is_null() {
                        Cell::new("NULL").fg(Color::DarkGrey)
                    } else {
                        Cell::new(v)
                    }
                }));
            }
            println!("{table}");
            status(&format!("({} rows)", result.row_count()), quiet);
        }
    }
    Ok(())
}

/// Print a status message (respects quiet mode).
pub fn status(msg: &str, quiet: bool) {
    if !quiet {
        println!("{msg}");
    }
}
