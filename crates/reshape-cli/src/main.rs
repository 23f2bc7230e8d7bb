//! Reshape CLI - pivot and unpivot JSON tables from the command line.
//!
//! Reads a JSON array of objects, registers it as a table and runs a single
//! PIVOT or UNPIVOT over it. Results print as a table or as JSON.

mod commands;
mod input;
mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use reshape_engine::Config;

/// Reshape table reshaping tool.
///
/// Turns row values into columns (pivot) and columns into rows (unpivot).
#[derive(Parser)]
#[command(name = "reshape")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Worker threads (defaults to available parallelism)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Maximum number of distinct pivot values discovered by scanning
    #[arg(long, global = true)]
    max_columns: Option<usize>,

    /// Suppress result output and info messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

/// Output format options.
#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// Machine-readable JSON format (array of objects)
    Json,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Turn the values of an expression into columns
    Pivot(PivotArgs),

    /// Fold columns into name/value rows
    Unpivot(UnpivotArgs),

    /// Display the inferred schema of an input file
    Schema {
        /// Path to a JSON array of objects
        file: PathBuf,
    },
}

/// Arguments of `reshape pivot`.
#[derive(Args)]
struct PivotArgs {
    /// Path to a JSON array of objects
    file: PathBuf,

    /// Column whose values become columns, optionally followed by ASC or DESC
    #[arg(long, required = true)]
    on: Vec<String>,

    /// Explicit comma-separated values for the matching --on (`v` or `v=alias`)
    #[arg(long = "in")]
    values: Vec<String>,

    /// Aggregate computed per cell, e.g. "sum(population) AS total"
    #[arg(long)]
    using: Vec<String>,

    /// Grouping column (defaults to every column not referenced by --on or --using)
    #[arg(long)]
    group_by: Vec<String>,

    /// Order scanned pivot values ascending instead of by first appearance
    #[arg(long)]
    sort: bool,
}

/// Arguments of `reshape unpivot`.
#[derive(Args)]
struct UnpivotArgs {
    /// Path to a JSON array of objects
    file: PathBuf,

    /// Comma-separated family of columns folded into one value column (`col` or `col:label`)
    #[arg(long, conflicts_with = "keep")]
    fold: Vec<String>,

    /// Fold every column except these (single value column)
    #[arg(long)]
    keep: Vec<String>,

    /// Name of the label column
    #[arg(long, default_value = "name")]
    name: String,

    /// Name of a value column, one per --fold family
    #[arg(long, default_value = "value")]
    value: Vec<String>,

    /// Keep rows whose folded values are all null
    #[arg(long)]
    include_nulls: bool,
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::in_memory();
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        if let Some(limit) = self.max_columns {
            config = config.with_pivot_column_limit(limit);
        }
        if self.verbose {
            config = config.with_query_logging();
        }
        config
    }
}

fn main() {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else if !cli.quiet {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    let config = cli.config();
    let result = match cli.command {
        Commands::Pivot(args) => commands::pivot::run(&args, config, cli.format, cli.quiet),
        Commands::Unpivot(args) => commands::unpivot::run(&args, config, cli.format, cli.quiet),
        Commands::Schema { file } => commands::schema::run(&file, cli.format, cli.quiet),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
