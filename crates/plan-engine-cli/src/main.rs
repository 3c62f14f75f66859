mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::plan::{FieldsArgs, JourneysArgs, KpisArgs, RecalcArgs, RowsArgs};

/// Workforce and financial planning calculations
#[derive(Parser)]
#[command(
    name = "wfp",
    version,
    about = "Workforce and financial planning calculations",
    long_about = "A CLI for the office-year planning engine. Loads a plan document \
                  (JSON or YAML), recomputes roll-ups and derived KPIs such as net \
                  sales, EBITDA and seniority-journey mix, and prints the results \
                  with decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Recompute a plan and print every office-level field
    Recalc(RecalcArgs),
    /// KPI summary with optional baseline deltas
    Kpis(KpisArgs),
    /// Projected display rows (office / role / level grouping)
    Rows(RowsArgs),
    /// Monthly seniority-journey mix
    Journeys(JourneysArgs),
    /// Print the standard field catalogue
    Fields(FieldsArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Recalc(args) => commands::plan::run_recalc(args),
        Commands::Kpis(args) => commands::plan::run_kpis(args),
        Commands::Rows(args) => commands::plan::run_rows(args),
        Commands::Journeys(args) => commands::plan::run_journeys(args),
        Commands::Fields(args) => commands::plan::run_fields(args),
        Commands::Version => {
            println!("wfp {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
