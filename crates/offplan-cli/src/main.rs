mod commands;
mod input;
mod output;
mod telemetry;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::compare::CompareArgs;
use commands::mortgage::AmortizeArgs;
use commands::quote::{ExitArgs, QuoteArgs};
use commands::schema::MigrateArgs;

/// Off-plan property investment quotes
#[derive(Parser)]
#[command(
    name = "opq",
    version,
    about = "Off-plan property investment quotes",
    long_about = "Quote off-plan property investments with decimal precision: staged \
                  payment plans, phased appreciation, rental income, mortgage \
                  amortisation, exit scenarios and multi-quote recommendations."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log filter when OFFPLAN_LOG is unset (e.g. "debug", "offplan_core=trace")
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Full quote: summary, schedule, projection, mortgage and exits
    Quote(QuoteArgs),
    /// Payment schedule only
    Schedule(QuoteArgs),
    /// Year-by-year projection only
    Projection(QuoteArgs),
    /// Exit scenarios at chosen months
    Exit(ExitArgs),
    /// Standalone mortgage amortisation
    Amortize(AmortizeArgs),
    /// Score and rank several quotes
    Compare(CompareArgs),
    /// Migrate a stored input document to the current schema
    Migrate(MigrateArgs),
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

    if let Err(e) = telemetry::init(&cli.log_level) {
        eprintln!("{}: {}", "error".red().bold(), e);
        process::exit(2);
    }

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Quote(args) => commands::quote::run_quote(args),
        Commands::Schedule(args) => commands::quote::run_schedule(args),
        Commands::Projection(args) => commands::quote::run_projection(args),
        Commands::Exit(args) => commands::quote::run_exit(args),
        Commands::Amortize(args) => commands::mortgage::run_amortize(args),
        Commands::Compare(args) => commands::compare::run_compare(args),
        Commands::Migrate(args) => commands::schema::run_migrate(args),
        Commands::Version => {
            println!("opq {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
