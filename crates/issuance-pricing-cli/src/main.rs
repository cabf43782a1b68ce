mod commands;
mod config;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use commands::calculators::{CappedArgs, GrossUpArgs, TieredArgs};
use commands::quote::QuoteArgs;
use commands::resolve::ResolveArgs;
use commands::tables::ValidateTablesArgs;
use commands::transition::TransitionArgs;
use config::{build_config, CliArgs};

/// Fee and cost pricing for structured-finance issuances
#[derive(Parser)]
#[command(
    name = "pricer",
    version,
    about = "Fee and cost pricing for structured-finance issuances",
    long_about = "Prices debenture, CRI, CRA, CR and commercial-note issuances with decimal \
                  precision: fixed catalog fees, B3 custody and registration, CVM and ANBIMA \
                  fees, gross-up, totals and per-series apportionment."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file (defaults to ./pricer.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true)]
    output: Option<OutputFormat>,

    /// Log level: trace, debug, info, warn, error (RUST_LOG overrides)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Price a full issuance from a JSON/YAML request
    Quote(QuoteArgs),
    /// Progressive-bracket calculation against a built-in or loaded table
    Tiered(TieredArgs),
    /// Percentage-of-volume fee clamped to a minimum and maximum
    Capped(CappedArgs),
    /// Gross up a net fee for a deduction rate
    GrossUp(GrossUpArgs),
    /// Show which cost tables and formulas apply to a classification
    Resolve(ResolveArgs),
    /// Apply a proposal status change
    Transition(TransitionArgs),
    /// Load and validate a rate-table snapshot
    ValidateTables(ValidateTablesArgs),
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

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{}: {}", "error".red().bold(), message);
    process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    let config = build_config(&CliArgs {
        config_file: cli.config.clone(),
        log_level: cli.log_level.clone(),
        output: cli.output.clone(),
    })
    .unwrap_or_else(|e| fail(e));

    init_tracing(config.log_level.as_filter_str());
    tracing::debug!(
        log_level = %config.log_level,
        rate_tables = ?config.rate_tables,
        output = ?config.output,
        "configuration loaded"
    );

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Quote(args) => commands::quote::run_quote(args, &config),
        Commands::Tiered(args) => commands::calculators::run_tiered(args, &config),
        Commands::Capped(args) => commands::calculators::run_capped(args),
        Commands::GrossUp(args) => commands::calculators::run_gross_up(args),
        Commands::Resolve(args) => commands::resolve::run_resolve(args),
        Commands::Transition(args) => commands::transition::run_transition(args),
        Commands::ValidateTables(args) => commands::tables::run_validate_tables(args, &config),
        Commands::Version => {
            println!("pricer {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&config.output, &value);
            process::exit(0);
        }
        Err(e) => fail(e),
    }
}
