mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::distribution::{ComputeArgs, RefinanceArgs};
use commands::ledger::{
    BreakdownArgs, CopyStructureArgs, DeleteArgs, ListArgs, ProcessArgs, UpdateArgs,
};
use output::OutputFormat;

/// Real-estate distribution waterfalls
#[derive(Parser)]
#[command(
    name = "rwf",
    version,
    about = "Real-estate distribution waterfalls",
    long_about = "Process property cash distributions through tiered waterfalls with \
                  decimal precision: debt and refinance netting, priority tiers, and \
                  exact fan-out to entity investments and their owners."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine configuration file (YAML or JSON)
    #[arg(long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a self-contained distribution scenario without a ledger
    Compute(ComputeArgs),
    /// Net refinance proceeds against the retired loan and fees
    Refinance(RefinanceArgs),
    /// Process a distribution against a ledger file and persist it
    Process(ProcessArgs),
    /// Show the stored breakdown of a distribution
    Breakdown(BreakdownArgs),
    /// List a property's distributions, newest first
    List(ListArgs),
    /// Edit a distribution's descriptive fields
    Update(UpdateArgs),
    /// Delete a distribution (refinance debt changes are kept)
    Delete(DeleteArgs),
    /// Copy a global waterfall structure to a property
    CopyStructure(CopyStructureArgs),
    /// Print version information
    Version,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let config = match input::file::read_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Compute(args) => commands::distribution::run_compute(args, &config),
        Commands::Refinance(args) => commands::distribution::run_refinance(args),
        Commands::Process(args) => commands::ledger::run_process(args, config),
        Commands::Breakdown(args) => commands::ledger::run_breakdown(args, config),
        Commands::List(args) => commands::ledger::run_list(args, config),
        Commands::Update(args) => commands::ledger::run_update(args, config),
        Commands::Delete(args) => commands::ledger::run_delete(args, config),
        Commands::CopyStructure(args) => commands::ledger::run_copy_structure(args, config),
        Commands::Version => {
            println!("rwf {}", env!("CARGO_PKG_VERSION"));
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
