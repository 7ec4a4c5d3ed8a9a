use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use commands::{
    cells::{self, CellsArgs},
    clean::{self, CleanArgs},
    fmt::{self, FmtArgs},
    merge_outputs::{self, MergeOutputsArgs},
    renumber::{self, RenumberArgs},
    run::{self, RunArgs},
};
use nbtidy_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod engine;
mod notebook;

#[derive(Parser, Debug)]
#[command(name = "nbtidy", about = "Notebook post-execution cleanup CLI")]
struct Cli {
    /// Log pipeline stages and engine invocations to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// YAML configuration (marker tags, alignment policy, engine program).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge consecutive stream outputs (e.g. stderr) of each cell.
    MergeOutputs(MergeOutputsArgs),
    /// Renumber non-null execution counts from 1, in document order.
    Renumber(RenumberArgs),
    /// Remove engine bookkeeping metadata from a notebook.
    Clean(CleanArgs),
    /// Execute a notebook, then merge outputs, align cells and clean metadata.
    Run(RunArgs),
    /// Reformat notebook JSON and filter cell fields.
    Fmt(FmtArgs),
    /// Print a cell or a slice of cells.
    #[command(allow_negative_numbers = true)]
    Cells(CellsArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::MergeOutputs(args) => merge_outputs::run(&args),
        Command::Renumber(args) => renumber::run(&args),
        Command::Clean(args) => clean::run(&args),
        Command::Run(args) => run::run(&args, &config),
        Command::Fmt(args) => fmt::run(&args),
        Command::Cells(args) => cells::run(&args),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    // RUST_LOG, when set, wins over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
