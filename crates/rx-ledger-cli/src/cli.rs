use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "rx-ledger")]
#[command(
    about = "Import pharmacy prescription exports into a medication ledger",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import an export file (CSV or spreadsheet)
    Import(ImportArgs),
    /// Show recent imports
    History(HistoryArgs),
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Export file to import
    pub file: PathBuf,

    /// SQLite database path
    #[arg(long, default_value = "rx-ledger.db")]
    pub db: PathBuf,

    /// TOML file with import settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the full report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Rows searched for the patient header (overrides the config file)
    #[arg(long)]
    pub lookahead: Option<usize>,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// SQLite database path
    #[arg(long, default_value = "rx-ledger.db")]
    pub db: PathBuf,

    /// Number of imports to show
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}
