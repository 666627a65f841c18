use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::cleaner::CleaningStrategy;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Clean, load, analyze and report on a sales CSV extract",
    long_about = None
)]
pub struct Cli {
    /// YAML configuration file; every setting falls back to its default
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run all four stages: clean, SQL analysis, exploration, final report
    Run(RunArgs),
    /// Clean the raw extract and write the cleaned table plus its log
    Clean(CleanArgs),
    /// Load the cleaned table into SQLite and run the canned queries
    Analyze(AnalyzeArgs),
    /// Compute the exploratory sections, charts, dashboard and report
    Explore(ExploreArgs),
    /// Write the final project report listing every artifact
    Report(ReportArgs),
    /// Export dimension and metric tables plus the canned query texts
    Export(ExportArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Raw sales file to clean
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Directory for charts and reports
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: Option<PathBuf>,
    /// Missing value strategy
    #[arg(short = 's', long = "strategy", value_enum)]
    pub strategy: Option<CleaningStrategy>,
    /// Run log file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Raw sales file to clean
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Destination of the cleaned table
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Missing value strategy
    #[arg(short = 's', long = "strategy", value_enum)]
    pub strategy: Option<CleaningStrategy>,
    /// Print the cleaning summary as JSON
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Cleaned sales file to load
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// SQLite database file
    #[arg(short = 'd', long = "database")]
    pub database: Option<PathBuf>,
    /// Print the performance comparison as JSON
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ExploreArgs {
    /// Cleaned sales file to explore
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Directory for charts, dashboard and report
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: Option<PathBuf>,
    /// Skip every chart and the dashboard
    #[arg(long = "no-charts")]
    pub no_charts: bool,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Directory holding the generated artifacts
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// SQLite database file holding the loaded table
    #[arg(short = 'd', long = "database")]
    pub database: Option<PathBuf>,
    /// Destination directory (defaults to `<output_dir>/exports`)
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: Option<PathBuf>,
}
