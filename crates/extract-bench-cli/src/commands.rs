use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "extract-bench")]
#[command(about = "Benchmark PDF text extractors against a deduplicated corpus", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub run: RunArgs,

    /// Configuration file (defaults to ./ExtractBench.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<String>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Files, directories or glob patterns making up the corpus
    #[arg(value_name = "PATTERN")]
    pub patterns: Vec<String>,

    /// Write the ranked scores to a CSV file
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,

    /// Directory for inspection reports and conversion artifacts
    #[arg(long, global = true, value_name = "DIR")]
    pub results_dir: Option<PathBuf>,

    /// Number of worker threads (0 = one per CPU)
    #[arg(long, short = 'j', global = true, value_name = "N")]
    pub jobs: Option<usize>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Find duplicate files in the corpus
    Dedupe {
        /// Files, directories or glob patterns making up the corpus
        #[arg(value_name = "PATTERN", required = true)]
        patterns: Vec<String>,

        /// Move duplicates into the quarantine directory
        #[arg(long)]
        quarantine: bool,
    },
    /// Print configuration values
    PrintConfig,
}
