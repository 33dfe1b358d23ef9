use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Parser)]
#[command(name = "drilling-etl")]
#[command(about = "Normalize drilling machine JSON records in batch")]
pub struct CliConfig {
    /// Folder containing the raw JSON files
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Folder receiving the processed files
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// File name pattern (`*` and `?` wildcards)
    #[arg(long)]
    pub pattern: Option<String>,

    /// TOML file with pipeline and transform settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Also write logs to a timestamped file in this folder
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Write the run metrics as JSON to this path
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Emit logs as JSON lines instead of the compact console format
    #[arg(long, conflicts_with = "log_dir")]
    pub json_logs: bool,

    /// List the files that would be processed without touching them
    #[arg(long)]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}
