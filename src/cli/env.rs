use clap::Parser;
use std::path::PathBuf;

use super::commands::Commands;
use super::output::{LogFormat, OutputFormat};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Enable debug mode
    #[arg(short, long)]
    pub debug: bool,

    /// Log line format (logs go to stderr)
    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Output format for progress events
    #[arg(short, long, value_enum, default_value = "human")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}
