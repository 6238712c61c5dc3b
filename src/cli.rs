use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Xlsx,
    Csv,
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliOptions {
    /// Browser profiles directory (defaults to the WeChat radium profiles folder)
    #[arg(long)]
    pub profiles_dir: Option<PathBuf>,

    /// Output directory for the exported file (overrides config when set)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Optional path to config file (YAML)
    #[arg(long)]
    pub config_path: Option<PathBuf>,

    /// Export format
    #[arg(long, value_enum, default_value_t = OutputFormat::Xlsx)]
    pub format: OutputFormat,

    /// Render timestamps in the local time zone instead of UTC
    #[arg(long)]
    pub local_time: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

pub fn parse() -> CliOptions {
    CliOptions::parse()
}
