//! # Utility Module
//!
//! Glue between the command line, the loaded configuration and the export
//! pipeline.

use tracing::info;

use crate::cli::{CliOptions, OutputFormat};
use crate::config::LoadedConfig;
use crate::error::ConfigError;
use crate::export::ExportFormat;
use crate::pipeline::ExportRequest;
use crate::report::CollectingReporter;
use crate::timestamp::TimeZoneMode;

/// Convert CLI output format to internal enum
pub fn format_from_cli(format: OutputFormat) -> ExportFormat {
    match format {
        OutputFormat::Xlsx => ExportFormat::Xlsx,
        OutputFormat::Csv => ExportFormat::Csv,
    }
}

/// Resolve directories and overrides into a ready-to-run request.
pub fn build_request(
    opts: &CliOptions,
    loaded: &LoadedConfig,
) -> Result<ExportRequest, ConfigError> {
    let mut config = loaded.config.clone();
    if opts.local_time {
        config.timezone = TimeZoneMode::Local;
    }

    let profiles_dir = match &opts.profiles_dir {
        Some(dir) => dir.clone(),
        None => config.default_profiles_dir()?,
    };
    let output_dir = opts
        .output
        .clone()
        .unwrap_or_else(|| config.output_dir_path());
    let temp_dir = config.temp_dir_path(&output_dir);

    info!(
        "profiles={} output={} config_hash={}",
        profiles_dir.display(),
        output_dir.display(),
        loaded.config_hash
    );

    Ok(ExportRequest {
        comment: format!(
            "wxhistory {} config_hash={}",
            env!("CARGO_PKG_VERSION"),
            loaded.config_hash
        ),
        config,
        profiles_dir,
        output_dir,
        temp_dir,
        format: format_from_cli(opts.format),
    })
}

/// One line naming the profiles that could not be read, if any.
pub fn failure_summary(reporter: &CollectingReporter) -> Option<String> {
    let failed = reporter.failed_profiles();
    if failed.is_empty() {
        return None;
    }
    Some(format!(
        "{} profile(s) could not be read: {}",
        failed.len(),
        failed.join(", ")
    ))
}
