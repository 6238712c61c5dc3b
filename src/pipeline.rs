//! # Export Pipeline
//!
//! Discovery, per-profile reads with failure isolation, merge, and output.
//! Only a failed discovery or an empty merge abort the run; a profile that
//! cannot be read is reported and skipped.

use std::path::PathBuf;

use chrono::{Local, NaiveDateTime};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::ExportError;
use crate::export::{self, ExportFormat};
use crate::history::{ReadOptions, VisitRecord, read_profile_history};
use crate::profile::{ProfileSource, discover_profiles};
use crate::report::{Diagnostic, Reporter};

/// Everything one run needs, resolved from config and CLI.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub config: Config,
    pub profiles_dir: PathBuf,
    pub output_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub format: ExportFormat,
    /// Stored in the workbook properties.
    pub comment: String,
}

#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub output_path: PathBuf,
    pub records: usize,
    pub profiles_read: usize,
    pub profiles_skipped: usize,
    pub profiles_failed: usize,
}

/// Records read from one profile, in query order.
#[derive(Debug, Clone)]
pub struct ProfileBatch {
    pub profile_id: String,
    pub records: Vec<VisitRecord>,
}

#[derive(Debug, Default, Clone, Copy)]
struct ReadStats {
    read: usize,
    skipped: usize,
    failed: usize,
}

/// Concatenate batches in order; no sorting across profiles.
pub fn merge_batches(batches: Vec<ProfileBatch>) -> Vec<VisitRecord> {
    let total = batches.iter().map(|b| b.records.len()).sum();
    let mut merged = Vec::with_capacity(total);
    for batch in batches {
        merged.extend(batch.records);
    }
    merged
}

fn collect_batches(
    profiles: &[ProfileSource],
    opts: ReadOptions<'_>,
) -> (Vec<ProfileBatch>, ReadStats) {
    let mut batches = Vec::new();
    let mut stats = ReadStats::default();

    for profile in profiles {
        info!("checking profile {}", profile.dir.display());
        let Some(history) = profile.history.as_deref() else {
            stats.skipped += 1;
            opts.reporter.report(Diagnostic::ProfileSkipped {
                profile_id: profile.id.clone(),
                reason: "no history file".to_string(),
            });
            continue;
        };

        info!("reading history {}", history.display());
        match read_profile_history(&profile.id, history, opts) {
            Ok(records) => {
                stats.read += 1;
                let batch = ProfileBatch {
                    profile_id: profile.id.clone(),
                    records,
                };
                opts.reporter.report(Diagnostic::ProfileRead {
                    profile_id: batch.profile_id.clone(),
                    rows: batch.records.len(),
                });
                batches.push(batch);
            }
            Err(err) => {
                stats.failed += 1;
                opts.reporter.report(Diagnostic::ProfileFailed {
                    profile_id: profile.id.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    (batches, stats)
}

/// Run a full export and return where the file was written.
pub fn run_export(
    request: &ExportRequest,
    reporter: &dyn Reporter,
) -> Result<ExportOutcome, ExportError> {
    run_export_at(request, reporter, Local::now().naive_local())
}

/// As [`run_export`], with an explicit generation time for the file name.
pub fn run_export_at(
    request: &ExportRequest,
    reporter: &dyn Reporter,
    generated_at: NaiveDateTime,
) -> Result<ExportOutcome, ExportError> {
    let cfg = &request.config;
    let profiles = discover_profiles(
        &request.profiles_dir,
        &cfg.profile_pattern,
        &cfg.history_file,
    )?;
    info!(
        "found {} profile folder(s) in {}",
        profiles.len(),
        request.profiles_dir.display()
    );

    export::ensure_output_dir(&request.output_dir)?;

    let opts = ReadOptions {
        temp_dir: &request.temp_dir,
        zone: cfg.timezone,
        reporter,
    };
    let (batches, stats) = collect_batches(&profiles, opts);
    let records = merge_batches(batches);
    if records.is_empty() {
        warn!(
            "no records extracted: {} read, {} skipped, {} failed",
            stats.read, stats.skipped, stats.failed
        );
        return Err(ExportError::NoData);
    }

    let table = export::build_table(&records, &cfg.columns, cfg.transition_labels);
    let file_name = export::output_file_name(
        &cfg.file_prefix,
        generated_at,
        request.format.extension(),
    );
    let output_path = request.output_dir.join(file_name);
    match request.format {
        ExportFormat::Xlsx => {
            let widths =
                export::column_widths(&table, cfg.column_padding, cfg.max_column_width);
            export::write_xlsx(&table, &widths, &request.comment, &output_path)?;
        }
        ExportFormat::Csv => export::write_csv(&table, &output_path)?,
    }
    info!(
        "exported {} records to {}",
        records.len(),
        output_path.display()
    );

    Ok(ExportOutcome {
        output_path,
        records: records.len(),
        profiles_read: stats.read,
        profiles_skipped: stats.skipped,
        profiles_failed: stats.failed,
    })
}
