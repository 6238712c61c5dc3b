use std::process::ExitCode;

use anyhow::Result;
use tracing::{error, info, warn};

use wxhistory::report::{CollectingReporter, TracingReporter};
use wxhistory::{cli, config, logging, pipeline, util};

fn run(cli_opts: &cli::CliOptions) -> Result<pipeline::ExportOutcome> {
    let loaded = config::load_config(cli_opts.config_path.as_deref())?;
    let request = util::build_request(cli_opts, &loaded)?;
    let reporter = CollectingReporter::forwarding(Box::new(TracingReporter));
    let outcome = pipeline::run_export(&request, &reporter)?;
    if let Some(summary) = util::failure_summary(&reporter) {
        warn!("{summary}");
    }
    info!(
        "profiles read={} skipped={} failed={} records={}",
        outcome.profiles_read, outcome.profiles_skipped, outcome.profiles_failed, outcome.records
    );
    Ok(outcome)
}

fn main() -> ExitCode {
    let cli_opts = cli::parse();
    logging::init_logging(cli_opts.log_json);

    println!("Note: close WeChat first, otherwise the history files may be locked.");
    match run(&cli_opts) {
        Ok(outcome) => {
            println!("History exported to: {}", outcome.output_path.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("export failed: {err:#}");
            println!("Export failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}
