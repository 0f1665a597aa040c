use anyhow::Context;
use buildpack_eol::app::{self, AppError};
use buildpack_eol::config::{Cli, RunConfig};
use buildpack_eol::logging::{init_logging, parse_level};
use clap::Parser;
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;

/// Exit status when at least one buildpack could not be checked.
const EXIT_PARTIAL: u8 = 1;
/// Exit status when the run could not start.
const EXIT_FATAL: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(parse_level(cli.effective_log_level()));
    debug!("Arguments: {:?}", cli);

    let config = RunConfig::from(&cli);

    match run(&config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_PARTIAL),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Returns whether every buildpack was checked successfully.
async fn run(config: &RunConfig) -> anyhow::Result<bool> {
    let source = app::http_source(config).context("setting up manifest source")?;

    let stdout = io::stdout();
    let mut stderr = io::stderr();
    let report = match app::run(config, Arc::new(source), stdout.lock(), &mut stderr).await {
        Ok(report) => report,
        Err(AppError::Listing(e)) => return Err(e).context("listing installed buildpacks"),
        Err(e) => return Err(e.into()),
    };

    Ok(!report.has_failures())
}
