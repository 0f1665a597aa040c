//! Command-line configuration.
//!
//! Every flag has an environment fallback, and the defaults reproduce the
//! plain `cf buildpacks` + GitHub behaviour with no extra options.

use crate::executor::EmitOrder;
use crate::fetch::DEFAULT_BASE_URL;
use crate::listing::ListingSource;
use crate::report::OutputFormat;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "buildpack-eol",
    version,
    about = "List dependency deprecation dates for installed buildpacks."
)]
pub struct Cli {
    /// Read the buildpack listing from a file ("-" for stdin) instead of running the cf CLI.
    #[arg(long, env = "BUILDPACK_EOL_LISTING_FILE")]
    pub listing_file: Option<PathBuf>,

    /// cf CLI executable, invoked as `<cf-command> buildpacks`.
    #[arg(long, env = "BUILDPACK_EOL_CF", default_value = "cf")]
    pub cf_command: String,

    /// Base URL manifests are fetched from.
    #[arg(long, env = "BUILDPACK_EOL_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Maximum manifest fetches in flight (default: one per buildpack).
    #[arg(long, env = "BUILDPACK_EOL_CONCURRENCY", value_parser = clap::value_parser!(u64).range(1..))]
    pub concurrency: Option<u64>,

    /// Per-request timeout in seconds (default: none).
    #[arg(long, env = "BUILDPACK_EOL_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Order buildpacks are printed in.
    #[arg(long, value_enum, default_value_t = OrderArg::Listing)]
    pub order: OrderArg,

    /// Output format.
    #[arg(long, value_enum, default_value_t = FormatArg::Text)]
    pub format: FormatArg,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "BUILDPACK_EOL_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Shorthand for --log-level debug.
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors.
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OrderArg {
    Listing,
    Completion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Text,
    Json,
}

impl From<OrderArg> for EmitOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Listing => EmitOrder::Listing,
            OrderArg::Completion => EmitOrder::Completion,
        }
    }
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

/// Settings for one run, resolved from [`Cli`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub listing: ListingSource,
    pub base_url: String,
    pub concurrency: Option<usize>,
    pub timeout: Option<Duration>,
    pub order: EmitOrder,
    pub format: OutputFormat,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            listing: ListingSource::Command {
                program: "cf".to_string(),
            },
            base_url: DEFAULT_BASE_URL.to_string(),
            concurrency: None,
            timeout: None,
            order: EmitOrder::default(),
            format: OutputFormat::default(),
        }
    }
}

impl From<&Cli> for RunConfig {
    fn from(cli: &Cli) -> Self {
        let listing = match &cli.listing_file {
            Some(path) if path.as_os_str() == "-" => ListingSource::Stdin,
            Some(path) => ListingSource::File(path.clone()),
            None => ListingSource::Command {
                program: cli.cf_command.clone(),
            },
        };

        Self {
            listing,
            base_url: cli.base_url.clone(),
            concurrency: cli
                .concurrency
                .map(|n| usize::try_from(n).unwrap_or(usize::MAX)),
            timeout: cli.timeout.map(Duration::from_secs),
            order: cli.order.into(),
            format: cli.format.into(),
        }
    }
}

impl Cli {
    /// Effective log level: explicit flag, then -v/-q, then `warn`.
    pub fn effective_log_level(&self) -> &str {
        if let Some(level) = &self.log_level {
            level
        } else if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }
}
