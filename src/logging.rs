//! Structured logging setup.
//!
//! Logs go to stderr so stdout carries only the report. `RUST_LOG`, when set,
//! replaces the default filter entirely.

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Parses a log level, defaulting to WARN on unknown input.
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to WARN. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::WARN
        }
    }
}

/// Default filter directives for `level` when `RUST_LOG` is unset.
pub fn default_directives(level: Level) -> Vec<String> {
    vec![
        format!("buildpack_eol={}", level.as_str().to_lowercase()),
        "h2=warn".to_string(),
        "hyper=warn".to_string(),
        "reqwest=warn".to_string(),
    ]
}

/// Installs the global subscriber. Later calls are ignored.
pub fn init_logging(level: Level) {
    INIT.call_once(|| {
        let filter = if env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            default_directives(level)
                .iter()
                .filter_map(|d| d.parse::<Directive>().ok())
                .fold(EnvFilter::new("off"), |filter, directive| {
                    filter.add_directive(directive)
                })
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    });
}
