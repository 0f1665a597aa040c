//! End-to-end run: read the listing, fetch every manifest, print the report.

use crate::config::RunConfig;
use crate::executor::{DeprecationExecutor, RunReport};
use crate::fetch::HttpManifestSource;
use crate::listing::{IdentityExtractor, ListingError};
use crate::report::{write_failure_summary, Reporter};
use crate::traits::ManifestSource;
use std::io::Write;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that abort a whole run, as opposed to per-buildpack failures.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Listing(#[from] ListingError),
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("Failed to write report: {0}")]
    Output(#[from] std::io::Error),
}

/// Builds the HTTP source described by `config`.
pub fn http_source(config: &RunConfig) -> Result<HttpManifestSource, AppError> {
    Ok(HttpManifestSource::with_timeout(
        config.base_url.clone(),
        config.timeout,
    )?)
}

/// Runs one report against `source`, writing the report to `out` and
/// failure diagnostics to `err`.
///
/// Per-buildpack failures are reported and returned in the [`RunReport`];
/// only listing and output errors abort with `Err`.
pub async fn run<S, W, E>(
    config: &RunConfig,
    source: Arc<S>,
    out: W,
    err: &mut E,
) -> Result<RunReport, AppError>
where
    S: ManifestSource + ?Sized + 'static,
    W: Write,
    E: Write,
{
    let listing = config.listing.read().await?;
    let identities = IdentityExtractor::new().extract_all(&listing);
    let total = identities.len();

    if identities.is_empty() {
        warn!("No versioned buildpacks found in listing");
        return Ok(RunReport::default());
    }
    info!(buildpacks = total, "Discovered buildpacks");

    let executor = match config.concurrency {
        Some(limit) => DeprecationExecutor::new(limit),
        None => DeprecationExecutor::unbounded(),
    }
    .with_order(config.order);

    let mut reporter = Reporter::new(out, config.format);
    let mut write_error = None;
    let report = executor
        .execute_with(source, identities, |outcome| {
            if write_error.is_none() {
                write_error = reporter.emit_outcome(outcome).err();
            }
        })
        .await;

    if let Some(e) = write_error {
        return Err(AppError::Output(e));
    }

    write_failure_summary(err, report.failures(), total)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::ListingSource;
    use crate::model::{BuildpackIdentity, BuildpackManifest};
    use crate::traits::FetchError;
    use async_trait::async_trait;
    use std::path::PathBuf;

    struct NeverCalled;

    #[async_trait]
    impl ManifestSource for NeverCalled {
        fn source_id(&self) -> &str {
            "never"
        }

        async fn fetch(
            &self,
            identity: &BuildpackIdentity,
        ) -> Result<BuildpackManifest, FetchError> {
            panic!("unexpected fetch for {}", identity);
        }
    }

    #[tokio::test]
    async fn test_unavailable_listing_aborts_before_fetching() {
        let config = RunConfig {
            listing: ListingSource::File(PathBuf::from("/nonexistent/cf-buildpacks.txt")),
            ..RunConfig::default()
        };
        let mut err = Vec::new();
        let result = run(&config, Arc::new(NeverCalled), Vec::new(), &mut err).await;
        assert!(matches!(result, Err(AppError::Listing(_))));
    }

    #[tokio::test]
    async fn test_listing_without_matches_spawns_nothing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"name  position  enabled  locked  filename\n")
            .unwrap();

        let config = RunConfig {
            listing: ListingSource::File(file.path().to_path_buf()),
            ..RunConfig::default()
        };
        let mut out = Vec::new();
        let mut err = Vec::new();
        let report = run(&config, Arc::new(NeverCalled), &mut out, &mut err)
            .await
            .unwrap();

        assert!(report.outcomes.is_empty());
        assert!(out.is_empty());
        assert!(err.is_empty());
    }

    #[test]
    fn test_http_source_uses_configured_base_url() {
        let config = RunConfig {
            base_url: "https://mirror.example.test/cf".to_string(),
            ..RunConfig::default()
        };
        let source = http_source(&config).unwrap();
        assert_eq!(source.base_url(), "https://mirror.example.test/cf");
    }
}
