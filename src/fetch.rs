//! Manifest retrieval over HTTP.
//!
//! [`HttpManifestSource`] issues one GET per buildpack release against
//! `<base_url>/<name>/<version>/manifest.yml` and hands the body to
//! [`decode_manifest`]. The body is read to completion before decoding, so the
//! connection goes back to the pool on every exit path.

use crate::model::{BuildpackIdentity, BuildpackManifest};
use crate::traits::{FetchError, ManifestSource};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Where upstream Cloud Foundry buildpacks publish their sources.
pub const DEFAULT_BASE_URL: &str = "https://raw.githubusercontent.com/cloudfoundry";

/// Decodes a manifest body.
///
/// Missing or empty `dependency_deprecation_dates`, and an entirely empty
/// body, decode to zero records.
pub fn decode_manifest(body: &str) -> Result<BuildpackManifest, serde_yaml::Error> {
    if body.trim().is_empty() {
        return Ok(BuildpackManifest::default());
    }
    serde_yaml::from_str(body)
}

pub struct HttpManifestSource {
    client: Client,
    base_url: String,
}

impl HttpManifestSource {
    /// Creates a source with no request timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        Self::with_timeout(base_url, None)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ManifestSource for HttpManifestSource {
    fn source_id(&self) -> &str {
        "http"
    }

    async fn fetch(&self, identity: &BuildpackIdentity) -> Result<BuildpackManifest, FetchError> {
        let url = identity.manifest_url(&self.base_url);
        debug!(%url, "Requesting manifest");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Retrieval {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Retrieval {
            url: url.clone(),
            message: format!("failed to read response body: {}", e),
        })?;

        decode_manifest(&body).map_err(|e| FetchError::Decode {
            url,
            message: e.to_string(),
        })
    }
}
