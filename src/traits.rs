use crate::model::{BuildpackIdentity, BuildpackManifest};
use async_trait::async_trait;
use thiserror::Error;

/// Why a single buildpack's manifest could not be produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Failed to retrieve {url}: {message}")]
    Retrieval { url: String, message: String },
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("Failed to decode manifest from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("Fetch task did not complete: {0}")]
    Task(String),
}

#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Short label for logs (e.g. "github").
    fn source_id(&self) -> &str;

    /// Retrieves and decodes the manifest of one buildpack release.
    async fn fetch(&self, identity: &BuildpackIdentity) -> Result<BuildpackManifest, FetchError>;
}
