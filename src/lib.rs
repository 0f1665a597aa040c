pub mod app;
pub mod config;
pub mod executor;
pub mod fetch;
pub mod listing;
pub mod logging;
pub mod model;
pub mod report;
pub mod traits;

// Re-export common types for convenience
pub use executor::{DeprecationExecutor, EmitOrder, Outcome, RunReport};
pub use fetch::{decode_manifest, HttpManifestSource, DEFAULT_BASE_URL};
pub use listing::{IdentityExtractor, ListingError, ListingSource};
pub use model::*;
pub use report::{OutputFormat, Reporter};
pub use traits::*;
