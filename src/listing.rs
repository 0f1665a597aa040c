//! Buildpack discovery from the platform's buildpack listing.
//!
//! The listing is the plain-text table printed by `cf buildpacks`. Only rows
//! whose last column is a versioned `.zip` archive name yield an identity;
//! headers, blank lines and status messages are skipped.

use crate::model::BuildpackIdentity;
use regex::Regex;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// `<name> <anything><version>.zip`, where version is `v` + digits + anything.
pub const LISTING_PATTERN: &str = r"^(.+?) .+(v\d+.*)\.zip$";

/// Subcommand passed to the listing program.
pub const LISTING_SUBCOMMAND: &str = "buildpacks";

#[derive(Error, Debug)]
pub enum ListingError {
    #[error("Buildpack listing unavailable: {0}")]
    Unavailable(String),
    #[error("Failed to read listing from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Turns listing lines into [`BuildpackIdentity`] values.
#[derive(Debug, Clone)]
pub struct IdentityExtractor {
    pattern: Regex,
}

impl Default for IdentityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityExtractor {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(LISTING_PATTERN).expect("valid regex"),
        }
    }

    /// Extracts the identity from one line, or `None` if the line does not match.
    pub fn extract_line(&self, line: &str) -> Option<BuildpackIdentity> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let captures = self.pattern.captures(line)?;
        let name = captures.get(1)?.as_str();
        let version = captures.get(2)?.as_str();
        Some(BuildpackIdentity::new(name, version))
    }

    /// Extracts every identity in listing order.
    ///
    /// Rows naming the same release more than once (one per stack) collapse
    /// into the first occurrence; they share a manifest.
    pub fn extract_all(&self, listing: &str) -> Vec<BuildpackIdentity> {
        let mut seen = HashSet::new();
        let mut identities = Vec::new();

        for line in listing.lines() {
            match self.extract_line(line) {
                Some(identity) => {
                    if seen.insert(identity.clone()) {
                        identities.push(identity);
                    } else {
                        debug!(buildpack = %identity, "Skipping duplicate listing row");
                    }
                }
                None => debug!(line, "Skipping listing line without a versioned archive"),
            }
        }

        identities
    }
}

/// Where the buildpack listing text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingSource {
    /// Run `<program> buildpacks` and capture stdout.
    Command { program: String },
    /// Read a previously captured listing from disk.
    File(PathBuf),
    /// Read the listing from standard input.
    Stdin,
}

impl ListingSource {
    /// Reads the complete listing text.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError::Unavailable`] if the command cannot be spawned,
    /// exits unsuccessfully, or prints nothing, and [`ListingError::Read`] if
    /// a file or stdin cannot be read.
    #[instrument(skip(self), fields(source = ?self))]
    pub async fn read(&self) -> Result<String, ListingError> {
        let text = match self {
            ListingSource::Command { program } => {
                let output = Command::new(program)
                    .arg(LISTING_SUBCOMMAND)
                    .output()
                    .await
                    .map_err(|e| {
                        ListingError::Unavailable(format!("failed to run '{}': {}", program, e))
                    })?;

                if !output.status.success() {
                    return Err(ListingError::Unavailable(format!(
                        "'{} {}' exited with {}: {}",
                        program,
                        LISTING_SUBCOMMAND,
                        output.status,
                        String::from_utf8_lossy(&output.stderr).trim()
                    )));
                }

                String::from_utf8_lossy(&output.stdout).into_owned()
            }
            ListingSource::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| ListingError::Read {
                        path: path.display().to_string(),
                        source,
                    })?
            }
            ListingSource::Stdin => {
                let mut text = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut text)
                    .await
                    .map_err(|source| ListingError::Read {
                        path: "<stdin>".to_string(),
                        source,
                    })?;
                text
            }
        };

        if text.trim().is_empty() {
            return Err(ListingError::Unavailable(
                "listing produced no output".to_string(),
            ));
        }

        info!(bytes = text.len(), "Read buildpack listing");
        Ok(text)
    }
}
