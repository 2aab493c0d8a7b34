//! Storage location backends
//!
//! A backend enumerates the artifact keys of one variant at one storage
//! location. The index builder only sees the [`Backend`] trait; concrete
//! implementations are picked from the configuration by [`build_backends`].

mod listing;
mod local;
mod paginated;

pub use listing::StaticListingBackend;
pub use local::LocalBackend;
pub use paginated::{drain_pages, Page, PageSource, PaginatedBackend};

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use nightly_artifact::sort_newest_first;
use serde::{Deserialize, Serialize};

use crate::config::{Config, LocationKind};

/// One key returned by a backend listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedArtifact {
    /// Key relative to the location root, e.g. `x86_64/hrev56000-abc-anyboot.zip`
    pub key: String,

    /// Modification time, when the location exposes one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,

    /// Size in bytes, when the location exposes one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl ListedArtifact {
    /// A key without metadata
    pub fn key_only(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            modified: None,
            size: None,
        }
    }

    /// Directory part of the key
    pub fn directory(&self) -> Option<&str> {
        self.key.rsplit_once('/').map(|(dir, _)| dir)
    }
}

/// Errors raised by a backend.
///
/// `Unavailable` means the location could not be listed at all, which is
/// different from a successful listing with zero artifacts.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("location '{location}' is unavailable: {reason}")]
    Unavailable { location: String, reason: String },

    #[error("location '{location}' returned a broken page sequence: {reason}")]
    Pagination { location: String, reason: String },

    #[error("location '{location}' does not support {operation}")]
    Unsupported { location: String, operation: String },

    #[error("failed to delete {}: {source}", .path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A storage location that can be listed per variant.
pub trait Backend {
    /// Location name from the configuration
    fn name(&self) -> &str;

    /// List every key stored for `variant`, newest first.
    ///
    /// Paginated stores must be drained completely before returning.
    fn list(&self, variant: &str) -> Result<Vec<ListedArtifact>, BackendError>;

    /// Public URL of `filename` within `variant`
    fn url_for(&self, variant: &str, filename: &str) -> String;

    /// Whether listings carry modification times and artifacts can be deleted
    fn supports_retention(&self) -> bool {
        false
    }

    /// Delete an artifact and its checksum sidecar.
    ///
    /// A file that is already gone is not an error.
    fn delete(&self, variant: &str, filename: &str) -> Result<(), BackendError> {
        let _ = (variant, filename);
        Err(BackendError::Unsupported {
            location: self.name().to_string(),
            operation: "deletion".to_string(),
        })
    }
}

/// Keep only keys that sit directly in the variant directory and order them
/// newest first.
pub(crate) fn finish_listing(variant: &str, listed: Vec<ListedArtifact>) -> Vec<ListedArtifact> {
    let mut kept: Vec<ListedArtifact> = listed
        .into_iter()
        .filter(|item| {
            item.directory()
                .map(|dir| dir.eq_ignore_ascii_case(variant))
                .unwrap_or(false)
        })
        .collect();

    sort_newest_first(&mut kept, |item| item.key.as_str());
    kept
}

/// Public URL layout of an object store bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketUrl {
    pub public_url: String,
    pub bucket: Option<String>,
    /// Bucket is part of the host name, so it is left out of the path
    pub vhost: bool,
}

impl BucketUrl {
    pub fn url_for(&self, variant: &str, filename: &str) -> String {
        let base = self.public_url.trim_end_matches('/');
        match (&self.bucket, self.vhost) {
            (Some(bucket), false) => format!("{}/{}/{}/{}", base, bucket, variant, filename),
            _ => format!("{}/{}/{}", base, variant, filename),
        }
    }
}

/// Instantiate the backends named in the configuration, in processing order.
pub fn build_backends(config: &Config) -> Vec<Box<dyn Backend>> {
    config
        .locations
        .iter()
        .map(|location| -> Box<dyn Backend> {
            match &location.kind {
                LocationKind::Local { path, public_url } => Box::new(LocalBackend::new(
                    location.name.clone(),
                    path.clone(),
                    public_url.clone(),
                )),
                LocationKind::Static {
                    listing,
                    public_url,
                    bucket,
                    vhost,
                } => Box::new(StaticListingBackend::new(
                    location.name.clone(),
                    listing.clone(),
                    BucketUrl {
                        public_url: public_url.clone(),
                        bucket: bucket.clone(),
                        vhost: *vhost,
                    },
                )),
            }
        })
        .collect()
}
