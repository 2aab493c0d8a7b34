//! Pre-fetched key listing of a remote object store
//!
//! The listing file holds one key per line. Blank lines and `#` comments are
//! skipped, and only the last whitespace-separated column is used, so the
//! output of a recursive `ls` against the bucket can be used as-is.
//! Remote listings carry no trustworthy modification times, so retention
//! never acts on this location.

use std::fs;
use std::path::PathBuf;

use super::{finish_listing, Backend, BackendError, BucketUrl, ListedArtifact};

#[derive(Debug, Clone)]
pub struct StaticListingBackend {
    name: String,
    listing: PathBuf,
    url: BucketUrl,
}

impl StaticListingBackend {
    pub fn new(name: String, listing: PathBuf, url: BucketUrl) -> Self {
        Self { name, listing, url }
    }
}

impl Backend for StaticListingBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list(&self, variant: &str) -> Result<Vec<ListedArtifact>, BackendError> {
        let content = fs::read_to_string(&self.listing).map_err(|e| BackendError::Unavailable {
            location: self.name.clone(),
            reason: format!("cannot read {}: {}", self.listing.display(), e),
        })?;

        let listed = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_whitespace().last())
            .map(ListedArtifact::key_only)
            .collect();

        Ok(finish_listing(variant, listed))
    }

    fn url_for(&self, variant: &str, filename: &str) -> String {
        self.url.url_for(variant, filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn url() -> BucketUrl {
        BucketUrl {
            public_url: "https://s3.example.org".to_string(),
            bucket: Some("nightly".to_string()),
            vhost: false,
        }
    }

    #[test]
    fn test_list_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("keys.txt");
        fs::write(
            &path,
            "# mirror snapshot\n\
             x86_64/hrev55000-def-anyboot.zip\n\
             \n\
             2024-03-01 02:11:09  734003200 x86_64/hrev56000-abc-anyboot.zip\n\
             arm/hrev56000-arm-mmc.zip\n",
        )
        .unwrap();

        let backend = StaticListingBackend::new("mirror".to_string(), path, url());
        let listed = backend.list("x86_64").unwrap();
        let keys: Vec<_> = listed.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "x86_64/hrev56000-abc-anyboot.zip",
                "x86_64/hrev55000-def-anyboot.zip"
            ]
        );
        assert!(listed.iter().all(|i| i.modified.is_none()));
        assert!(!backend.supports_retention());
    }

    #[test]
    fn test_unreadable_listing_is_unavailable() {
        let backend = StaticListingBackend::new(
            "mirror".to_string(),
            PathBuf::from("/nonexistent/keys.txt"),
            url(),
        );
        assert!(matches!(
            backend.list("x86_64"),
            Err(BackendError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_delete_is_unsupported() {
        let backend = StaticListingBackend::new("mirror".to_string(), PathBuf::new(), url());
        assert!(matches!(
            backend.delete("x86_64", "hrev1-a-anyboot.zip"),
            Err(BackendError::Unsupported { .. })
        ));
    }
}
