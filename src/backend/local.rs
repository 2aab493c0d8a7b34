//! Local filesystem location
//!
//! Layout: `<root>/<variant>/<artifact>` with `<artifact>.sha256` next to it.
//! This is the only backend with reliable modification times, so it is the
//! only one retention can act on.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use nightly_artifact::CHECKSUM_SUFFIX;
use walkdir::WalkDir;

use super::{finish_listing, Backend, BackendError, ListedArtifact};

/// Filesystem-backed location.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
    public_url: String,
}

impl LocalBackend {
    pub fn new(name: String, root: PathBuf, public_url: String) -> Self {
        Self {
            name,
            root,
            public_url,
        }
    }

    /// Directory holding the artifacts of `variant`
    pub fn variant_dir(&self, variant: &str) -> PathBuf {
        self.root.join(variant)
    }

    fn unavailable(&self, reason: impl ToString) -> BackendError {
        BackendError::Unavailable {
            location: self.name.clone(),
            reason: reason.to_string(),
        }
    }
}

impl Backend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list(&self, variant: &str) -> Result<Vec<ListedArtifact>, BackendError> {
        if !self.root.is_dir() {
            return Err(self.unavailable(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }

        let dir = self.variant_dir(variant);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut listed = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| self.unavailable(e))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let filename = entry.file_name().to_string_lossy().into_owned();
            let metadata = entry.metadata().map_err(|e| self.unavailable(e))?;
            let modified = metadata.modified().ok().map(DateTime::<Utc>::from);

            listed.push(ListedArtifact {
                key: format!("{}/{}", variant, filename),
                modified,
                size: Some(metadata.len()),
            });
        }

        Ok(finish_listing(variant, listed))
    }

    fn url_for(&self, variant: &str, filename: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_url.trim_end_matches('/'),
            variant,
            filename
        )
    }

    fn supports_retention(&self) -> bool {
        true
    }

    fn delete(&self, variant: &str, filename: &str) -> Result<(), BackendError> {
        let dir = self.variant_dir(variant);
        remove_if_present(&dir.join(filename))?;
        remove_if_present(&dir.join(format!("{}{}", filename, CHECKSUM_SUFFIX)))?;
        Ok(())
    }
}

fn remove_if_present(path: &Path) -> Result<(), BackendError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(BackendError::Delete {
            path: path.to_path_buf(),
            source,
        }),
    }
}
