//! Output files
//!
//! Everything the run produces is read concurrently by a web server or a
//! reverse proxy, so each file is written to a process-unique temporary
//! name in the target directory and renamed into place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::VariantConfig;
use crate::feed::FeedItem;
use crate::index::{CurrentImageSet, TableRow, VariantIndex};

/// Errors while writing output
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Write `contents` to `path` atomically (write-then-rename).
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), OutputError> {
    let io_err = |source: io::Error| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(format!(".{}", std::process::id()));
    let temp_path = PathBuf::from(temp_name);

    if let Err(source) = fs::write(&temp_path, contents) {
        let _ = fs::remove_file(&temp_path);
        return Err(io_err(source));
    }

    // Atomic rename
    fs::rename(&temp_path, path).map_err(|source| {
        let _ = fs::remove_file(&temp_path);
        io_err(source)
    })
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), OutputError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| OutputError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, json.as_bytes())
}

/// Paths of one variant's output under the output root.
#[derive(Debug, Clone)]
pub struct VariantPaths {
    pub index: PathBuf,
    pub feed: PathBuf,
}

impl VariantPaths {
    pub fn new(output_dir: &Path, variant: &str) -> Self {
        let dir = output_dir.join("nightly-images").join(variant);
        Self {
            index: dir.join("index.json"),
            feed: dir.join("rss").join("feed.json"),
        }
    }
}

/// Page context handed to the index renderer.
#[derive(Debug, Clone, Serialize)]
pub struct IndexDocument<'a> {
    pub variant: &'a str,
    pub generated_at: DateTime<Utc>,
    pub headers: Vec<&'a str>,
    pub image_types: Vec<&'a str>,
    pub table: &'a [TableRow],
    pub current: &'a CurrentImageSet,
    /// Locations that could not be listed; the table may be partial
    pub failed_locations: &'a [String],
}

impl<'a> IndexDocument<'a> {
    pub fn new(
        variant: &'a VariantConfig,
        index: &'a VariantIndex,
        failed_locations: &'a [String],
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            variant: &variant.name,
            generated_at,
            headers: variant.headers(),
            image_types: variant.image_type_ids(),
            table: &index.table,
            current: &index.current,
            failed_locations,
        }
    }
}

/// Context handed to the feed renderer.
#[derive(Debug, Clone, Serialize)]
pub struct FeedDocument<'a> {
    pub variant: &'a str,
    pub items: &'a [FeedItem],
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_parents_and_replaces() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a/b/map.txt");

        write_atomic(&path, b"first\n").unwrap();
        write_atomic(&path, b"second\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second\n");
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1, "temporary file left behind");
    }

    #[test]
    fn test_write_atomic_into_unwritable_location_fails() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("file");
        fs::write(&blocker, b"").unwrap();

        let result = write_atomic(&blocker.join("child.txt"), b"x");
        assert!(matches!(result, Err(OutputError::Io { .. })));
    }

    #[test]
    fn test_variant_paths() {
        let paths = VariantPaths::new(Path::new("/srv/www"), "x86_64");
        assert_eq!(paths.index, PathBuf::from("/srv/www/nightly-images/x86_64/index.json"));
        assert_eq!(paths.feed, PathBuf::from("/srv/www/nightly-images/x86_64/rss/feed.json"));
    }

    #[test]
    fn test_write_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("feed.json");
        let items = vec![FeedItem {
            filename: "hrev1-q-anyboot.zip".to_string(),
            date: "Sat, 01 Jun 2024 00:00:00 -0000".to_string(),
            size_mib: 3,
        }];
        write_json(&path, &FeedDocument { variant: "x86_64", items: &items }).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["variant"], "x86_64");
        assert_eq!(value["items"][0]["size_mib"], 3);
    }
}
