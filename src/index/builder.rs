//! Index builder.
//!
//! Locations are merged in processing order. Each location's listing is
//! newest first, so the first artifact of an image type seen in a location
//! is that location's candidate for "current". Between locations the
//! candidate with the later modification time wins; when either side has no
//! modification time, or both are equal, the earlier location keeps it.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use nightly_artifact::{parse_key, sort_newest_first, ParsedArtifact};
use tracing::debug;

use super::table::{ArtifactLink, CurrentImage, CurrentImageSet, TableRow, VariantIndex};
use crate::backend::{Backend, ListedArtifact};
use crate::config::VariantConfig;

/// A recognized artifact at a specific location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedArtifact {
    pub artifact: ParsedArtifact,
    pub url: String,
    pub modified: Option<DateTime<Utc>>,
}

/// The recognized artifacts of one location, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationArtifacts {
    pub location: String,
    pub artifacts: Vec<LocatedArtifact>,
}

/// Parse a location listing and keep the image types `variant` recognizes.
///
/// Keys outside the artifact grammar are dropped silently.
pub fn collect_location(
    backend: &dyn Backend,
    variant: &VariantConfig,
    listed: &[ListedArtifact],
) -> LocationArtifacts {
    let mut artifacts = Vec::new();

    for item in listed {
        let Some(artifact) = parse_key(&item.key) else {
            debug!(location = backend.name(), key = %item.key, "skipping non-artifact key");
            continue;
        };
        if !variant.recognizes(&artifact.image_type) {
            continue;
        }

        let url = backend.url_for(&variant.name, &artifact.filename());
        artifacts.push(LocatedArtifact {
            artifact,
            url,
            modified: item.modified,
        });
    }

    LocationArtifacts {
        location: backend.name().to_string(),
        artifacts,
    }
}

/// Merge location listings into the revision table and current set.
pub fn build_index(variant: &VariantConfig, locations: &[LocationArtifacts]) -> VariantIndex {
    let image_order = variant.image_type_ids();
    let mut rows: Vec<TableRow> = Vec::new();
    let mut row_positions: HashMap<String, usize> = HashMap::new();
    let mut current = CurrentImageSet::default();

    for location in locations {
        let mut seen_types: HashSet<&str> = HashSet::new();

        for located in &location.artifacts {
            let artifact = &located.artifact;
            if !variant.recognizes(&artifact.image_type) {
                continue;
            }

            let position = *row_positions
                .entry(artifact.revision.clone())
                .or_insert_with(|| {
                    rows.push(TableRow::new(artifact.revision.clone()));
                    rows.len() - 1
                });

            let links = rows[position]
                .images
                .entry(artifact.image_type.clone())
                .or_default();
            // Same revision and type twice in one location: keep the first
            if !links.iter().any(|l| l.location == location.location) {
                links.push(ArtifactLink {
                    location: location.location.clone(),
                    filename: artifact.filename(),
                    url: located.url.clone(),
                    modified: located.modified,
                });
            }

            if seen_types.insert(artifact.image_type.as_str()) {
                offer_current(&mut current, &location.location, located);
            }
        }
    }

    for row in &mut rows {
        row.refresh_mtime(&image_order);
    }
    sort_newest_first(&mut rows, |row| row.revision.as_str());

    VariantIndex {
        table: rows,
        current,
    }
}

fn offer_current(current: &mut CurrentImageSet, location: &str, candidate: &LocatedArtifact) {
    let image_type = &candidate.artifact.image_type;
    let replace = match current.get(image_type) {
        None => true,
        Some(existing) => match (existing.modified, candidate.modified) {
            (Some(old), Some(new)) => new > old,
            _ => false,
        },
    };

    if replace {
        current.insert(
            image_type.clone(),
            CurrentImage {
                artifact: candidate.artifact.clone(),
                location: location.to_string(),
                url: candidate.url.clone(),
                modified: candidate.modified,
            },
        );
    }
}
