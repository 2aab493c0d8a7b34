//! One indexing run
//!
//! For every selected variant:
//! - list each location once (a failing location is skipped, not fatal)
//! - parse and merge the listings into the revision table
//! - apply retention at locations that support it
//! - build the feed and write the renderer contexts
//!
//! After all variants, the aggregated rewrite maps are regenerated.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::backend::{Backend, ListedArtifact};
use crate::config::{Config, ConfigError, VariantConfig};
use crate::feed::{build_feed, FeedCandidate, FeedItem};
use crate::index::{build_index, collect_location, CurrentImageSet, VariantIndex};
use crate::output::{write_atomic, write_json, FeedDocument, IndexDocument, OutputError, VariantPaths};
use crate::retention::{apply_retention, RetentionReport};
use crate::rewrite_map::{map_entries, MapAggregate, MapDialect};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),
}

impl PipelineError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Config(_) => 1,
            PipelineError::Output(_) => 2,
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Everything computed for one variant.
#[derive(Debug, Clone)]
pub struct VariantRun {
    pub index: VariantIndex,
    pub feed: Vec<FeedItem>,
    pub report: VariantReport,
}

/// Summary of one variant
#[derive(Debug, Clone, Default, Serialize)]
pub struct VariantReport {
    pub variant: String,
    /// Locations listed successfully
    pub listed_locations: Vec<String>,
    /// Locations that could not be listed
    pub failed_locations: Vec<String>,
    pub rows: usize,
    /// Image types with a current artifact
    pub current: Vec<String>,
    pub feed_items: usize,
    pub retention: Vec<RetentionReport>,
    /// Whether index and feed were written
    pub written: bool,
}

impl VariantReport {
    /// No location could be listed, so the table says nothing about what exists
    pub fn is_unavailable(&self) -> bool {
        self.listed_locations.is_empty()
    }

    /// Some locations failed; the table may be missing entries
    pub fn is_partial(&self) -> bool {
        !self.failed_locations.is_empty()
    }
}

/// Summary of a whole run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub variants: Vec<VariantReport>,
    pub maps_written: bool,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.variants.iter().any(|v| v.is_partial())
    }
}

/// Successful and failed listings of one variant.
#[derive(Default)]
struct VariantListings<'b> {
    listed: Vec<(&'b dyn Backend, Vec<ListedArtifact>)>,
    failed: Vec<String>,
}

/// Pipeline execution context
pub struct Pipeline<'a> {
    config: &'a Config,
    backends: Vec<Box<dyn Backend>>,
    now: DateTime<Utc>,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline over `backends`, in location processing order
    pub fn new(config: &'a Config, backends: Vec<Box<dyn Backend>>) -> Self {
        Self {
            config,
            backends,
            now: Utc::now(),
        }
    }

    /// Fix the reference time used by retention and output timestamps
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Build every requested variant (all when empty) and the rewrite maps.
    ///
    /// Unknown variants fail before anything is written. Variants outside
    /// the request are still listed so the aggregate maps keep their
    /// aliases; their index, feed and history are left alone.
    pub fn run(&self, requested: &[String]) -> PipelineResult<RunSummary> {
        let selected = self.config.select_variants(requested)?;
        let mut summary = RunSummary::default();
        let mut maps = MapAggregate::new();
        let mut maps_complete = true;

        for variant in &self.config.variants {
            if !selected.iter().any(|s| s.name == variant.name) {
                match self.current_images(variant) {
                    Some(current) => maps.push(map_entries(variant, &current, &self.config.map)),
                    None => {
                        warn!(
                            variant = %variant.name,
                            "no location could be listed for map aliases"
                        );
                        maps_complete = false;
                    }
                }
                continue;
            }

            let mut run = self.index_variant(variant);

            if run.report.is_unavailable() {
                warn!(
                    variant = %variant.name,
                    "no location could be listed, keeping previous output"
                );
                maps_complete = false;
            } else {
                self.write_variant(variant, &run)?;
                run.report.written = true;
                maps.push(map_entries(variant, &run.index.current, &self.config.map));
            }

            info!(
                variant = %variant.name,
                rows = run.report.rows,
                current = run.report.current.len(),
                feed_items = run.report.feed_items,
                failed_locations = run.report.failed_locations.len(),
                "variant indexed"
            );
            summary.variants.push(run.report);
        }

        if maps_complete {
            self.write_maps(&maps)?;
            summary.maps_written = true;
        } else {
            warn!("rewrite maps not regenerated because a variant had no listable location");
        }

        Ok(summary)
    }

    /// Index one variant without writing any output.
    pub fn index_variant(&self, variant: &VariantConfig) -> VariantRun {
        let listings = self.list_variant(variant);
        let mut report = VariantReport {
            variant: variant.name.clone(),
            failed_locations: listings.failed,
            ..VariantReport::default()
        };

        let mut locations = Vec::new();
        // (location, candidate) in location processing order
        let mut candidates: Vec<(&str, FeedCandidate)> = Vec::new();
        for &(backend, ref listed) in &listings.listed {
            let name = backend.name();
            candidates.extend(
                listed
                    .iter()
                    .filter_map(FeedCandidate::from_listed)
                    .map(|c| (name, c)),
            );
            locations.push(collect_location(backend, variant, listed));
            report.listed_locations.push(name.to_string());
        }

        let mut index = build_index(variant, &locations);

        let policy = &self.config.retention;
        let mut deleted: HashSet<(String, String)> = HashSet::new();
        for (backend, _) in &listings.listed {
            let retention = apply_retention(*backend, variant, &mut index, policy, self.now);
            if !retention.dry_run {
                for file in &retention.deleted_files {
                    deleted.insert((retention.location.clone(), file.clone()));
                }
            }
            report.retention.push(retention);
        }

        // first surviving copy of each filename
        let mut seen: HashSet<String> = HashSet::new();
        let candidates: Vec<FeedCandidate> = candidates
            .into_iter()
            .filter(|(location, c)| !deleted.contains(&(location.to_string(), c.filename.clone())))
            .filter(|(_, c)| seen.insert(c.filename.clone()))
            .map(|(_, c)| c)
            .collect();
        let feed = build_feed(&candidates, self.config.feed.limit);

        report.rows = index.table.len();
        report.current = index.current.iter().map(|(t, _)| t.clone()).collect();
        report.feed_items = feed.len();

        VariantRun {
            index,
            feed,
            report,
        }
    }

    /// Current images of a variant, computed without retention.
    ///
    /// `None` when no location could be listed.
    pub fn current_images(&self, variant: &VariantConfig) -> Option<CurrentImageSet> {
        let listings = self.list_variant(variant);
        if listings.listed.is_empty() {
            return None;
        }

        let locations: Vec<_> = listings
            .listed
            .iter()
            .map(|(backend, listed)| collect_location(*backend, variant, listed))
            .collect();
        Some(build_index(variant, &locations).current)
    }

    /// List `variant` at every location once, in processing order.
    fn list_variant(&self, variant: &VariantConfig) -> VariantListings<'_> {
        let mut listings = VariantListings::default();

        for backend in &self.backends {
            let backend = backend.as_ref();
            match backend.list(&variant.name) {
                Ok(listed) => {
                    info!(
                        location = backend.name(),
                        variant = %variant.name,
                        keys = listed.len(),
                        "listed location"
                    );
                    listings.listed.push((backend, listed));
                }
                Err(e) => {
                    warn!(
                        location = backend.name(),
                        variant = %variant.name,
                        error = %e,
                        "skipping location"
                    );
                    listings.failed.push(backend.name().to_string());
                }
            }
        }

        listings
    }

    fn write_variant(&self, variant: &VariantConfig, run: &VariantRun) -> PipelineResult<()> {
        let paths = VariantPaths::new(&self.config.output_dir, &variant.name);

        let document = IndexDocument::new(variant, &run.index, &run.report.failed_locations, self.now);
        write_json(&paths.index, &document)?;

        let feed = FeedDocument {
            variant: &variant.name,
            items: &run.feed,
        };
        write_json(&paths.feed, &feed)?;

        Ok(())
    }

    fn write_maps(&self, maps: &MapAggregate) -> PipelineResult<()> {
        for dialect in MapDialect::ALL {
            let path = self.config.output_dir.join(self.config.map.file_name(dialect));
            write_atomic(&path, maps.render(dialect).as_bytes())?;
            info!(path = %path.display(), "wrote rewrite map");
        }
        Ok(())
    }
}
