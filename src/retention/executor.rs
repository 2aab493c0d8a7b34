//! Applying a retention plan to one location.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{plan_retention, RetentionPolicy};
use crate::backend::Backend;
use crate::config::VariantConfig;
use crate::index::VariantIndex;

/// Outcome of retention at one location.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetentionReport {
    pub location: String,
    /// Rows holding at least one artifact from this location
    pub scanned: usize,
    pub kept: usize,
    pub dropped: usize,
    /// Artifacts removed (or that would be removed in dry-run)
    pub deleted_files: Vec<String>,
    /// Artifacts of dropped rows left alone because they are current
    pub protected: usize,
    pub dry_run: bool,
    /// Why nothing was planned, when retention did not run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    /// Errors encountered (non-fatal)
    pub errors: Vec<String>,
}

impl RetentionReport {
    fn skipped(location: &str, reason: impl Into<String>) -> Self {
        Self {
            location: location.to_string(),
            skipped: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// Plan and apply retention for `backend`'s share of `index`.
///
/// Rows are read newest to oldest. Dropped artifacts are deleted together
/// with their checksum sidecars, except artifacts that are current. Failed
/// deletions are recorded and never stop the run. Links to deleted files
/// are removed from the index.
pub fn apply_retention(
    backend: &dyn Backend,
    variant: &VariantConfig,
    index: &mut VariantIndex,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> RetentionReport {
    let location = backend.name();

    if !policy.enabled {
        return RetentionReport::skipped(location, "retention disabled");
    }
    if !backend.supports_retention() {
        debug!(location, "location has no modification times, retention skipped");
        return RetentionReport::skipped(location, "location does not expose modification times");
    }

    let image_order = variant.image_type_ids();
    let rows: Vec<usize> = index
        .table
        .iter()
        .enumerate()
        .filter(|(_, row)| row.links_at(location).next().is_some())
        .map(|(i, _)| i)
        .collect();

    let mut mtimes = Vec::with_capacity(rows.len());
    for &i in &rows {
        match index.table[i].mtime_at(location, &image_order) {
            Some(mtime) => mtimes.push(mtime),
            None => {
                warn!(
                    location,
                    variant = %variant.name,
                    revision = %index.table[i].revision,
                    "artifact without modification time, retention skipped"
                );
                return RetentionReport::skipped(location, "artifact without modification time");
            }
        }
    }

    let decisions = plan_retention(&mtimes, now, policy);
    let mut report = RetentionReport {
        location: location.to_string(),
        scanned: rows.len(),
        dry_run: policy.dry_run,
        ..RetentionReport::default()
    };

    for (&i, decision) in rows.iter().zip(&decisions) {
        if decision.keep {
            report.kept += 1;
            continue;
        }
        report.dropped += 1;

        let row = &index.table[i];
        for link in row.links_at(location) {
            if index.current.contains(location, &link.filename) {
                report.protected += 1;
                continue;
            }

            if policy.dry_run {
                info!(location, variant = %variant.name, file = %link.filename, "dry-run: would delete");
                report.deleted_files.push(link.filename.clone());
                continue;
            }

            match backend.delete(&variant.name, &link.filename) {
                Ok(()) => {
                    info!(location, variant = %variant.name, file = %link.filename, "deleted");
                    report.deleted_files.push(link.filename.clone());
                }
                Err(e) => {
                    warn!(location, variant = %variant.name, error = %e, "deletion failed");
                    report.errors.push(e.to_string());
                }
            }
        }
    }

    if !policy.dry_run {
        index.remove_links(location, &report.deleted_files, &image_order);
    }

    report
}
