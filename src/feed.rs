//! Syndication feed entries
//!
//! Builds the bounded, newest-first list of recent artifacts handed to the
//! feed renderer.

use chrono::{DateTime, Utc};
use nightly_artifact::{parse_key, sort_newest_first};
use serde::{Deserialize, Serialize};

use crate::backend::ListedArtifact;

/// Feed settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSettings {
    /// Maximum number of feed items
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            limit: default_limit(),
        }
    }
}

/// A file that may appear in the feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedCandidate {
    pub filename: String,
    pub modified: DateTime<Utc>,
    pub size: u64,
}

impl FeedCandidate {
    /// Candidate from a listing entry that carries both mtime and size.
    pub fn from_listed(item: &ListedArtifact) -> Option<Self> {
        let filename = item.key.rsplit('/').next()?.to_string();
        Some(Self {
            filename,
            modified: item.modified?,
            size: item.size?,
        })
    }
}

/// One feed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    pub filename: String,
    /// RFC 822 date
    pub date: String,
    /// Whole mebibytes, rounded down
    pub size_mib: u64,
}

/// RFC 822 date in UTC, e.g. `Sat, 01 Jun 2024 12:00:00 -0000`.
pub fn rfc822_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S -0000").to_string()
}

/// Newest-first feed of at most `limit` artifacts.
///
/// Candidates are ordered by natural descending filename; files outside the
/// artifact grammar are skipped.
pub fn build_feed(candidates: &[FeedCandidate], limit: usize) -> Vec<FeedItem> {
    let mut ordered: Vec<&FeedCandidate> = candidates.iter().collect();
    sort_newest_first(&mut ordered, |c| c.filename.as_str());

    ordered
        .into_iter()
        .filter(|c| parse_key(&c.filename).is_some())
        .take(limit)
        .map(|c| FeedItem {
            filename: c.filename.clone(),
            date: rfc822_date(c.modified),
            size_mib: c.size >> 20,
        })
        .collect()
}
