//! The thinning fold.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::RetentionPolicy;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Keep or drop, per row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RetentionDecision {
    pub keep: bool,
    /// Minimum gap in force after this row was decided
    pub threshold_days: f64,
}

/// Loop state carried from row to row.
#[derive(Debug, Clone, Copy)]
struct Fold {
    last_kept: DateTime<Utc>,
    keep_count: usize,
    threshold_days: f64,
}

impl Fold {
    fn start(now: DateTime<Utc>, policy: &RetentionPolicy) -> Self {
        Self {
            last_kept: now,
            keep_count: 0,
            threshold_days: policy.initial_min_gap_days,
        }
    }

    fn step(&mut self, mtime: DateTime<Utc>, policy: &RetentionPolicy) -> RetentionDecision {
        let age_days = (self.last_kept - mtime).num_seconds() as f64 / SECONDS_PER_DAY;

        if self.keep_count > policy.min_keep_count && age_days < self.threshold_days {
            return RetentionDecision {
                keep: false,
                threshold_days: self.threshold_days,
            };
        }

        self.last_kept = mtime;
        self.keep_count += 1;
        if self.keep_count > policy.min_keep_count {
            self.threshold_days *= policy.growth_factor;
        }

        RetentionDecision {
            keep: true,
            threshold_days: self.threshold_days,
        }
    }
}

/// Decide keep/drop for rows ordered newest to oldest.
///
/// `mtimes` are the day-truncated modification times of the rows.
pub fn plan_retention(
    mtimes: &[DateTime<Utc>],
    now: DateTime<Utc>,
    policy: &RetentionPolicy,
) -> Vec<RetentionDecision> {
    mtimes
        .iter()
        .scan(Fold::start(now, policy), |fold, mtime| {
            Some(fold.step(*mtime, policy))
        })
        .collect()
}
