//! Aging-based retention
//!
//! Keeps recent history dense and thins older history geometrically:
//! - the newest `min_keep_count` revisions are always kept
//! - past that, consecutive kept revisions must be at least `threshold` days
//!   apart, and the threshold grows by `growth_factor` after every keep
//! - deletion only happens at locations that expose modification times

mod executor;
mod planner;

pub use executor::{apply_retention, RetentionReport};
pub use planner::{plan_retention, RetentionDecision};

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Retention parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Run retention at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Log decisions without deleting anything
    #[serde(default)]
    pub dry_run: bool,

    /// Revisions always kept before thinning starts
    #[serde(default = "default_min_keep_count")]
    pub min_keep_count: usize,

    /// Minimum gap in days once thinning starts
    #[serde(default = "default_initial_min_gap_days")]
    pub initial_min_gap_days: f64,

    /// Multiplier applied to the gap after each kept revision
    #[serde(default = "default_growth_factor")]
    pub growth_factor: f64,
}

fn default_enabled() -> bool {
    true
}

fn default_min_keep_count() -> usize {
    50
}

fn default_initial_min_gap_days() -> f64 {
    2.0
}

fn default_growth_factor() -> f64 {
    1.5
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            dry_run: false,
            min_keep_count: default_min_keep_count(),
            initial_min_gap_days: default_initial_min_gap_days(),
            growth_factor: default_growth_factor(),
        }
    }
}

impl RetentionPolicy {
    /// Policy with explicit thinning parameters.
    pub fn thinning(min_keep_count: usize, initial_min_gap_days: f64, growth_factor: f64) -> Self {
        Self {
            min_keep_count,
            initial_min_gap_days,
            growth_factor,
            ..Self::default()
        }
    }

    /// Set dry-run mode.
    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_min_gap_days.is_finite() || self.initial_min_gap_days < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "retention.initial_min_gap_days".to_string(),
                reason: "must be a non-negative number".to_string(),
            });
        }
        if !self.growth_factor.is_finite() || self.growth_factor < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "retention.growth_factor".to_string(),
                reason: "must be at least 1.0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retention_policy_default() {
        let policy = RetentionPolicy::default();
        assert!(policy.enabled);
        assert!(!policy.dry_run);
        assert_eq!(policy.min_keep_count, 50);
        assert_eq!(policy.initial_min_gap_days, 2.0);
        assert_eq!(policy.growth_factor, 1.5);
    }

    #[test]
    fn test_shrinking_growth_factor_rejected() {
        let policy = RetentionPolicy::thinning(10, 2.0, 0.5);
        assert!(policy.validate().is_err());
        assert!(RetentionPolicy::thinning(10, -1.0, 1.5).validate().is_err());
        assert!(RetentionPolicy::thinning(0, 0.0, 1.0).validate().is_ok());
    }
}
