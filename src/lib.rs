//! Nightly image indexer
//!
//! Indexes the nightly images of several variants stored across one or more
//! locations: builds the revision table and the current image of each type,
//! thins old history with an aging retention policy, and emits the feed
//! entries and reverse-proxy rewrite maps for the current images.

pub mod backend;
pub mod config;
pub mod feed;
pub mod index;
pub mod output;
pub mod pipeline;
pub mod retention;
pub mod rewrite_map;

pub use backend::{build_backends, Backend, BackendError, ListedArtifact};
pub use config::{Config, ConfigError, VariantConfig};
pub use index::{build_index, CurrentImageSet, TableRow, VariantIndex};
pub use pipeline::{Pipeline, PipelineError, RunSummary, VariantReport};
pub use retention::{plan_retention, RetentionPolicy};
