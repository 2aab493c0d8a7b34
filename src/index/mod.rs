//! Revision index of one variant
//!
//! Merges the parsed listings of every location into one table keyed by
//! revision and derives the current artifact of each image type.

mod builder;
mod table;

pub use builder::{build_index, collect_location, LocatedArtifact, LocationArtifacts};
pub use table::{truncate_to_day, ArtifactLink, CurrentImage, CurrentImageSet, TableRow, VariantIndex};
