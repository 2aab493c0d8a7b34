//! Nightly image artifact naming.
//!
//! Pure helpers shared by the indexer: the artifact filename grammar and the
//! natural ordering used to sort revisions whose numeric width changed over
//! time (`hrev9999` is older than `hrev52000`).

mod natsort;
mod parser;

pub use natsort::sort_newest_first;
pub use parser::{parse_key, ArtifactExtension, ParsedArtifact, CHECKSUM_SUFFIX};
