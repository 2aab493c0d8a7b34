//! Reverse-proxy rewrite maps
//!
//! Maps the stable "current" alias of every image type (and its checksum
//! sidecar) to the concrete artifact. Two dialects are produced: plain
//! `<alias> <target>` lines, and the same lines terminated with `;`.
//! Fragments are concatenated in variant build order and the files are
//! regenerated in full on every run.

use nightly_artifact::CHECKSUM_SUFFIX;
use serde::{Deserialize, Serialize};

use crate::config::VariantConfig;
use crate::index::{CurrentImage, CurrentImageSet};

/// Alias and target path layout.
///
/// Templates may use `{variant}`, `{image_type}`, `{extension}` and
/// `{filename}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapScheme {
    #[serde(default = "default_alias_template")]
    pub alias_template: String,

    #[serde(default = "default_target_template")]
    pub target_template: String,

    /// Aggregate map file for the plain dialect, relative to the output dir
    #[serde(default = "default_apache_file")]
    pub apache_file: String,

    /// Aggregate map file for the `;`-terminated dialect
    #[serde(default = "default_nginx_file")]
    pub nginx_file: String,
}

fn default_alias_template() -> String {
    "/nightly-images/{variant}/current-{image_type}.{extension}".to_string()
}

fn default_target_template() -> String {
    "/nightly-images/{variant}/{filename}".to_string()
}

fn default_apache_file() -> String {
    "rewrite-map.txt".to_string()
}

fn default_nginx_file() -> String {
    "rewrite-map.nginx".to_string()
}

impl Default for MapScheme {
    fn default() -> Self {
        Self {
            alias_template: default_alias_template(),
            target_template: default_target_template(),
            apache_file: default_apache_file(),
            nginx_file: default_nginx_file(),
        }
    }
}

impl MapScheme {
    fn expand(&self, template: &str, variant: &str, image: &CurrentImage) -> String {
        template
            .replace("{variant}", variant)
            .replace("{image_type}", &image.artifact.image_type)
            .replace("{extension}", image.artifact.extension.as_str())
            .replace("{filename}", &image.filename())
    }

    pub fn file_name(&self, dialect: MapDialect) -> &str {
        match dialect {
            MapDialect::Plain => &self.apache_file,
            MapDialect::Terminated => &self.nginx_file,
        }
    }
}

/// Line syntax of a map file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapDialect {
    /// `<alias> <target>`
    Plain,
    /// `<alias> <target>;`
    Terminated,
}

impl MapDialect {
    pub const ALL: [MapDialect; 2] = [MapDialect::Plain, MapDialect::Terminated];

    fn line(&self, entry: &MapEntry) -> String {
        match self {
            MapDialect::Plain => format!("{} {}\n", entry.alias, entry.target),
            MapDialect::Terminated => format!("{} {};\n", entry.alias, entry.target),
        }
    }
}

/// One alias -> target mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub alias: String,
    pub target: String,
}

/// Entries for one variant, in configured image type order.
///
/// Each current artifact yields two entries: the artifact and its sidecar.
pub fn map_entries(variant: &VariantConfig, current: &CurrentImageSet, scheme: &MapScheme) -> Vec<MapEntry> {
    let mut entries = Vec::new();

    for image_type in variant.image_type_ids() {
        let Some(image) = current.get(image_type) else {
            continue;
        };

        let alias = scheme.expand(&scheme.alias_template, &variant.name, image);
        let target = scheme.expand(&scheme.target_template, &variant.name, image);
        let checksum = MapEntry {
            alias: format!("{}{}", alias, CHECKSUM_SUFFIX),
            target: format!("{}{}", target, CHECKSUM_SUFFIX),
        };
        entries.push(MapEntry { alias, target });
        entries.push(checksum);
    }

    entries
}

/// Render entries in one dialect.
pub fn render_fragment(entries: &[MapEntry], dialect: MapDialect) -> String {
    entries.iter().map(|e| dialect.line(e)).collect()
}

/// Per-variant fragments collected over a run.
#[derive(Debug, Clone, Default)]
pub struct MapAggregate {
    fragments: Vec<Vec<MapEntry>>,
}

impl MapAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variant's entries. Call in variant build order.
    pub fn push(&mut self, entries: Vec<MapEntry>) {
        self.fragments.push(entries);
    }

    /// Whole map file contents for `dialect`.
    pub fn render(&self, dialect: MapDialect) -> String {
        self.fragments
            .iter()
            .map(|entries| render_fragment(entries, dialect))
            .collect()
    }
}
