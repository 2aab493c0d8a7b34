//! Indexer configuration
//!
//! Parses and validates the TOML configuration file. The result is loaded
//! once per run and handed to every component by reference.

mod defaults;

pub use defaults::builtin_variants;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::feed::FeedSettings;
use crate::retention::RetentionPolicy;
use crate::rewrite_map::MapScheme;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "nightly-index.toml";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of the generated output tree
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub retention: RetentionPolicy,

    #[serde(default)]
    pub feed: FeedSettings,

    #[serde(default)]
    pub map: MapScheme,

    /// Storage locations in processing order
    #[serde(default, rename = "location")]
    pub locations: Vec<LocationConfig>,

    /// Known variants in build order (builtin table when empty)
    #[serde(default, rename = "variant")]
    pub variants: Vec<VariantConfig>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

/// One storage location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Unique location name, used as the column key in the table
    pub name: String,

    #[serde(flatten)]
    pub kind: LocationKind,
}

/// Storage backend selected for a location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LocationKind {
    /// Directory tree laid out as `<path>/<variant>/<artifact>`
    Local {
        path: PathBuf,
        public_url: String,
    },
    /// Key listing of a remote object store, fetched out of band
    Static {
        listing: PathBuf,
        public_url: String,
        #[serde(default)]
        bucket: Option<String>,
        /// Bucket is addressed through the host name rather than the path
        #[serde(default)]
        vhost: bool,
    },
}

/// A recognized image type and its column header
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageTypeConfig {
    pub id: String,
    pub label: String,
}

/// Image types recognized for one variant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VariantConfig {
    pub name: String,

    #[serde(default)]
    pub image_types: Vec<ImageTypeConfig>,
}

impl VariantConfig {
    /// Column headers in configured order
    pub fn headers(&self) -> Vec<&str> {
        self.image_types.iter().map(|t| t.label.as_str()).collect()
    }

    /// Image type identifiers in configured order
    pub fn image_type_ids(&self) -> Vec<&str> {
        self.image_types.iter().map(|t| t.id.as_str()).collect()
    }

    pub fn recognizes(&self, image_type: &str) -> bool {
        self.image_types.iter().any(|t| t.id == image_type)
    }
}

/// Errors that can occur when loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Duplicate location name: '{0}'")]
    DuplicateLocation(String),

    #[error("Duplicate variant name: '{0}'")]
    DuplicateVariant(String),

    #[error("Location '{name}': missing required field '{field}'")]
    MissingField { name: String, field: String },

    #[error("Variant '{0}' has no image types")]
    NoImageTypes(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Unknown variant(s): {}", .0.join(", "))]
    UnknownVariants(Vec<String>),

    #[error("No storage locations configured")]
    NoLocations,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)?;
        if config.variants.is_empty() {
            config.variants = builtin_variants();
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.locations.is_empty() {
            return Err(ConfigError::NoLocations);
        }

        let mut seen = HashSet::new();
        for location in &self.locations {
            if !seen.insert(location.name.as_str()) {
                return Err(ConfigError::DuplicateLocation(location.name.clone()));
            }
            location.validate()?;
        }

        let mut seen = HashSet::new();
        for variant in &self.variants {
            if !seen.insert(variant.name.as_str()) {
                return Err(ConfigError::DuplicateVariant(variant.name.clone()));
            }
            if variant.image_types.is_empty() {
                return Err(ConfigError::NoImageTypes(variant.name.clone()));
            }
        }

        self.retention.validate()?;

        if self.feed.limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "feed.limit".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Get a variant by name
    pub fn variant(&self, name: &str) -> Option<&VariantConfig> {
        self.variants.iter().find(|v| v.name == name)
    }

    /// Resolve the variants to build.
    ///
    /// An empty request selects every configured variant. The result keeps
    /// configured order regardless of request order. Any unknown name fails
    /// the whole selection.
    pub fn select_variants(&self, requested: &[String]) -> Result<Vec<&VariantConfig>, ConfigError> {
        if requested.is_empty() {
            return Ok(self.variants.iter().collect());
        }

        let unknown: Vec<String> = requested
            .iter()
            .filter(|name| self.variant(name).is_none())
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ConfigError::UnknownVariants(unknown));
        }

        Ok(self
            .variants
            .iter()
            .filter(|v| requested.iter().any(|r| r == &v.name))
            .collect())
    }
}

impl LocationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::MissingField {
                name: "(unnamed)".to_string(),
                field: "name".to_string(),
            });
        }

        let missing = |field: &str| ConfigError::MissingField {
            name: self.name.clone(),
            field: field.to_string(),
        };

        match &self.kind {
            LocationKind::Local { path, public_url } => {
                if path.as_os_str().is_empty() {
                    return Err(missing("path"));
                }
                if public_url.is_empty() {
                    return Err(missing("public_url"));
                }
            }
            LocationKind::Static {
                listing,
                public_url,
                bucket,
                vhost,
            } => {
                if listing.as_os_str().is_empty() {
                    return Err(missing("listing"));
                }
                if public_url.is_empty() {
                    return Err(missing("public_url"));
                }
                if !vhost && bucket.as_deref().map_or(true, str::is_empty) {
                    return Err(missing("bucket"));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = r#"
        output_dir = "/srv/www"

        [retention]
        min_keep_count = 10

        [[location]]
        name = "local"
        kind = "local"
        path = "/srv/nightly-images"
        public_url = "https://example.org/nightly-images"

        [[location]]
        name = "mirror"
        kind = "static"
        listing = "/var/lib/nightly/mirror.txt"
        public_url = "https://s3.example.org"
        bucket = "nightly"

        [[variant]]
        name = "x86_64"
        image_types = [{ id = "anyboot", label = "Anyboot ISO" }]

        [[variant]]
        name = "arm"
        image_types = [{ id = "mmc", label = "SD Card Image" }]
    "#;

    #[test]
    fn test_parse_basic_config() {
        let config = Config::parse(BASIC).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/srv/www"));
        assert_eq!(config.retention.min_keep_count, 10);
        assert_eq!(config.retention.growth_factor, 1.5);
        assert_eq!(config.feed.limit, 20);
        assert_eq!(config.locations.len(), 2);
        assert_eq!(config.locations[0].name, "local");
        assert!(matches!(config.locations[0].kind, LocationKind::Local { .. }));
        match &config.locations[1].kind {
            LocationKind::Static { bucket, vhost, .. } => {
                assert_eq!(bucket.as_deref(), Some("nightly"));
                assert!(!vhost);
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert_eq!(config.variants.len(), 2);
        assert_eq!(config.variant("arm").unwrap().headers(), vec!["SD Card Image"]);
    }

    #[test]
    fn test_builtin_variants_when_none_configured() {
        let content = r#"
            [[location]]
            name = "local"
            kind = "local"
            path = "/srv/nightly-images"
            public_url = "https://example.org"
        "#;
        let config = Config::parse(content).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert!(config.variant("x86_gcc2h").is_some());
        assert!(config.variant("x86").is_none());
    }

    #[test]
    fn test_duplicate_location_rejected() {
        let content = r#"
            [[location]]
            name = "same"
            kind = "local"
            path = "/a"
            public_url = "https://a"

            [[location]]
            name = "same"
            kind = "local"
            path = "/b"
            public_url = "https://b"
        "#;
        assert!(matches!(
            Config::parse(content),
            Err(ConfigError::DuplicateLocation(_))
        ));
    }

    #[test]
    fn test_static_location_needs_bucket_without_vhost() {
        let content = r#"
            [[location]]
            name = "mirror"
            kind = "static"
            listing = "/keys.txt"
            public_url = "https://s3.example.org"
        "#;
        assert!(matches!(
            Config::parse(content),
            Err(ConfigError::MissingField { .. })
        ));

        let vhost = r#"
            [[location]]
            name = "mirror"
            kind = "static"
            listing = "/keys.txt"
            public_url = "https://nightly.s3.example.org"
            vhost = true
        "#;
        assert!(Config::parse(vhost).is_ok());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let content = r#"
            [[location]]
            name = "ftp"
            kind = "ftp"
            public_url = "ftp://example.org"
        "#;
        assert!(matches!(Config::parse(content), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_no_locations_rejected() {
        assert!(matches!(Config::parse(""), Err(ConfigError::NoLocations)));
    }

    #[test]
    fn test_variant_without_image_types_rejected() {
        let content = r#"
            [[location]]
            name = "local"
            kind = "local"
            path = "/a"
            public_url = "https://a"

            [[variant]]
            name = "m68k"
        "#;
        assert!(matches!(
            Config::parse(content),
            Err(ConfigError::NoImageTypes(_))
        ));
    }

    #[test]
    fn test_select_variants_keeps_configured_order() {
        let config = Config::parse(BASIC).unwrap();
        let selected = config
            .select_variants(&["arm".to_string(), "x86_64".to_string()])
            .unwrap();
        let names: Vec<_> = selected.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["x86_64", "arm"]);

        assert_eq!(config.select_variants(&[]).unwrap().len(), 2);
    }

    #[test]
    fn test_select_unknown_variant_fails() {
        let config = Config::parse(BASIC).unwrap();
        let err = config
            .select_variants(&["x86_64".to_string(), "vax".to_string()])
            .unwrap_err();
        match err {
            ConfigError::UnknownVariants(names) => assert_eq!(names, vec!["vax"]),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/nightly-index.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
