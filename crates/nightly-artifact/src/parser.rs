//! Artifact key parser.
//!
//! Recognizes keys of the form `[<path>/]hrev<digits>-<qualifier>-<type>.<zip|tar.xz>`.
//! Anything else is noise from the listing and is reported as `None`.

use std::fmt;
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Suffix of the checksum sidecar published next to every artifact.
pub const CHECKSUM_SUFFIX: &str = ".sha256";

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:(.*)/)?(hrev[0-9]+)-([^-/]*)-([^./]+)\.(zip|tar\.xz)$")
            .expect("artifact key pattern is valid")
    })
}

/// Archive container of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactExtension {
    #[serde(rename = "zip")]
    Zip,
    #[serde(rename = "tar.xz")]
    TarXz,
}

impl ArtifactExtension {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactExtension::Zip => "zip",
            ArtifactExtension::TarXz => "tar.xz",
        }
    }

    fn from_capture(s: &str) -> Option<Self> {
        match s {
            "zip" => Some(ArtifactExtension::Zip),
            "tar.xz" => Some(ArtifactExtension::TarXz),
            _ => None,
        }
    }
}

impl fmt::Display for ArtifactExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A listing key that matched the artifact grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedArtifact {
    /// The key exactly as the backend reported it
    pub raw_key: String,

    /// Directory part of the key, if any (without trailing slash)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// `hrev<digits>`
    pub revision: String,

    /// Free-form middle component (branch, build flavour, ...)
    pub qualifier: String,

    /// Image type, e.g. `anyboot` or `mmc`
    pub image_type: String,

    /// Archive container
    pub extension: ArtifactExtension,
}

impl ParsedArtifact {
    /// Filename without any path prefix.
    pub fn filename(&self) -> String {
        format!(
            "{}-{}-{}.{}",
            self.revision, self.qualifier, self.image_type, self.extension
        )
    }
}

/// Parse an artifact key.
///
/// Returns `None` for keys that do not follow the grammar. Callers skip
/// those silently; they are not errors.
pub fn parse_key(key: &str) -> Option<ParsedArtifact> {
    let caps = key_pattern().captures(key)?;
    let extension = ArtifactExtension::from_capture(caps.get(5)?.as_str())?;

    Some(ParsedArtifact {
        raw_key: key.to_string(),
        path: caps.get(1).map(|m| m.as_str().to_string()),
        revision: caps.get(2)?.as_str().to_string(),
        qualifier: caps.get(3)?.as_str().to_string(),
        image_type: caps.get(4)?.as_str().to_string(),
        extension,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_path() {
        let parsed = parse_key("x86_64/hrev56000-abc-anyboot.zip").unwrap();
        assert_eq!(parsed.path.as_deref(), Some("x86_64"));
        assert_eq!(parsed.revision, "hrev56000");
        assert_eq!(parsed.qualifier, "abc");
        assert_eq!(parsed.image_type, "anyboot");
        assert_eq!(parsed.extension, ArtifactExtension::Zip);
    }

    #[test]
    fn test_parse_bare_tar_xz() {
        let parsed = parse_key("hrev55123-x86_64-raw.tar.xz").unwrap();
        assert!(parsed.path.is_none());
        assert_eq!(parsed.qualifier, "x86_64");
        assert_eq!(parsed.image_type, "raw");
        assert_eq!(parsed.extension, ArtifactExtension::TarXz);
    }

    #[test]
    fn test_parse_image_type_with_underscore() {
        let parsed = parse_key("ppc/hrev57000-ppc-boot_cd.zip").unwrap();
        assert_eq!(parsed.image_type, "boot_cd");
    }

    #[test]
    fn test_reject_noise() {
        assert!(parse_key("x86_64/index.html").is_none());
        assert!(parse_key("x86_64/hrev56000-abc-anyboot.zip.sha256").is_none());
        assert!(parse_key("x86_64/hrev56000-abc-anyboot.iso").is_none());
        assert!(parse_key("x86_64/hrev-abc-anyboot.zip").is_none());
        assert!(parse_key("x86_64/r1beta4-abc-anyboot.zip").is_none());
        assert!(parse_key("").is_none());
    }

    #[test]
    fn test_filename_reconstructs_key_without_path() {
        for key in [
            "x86_64/hrev56000-abc-anyboot.zip",
            "hrev9999-x86_gcc2h-anyboot.zip",
            "deep/nested/arm/hrev52000-arm-mmc.tar.xz",
            "hrev1--raw.zip",
        ] {
            let parsed = parse_key(key).unwrap();
            let expected = key.rsplit('/').next().unwrap();
            assert_eq!(parsed.filename(), expected, "key {}", key);
        }
    }
}
