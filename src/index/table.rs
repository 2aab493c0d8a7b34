//! Table rows and the current image set.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use nightly_artifact::ParsedArtifact;
use serde::Serialize;

/// Day-truncated timestamp (midnight UTC of the same day).
pub fn truncate_to_day(time: DateTime<Utc>) -> DateTime<Utc> {
    time.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(time)
}

/// Where one artifact of a row can be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactLink {
    pub location: String,
    pub filename: String,
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

/// One revision and the artifacts every location holds for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub revision: String,

    /// image type -> links in location processing order
    pub images: BTreeMap<String, Vec<ArtifactLink>>,

    /// Day-truncated mtime of the row's first resolved artifact
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime: Option<DateTime<Utc>>,
}

impl TableRow {
    pub(crate) fn new(revision: String) -> Self {
        Self {
            revision,
            images: BTreeMap::new(),
            mtime: None,
        }
    }

    /// Link for `image_type` at `location`
    pub fn link(&self, image_type: &str, location: &str) -> Option<&ArtifactLink> {
        self.images
            .get(image_type)
            .and_then(|links| links.iter().find(|l| l.location == location))
    }

    /// Every link held by `location`, in image type order
    pub fn links_at<'a>(&'a self, location: &'a str) -> impl Iterator<Item = &'a ArtifactLink> + 'a {
        self.images
            .values()
            .flat_map(|links| links.iter())
            .filter(move |l| l.location == location)
    }

    /// Day-truncated mtime of the first artifact `location` holds for this row.
    ///
    /// `image_order` is the configured image type order.
    pub fn mtime_at(&self, location: &str, image_order: &[&str]) -> Option<DateTime<Utc>> {
        image_order
            .iter()
            .find_map(|image_type| self.link(image_type, location))
            .and_then(|link| link.modified)
            .map(truncate_to_day)
    }

    pub fn is_empty(&self) -> bool {
        self.images.values().all(|links| links.is_empty())
    }

    /// Recompute `mtime` from the first resolved artifact in configured order.
    pub(crate) fn refresh_mtime(&mut self, image_order: &[&str]) {
        self.mtime = image_order
            .iter()
            .filter_map(|image_type| self.images.get(*image_type))
            .find_map(|links| links.first())
            .and_then(|link| link.modified)
            .map(truncate_to_day);
    }
}

/// Newest artifact of one image type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentImage {
    pub artifact: ParsedArtifact,
    pub location: String,
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl CurrentImage {
    pub fn filename(&self) -> String {
        self.artifact.filename()
    }
}

/// image type -> current artifact. Derived once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CurrentImageSet(BTreeMap<String, CurrentImage>);

impl CurrentImageSet {
    pub fn get(&self, image_type: &str) -> Option<&CurrentImage> {
        self.0.get(image_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CurrentImage)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `filename` at `location` is the current artifact of some type
    pub fn contains(&self, location: &str, filename: &str) -> bool {
        self.0
            .values()
            .any(|c| c.location == location && c.artifact.filename() == filename)
    }

    pub(crate) fn insert(&mut self, image_type: String, image: CurrentImage) {
        self.0.insert(image_type, image);
    }
}

/// Table and current set of one variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VariantIndex {
    /// Rows, newest revision first
    pub table: Vec<TableRow>,
    pub current: CurrentImageSet,
}

impl VariantIndex {
    /// Drop links to files deleted from `location`, and rows left empty.
    pub fn remove_links(&mut self, location: &str, filenames: &[String], image_order: &[&str]) {
        if filenames.is_empty() {
            return;
        }

        for row in &mut self.table {
            for links in row.images.values_mut() {
                links.retain(|l| !(l.location == location && filenames.contains(&l.filename)));
            }
            row.images.retain(|_, links| !links.is_empty());
            row.refresh_mtime(image_order);
        }
        self.table.retain(|row| !row.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn link(location: &str, filename: &str, modified: Option<DateTime<Utc>>) -> ArtifactLink {
        ArtifactLink {
            location: location.to_string(),
            filename: filename.to_string(),
            url: format!("https://{}/{}", location, filename),
            modified,
        }
    }

    #[test]
    fn test_truncate_to_day() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 17, 45, 12).unwrap();
        assert_eq!(
            truncate_to_day(t),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_mtime_at_uses_configured_order() {
        let early = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap();

        let mut row = TableRow::new("hrev57000".to_string());
        row.images.insert(
            "boot_cd".to_string(),
            vec![link("local", "hrev57000-ppc-boot_cd.zip", Some(late))],
        );
        row.images.insert(
            "raw".to_string(),
            vec![link("local", "hrev57000-ppc-raw.zip", Some(early))],
        );

        let order = ["raw", "boot_cd"];
        assert_eq!(row.mtime_at("local", &order), Some(truncate_to_day(early)));
        assert_eq!(row.mtime_at("mirror", &order), None);

        row.refresh_mtime(&order);
        assert_eq!(row.mtime, Some(truncate_to_day(early)));
    }

    #[test]
    fn test_remove_links_drops_empty_rows() {
        let mut index = VariantIndex::default();
        let mut kept = TableRow::new("hrev2".to_string());
        kept.images.insert(
            "anyboot".to_string(),
            vec![
                link("local", "hrev2-a-anyboot.zip", None),
                link("mirror", "hrev2-a-anyboot.zip", None),
            ],
        );
        let mut emptied = TableRow::new("hrev1".to_string());
        emptied.images.insert(
            "anyboot".to_string(),
            vec![link("local", "hrev1-a-anyboot.zip", None)],
        );
        index.table = vec![kept, emptied];

        index.remove_links(
            "local",
            &["hrev1-a-anyboot.zip".to_string(), "hrev2-a-anyboot.zip".to_string()],
            &["anyboot"],
        );

        assert_eq!(index.table.len(), 1);
        assert_eq!(index.table[0].revision, "hrev2");
        assert_eq!(index.table[0].images["anyboot"].len(), 1);
        assert_eq!(index.table[0].images["anyboot"][0].location, "mirror");
    }
}
