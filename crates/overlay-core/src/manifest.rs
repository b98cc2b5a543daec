//! Dataset manifest: which raster backs each (variable, year).
//!
//! ```json
//! {
//!   "variables": ["NH3", "CH4"],
//!   "years": ["2019", "2020"],
//!   "data": {
//!     "NH3": {
//!       "2019": { "tif": "data/NH3_2019.tif", "nc": "data/nc/2019.nc", "min": 0.0, "max": 1.2e-9 }
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{OverlayError, Result};
use crate::fetch::RasterFetcher;

/// Selection key for one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatasetKey {
    pub variable: String,
    pub year: String,
}

impl DatasetKey {
    pub fn new(variable: impl Into<String>, year: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            year: year.into(),
        }
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.variable, self.year)
    }
}

/// One dataset's location and reported value bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub min: f64,
    pub max: f64,
    /// GeoTIFF location, absolute or relative to the base URL.
    pub tif: String,
    /// Companion NetCDF source, informational only.
    #[serde(default)]
    pub nc: Option<String>,
}

/// The collaborator-provided dataset catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default)]
    pub years: Vec<String>,
    #[serde(default)]
    pub data: BTreeMap<String, BTreeMap<String, ManifestEntry>>,
}

impl Manifest {
    /// Parse a manifest from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| OverlayError::manifest(e.to_string()))
    }

    /// Parse a manifest from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| OverlayError::manifest(e.to_string()))
    }

    /// Fetch and parse a manifest.
    pub async fn load<F>(fetcher: &F, location: &str) -> Result<Self>
    where
        F: RasterFetcher + ?Sized,
    {
        let bytes = fetcher.fetch(location).await?;
        Self::from_slice(&bytes)
    }

    /// Entry for a key. A miss is terminal for that key.
    pub fn lookup(&self, key: &DatasetKey) -> Result<&ManifestEntry> {
        self.data
            .get(&key.variable)
            .and_then(|years| years.get(&key.year))
            .ok_or_else(|| OverlayError::manifest_miss(key))
    }

    /// Every key that has an entry, in sorted order.
    pub fn keys(&self) -> Vec<DatasetKey> {
        self.data
            .iter()
            .flat_map(|(variable, years)| {
                years
                    .keys()
                    .map(move |year| DatasetKey::new(variable.clone(), year.clone()))
            })
            .collect()
    }

    /// Directory that relative `tif` paths resolve against, given the
    /// directory (path or URL) holding the manifest.
    ///
    /// The tile build writes `data/manifest.json` listing
    /// `data/NH3_2019.tif`, relative to the site root one level up. When
    /// every relative path starts with the manifest directory's own name the
    /// parent is the root; otherwise the manifest directory is.
    pub fn site_root(&self, manifest_dir: &str) -> String {
        let dir = manifest_dir.trim_end_matches('/');
        let Some((parent, name)) = dir.rsplit_once('/') else {
            return dir.to_string();
        };
        if name.is_empty() || parent.ends_with(':') || parent.ends_with(":/") {
            return dir.to_string();
        }

        let prefix = format!("{}/", name);
        let mut relative = self
            .data
            .values()
            .flat_map(|years| years.values())
            .map(|entry| entry.tif.as_str())
            .filter(|tif| !is_absolute(tif))
            .map(|tif| tif.trim_start_matches("./"))
            .peekable();
        let nested = relative.peek().is_some() && relative.all(|tif| tif.starts_with(&prefix));

        match (nested, parent) {
            (false, _) => dir.to_string(),
            (true, "") => "/".to_string(),
            (true, parent) => parent.to_string(),
        }
    }
}

fn is_absolute(tif: &str) -> bool {
    tif.contains("://") || tif.starts_with('/')
}

/// Join a relative `tif` path onto an optional base URL.
///
/// Absolute URLs and paths are returned unchanged.
pub fn resolve_url(tif: &str, base_url: Option<&str>) -> String {
    match base_url {
        Some(base) if !is_absolute(tif) && !base.is_empty() => {
            format!("{}/{}", base.trim_end_matches('/'), tif.trim_start_matches("./"))
        }
        _ => tif.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "variables": ["NH3", "CH4"],
        "years": ["2019", "2020"],
        "data": {
            "NH3": {
                "2019": { "tif": "data/NH3_2019.tif", "nc": "data/nc/a.nc", "min": 0.0, "max": 1.2e-9 },
                "2020": { "tif": "data/NH3_2020.tif", "min": 0.0, "max": 2.0e-9 }
            }
        }
    }"#;

    #[test]
    fn test_lookup() {
        let manifest = Manifest::from_json(MANIFEST).unwrap();
        let entry = manifest.lookup(&DatasetKey::new("NH3", "2019")).unwrap();
        assert_eq!(entry.tif, "data/NH3_2019.tif");
        assert_eq!(entry.max, 1.2e-9);
        assert_eq!(entry.nc.as_deref(), Some("data/nc/a.nc"));

        let entry = manifest.lookup(&DatasetKey::new("NH3", "2020")).unwrap();
        assert!(entry.nc.is_none());
    }

    #[test]
    fn test_lookup_miss() {
        let manifest = Manifest::from_json(MANIFEST).unwrap();
        assert!(matches!(
            manifest.lookup(&DatasetKey::new("CH4", "2019")),
            Err(OverlayError::ManifestMiss { .. })
        ));
        assert!(manifest.lookup(&DatasetKey::new("NH3", "1999")).is_err());
    }

    #[test]
    fn test_keys() {
        let manifest = Manifest::from_json(MANIFEST).unwrap();
        assert_eq!(
            manifest.keys(),
            vec![DatasetKey::new("NH3", "2019"), DatasetKey::new("NH3", "2020")]
        );
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            Manifest::from_json("{\"data\": 3}"),
            Err(OverlayError::Manifest(_))
        ));
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(
            resolve_url("data/a.tif", Some("https://example.org/site/")),
            "https://example.org/site/data/a.tif"
        );
        assert_eq!(resolve_url("./data/a.tif", Some("/srv")), "/srv/data/a.tif");
        assert_eq!(resolve_url("https://cdn/a.tif", Some("https://x")), "https://cdn/a.tif");
        assert_eq!(resolve_url("/abs/a.tif", Some("https://x")), "/abs/a.tif");
        assert_eq!(resolve_url("data/a.tif", None), "data/a.tif");
    }

    #[test]
    fn test_site_root() {
        let manifest = Manifest::from_json(MANIFEST).unwrap();
        assert_eq!(manifest.site_root("/srv/site/data"), "/srv/site");
        assert_eq!(manifest.site_root("/srv/site/data/"), "/srv/site");
        assert_eq!(manifest.site_root("/srv/site"), "/srv/site");
        assert_eq!(manifest.site_root("/data"), "/");
        assert_eq!(
            manifest.site_root("https://example.org/site/data"),
            "https://example.org/site"
        );
        assert_eq!(manifest.site_root("https://example.org"), "https://example.org");
        assert_eq!(manifest.site_root("data"), "data");
    }

    #[test]
    fn test_site_root_ignores_absolute_paths() {
        let manifest = Manifest::from_json(
            r#"{ "data": { "NH3": { "2019": { "tif": "https://cdn/data/a.tif", "min": 0, "max": 1 } } } }"#,
        )
        .unwrap();
        assert_eq!(manifest.site_root("/srv/site/data"), "/srv/site/data");
    }

    #[test]
    fn test_key_display() {
        assert_eq!(DatasetKey::new("CH4", "2020").to_string(), "CH4/2020");
    }
}
