//! Catalog configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the catalog lives and how previews are resolved.
///
/// Every field has a default, so an empty `[catalog]` table is valid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directory a [`crate::DirectoryBundle`] is rooted at.
    pub resource_root: PathBuf,
    /// Bundle-relative manifest path.
    pub manifest_path: String,
    /// Bundle-relative fallback preview.
    pub placeholder_path: String,
    /// Image worker threads per resolution.
    pub image_workers: usize,
}

impl CatalogConfig {
    /// Default manifest location.
    pub const DEFAULT_MANIFEST: &'static str = "simulations/simulations.json";
    /// Default placeholder asset.
    pub const DEFAULT_PLACEHOLDER: &'static str = "placeholder.png";
    /// Default number of image workers.
    pub const DEFAULT_IMAGE_WORKERS: usize = 2;

    /// Directory the manifest sits in, probed before it is read.
    ///
    /// Empty when the manifest is at the bundle root.
    #[must_use]
    pub fn simulations_dir(&self) -> &str {
        self.manifest_path.rsplit_once('/').map_or("", |(dir, _)| dir)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            resource_root: PathBuf::from("."),
            manifest_path: Self::DEFAULT_MANIFEST.to_string(),
            placeholder_path: Self::DEFAULT_PLACEHOLDER.to_string(),
            image_workers: Self::DEFAULT_IMAGE_WORKERS,
        }
    }
}
