//! # Catalog Records
//!
//! Typed, immutable descriptions of the simulations shipped in a bundle.
//!
//! A [`SimulationDescriptor`] is fully built by the loader and never changes
//! afterwards, with one exception: its preview image sits in a write-once
//! cell that an image worker fills some time after the catalog is returned.
//!
//! ```text
//! Catalog ─┬─ Arc<SimulationDescriptor> ── image: OnceLock<Arc<PreviewImage>>
//!          ├─ Arc<SimulationDescriptor>        (empty until resolved)
//!          └─ ...
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Root directory holding the manifest and per-simulation assets.
pub const SIMULATIONS_DIR: &str = "simulations";

/// Joins `rel` onto [`SIMULATIONS_DIR`] unless it is already rooted there.
#[must_use]
pub fn asset_path(rel: &str) -> String {
    let rel = rel.trim_start_matches('/');
    let rooted = rel
        .strip_prefix(SIMULATIONS_DIR)
        .is_some_and(|rest| rest.starts_with('/'));
    if rooted {
        rel.to_string()
    } else {
        format!("{SIMULATIONS_DIR}/{rel}")
    }
}

/// One auxiliary asset attached to a simulation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileRef {
    /// Name shown to the user.
    pub file_name: String,
    /// Asset reference inside the bundle.
    pub url: String,
}

impl FileRef {
    /// Bundle-relative path of the asset.
    #[must_use]
    pub fn resolve(&self) -> String {
        asset_path(&self.url)
    }
}

/// Where a preview image came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    /// Decoded from the descriptor's own `imageUrl`.
    Asset(String),
    /// The bundle placeholder, or the built-in pixel if that was unusable.
    Placeholder,
}

/// Decoded RGBA8 preview.
#[derive(Clone, PartialEq, Eq)]
pub struct PreviewImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA8 bytes, `width * height * 4` long.
    pub pixels: Vec<u8>,
    /// Origin of the pixels.
    pub source: ImageSource,
}

impl PreviewImage {
    /// Decodes PNG or JPEG bytes.
    ///
    /// # Errors
    ///
    /// Returns the decoder error if the bytes are not a supported image.
    pub fn decode(bytes: &[u8], source: ImageSource) -> Result<Self, image::ImageError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        Ok(Self {
            width: rgba.width(),
            height: rgba.height(),
            pixels: rgba.into_raw(),
            source,
        })
    }

    /// A single mid-grey pixel, used when even the placeholder asset fails.
    #[must_use]
    pub fn builtin_placeholder() -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![128, 128, 128, 255],
            source: ImageSource::Placeholder,
        }
    }

    /// Returns true if this is the placeholder rather than the real preview.
    #[inline]
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.source == ImageSource::Placeholder
    }
}

impl fmt::Debug for PreviewImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .field("source", &self.source)
            .finish()
    }
}

/// Metadata for one runnable simulation.
pub struct SimulationDescriptor {
    /// Unique key within a catalog.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Short description.
    pub description: String,
    /// Longer write-up shown after a run, if any.
    pub analysis_description: Option<String>,
    /// Bundle-relative preview image.
    pub image_url: String,
    /// Backend input script reference.
    pub input_script: String,
    /// Search keywords.
    pub keywords: BTreeSet<String>,
    /// Auxiliary assets, in manifest order.
    pub files: Vec<FileRef>,
    /// Resolved preview, filled once by an image worker.
    image: OnceLock<Arc<PreviewImage>>,
}

impl SimulationDescriptor {
    /// Creates a descriptor with no image attached.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        id: String,
        title: String,
        description: String,
        analysis_description: Option<String>,
        image_url: String,
        input_script: String,
        keywords: BTreeSet<String>,
        files: Vec<FileRef>,
    ) -> Self {
        Self {
            id,
            title,
            description,
            analysis_description,
            image_url,
            input_script,
            keywords,
            files,
            image: OnceLock::new(),
        }
    }

    /// Bundle-relative path of the input script.
    #[must_use]
    pub fn input_script_path(&self) -> String {
        asset_path(&self.input_script)
    }

    /// The resolved preview, if a worker has attached one yet.
    #[must_use]
    pub fn image(&self) -> Option<Arc<PreviewImage>> {
        self.image.get().cloned()
    }

    /// Returns true once a preview (real or placeholder) is attached.
    #[inline]
    #[must_use]
    pub fn has_image(&self) -> bool {
        self.image.get().is_some()
    }

    /// Attaches the preview.
    ///
    /// # Returns
    ///
    /// `false` if an image was already attached; the first one stays.
    pub fn attach_image(&self, image: Arc<PreviewImage>) -> bool {
        self.image.set(image).is_ok()
    }

    /// Case-insensitive keyword match.
    #[must_use]
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword))
    }

    fn matches_text(&self, needle_lower: &str) -> bool {
        self.title.to_lowercase().contains(needle_lower)
            || self.description.to_lowercase().contains(needle_lower)
            || self
                .keywords
                .iter()
                .any(|k| k.to_lowercase().contains(needle_lower))
    }
}

/// Record equality; the attached image is not compared.
impl PartialEq for SimulationDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.description == other.description
            && self.analysis_description == other.analysis_description
            && self.image_url == other.image_url
            && self.input_script == other.input_script
            && self.keywords == other.keywords
            && self.files == other.files
    }
}

impl Eq for SimulationDescriptor {}

impl fmt::Debug for SimulationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationDescriptor")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("image_url", &self.image_url)
            .field("input_script", &self.input_script)
            .field("keywords", &self.keywords)
            .field("files", &self.files.len())
            .field("has_image", &self.has_image())
            .finish_non_exhaustive()
    }
}

/// Ordered set of descriptors with unique ids.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<Arc<SimulationDescriptor>>,
}

impl Catalog {
    /// Wraps already-deduplicated descriptors.
    pub(crate) fn from_entries(entries: Vec<Arc<SimulationDescriptor>>) -> Self {
        Self { entries }
    }

    /// Looks up a descriptor by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<SimulationDescriptor>> {
        self.entries.iter().find(|d| d.id == id)
    }

    /// Descriptors in manifest order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<SimulationDescriptor>> + '_ {
        self.entries.iter()
    }

    /// Number of descriptors.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the manifest produced no descriptors.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids in manifest order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|d| d.id.as_str()).collect()
    }

    /// Descriptors tagged with `keyword`, ignoring case.
    #[must_use]
    pub fn with_keyword(&self, keyword: &str) -> Vec<&Arc<SimulationDescriptor>> {
        self.entries.iter().filter(|d| d.has_keyword(keyword)).collect()
    }

    /// Descriptors whose title, description or keywords contain `text`,
    /// ignoring case. An empty query matches everything.
    #[must_use]
    pub fn search(&self, text: &str) -> Vec<&Arc<SimulationDescriptor>> {
        let needle = text.trim().to_lowercase();
        self.entries
            .iter()
            .filter(|d| needle.is_empty() || d.matches_text(&needle))
            .collect()
    }

    /// Number of descriptors with an attached image.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.entries.iter().filter(|d| d.has_image()).count()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Arc<SimulationDescriptor>;
    type IntoIter = std::slice::Iter<'a, Arc<SimulationDescriptor>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: &str, title: &str, keywords: &[&str]) -> SimulationDescriptor {
        SimulationDescriptor::new(
            id.to_string(),
            title.to_string(),
            format!("{title} demo"),
            None,
            format!("simulations/{id}/{id}.png"),
            format!("{id}/{id}.in"),
            keywords.iter().map(ToString::to_string).collect(),
            vec![FileRef {
                file_name: "data".to_string(),
                url: format!("{id}/data.txt"),
            }],
        )
    }

    #[test]
    fn test_asset_path_prefixes_once() {
        assert_eq!(asset_path("water/vapor.in"), "simulations/water/vapor.in");
        assert_eq!(asset_path("simulations/water/vapor.in"), "simulations/water/vapor.in");
        assert_eq!(asset_path("/lj.in"), "simulations/lj.in");
        assert_eq!(asset_path("simulationsx/a.in"), "simulations/simulationsx/a.in");
    }

    #[test]
    fn test_descriptor_paths() {
        let d = descriptor("vapor", "Vapor", &[]);
        assert_eq!(d.input_script_path(), "simulations/vapor/vapor.in");
        assert_eq!(d.files[0].resolve(), "simulations/vapor/data.txt");
    }

    #[test]
    fn test_image_is_write_once() {
        let d = descriptor("vapor", "Vapor", &[]);
        assert!(!d.has_image());

        assert!(d.attach_image(Arc::new(PreviewImage::builtin_placeholder())));
        let second = PreviewImage {
            width: 2,
            height: 1,
            pixels: vec![0; 8],
            source: ImageSource::Asset("x.png".to_string()),
        };
        assert!(!d.attach_image(Arc::new(second)));

        let image = d.image().unwrap();
        assert!(image.is_placeholder());
        assert_eq!((image.width, image.height), (1, 1));
    }

    #[test]
    fn test_equality_ignores_image() {
        let a = descriptor("lj", "Lennard-Jones", &["gas"]);
        let b = descriptor("lj", "Lennard-Jones", &["gas"]);
        a.attach_image(Arc::new(PreviewImage::builtin_placeholder()));

        assert_eq!(a, b);
        assert_ne!(a, descriptor("lj", "Other", &["gas"]));
    }

    #[test]
    fn test_catalog_queries() {
        let catalog = Catalog::from_entries(vec![
            Arc::new(descriptor("vapor", "Water Vapor", &["Water", "phase"])),
            Arc::new(descriptor("lj", "Lennard-Jones Fluid", &["gas"])),
        ]);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.ids(), vec!["vapor", "lj"]);
        assert_eq!(catalog.get("lj").unwrap().title, "Lennard-Jones Fluid");
        assert!(catalog.get("missing").is_none());

        let water: Vec<_> = catalog.with_keyword("water").iter().map(|d| d.id.as_str()).collect();
        assert_eq!(water, vec!["vapor"]);

        let fluid: Vec<_> = catalog.search("FLUID").iter().map(|d| d.id.as_str()).collect();
        assert_eq!(fluid, vec!["lj"]);
        assert_eq!(catalog.search("  ").len(), 2);
        assert_eq!(catalog.resolved_count(), 0);
        assert_eq!((&catalog).into_iter().count(), 2);
    }

    #[test]
    fn test_debug_omits_pixels() {
        let text = format!("{:?}", PreviewImage::builtin_placeholder());
        assert!(text.contains("bytes: 4"));
    }
}
