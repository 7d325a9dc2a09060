//! # Catalog Loader
//!
//! Reads the manifest out of a [`ResourceBundle`], builds the [`Catalog`]
//! and kicks off preview resolution.
//!
//! ## Load Sequence
//!
//! 1. Probe the simulations directory (missing → `ResourceNotFound`)
//! 2. Read the manifest (missing → `ResourceNotFound`, unreadable → `Io`)
//! 3. Parse and validate ([`crate::manifest::parse_manifest`])
//! 4. Hand back the catalog; previews resolve in the background
//!
//! Loading is idempotent: the same bundle always yields the same catalog.

use std::sync::Arc;

use crate::bundle::{DirectoryBundle, ResourceBundle};
use crate::config::CatalogConfig;
use crate::error::{CatalogError, CatalogResult};
use crate::images::{ImageResolution, ImageResolver};
use crate::manifest::{parse_manifest, SkippedEntry};
use crate::model::{Catalog, FileRef, SimulationDescriptor};

/// A loaded catalog and the entries that were left out.
#[derive(Debug, Default)]
pub struct CatalogLoad {
    /// Accepted descriptors.
    pub catalog: Catalog,
    /// Per-entry warnings.
    pub skipped: Vec<SkippedEntry>,
}

impl CatalogLoad {
    /// Number of skipped manifest entries.
    #[inline]
    #[must_use]
    pub fn skip_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Loads catalogs from a bundle.
pub struct CatalogLoader {
    bundle: Arc<dyn ResourceBundle>,
    config: CatalogConfig,
}

impl CatalogLoader {
    /// Creates a loader over `bundle`.
    ///
    /// `config.resource_root` is ignored; the bundle already knows where
    /// its bytes live.
    pub fn new(bundle: Arc<dyn ResourceBundle>, config: CatalogConfig) -> Self {
        Self { bundle, config }
    }

    /// Creates a loader over a [`DirectoryBundle`] at `config.resource_root`.
    #[must_use]
    pub fn from_config(config: CatalogConfig) -> Self {
        let bundle = DirectoryBundle::new(config.resource_root.clone());
        Self::new(Arc::new(bundle), config)
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// The bundle being read.
    #[must_use]
    pub fn bundle(&self) -> &Arc<dyn ResourceBundle> {
        &self.bundle
    }

    /// Reads and validates the manifest without touching images.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::ResourceNotFound`] if the simulations directory or
    ///   the manifest is missing
    /// - [`CatalogError::Io`] if the manifest cannot be read
    /// - [`CatalogError::Parse`] / [`CatalogError::Schema`] if it is not a
    ///   valid manifest
    pub fn read_manifest(&self) -> CatalogResult<CatalogLoad> {
        self.probe_simulations_dir()?;

        let path = self.config.manifest_path.as_str();
        if !self.bundle.contains(path) {
            return Err(CatalogError::ResourceNotFound {
                path: path.to_string(),
            });
        }
        let bytes = self
            .bundle
            .read(path)
            .map_err(|e| CatalogError::from_io(path, e))?;

        let parsed = parse_manifest(&bytes)?;
        for skipped in &parsed.skipped {
            tracing::warn!("skipping catalog {}", skipped);
        }

        let catalog = Catalog::from_entries(parsed.descriptors.into_iter().map(Arc::new).collect());
        tracing::info!(
            "catalog loaded: {} simulations, {} skipped",
            catalog.len(),
            parsed.skipped.len()
        );

        Ok(CatalogLoad {
            catalog,
            skipped: parsed.skipped,
        })
    }

    /// Loads the catalog and starts resolving previews.
    ///
    /// The catalog is returned as soon as the manifest is parsed; images
    /// attach to its descriptors as workers finish.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogLoader::read_manifest`]. Image failures are never
    /// errors.
    pub fn load_catalog(&self) -> CatalogResult<(CatalogLoad, ImageResolution)> {
        let load = self.read_manifest()?;
        let resolution = self.resolver().resolve(&load.catalog);
        Ok((load, resolution))
    }

    /// An image resolver sharing this loader's bundle.
    #[must_use]
    pub fn resolver(&self) -> ImageResolver {
        ImageResolver::new(
            Arc::clone(&self.bundle),
            self.config.placeholder_path.clone(),
            self.config.image_workers,
        )
    }

    /// Reads a simulation's input script as text.
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` or `Io` from the bundle; `Schema` if the script
    /// is not UTF-8.
    pub fn read_input_script(&self, descriptor: &SimulationDescriptor) -> CatalogResult<String> {
        let path = descriptor.input_script_path();
        let bytes = self.read_resource(&path)?;
        String::from_utf8(bytes)
            .map_err(|_| CatalogError::Schema(format!("input script {path} is not UTF-8")))
    }

    /// Reads one auxiliary file.
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` or `Io` from the bundle.
    pub fn read_file(&self, file: &FileRef) -> CatalogResult<Vec<u8>> {
        self.read_resource(&file.resolve())
    }

    fn read_resource(&self, path: &str) -> CatalogResult<Vec<u8>> {
        self.bundle.read(path).map_err(|e| CatalogError::from_io(path, e))
    }

    fn probe_simulations_dir(&self) -> CatalogResult<()> {
        let dir = self.config.simulations_dir();
        if dir.is_empty() {
            return Ok(());
        }

        match self.bundle.list(dir) {
            Ok(names) => {
                tracing::debug!("{} contains {:?}", dir, names);
                Ok(())
            }
            Err(e) => Err(CatalogError::from_io(dir, e)),
        }
    }
}

impl std::fmt::Debug for CatalogLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogLoader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
