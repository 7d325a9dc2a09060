//! # Atomify Catalog
//!
//! The list of simulations shipped with the application.
//!
//! ## Flow
//!
//! ```text
//! ResourceBundle ──> CatalogLoader ──> Catalog (immediately)
//!                          │
//!                          └──> ImageResolver ──> previews attach later
//! ```
//!
//! Malformed manifest entries are skipped with a warning. Missing or broken
//! previews get the placeholder image. Only a missing or structurally
//! invalid manifest fails the load.
//!
//! ## Example
//!
//! ```rust,ignore
//! use atomify_catalog::{CatalogConfig, CatalogLoader};
//!
//! let loader = CatalogLoader::from_config(CatalogConfig::default());
//! let (load, images) = loader.load_catalog()?;
//! for sim in load.catalog.iter() {
//!     println!("{}: {}", sim.id, sim.title);
//! }
//! images.wait();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod bundle;
pub mod config;
pub mod error;
pub mod images;
pub mod loader;
pub mod manifest;
pub mod model;

pub use bundle::{DirectoryBundle, MemoryBundle, ResourceBundle};
pub use config::CatalogConfig;
pub use error::{CatalogError, CatalogResult};
pub use images::{ImageEvent, ImageResolution, ImageResolver};
pub use loader::{CatalogLoad, CatalogLoader};
pub use manifest::{SkipReason, SkippedEntry};
pub use model::{Catalog, FileRef, ImageSource, PreviewImage, SimulationDescriptor};
