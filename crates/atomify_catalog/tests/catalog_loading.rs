//! End-to-end catalog loads against an on-disk bundle.

use std::fs;
use std::io::{self, Cursor};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use atomify_catalog::{
    CatalogConfig, CatalogError, CatalogLoader, DirectoryBundle, ImageSource, MemoryBundle,
    ResourceBundle, SkipReason,
};
use crossbeam_channel::{bounded, Receiver, Sender};

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn write(root: &Path, rel: &str, bytes: impl AsRef<[u8]>) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

const MANIFEST: &str = r#"{
    "examples": [
        {
            "id": "vapor",
            "title": "Water Vapor",
            "description": "TIP4P water molecules in the gas phase",
            "analysisDescription": "Watch the molecules cluster as the box cools.",
            "imageUrl": "simulations/water/vapor.png",
            "inputScript": "water/vapor.in",
            "keywords": ["water", "phase transition"],
            "files": [
                { "fileName": "Input script", "url": "water/vapor.in" },
                { "fileName": "Data file", "url": "water/vapor.data" }
            ]
        },
        {
            "id": "broken",
            "title": "Broken",
            "description": "Second file has no url",
            "imageUrl": "simulations/broken.png",
            "inputScript": "broken.in",
            "keywords": [],
            "files": [{ "fileName": "ok", "url": "a" }, { "fileName": "no url" }]
        },
        {
            "id": "lj",
            "title": "Lennard-Jones Fluid",
            "description": "Argon-like particles",
            "imageUrl": "simulations/lj/missing.png",
            "inputScript": "lj/lj.in",
            "keywords": ["gas"],
            "files": []
        }
    ]
}"#;

fn bundle_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "simulations/simulations.json", MANIFEST);
    write(dir.path(), "simulations/water/vapor.png", png(8, 6));
    write(dir.path(), "simulations/water/vapor.in", "units real\natom_style full\n");
    write(dir.path(), "simulations/lj/lj.in", "pair_style lj/cut 2.5\n");
    write(dir.path(), "placeholder.png", png(2, 2));
    dir
}

fn loader_for(root: &Path) -> CatalogLoader {
    CatalogLoader::from_config(CatalogConfig {
        resource_root: root.to_path_buf(),
        ..CatalogConfig::default()
    })
}

#[test]
fn skips_entry_with_incomplete_file_and_keeps_order() {
    let dir = bundle_dir();
    let load = loader_for(dir.path()).read_manifest().unwrap();

    assert_eq!(load.catalog.ids(), vec!["vapor", "lj"]);
    assert_eq!(load.skip_count(), 1);
    assert_eq!(load.skipped[0].id.as_deref(), Some("broken"));
    assert!(matches!(load.skipped[0].reason, SkipReason::Malformed(_)));

    let vapor = load.catalog.get("vapor").unwrap();
    assert_eq!(vapor.files.len(), 2);
    assert_eq!(vapor.files[1].resolve(), "simulations/water/vapor.data");
    assert!(vapor.analysis_description.is_some());
}

#[test]
fn images_resolve_to_asset_or_placeholder() {
    let dir = bundle_dir();
    let (load, images) = loader_for(dir.path()).load_catalog().unwrap();

    // Descriptors are complete records right away; images may still be pending.
    assert_eq!(load.catalog.len(), 2);
    assert_eq!(images.total(), 2);

    assert!(images.wait_timeout(Duration::from_secs(10)));
    assert_eq!(load.catalog.resolved_count(), 2);

    let vapor = load.catalog.get("vapor").unwrap().image().unwrap();
    assert_eq!((vapor.width, vapor.height), (8, 6));
    assert_eq!(vapor.source, ImageSource::Asset("simulations/water/vapor.png".to_string()));

    let lj = load.catalog.get("lj").unwrap().image().unwrap();
    assert!(lj.is_placeholder());
    assert_eq!((lj.width, lj.height), (2, 2));

    let mut events = images.drain();
    events.sort_by(|a, b| a.id.cmp(&b.id));
    let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["lj", "vapor"]);
}

/// Memory bundle whose read of one path waits for a release signal.
struct GatedBundle {
    inner: MemoryBundle,
    gated: &'static str,
    reading: Sender<()>,
    release: Receiver<()>,
}

impl ResourceBundle for GatedBundle {
    fn read(&self, rel_path: &str) -> io::Result<Vec<u8>> {
        if rel_path == self.gated {
            let _ = self.reading.send(());
            // Bounded so a regression fails the test instead of hanging it.
            let _ = self.release.recv_timeout(Duration::from_secs(10));
        }
        self.inner.read(rel_path)
    }

    fn contains(&self, rel_path: &str) -> bool {
        self.inner.contains(rel_path)
    }

    fn list(&self, rel_path: &str) -> io::Result<Vec<String>> {
        self.inner.list(rel_path)
    }
}

#[test]
fn catalog_is_available_before_images() {
    let manifest = r#"{ "examples": [{
        "id": "vapor", "title": "Water Vapor", "description": "gas phase",
        "imageUrl": "simulations/water/vapor.png", "inputScript": "water/vapor.in",
        "keywords": ["water"], "files": []
    }] }"#;
    let (reading_tx, reading_rx) = bounded(1);
    let (release_tx, release_rx) = bounded(1);
    let bundle = GatedBundle {
        inner: MemoryBundle::new()
            .with("simulations/simulations.json", manifest)
            .with("simulations/water/vapor.png", png(4, 3)),
        gated: "simulations/water/vapor.png",
        reading: reading_tx,
        release: release_rx,
    };
    let loader = CatalogLoader::new(
        Arc::new(bundle),
        CatalogConfig {
            image_workers: 1,
            ..CatalogConfig::default()
        },
    );

    let (load, images) = loader.load_catalog().unwrap();

    // The worker is stuck inside the image read, yet the catalog is here.
    reading_rx.recv_timeout(Duration::from_secs(10)).unwrap();
    let vapor = load.catalog.get("vapor").unwrap();
    assert!(!vapor.has_image());
    assert_eq!(images.pending(), 1);
    assert!(!images.is_complete());
    assert!(!images.wait_timeout(Duration::from_millis(20)));
    assert!(images.drain().is_empty());

    release_tx.send(()).unwrap();

    assert!(images.wait_timeout(Duration::from_secs(10)));
    let image = vapor.image().unwrap();
    assert_eq!((image.width, image.height), (4, 3));
    assert_eq!(
        images.drain().into_iter().map(|e| e.id).collect::<Vec<_>>(),
        vec!["vapor".to_string()]
    );
}

#[test]
fn loading_twice_gives_identical_catalogs() {
    let dir = bundle_dir();
    let loader = loader_for(dir.path());

    let first = loader.read_manifest().unwrap();
    let second = loader.read_manifest().unwrap();

    assert_eq!(first.catalog, second.catalog);
    assert_eq!(first.skipped, second.skipped);
}

#[test]
fn input_script_resolves_under_simulations() {
    let dir = bundle_dir();
    let loader = loader_for(dir.path());
    let load = loader.read_manifest().unwrap();

    let script = loader
        .read_input_script(load.catalog.get("lj").unwrap())
        .unwrap();
    assert!(script.starts_with("pair_style"));
}

#[test]
fn missing_examples_is_a_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "simulations/simulations.json", r#"{"sims": []}"#);

    let err = loader_for(dir.path()).read_manifest().unwrap_err();
    assert!(matches!(err, CatalogError::Schema(_)));
    assert!(!err.is_retryable());
}

#[test]
fn missing_resource_root_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = loader_for(&dir.path().join("nowhere")).read_manifest().unwrap_err();
    assert!(matches!(err, CatalogError::ResourceNotFound { .. }));
}

#[test]
fn unusable_placeholder_still_attaches_an_image() {
    let bundle = MemoryBundle::new()
        .with("simulations/simulations.json", MANIFEST)
        .with("placeholder.png", b"garbage".to_vec());
    let loader = CatalogLoader::new(Arc::new(bundle), CatalogConfig::default());

    let (load, images) = loader.load_catalog().unwrap();
    images.wait();

    for descriptor in load.catalog.iter() {
        let image = descriptor.image().unwrap();
        assert!(image.is_placeholder());
        assert_eq!((image.width, image.height), (1, 1));
    }
}

#[test]
fn directory_bundle_and_memory_bundle_agree() {
    let dir = bundle_dir();
    let from_disk = loader_for(dir.path()).read_manifest().unwrap();

    let memory = MemoryBundle::new().with("simulations/simulations.json", MANIFEST);
    let from_memory = CatalogLoader::new(Arc::new(memory), CatalogConfig::default())
        .read_manifest()
        .unwrap();

    assert_eq!(from_disk.catalog, from_memory.catalog);
}

#[test]
fn explicit_directory_bundle_matches_from_config() {
    let dir = bundle_dir();
    let explicit = CatalogLoader::new(
        Arc::new(DirectoryBundle::new(dir.path())),
        CatalogConfig::default(),
    );

    assert_eq!(
        explicit.read_manifest().unwrap().catalog,
        loader_for(dir.path()).read_manifest().unwrap().catalog
    );
}
