//! # Preview Image Resolution
//!
//! Decodes each descriptor's preview on worker threads, after the catalog
//! has already been handed out.
//!
//! ```text
//! resolve(catalog) ─> [job channel] ─> worker 0..N ─┬─> descriptor.attach_image()
//!        │                                           └─> [event channel] ─> UI drains
//!        └─> ImageResolution { events, pending, wait() }
//! ```
//!
//! A failed read or decode never surfaces as an error: the bundle
//! placeholder is attached instead, and if that is unusable too, a built-in
//! grey pixel. Every queued descriptor ends up with an image.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};

use crate::bundle::ResourceBundle;
use crate::model::{Catalog, ImageSource, PreviewImage, SimulationDescriptor};

/// Notification that one descriptor's image was attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageEvent {
    /// Descriptor id.
    pub id: String,
    /// Where the attached image came from.
    pub source: ImageSource,
}

/// Counts outstanding jobs and wakes waiters when it reaches zero.
struct Completion {
    remaining: Mutex<usize>,
    condvar: Condvar,
}

impl Completion {
    fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            condvar: Condvar::new(),
        }
    }

    fn finish_one(&self) {
        let mut remaining = self.remaining.lock();
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.condvar.notify_all();
        }
    }

    fn remaining(&self) -> usize {
        *self.remaining.lock()
    }

    fn wait(&self) {
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            self.condvar.wait(&mut remaining);
        }
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait();
            return true;
        };
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            if self.condvar.wait_until(&mut remaining, deadline).timed_out() {
                return *remaining == 0;
            }
        }
        true
    }
}

/// State shared by the resolver and its workers.
struct Shared {
    bundle: Arc<dyn ResourceBundle>,
    placeholder_path: String,
    placeholder: OnceLock<Arc<PreviewImage>>,
}

impl Shared {
    fn placeholder(&self) -> Arc<PreviewImage> {
        Arc::clone(self.placeholder.get_or_init(|| {
            let decoded = self
                .bundle
                .read(&self.placeholder_path)
                .map_err(|e| e.to_string())
                .and_then(|bytes| {
                    PreviewImage::decode(&bytes, ImageSource::Placeholder).map_err(|e| e.to_string())
                });

            match decoded {
                Ok(image) => Arc::new(image),
                Err(e) => {
                    tracing::warn!(
                        "placeholder {} unusable ({}), using built-in pixel",
                        self.placeholder_path,
                        e
                    );
                    Arc::new(PreviewImage::builtin_placeholder())
                }
            }
        }))
    }

    fn load(&self, descriptor: &SimulationDescriptor) -> Arc<PreviewImage> {
        let path = &descriptor.image_url;
        let bytes = match self.bundle.read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!("preview {} for {} not readable: {}", path, descriptor.id, e);
                return self.placeholder();
            }
        };

        match PreviewImage::decode(&bytes, ImageSource::Asset(path.clone())) {
            Ok(image) => {
                tracing::debug!(
                    "decoded preview for {} ({}x{})",
                    descriptor.id,
                    image.width,
                    image.height
                );
                Arc::new(image)
            }
            Err(e) => {
                tracing::debug!("preview {} for {} failed to decode: {}", path, descriptor.id, e);
                self.placeholder()
            }
        }
    }

    /// Resolves one descriptor, falling back to the built-in pixel if the
    /// decoder panics.
    fn resolve(&self, descriptor: &SimulationDescriptor) -> Arc<PreviewImage> {
        panic::catch_unwind(AssertUnwindSafe(|| self.load(descriptor))).unwrap_or_else(|_| {
            tracing::warn!("preview decode for {} panicked", descriptor.id);
            Arc::new(PreviewImage::builtin_placeholder())
        })
    }
}

fn worker_loop(
    shared: &Shared,
    jobs: &Receiver<Arc<SimulationDescriptor>>,
    events: &Sender<ImageEvent>,
    completion: &Completion,
) {
    while let Ok(descriptor) = jobs.recv() {
        let image = shared.resolve(&descriptor);
        if !descriptor.attach_image(Arc::clone(&image)) {
            tracing::debug!("preview for {} already attached", descriptor.id);
        }
        // Report what the descriptor holds, which an overlapping resolution
        // may have set first.
        let source = descriptor.image().unwrap_or(image).source.clone();

        // Nobody listening is fine; the image is attached either way.
        let _ = events.send(ImageEvent {
            id: descriptor.id.clone(),
            source,
        });
        completion.finish_one();
    }
}

/// Resolves preview images for a catalog.
pub struct ImageResolver {
    shared: Arc<Shared>,
    workers: usize,
}

impl ImageResolver {
    /// Creates a resolver reading from `bundle`.
    ///
    /// `workers` is clamped to at least one.
    pub fn new(bundle: Arc<dyn ResourceBundle>, placeholder_path: impl Into<String>, workers: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                bundle,
                placeholder_path: placeholder_path.into(),
                placeholder: OnceLock::new(),
            }),
            workers: workers.max(1),
        }
    }

    /// Number of worker threads per resolution.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// The placeholder image, decoded on first use.
    #[must_use]
    pub fn placeholder(&self) -> Arc<PreviewImage> {
        self.shared.placeholder()
    }

    /// Resolves and attaches one descriptor's image on the calling thread.
    pub fn resolve_now(&self, descriptor: &SimulationDescriptor) -> Arc<PreviewImage> {
        let image = self.shared.resolve(descriptor);
        descriptor.attach_image(Arc::clone(&image));
        descriptor.image().unwrap_or(image)
    }

    /// Starts resolving every descriptor that has no image yet.
    ///
    /// Returns immediately; the catalog is usable while workers run.
    pub fn resolve(&self, catalog: &Catalog) -> ImageResolution {
        let (job_tx, job_rx) = crossbeam_channel::unbounded();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();

        let queued: Vec<Arc<SimulationDescriptor>> =
            catalog.iter().filter(|d| !d.has_image()).cloned().collect();
        let total = queued.len();
        let completion = Arc::new(Completion::new(total));

        for descriptor in queued {
            // Receiver is alive in this scope.
            let _ = job_tx.send(descriptor);
        }
        drop(job_tx);

        let mut spawned = 0;
        for index in 0..self.workers.min(total) {
            let shared = Arc::clone(&self.shared);
            let jobs = job_rx.clone();
            let events = event_tx.clone();
            let done = Arc::clone(&completion);

            let result = thread::Builder::new()
                .name(format!("atomify-image-{index}"))
                .spawn(move || worker_loop(&shared, &jobs, &events, &done));
            match result {
                Ok(_) => spawned += 1,
                Err(e) => tracing::warn!("failed to spawn image worker {}: {}", index, e),
            }
        }

        if spawned == 0 && total > 0 {
            tracing::warn!("no image workers available, resolving {} previews inline", total);
            worker_loop(&self.shared, &job_rx, &event_tx, &completion);
        }

        tracing::debug!("resolving {} previews on {} workers", total, spawned);

        ImageResolution {
            events: event_rx,
            completion,
            total,
        }
    }
}

impl std::fmt::Debug for ImageResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageResolver")
            .field("placeholder_path", &self.shared.placeholder_path)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

/// Handle to an in-flight resolution.
///
/// Dropping it does not cancel the workers; they finish and exit.
pub struct ImageResolution {
    events: Receiver<ImageEvent>,
    completion: Arc<Completion>,
    total: usize,
}

impl ImageResolution {
    /// Completion notifications, one per queued descriptor, in completion
    /// order.
    #[must_use]
    pub fn events(&self) -> &Receiver<ImageEvent> {
        &self.events
    }

    /// Takes all notifications received so far without blocking.
    #[must_use]
    pub fn drain(&self) -> Vec<ImageEvent> {
        self.events.try_iter().collect()
    }

    /// Descriptors queued by this resolution.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Descriptors still waiting for an image.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.completion.remaining()
    }

    /// Returns true once every queued descriptor has an image.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.pending() == 0
    }

    /// Blocks until every queued descriptor has an image.
    pub fn wait(&self) {
        self.completion.wait();
    }

    /// Blocks up to `timeout`.
    ///
    /// # Returns
    ///
    /// `true` if resolution completed in time.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.completion.wait_timeout(timeout)
    }
}

impl std::fmt::Debug for ImageResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageResolution")
            .field("total", &self.total)
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}
