//! # Atomify Headless
//!
//! Loads the catalog, runs one simulation against the demo backend for a
//! fixed number of ticks, and logs what the renderer would have drawn.
//!
//! ```bash
//! # defaults: ./atomify.toml if present, first catalog entry, 200 ticks
//! RUST_LOG=debug atomify_headless [config.toml] [simulation-id] [ticks]
//! ```

use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use atomify::catalog::{CatalogLoader, SimulationDescriptor};
use atomify::core::{AtomType, EntityRenderer, ParticleStyle, Position};
use atomify::{
    preset_for, DemoBackend, EventReceiver, SessionConfig, SyncEngine, SyncEvent, PRESET_LJ,
};

const DEFAULT_CONFIG: &str = "atomify.toml";
const DEFAULT_TICKS: u64 = 200;

/// Renderer that keeps entity positions in a flat array.
#[derive(Default)]
struct HeadlessRenderer {
    positions: Vec<Position>,
}

impl HeadlessRenderer {
    fn bounds(&self) -> Option<(Position, Position)> {
        let first = *self.positions.first()?;
        Some(self.positions.iter().fold((first, first), |(lo, hi), p| {
            (
                Position::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z)),
                Position::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z)),
            )
        }))
    }
}

impl EntityRenderer for HeadlessRenderer {
    type Handle = usize;

    fn create_entity(&mut self, atom_type: AtomType, style: &ParticleStyle) -> usize {
        tracing::trace!("entity {} for {} (r={})", self.positions.len(), atom_type, style.radius);
        self.positions.push(Position::ZERO);
        self.positions.len() - 1
    }

    fn place(&mut self, handle: &mut usize, position: Position) {
        if let Some(slot) = self.positions.get_mut(*handle) {
            *slot = position;
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}

fn load_config(arg: Option<&str>) -> Result<SessionConfig, atomify::ConfigError> {
    match arg {
        Some(path) => SessionConfig::from_file(path),
        None if Path::new(DEFAULT_CONFIG).exists() => SessionConfig::from_file(DEFAULT_CONFIG),
        None => Ok(SessionConfig::default()),
    }
}

fn pick<'a>(
    catalog: &'a atomify::catalog::Catalog,
    id: Option<&str>,
) -> Option<&'a std::sync::Arc<SimulationDescriptor>> {
    match id {
        Some(id) => catalog.get(id),
        None => catalog.iter().next(),
    }
}

/// Outcome of the ticks counted against the budget.
#[derive(Debug, Default, PartialEq, Eq)]
struct TickTally {
    completed: u64,
    failed: u64,
}

/// Follows engine events until `budget` ticks have finished, successfully
/// or not, or no event arrives for `idle_limit`.
fn count_ticks(events: &EventReceiver, budget: u64, idle_limit: Duration) -> TickTally {
    let mut tally = TickTally::default();
    while tally.completed + tally.failed < budget {
        match events.recv_timeout(idle_limit) {
            Some(SyncEvent::TickCompleted { .. }) => tally.completed += 1,
            Some(SyncEvent::TickFailed { tick, error }) => {
                tally.failed += 1;
                tracing::warn!("tick {} failed: {}", tick, error);
            }
            Some(_) => {}
            None => {
                tracing::warn!(
                    "no tick for {:?}, stopping after {} ticks",
                    idle_limit,
                    tally.completed + tally.failed
                );
                break;
            }
        }
    }
    tally
}

fn main() -> ExitCode {
    init_tracing();
    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = match load_config(args.first().map(String::as_str)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let ticks = match args.get(2).map(|s| s.parse::<u64>()) {
        Some(Ok(n)) => n,
        Some(Err(e)) => {
            tracing::error!("tick count: {}", e);
            return ExitCode::FAILURE;
        }
        None => DEFAULT_TICKS,
    };

    // === CATALOG ===
    let loader = CatalogLoader::from_config(config.catalog.clone());
    let mut preset = PRESET_LJ;
    let images = match loader.load_catalog() {
        Ok((load, images)) => {
            match pick(&load.catalog, args.get(1).map(String::as_str)) {
                Some(sim) => {
                    preset = preset_for(sim);
                    tracing::info!("running {} ({}) with the {} preset", sim.id, sim.title, preset);
                    match loader.read_input_script(sim) {
                        Ok(script) => tracing::debug!("input script: {} lines", script.lines().count()),
                        Err(e) => tracing::warn!("input script unavailable: {}", e),
                    }
                }
                None => tracing::warn!("no matching simulation, using the {} preset", preset),
            }
            Some(images)
        }
        Err(e) => {
            tracing::warn!("catalog unavailable ({}), using the {} preset", e, preset);
            None
        }
    };

    // === ENGINE ===
    let cadence = config.engine.cadence();
    let mut engine = SyncEngine::new(HeadlessRenderer::default(), config.engine);
    let events = engine.subscribe();
    engine.request_reset(preset);
    if let Err(e) = engine.start(DemoBackend::new(), cadence) {
        tracing::error!("{}", e);
        return ExitCode::FAILURE;
    }

    let idle_limit = cadence.saturating_mul(4).saturating_add(Duration::from_secs(1));
    let tally = count_ticks(&events, ticks, idle_limit);
    engine.stop();

    // === REPORT ===
    let stats = engine.stats();
    let snapshot = engine.snapshot();
    tracing::info!(
        "{} ticks ({} failed, {} deferred), avg {}us, max {}us",
        stats.total_ticks(),
        tally.failed,
        stats.deferred_ticks,
        stats.avg_tick_us,
        stats.max_tick_us
    );
    for (atom_type, count) in snapshot.handle_counts() {
        tracing::info!("{}: {} entities", atom_type, count);
    }
    engine.with_pool(|pool| {
        if let Some((lo, hi)) = pool.renderer().bounds() {
            tracing::info!("scene bounds {:?} .. {:?}", lo.to_array(), hi.to_array());
        }
    });

    if let Some(images) = images {
        if images.wait_timeout(Duration::from_secs(2)) {
            tracing::info!("{} previews resolved", images.total());
        } else {
            tracing::warn!("{} previews still pending", images.pending());
        }
    }

    ExitCode::SUCCESS
}
