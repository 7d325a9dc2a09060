//! # Atomify
//!
//! Live particle synchronization: a backend steps, the engine mirrors the
//! result onto renderable entities, and the catalog says what can be run.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                           ATOMIFY                              │
//! ├────────────────────────────────────────────────────────────────┤
//! │                                                                │
//! │  ┌──────────────────┐   preset   ┌──────────────────────────┐  │
//! │  │ atomify_catalog  │──────────> │ SyncEngine (tick thread) │  │
//! │  │  • manifest      │            │  • SimulationBackend     │  │
//! │  │  • previews      │            │  • EntityPool (core)     │  │
//! │  └──────────────────┘            │  • SyncEvent bus         │  │
//! │                                  └────────────┬─────────────┘  │
//! │                                               │ snapshot       │
//! │                                               v                │
//! │                                  ┌──────────────────────────┐  │
//! │                                  │  PlacementsHandle (UI)   │  │
//! │                                  └──────────────────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `backend`: simulation seam and the analytic demo backend
//! - `engine`: tick thread, lifecycle, failure containment
//! - `events`: engine notifications
//! - `tick`: cadence scheduling and timing stats
//! - `config`: TOML session configuration

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod tick;

// Re-export the building blocks
pub use atomify_catalog as catalog;
pub use atomify_core as core;

pub use backend::{DemoBackend, SimulationBackend, PRESET_LJ, PRESET_WATER};
pub use config::{EngineConfig, SessionConfig};
pub use engine::{EngineState, SyncEngine};
pub use error::{
    BackendError, BackendResult, ConfigError, ConfigResult, EngineError, EngineResult, TickError,
};
pub use events::{EventHub, EventReceiver, SyncEvent};
pub use tick::{NextTick, TickClock, TickStats, MAX_CADENCE};

/// Picks the demo preset that best matches a catalog entry.
///
/// Entries tagged `water` map to [`PRESET_WATER`]; everything else runs
/// the Lennard-Jones lattice.
#[must_use]
pub fn preset_for(descriptor: &catalog::SimulationDescriptor) -> &'static str {
    if descriptor.has_keyword(PRESET_WATER) || descriptor.id.contains(PRESET_WATER) {
        PRESET_WATER
    } else {
        PRESET_LJ
    }
}
