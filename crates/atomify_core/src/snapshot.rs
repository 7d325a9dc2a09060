//! # Published Placements
//!
//! The reconciled state of the last tick, shared with whoever renders it.
//!
//! The tick thread publishes a fresh [`PlacementSnapshot`] after every
//! successful reconcile. Readers take an `Arc` to the latest one and never
//! block the writer for longer than a pointer swap.
//!
//! ```text
//! Tick thread → publish(snapshot) → [RwLock<Arc<Snapshot>>] → latest() ← Render/UI
//!                                    generation += 1
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::particle::{AtomType, Position};

/// Where one particle ended up this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Particle type.
    pub atom_type: AtomType,
    /// Type-relative pool slot.
    pub slot: usize,
    /// Position the slot was moved to.
    pub position: Position,
}

/// Reconciled state of one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlacementSnapshot {
    tick: u64,
    placements: Vec<Placement>,
    handle_counts: Vec<(AtomType, usize)>,
}

impl PlacementSnapshot {
    /// Creates a snapshot.
    ///
    /// `placements` are in backend order; `handle_counts` are the pool's
    /// per-type sizes after the tick.
    #[must_use]
    pub fn new(tick: u64, placements: Vec<Placement>, handle_counts: Vec<(AtomType, usize)>) -> Self {
        Self {
            tick,
            placements,
            handle_counts,
        }
    }

    /// Returns the snapshot stamped with `tick`.
    #[must_use]
    pub fn with_tick(mut self, tick: u64) -> Self {
        self.tick = tick;
        self
    }

    /// Tick that produced this snapshot (0 before the first tick).
    #[inline]
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Particles placed this tick.
    #[inline]
    #[must_use]
    pub fn particle_count(&self) -> usize {
        self.placements.len()
    }

    /// Placements in backend order.
    #[inline]
    #[must_use]
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Pool size for `atom_type` after the tick.
    #[must_use]
    pub fn handle_count(&self, atom_type: AtomType) -> usize {
        self.handle_counts
            .iter()
            .find(|(t, _)| *t == atom_type)
            .map_or(0, |(_, n)| *n)
    }

    /// Per-type pool sizes after the tick.
    #[must_use]
    pub fn handle_counts(&self) -> &[(AtomType, usize)] {
        &self.handle_counts
    }

    /// Positions placed for `atom_type`, in slot order.
    ///
    /// Contiguous `Position`s, ready for `bytemuck::cast_slice`.
    #[must_use]
    pub fn positions_for(&self, atom_type: AtomType) -> Vec<Position> {
        let mut of_type: Vec<&Placement> = self
            .placements
            .iter()
            .filter(|p| p.atom_type == atom_type)
            .collect();
        of_type.sort_by_key(|p| p.slot);
        of_type.into_iter().map(|p| p.position).collect()
    }
}

/// Single-writer, many-reader cell holding the latest snapshot.
pub struct SharedPlacements {
    /// Latest published snapshot.
    current: RwLock<Arc<PlacementSnapshot>>,
    /// Incremented on each publish.
    generation: AtomicU64,
}

impl SharedPlacements {
    /// Creates a cell holding an empty snapshot at generation 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(PlacementSnapshot::default())),
            generation: AtomicU64::new(0),
        }
    }

    /// Publishes a snapshot, replacing the previous one.
    pub fn publish(&self, snapshot: PlacementSnapshot) {
        let snapshot = Arc::new(snapshot);
        *self.current.write() = snapshot;
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Returns the latest snapshot.
    ///
    /// Never blocks for longer than the writer's pointer swap.
    #[must_use]
    pub fn latest(&self) -> Arc<PlacementSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Number of snapshots published so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl Default for SharedPlacements {
    fn default() -> Self {
        Self::new()
    }
}

/// Cheap clonable handle for passing [`SharedPlacements`] between threads.
#[derive(Clone, Default)]
pub struct PlacementsHandle {
    inner: Arc<SharedPlacements>,
}

impl PlacementsHandle {
    /// Creates a handle around a fresh cell.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared cell.
    #[must_use]
    pub fn cell(&self) -> &SharedPlacements {
        &self.inner
    }

    /// Shorthand for `cell().latest()`.
    #[must_use]
    pub fn latest(&self) -> Arc<PlacementSnapshot> {
        self.inner.latest()
    }

    /// Shorthand for `cell().generation()`.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.generation()
    }
}
