//! # Reconcile
//!
//! Mirrors one [`ParticleState`] onto an [`EntityPool`] in three phases:
//!
//! ```text
//! ParticleState ──> partition ──> grow ──> place_all ──> PlacementSnapshot
//!                   (slots)      (pool)    (pool)
//! ```
//!
//! 1. `partition`: count particles per type and give each particle its
//!    type-relative slot (the n-th particle of that type, in encounter order).
//! 2. `grow`: `ensure_capacity` once per distinct type.
//! 3. `place_all`: move every particle's slot to its position.
//!
//! Each phase is a plain function so it can be driven without a timer.
//! An empty state grows nothing and places nothing; handles left over from
//! earlier ticks keep their last position.

use std::collections::BTreeMap;

use crate::error::PoolResult;
use crate::particle::{AtomType, ParticleState};
use crate::pool::{EntityPool, EntityRenderer};
use crate::snapshot::{Placement, PlacementSnapshot};

/// Result of the partition phase.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    /// Particles per type observed in the state.
    counts: BTreeMap<AtomType, usize>,
    /// Type-relative slot of each particle, in backend order.
    slots: Vec<usize>,
}

impl Partition {
    /// Particles of `atom_type` in the partitioned state.
    #[must_use]
    pub fn count(&self, atom_type: AtomType) -> usize {
        self.counts.get(&atom_type).copied().unwrap_or(0)
    }

    /// `(type, count)` pairs, ascending by type.
    pub fn counts(&self) -> impl Iterator<Item = (AtomType, usize)> + '_ {
        self.counts.iter().map(|(t, c)| (*t, *c))
    }

    /// Slot assigned to particle `index`.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<usize> {
        self.slots.get(index).copied()
    }

    /// Slots for every particle, in backend order.
    #[must_use]
    pub fn slots(&self) -> &[usize] {
        &self.slots
    }

    /// Number of distinct types seen.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.counts.len()
    }
}

/// Phase 1: assigns each particle its type-relative slot.
#[must_use]
pub fn partition(state: &ParticleState) -> Partition {
    let mut counts: BTreeMap<AtomType, usize> = BTreeMap::new();
    let mut slots = Vec::with_capacity(state.count());

    for &atom_type in state.types() {
        let next = counts.entry(atom_type).or_insert(0);
        slots.push(*next);
        *next += 1;
    }

    Partition { counts, slots }
}

/// Phase 2: grows the pool so every type has a handle per particle.
///
/// # Returns
///
/// The number of handles created.
pub fn grow<R: EntityRenderer>(pool: &mut EntityPool<R>, partition: &Partition) -> usize {
    partition
        .counts()
        .map(|(atom_type, count)| pool.ensure_capacity(atom_type, count))
        .sum()
}

/// Phase 3: places every particle's handle at its reported position.
///
/// Does not publish anything; the returned snapshot carries tick 0 and the
/// caller stamps it.
///
/// # Errors
///
/// Returns [`crate::PoolError::IndexOutOfRange`] if `grow` was skipped for
/// this partition.
pub fn place_all<R: EntityRenderer>(
    pool: &mut EntityPool<R>,
    state: &ParticleState,
    partition: &Partition,
) -> PoolResult<PlacementSnapshot> {
    let mut placements = Vec::with_capacity(state.count());

    for ((atom_type, position), &slot) in state.iter().zip(partition.slots()) {
        pool.place(atom_type, slot, position)?;
        placements.push(Placement {
            atom_type,
            slot,
            position,
        });
    }

    Ok(PlacementSnapshot::new(0, placements, pool.handle_counts()))
}

/// Runs all three phases.
///
/// # Errors
///
/// Propagates pool errors from [`place_all`]; with `grow` in front of it
/// there are none in practice.
pub fn reconcile<R: EntityRenderer>(
    pool: &mut EntityPool<R>,
    state: &ParticleState,
) -> PoolResult<PlacementSnapshot> {
    let partition = partition(state);
    if partition.type_count() > 0 {
        grow(pool, &partition);
    }
    place_all(pool, state, &partition)
}
