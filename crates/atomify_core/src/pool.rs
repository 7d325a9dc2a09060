//! # Entity Pool
//!
//! Type-keyed render handles, reused across ticks.
//!
//! The pool only ever grows. Handles are requested from the renderer the
//! first time a type needs more slots than it has, and are never freed for
//! the lifetime of the pool. Stale handles (from a tick that had more
//! particles of a type than the current one) keep their last placement.
//!
//! # Thread Safety
//!
//! The pool is NOT thread-safe. The sync engine owns it and touches it only
//! from its tick context.

use std::collections::BTreeMap;

use crate::error::{PoolError, PoolResult};
use crate::particle::{AtomType, ParticleStyle, Position};

/// The render collaborator: creates entities and moves them.
///
/// Implementations wrap whatever scene graph the host application uses.
/// `Send` because the engine moves the pool onto its tick thread.
pub trait EntityRenderer: Send {
    /// Opaque handle to one renderable entity.
    type Handle: Send;

    /// Creates a new entity for a particle of `atom_type`.
    ///
    /// `style` is the default look for that type; renderers are free to
    /// ignore it and pick their own geometry.
    fn create_entity(&mut self, atom_type: AtomType, style: &ParticleStyle) -> Self::Handle;

    /// Moves an entity to `position`.
    fn place(&mut self, handle: &mut Self::Handle, position: Position);
}

/// One pooled entity and the position it was last given.
struct Slot<H> {
    handle: H,
    last_position: Position,
}

/// Type-keyed collection of render handles.
pub struct EntityPool<R: EntityRenderer> {
    /// The render collaborator.
    renderer: R,
    /// Handles per type, in slot order.
    slots: BTreeMap<AtomType, Vec<Slot<R::Handle>>>,
}

impl<R: EntityRenderer> EntityPool<R> {
    /// Creates an empty pool around a renderer.
    #[must_use]
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            slots: BTreeMap::new(),
        }
    }

    /// Grows the handle list for `atom_type` to at least `count`.
    ///
    /// New entities are created at the origin. Never removes handles.
    ///
    /// # Returns
    ///
    /// The number of handles created by this call.
    pub fn ensure_capacity(&mut self, atom_type: AtomType, count: usize) -> usize {
        let slots = self.slots.entry(atom_type).or_default();
        let have = slots.len();
        if have >= count {
            return 0;
        }

        let style = ParticleStyle::for_type(atom_type);
        slots.reserve(count - have);
        for _ in have..count {
            let mut handle = self.renderer.create_entity(atom_type, &style);
            self.renderer.place(&mut handle, Position::ZERO);
            slots.push(Slot {
                handle,
                last_position: Position::ZERO,
            });
        }

        tracing::debug!("pool grew {} from {} to {} handles", atom_type, have, count);
        count - have
    }

    /// Moves the `index`-th handle of `atom_type` to `position`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::IndexOutOfRange`] if `index` is not below the
    /// current handle count for that type.
    pub fn place(&mut self, atom_type: AtomType, index: usize, position: Position) -> PoolResult<()> {
        let slots = self.slots.get_mut(&atom_type);
        let len = slots.as_ref().map_or(0, |s| s.len());
        let slot = slots
            .and_then(|s| s.get_mut(index))
            .ok_or(PoolError::IndexOutOfRange {
                atom_type,
                index,
                len,
            })?;

        self.renderer.place(&mut slot.handle, position);
        slot.last_position = position;
        Ok(())
    }

    /// Number of handles held for `atom_type`.
    #[inline]
    #[must_use]
    pub fn handle_count(&self, atom_type: AtomType) -> usize {
        self.slots.get(&atom_type).map_or(0, Vec::len)
    }

    /// Number of handles across all types.
    #[must_use]
    pub fn total_handles(&self) -> usize {
        self.slots.values().map(Vec::len).sum()
    }

    /// Types the pool has handles for, ascending.
    pub fn types(&self) -> impl Iterator<Item = AtomType> + '_ {
        self.slots.keys().copied()
    }

    /// Handles for `atom_type`, in slot order.
    pub fn handles(&self, atom_type: AtomType) -> impl Iterator<Item = &R::Handle> + '_ {
        self.slots
            .get(&atom_type)
            .into_iter()
            .flat_map(|s| s.iter().map(|slot| &slot.handle))
    }

    /// Position most recently given to a handle.
    #[must_use]
    pub fn last_position(&self, atom_type: AtomType, index: usize) -> Option<Position> {
        self.slots
            .get(&atom_type)?
            .get(index)
            .map(|slot| slot.last_position)
    }

    /// Per-type handle counts, ascending by type.
    #[must_use]
    pub fn handle_counts(&self) -> Vec<(AtomType, usize)> {
        self.slots.iter().map(|(t, s)| (*t, s.len())).collect()
    }

    /// Returns the renderer.
    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Returns the renderer mutably.
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }
}

impl<R: EntityRenderer> std::fmt::Debug for EntityPool<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityPool")
            .field("handle_counts", &self.handle_counts())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording renderer shared by the crate's unit tests.

    use super::*;

    /// Handle that remembers where it was put.
    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedEntity {
        pub id: usize,
        pub atom_type: AtomType,
        pub radius: f32,
        pub position: Position,
        pub moves: usize,
    }

    /// Renderer that hands out sequential ids.
    #[derive(Debug, Default)]
    pub struct RecordingRenderer {
        pub created: usize,
    }

    impl EntityRenderer for RecordingRenderer {
        type Handle = RecordedEntity;

        fn create_entity(&mut self, atom_type: AtomType, style: &ParticleStyle) -> RecordedEntity {
            self.created += 1;
            RecordedEntity {
                id: self.created,
                atom_type,
                radius: style.radius,
                position: Position::new(f32::NAN, f32::NAN, f32::NAN),
                moves: 0,
            }
        }

        fn place(&mut self, handle: &mut RecordedEntity, position: Position) {
            handle.position = position;
            handle.moves += 1;
        }
    }
}
