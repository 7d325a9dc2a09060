//! # Particle State
//!
//! The per-tick snapshot a simulation backend hands to the engine.
//!
//! Positions and types are parallel arrays, indexed `0..count`. The
//! constructor is the only way in, so the lengths always agree.

use bytemuck::{Pod, Zeroable};

use crate::error::{StateError, StateResult};

/// Visual class of a particle, as reported by the backend.
///
/// Backends number their atom types from 1. The value is opaque to the
/// engine: it only partitions particles and keys the entity pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AtomType(pub u32);

impl AtomType {
    /// Returns the raw type number.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for AtomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "type {}", self.0)
    }
}

/// A point in simulation space.
///
/// `#[repr(C)]` and `Pod` so a renderer can `bytemuck::cast_slice` a run of
/// positions straight into an upload buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Position {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
    /// Z coordinate.
    pub z: f32,
}

impl Position {
    /// The origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Creates a new position.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Returns the position as an array.
    #[inline]
    #[must_use]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f32; 3]> for Position {
    #[inline]
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

/// Snapshot of every particle after one backend step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticleState {
    positions: Vec<Position>,
    types: Vec<AtomType>,
}

impl ParticleState {
    /// Creates a state from parallel position and type arrays.
    ///
    /// # Errors
    ///
    /// - [`StateError::LengthMismatch`] if the arrays differ in length
    /// - [`StateError::InvalidType`] if a type is zero
    pub fn new(positions: Vec<Position>, types: Vec<AtomType>) -> StateResult<Self> {
        if positions.len() != types.len() {
            return Err(StateError::LengthMismatch {
                positions: positions.len(),
                types: types.len(),
            });
        }
        if let Some(index) = types.iter().position(|t| t.0 == 0) {
            return Err(StateError::InvalidType { index, raw: 0 });
        }
        Ok(Self { positions, types })
    }

    /// Creates an empty state (`count == 0`).
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            positions: Vec::new(),
            types: Vec::new(),
        }
    }

    /// Builds a state from the flat layout LAMMPS-style wrappers expose:
    /// `xyz` packed as `[x0, y0, z0, x1, ...]` in double precision and one
    /// integer type per atom.
    ///
    /// # Errors
    ///
    /// - [`StateError::RaggedCoordinates`] if `xyz.len()` is not a multiple of 3
    /// - [`StateError::LengthMismatch`] if the atom counts disagree
    /// - [`StateError::InvalidType`] if a type is zero or negative
    pub fn from_flat(xyz: &[f64], types: &[i32]) -> StateResult<Self> {
        if xyz.len() % 3 != 0 {
            return Err(StateError::RaggedCoordinates { len: xyz.len() });
        }

        // Narrowing to f32 is what the renderer consumes anyway.
        #[allow(clippy::cast_possible_truncation)]
        let positions: Vec<Position> = xyz
            .chunks_exact(3)
            .map(|c| Position::new(c[0] as f32, c[1] as f32, c[2] as f32))
            .collect();

        let types = types
            .iter()
            .enumerate()
            .map(|(index, &raw)| match u32::try_from(raw) {
                Ok(t) if t > 0 => Ok(AtomType(t)),
                _ => Err(StateError::InvalidType { index, raw }),
            })
            .collect::<StateResult<Vec<_>>>()?;

        Self::new(positions, types)
    }

    /// Number of particles.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if the backend reported no particles.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Positions in backend order.
    #[inline]
    #[must_use]
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Types in backend order.
    #[inline]
    #[must_use]
    pub fn types(&self) -> &[AtomType] {
        &self.types
    }

    /// Iterates `(type, position)` pairs in backend order.
    pub fn iter(&self) -> impl Iterator<Item = (AtomType, Position)> + '_ {
        self.types.iter().copied().zip(self.positions.iter().copied())
    }
}

/// Default look for a particle class, handed to the renderer when it
/// creates an entity.
///
/// Type 1 is drawn as a large red sphere and everything else as a smaller
/// white one (oxygen and hydrogen in the bundled water systems).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleStyle {
    /// Sphere radius in simulation units.
    pub radius: f32,
    /// Linear RGBA colour.
    pub color: [f32; 4],
}

impl ParticleStyle {
    /// Style used for type 1.
    pub const PRIMARY: Self = Self {
        radius: 0.5,
        color: [1.0, 0.0, 0.0, 1.0],
    };

    /// Style used for every other type.
    pub const SECONDARY: Self = Self {
        radius: 0.4,
        color: [1.0, 1.0, 1.0, 1.0],
    };

    /// Returns the default style for a type.
    #[must_use]
    pub const fn for_type(atom_type: AtomType) -> Self {
        if atom_type.0 == 1 {
            Self::PRIMARY
        } else {
            Self::SECONDARY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_mismatched_lengths() {
        let err = ParticleState::new(vec![Position::ZERO; 2], vec![AtomType(1)]).unwrap_err();
        assert_eq!(
            err,
            StateError::LengthMismatch {
                positions: 2,
                types: 1
            }
        );
    }

    #[test]
    fn test_new_rejects_type_zero() {
        let err = ParticleState::new(vec![Position::ZERO; 2], vec![AtomType(1), AtomType(0)]).unwrap_err();
        assert_eq!(err, StateError::InvalidType { index: 1, raw: 0 });
    }

    #[test]
    fn test_from_flat() {
        let state = ParticleState::from_flat(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0], &[1, 2]).unwrap();
        assert_eq!(state.count(), 2);
        assert_eq!(state.positions()[1], Position::new(3.0, 4.0, 5.0));
        assert_eq!(state.types(), &[AtomType(1), AtomType(2)]);
    }

    #[test]
    fn test_from_flat_rejects_ragged_xyz() {
        let err = ParticleState::from_flat(&[0.0, 1.0], &[]).unwrap_err();
        assert_eq!(err, StateError::RaggedCoordinates { len: 2 });
    }

    #[test]
    fn test_from_flat_rejects_non_positive_type() {
        let err = ParticleState::from_flat(&[0.0; 6], &[1, 0]).unwrap_err();
        assert_eq!(err, StateError::InvalidType { index: 1, raw: 0 });
    }

    #[test]
    fn test_empty_state() {
        let state = ParticleState::empty();
        assert!(state.is_empty());
        assert_eq!(state.iter().count(), 0);
    }

    #[test]
    fn test_style_split() {
        assert_eq!(ParticleStyle::for_type(AtomType(1)), ParticleStyle::PRIMARY);
        assert_eq!(ParticleStyle::for_type(AtomType(2)), ParticleStyle::SECONDARY);
        assert_eq!(ParticleStyle::for_type(AtomType(7)), ParticleStyle::SECONDARY);
    }

    #[test]
    fn test_position_is_pod() {
        let positions = [Position::new(1.0, 2.0, 3.0), Position::new(4.0, 5.0, 6.0)];
        let floats: &[f32] = bytemuck::cast_slice(&positions);
        assert_eq!(floats, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }
}
