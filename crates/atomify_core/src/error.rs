//! # Core Error Types
//!
//! Errors raised while building particle state or driving the entity pool.

use thiserror::Error;

use crate::particle::AtomType;

/// Errors raised by [`crate::EntityPool`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// A placement targeted a slot the pool never grew to.
    ///
    /// This is a caller bug: `ensure_capacity` must run before `place`.
    #[error("slot {index} out of range for {atom_type} ({len} handles)")]
    IndexOutOfRange {
        /// Type whose handle list was indexed.
        atom_type: AtomType,
        /// Requested slot.
        index: usize,
        /// Handles available for that type.
        len: usize,
    },
}

/// Errors raised while building a [`crate::ParticleState`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Position and type arrays disagree on the particle count.
    #[error("particle arrays disagree: {positions} positions, {types} types")]
    LengthMismatch {
        /// Number of positions supplied.
        positions: usize,
        /// Number of types supplied.
        types: usize,
    },

    /// A flat coordinate array was not a multiple of three.
    #[error("flat coordinate array has {len} values, not a multiple of 3")]
    RaggedCoordinates {
        /// Length of the flat array.
        len: usize,
    },

    /// A backend reported a type number below 1.
    #[error("particle {index} has invalid type {raw}")]
    InvalidType {
        /// Particle index.
        index: usize,
        /// Raw type value.
        raw: i32,
    },
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Result type for state construction.
pub type StateResult<T> = Result<T, StateError>;
