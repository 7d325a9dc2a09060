//! # Atomify Core
//!
//! Mirrors a stepping particle simulation onto renderable entities.
//!
//! ## Pieces
//!
//! - [`ParticleState`]: what a backend reports after a step
//! - [`EntityPool`]: render handles per [`AtomType`], grown lazily
//! - [`reconcile`]: partition, grow and place, as separate phases
//! - [`SharedPlacements`]: the published result of the last tick
//!
//! ## Example
//!
//! ```rust,ignore
//! use atomify_core::{reconcile, EntityPool, ParticleState};
//!
//! let mut pool = EntityPool::new(my_renderer);
//! let state = ParticleState::from_flat(&xyz, &types)?;
//! let snapshot = reconcile::reconcile(&mut pool, &state)?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod particle;
pub mod pool;
pub mod reconcile;
pub mod snapshot;

pub use error::{PoolError, PoolResult, StateError, StateResult};
pub use particle::{AtomType, ParticleState, ParticleStyle, Position};
pub use pool::{EntityPool, EntityRenderer};
pub use reconcile::Partition;
pub use snapshot::{Placement, PlacementSnapshot, PlacementsHandle, SharedPlacements};
