//! # Engine Error Types
//!
//! ```text
//! BackendError ──┐
//! PoolError ─────┼──> TickError ──> SyncEvent::TickFailed (tick thread)
//! panic payload ─┘        └───────> EngineError::Tick   (tick_now)
//! ```

use std::path::PathBuf;
use std::time::Duration;

use atomify_core::{PoolError, StateError};
use thiserror::Error;

/// Failures reported by a simulation backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Advancing the simulation failed.
    #[error("step failed: {0}")]
    Step(String),

    /// Reading particle state back failed.
    #[error("synchronize failed: {0}")]
    Synchronize(String),

    /// Reinitializing to a preset failed.
    #[error("reset to `{preset}` failed: {reason}")]
    Reset {
        /// Requested preset.
        preset: String,
        /// Backend's explanation.
        reason: String,
    },

    /// The backend produced inconsistent particle arrays.
    #[error("invalid particle state: {0}")]
    State(#[from] StateError),
}

/// Result type for backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// Why a single tick did not publish a snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TickError {
    /// The backend returned an error.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Reconcile violated the pool contract.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The session lost its backend between ticks.
    #[error("no simulation backend attached")]
    NoBackend,

    /// A backend or renderer call panicked.
    #[error("{operation} panicked: {message}")]
    Panicked {
        /// Call that panicked (`step`, `synchronize`, `reset`, `reconcile`).
        operation: &'static str,
        /// Panic payload, if it was a string.
        message: String,
    },
}

/// Errors from engine lifecycle calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// `start` while the tick thread is running.
    #[error("engine is already running")]
    AlreadyRunning,

    /// An idle-only operation was called while running.
    #[error("operation requires an idle engine")]
    Running,

    /// No backend has been attached.
    #[error("no simulation backend attached")]
    NoBackend,

    /// The cadence is longer than [`crate::tick::MAX_CADENCE`].
    #[error("cadence {0:?} exceeds the {max:?} limit", max = crate::tick::MAX_CADENCE)]
    InvalidCadence(Duration),

    /// The OS refused to create the tick thread.
    #[error("failed to spawn tick thread: {0}")]
    Spawn(String),

    /// A synchronous tick failed.
    #[error("tick failed: {0}")]
    Tick(#[from] TickError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors loading a [`crate::SessionConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The text is not valid TOML for the config schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be rendered back to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
