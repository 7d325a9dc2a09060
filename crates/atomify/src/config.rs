//! # Session Configuration
//!
//! One TOML file configures both halves of a session:
//!
//! ```toml
//! [engine]
//! cadence_ms = 1
//! event_capacity = 1024
//! initial_preset = "water"
//!
//! [catalog]
//! resource_root = "resources"
//! image_workers = 2
//! ```
//!
//! Every key is optional.

use std::fs;
use std::path::Path;
use std::time::Duration;

use atomify_catalog::CatalogConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::tick::MAX_CADENCE;

/// Tick engine settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Milliseconds between tick starts.
    pub cadence_ms: u64,
    /// Per-subscriber event buffer.
    pub event_capacity: usize,
    /// Preset applied to the backend when the engine starts.
    pub initial_preset: Option<String>,
}

impl EngineConfig {
    /// Default tick cadence.
    pub const DEFAULT_CADENCE_MS: u64 = 1;
    /// Default per-subscriber event buffer.
    pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

    /// Cadence as a `Duration`.
    #[must_use]
    pub fn cadence(&self) -> Duration {
        Duration::from_millis(self.cadence_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cadence_ms: Self::DEFAULT_CADENCE_MS,
            event_capacity: Self::DEFAULT_EVENT_CAPACITY,
            initial_preset: None,
        }
    }
}

/// Full session configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Tick engine.
    pub engine: EngineConfig,
    /// Catalog loading.
    pub catalog: CatalogConfig,
}

impl SessionConfig {
    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for bad TOML, [`ConfigError::Invalid`] for
    /// out-of-range values.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`SessionConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Serialize`] if a value has no TOML form.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first bad key.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.engine.cadence_ms == 0 {
            return Err(ConfigError::Invalid("engine.cadence_ms must be at least 1".to_string()));
        }
        if self.engine.cadence() > MAX_CADENCE {
            return Err(ConfigError::Invalid(format!(
                "engine.cadence_ms must be at most {}",
                MAX_CADENCE.as_millis()
            )));
        }
        if self.engine.event_capacity == 0 {
            return Err(ConfigError::Invalid(
                "engine.event_capacity must be at least 1".to_string(),
            ));
        }
        if self.catalog.image_workers == 0 {
            return Err(ConfigError::Invalid(
                "catalog.image_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
