//! # Core Configuration
//!
//! Capacity and frame pacing, loaded once at startup from TOML.
//!
//! ```toml
//! max_entities = 131072
//! frames_in_flight = 3
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, EcsResult};

/// Default entity capacity.
pub const DEFAULT_MAX_ENTITIES: usize = 64 * 1024;

/// Default number of frames that may be in flight at once.
pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 2;

/// Startup configuration for a [`Coordinator`](crate::Coordinator) and its
/// buffered systems.
///
/// Keys missing from the TOML source fall back to their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcsConfig {
    /// Fixed entity capacity. Not growable after initialization.
    pub max_entities: usize,
    /// Number of mirror slots (`K`), one per frame that may still be in flight.
    pub frames_in_flight: usize,
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            max_entities: DEFAULT_MAX_ENTITIES,
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
        }
    }
}

impl EcsConfig {
    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] on malformed TOML or invalid values.
    pub fn from_toml_str(source: &str) -> EcsResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| EcsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the file cannot be read, parsed
    /// or validated.
    pub fn load(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| EcsError::InvalidConfig(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(
            path = %path.display(),
            max_entities = config.max_entities,
            frames_in_flight = config.frames_in_flight,
            "loaded configuration"
        );
        Ok(config)
    }

    /// Checks the values for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the capacity is zero or does not
    /// fit an entity id, or if no frames are in flight.
    pub fn validate(&self) -> EcsResult<()> {
        if self.max_entities == 0 {
            return Err(EcsError::InvalidConfig(
                "max_entities must be greater than zero".into(),
            ));
        }
        // u32::MAX is reserved for Entity::INVALID.
        if self.max_entities >= u32::MAX as usize {
            return Err(EcsError::InvalidConfig(format!(
                "max_entities must be below {}",
                u32::MAX
            )));
        }
        if self.frames_in_flight == 0 {
            return Err(EcsError::InvalidConfig(
                "frames_in_flight must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
