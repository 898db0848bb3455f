//! # Engine Configuration
//!
//! Tunables for heartbeat slicing and edit sessions. The defaults match what a
//! host ticking at 20Hz can afford: a 30ms slice per tick, one heartbeat per
//! tick, and parking the heartbeat after roughly five idle seconds.
//!
//! Configuration can be read from JSON; missing fields fall back to defaults.
//!
//! ```
//! use voxel_operations::core::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "heartbeat_slice_ms": 10 }"#).unwrap();
//! assert_eq!(config.heartbeat_slice_ms, 10);
//! assert_eq!(config.idle_heartbeats_before_park, 100);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use web_time::Duration;

/// Errors raised while loading an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration was not valid JSON for [`EngineConfig`].
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field had a value the engine cannot run with.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Engine-wide tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Wall-clock budget of one heartbeat, in milliseconds.
    pub heartbeat_slice_ms: u64,
    /// Host ticks between two heartbeats.
    pub heartbeat_period_ticks: u64,
    /// Consecutive heartbeats with an empty queue before the heartbeat is
    /// unscheduled. It is scheduled again on the next submission.
    pub idle_heartbeats_before_park: u32,
    /// Upper bound on the cells a region visitor touches in a single resume.
    pub cells_per_resume: usize,
    /// Maximum number of changes an edit session accepts, if any.
    pub max_changes: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            heartbeat_slice_ms: 30,
            heartbeat_period_ticks: 1,
            idle_heartbeats_before_park: 100,
            cells_per_resume: 4096,
            max_changes: None,
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&contents)?;
        log::info!("Loaded engine configuration from {:?}", path.as_ref());
        Ok(config)
    }

    /// The heartbeat slice as a duration.
    pub fn heartbeat_slice(&self) -> Duration {
        Duration::from_millis(self.heartbeat_slice_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_period_ticks == 0 {
            return Err(ConfigError::Invalid(
                "heartbeat_period_ticks must be at least 1".to_string(),
            ));
        }
        if self.cells_per_resume == 0 {
            return Err(ConfigError::Invalid(
                "cells_per_resume must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.heartbeat_slice(), Duration::from_millis(30));
    }

    #[test]
    fn change_limit_round_trips_through_json() {
        let config = EngineConfig::from_json_str(r#"{ "max_changes": 64 }"#).unwrap();
        assert_eq!(config.max_changes, Some(64));
    }

    #[test]
    fn zero_cell_cap_is_rejected() {
        let err = EngineConfig::from_json_str(r#"{ "cells_per_resume": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = EngineConfig::from_json_str("{ heartbeat").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
