//! Engine Configuration
//!
//! Runtime knobs for the driver and the built-in states. Every field has a
//! default, so a config file only needs the keys it changes.

use std::fs;
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::game::context::IntegrityPolicy;
use crate::DEFAULT_TICK_RATE;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that failed
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Configuration for the state machine driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed tick rate (Hz) used by the frame clock
    pub tick_rate: u32,
    /// Longest delta a single tick may simulate (seconds)
    pub max_delta_seconds: f64,
    /// Reference handling when loading project data
    pub integrity: IntegrityPolicy,
    /// Seconds of simulated time per turn in `TurnState`
    pub turn_duration_seconds: f64,
    /// Turns `TurnState` plays before handing back to the main menu
    pub max_turns: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            max_delta_seconds: 0.25,
            integrity: IntegrityPolicy::Advisory,
            turn_duration_seconds: 1.0,
            max_turns: None,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "tick_rate",
                reason: "must be at least 1".into(),
            });
        }
        if !(self.max_delta_seconds.is_finite() && self.max_delta_seconds > 0.0) {
            return Err(ConfigError::Invalid {
                field: "max_delta_seconds",
                reason: format!("must be positive, got {}", self.max_delta_seconds),
            });
        }
        validate_turn_settings(self.turn_duration_seconds, self.max_turns)
    }
}

/// Check the turn loop settings shared by `EngineConfig` and `TurnState`.
pub fn validate_turn_settings(turn_duration: f64, max_turns: Option<u32>) -> Result<(), ConfigError> {
    if !(turn_duration.is_finite() && turn_duration > 0.0) {
        return Err(ConfigError::Invalid {
            field: "turn_duration_seconds",
            reason: format!("must be positive, got {}", turn_duration),
        });
    }
    if max_turns == Some(0) {
        return Err(ConfigError::Invalid {
            field: "max_turns",
            reason: "must be at least 1 when set".into(),
        });
    }
    Ok(())
}
