//! # Simulation Configuration
//!
//! Configuration structures for the engine and for each collider group.
//! All of them are serde types, so a whole simulation can be described in a
//! single TOML or RON file through the [`Config`] trait.
//!
//! ## Configuration Categories
//!
//! - **Engine Config**: logging and debug features
//! - **Collider Group Config**: bucket table sizing, time dilation and the
//!   speed-to-evaluation-interval calibration points

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};
use crate::physics::{CastingMode, PhysicsError};

/// # Engine Configuration
///
/// Behavior that applies to the whole process rather than to one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default log filter, e.g. `"info"` or `"collider_engine=trace"`
    pub log_level: String,
    /// Whether to run the consistency checks after every frame
    pub debug_mode: bool,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            debug_mode: cfg!(debug_assertions),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable debug mode
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Collider Group Configuration
///
/// Sizing and timing parameters for one [`ColliderGroup`](crate::physics::ColliderGroup).
///
/// The evaluation interval of a velocity is interpolated linearly from
/// `least_frequent_eval` at `lowest_speed_for_eval_calc` down to
/// `most_frequent_eval` at `highest_speed_for_eval_calc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColliderGroupConfig {
    /// Number of buckets in the spatial table
    pub bucket_count: usize,
    /// Starting size of the per-tick scratch buffers
    pub initial_capacity: usize,
    /// Global time dilation applied to every velocity
    pub speed_ratio: f32,
    /// Evaluation interval, in seconds, for a stationary velocity
    pub least_frequent_eval: f32,
    /// Evaluation interval, in seconds, for the fastest velocity
    pub most_frequent_eval: f32,
    /// Speed at which `least_frequent_eval` applies
    pub lowest_speed_for_eval_calc: f32,
    /// Speed at and above which `most_frequent_eval` applies
    pub highest_speed_for_eval_calc: f32,
    /// Ray density used by the tick
    pub casting_mode: CastingMode,
}

impl ColliderGroupConfig {
    /// Create a configuration with the stock calibration
    pub fn new() -> Self {
        Self {
            bucket_count: 300,
            initial_capacity: 64,
            speed_ratio: 1.0,
            least_frequent_eval: 0.05,
            most_frequent_eval: 0.002,
            lowest_speed_for_eval_calc: 0.0,
            highest_speed_for_eval_calc: 60.0,
            casting_mode: CastingMode::Precise,
        }
    }

    /// Set the spatial table size
    pub fn with_bucket_count(mut self, bucket_count: usize) -> Self {
        self.bucket_count = bucket_count;
        self
    }

    /// Set the global time dilation
    pub fn with_speed_ratio(mut self, speed_ratio: f32) -> Self {
        self.speed_ratio = speed_ratio;
        self
    }

    /// Set the ray density
    pub fn with_casting_mode(mut self, casting_mode: CastingMode) -> Self {
        self.casting_mode = casting_mode;
        self
    }

    /// Validate value ranges
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if self.bucket_count == 0 {
            return Err(PhysicsError::InvalidConfig("bucket_count must be at least 1".into()));
        }
        if self.speed_ratio.is_nan() || self.speed_ratio < 0.0 {
            return Err(PhysicsError::InvalidConfig(format!(
                "speed_ratio must be non-negative, got {}",
                self.speed_ratio
            )));
        }
        if self.most_frequent_eval.is_nan()
            || self.most_frequent_eval <= 0.0
            || self.most_frequent_eval > self.least_frequent_eval
        {
            return Err(PhysicsError::InvalidConfig(format!(
                "eval intervals must satisfy 0 < most_frequent_eval ({}) <= least_frequent_eval ({})",
                self.most_frequent_eval, self.least_frequent_eval
            )));
        }
        if self.highest_speed_for_eval_calc.is_nan() || self.highest_speed_for_eval_calc <= self.lowest_speed_for_eval_calc {
            return Err(PhysicsError::InvalidConfig(format!(
                "highest_speed_for_eval_calc ({}) must exceed lowest_speed_for_eval_calc ({})",
                self.highest_speed_for_eval_calc, self.lowest_speed_for_eval_calc
            )));
        }
        Ok(())
    }
}

impl Default for ColliderGroupConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Complete Simulation Configuration
///
/// Top-level file schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Engine-wide settings
    pub engine: EngineConfig,
    /// Settings for the collider group
    pub physics: ColliderGroupConfig,
}

impl SimulationConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), PhysicsError> {
        self.physics.validate()
    }
}

impl Config for SimulationConfig {}
impl Config for ColliderGroupConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.physics.bucket_count, 300);
        assert_eq!(config.physics.casting_mode, CastingMode::Precise);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(ColliderGroupConfig::new().with_bucket_count(0).validate().is_err());
        assert!(ColliderGroupConfig::new().with_speed_ratio(-1.0).validate().is_err());

        let mut inverted = ColliderGroupConfig::new();
        inverted.highest_speed_for_eval_calc = inverted.lowest_speed_for_eval_calc;
        assert!(matches!(inverted.validate(), Err(PhysicsError::InvalidConfig(_))));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let text = "[physics]\nbucket_count = 17\ncasting_mode = \"Rough\"\n";
        let config = SimulationConfig::from_str_as(text, ConfigFormat::Toml).unwrap();
        assert_eq!(config.physics.bucket_count, 17);
        assert_eq!(config.physics.casting_mode, CastingMode::Rough);
        assert_eq!(config.physics.least_frequent_eval, 0.05);
        assert_eq!(config.engine, EngineConfig::default());
    }
}
