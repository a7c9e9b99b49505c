//! Configuration
//!
//! Plain serde structs with defaults for every field, so a TOML file only
//! needs to mention what it changes.

use crate::error::SchedError;
use crate::handle::MAX_SLOTS;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Slots allocated up front. The table doubles when it runs out.
    pub initial_capacity: usize,
    /// Hard limit on slots. Growth past it fails with `CapacityExceeded`.
    pub max_capacity: usize,
    /// Catch panics raised by sequences and turn them into fiber stops.
    pub isolate_panics: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            max_capacity: MAX_SLOTS,
            isolate_panics: true,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), SchedError> {
        if self.max_capacity == 0 || self.max_capacity > MAX_SLOTS {
            return Err(SchedError::InvalidConfig(format!(
                "max_capacity {} must be in 1..={}",
                self.max_capacity, MAX_SLOTS
            )));
        }
        if self.initial_capacity == 0 || self.initial_capacity > self.max_capacity {
            return Err(SchedError::InvalidConfig(format!(
                "initial_capacity {} must be in 1..={}",
                self.initial_capacity, self.max_capacity
            )));
        }
        Ok(())
    }
}

/// Configuration for the host-loop engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frames per second for `step_frame` and realtime pacing.
    pub fps: f64,
    /// Global time scale applied to every tick.
    pub time_scale: f64,
    pub scheduler: SchedulerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fps: 60.0,
            time_scale: 1.0,
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, SchedError> {
        let config: EngineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SchedError> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(SchedError::InvalidConfig(format!(
                "fps must be positive, got {}",
                self.fps
            )));
        }
        if !(self.time_scale.is_finite() && self.time_scale >= 0.0) {
            return Err(SchedError::InvalidConfig(format!(
                "time_scale must be non-negative, got {}",
                self.time_scale
            )));
        }
        self.scheduler.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(SchedulerConfig::default().validate().is_ok());
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            fps = 30.0

            [scheduler]
            initial_capacity = 8
            isolate_panics = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.fps, 30.0);
        assert_eq!(cfg.time_scale, 1.0);
        assert_eq!(cfg.scheduler.initial_capacity, 8);
        assert_eq!(cfg.scheduler.max_capacity, MAX_SLOTS);
        assert!(!cfg.scheduler.isolate_panics);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_toml_str("fps = 0.0"),
            Err(SchedError::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[scheduler]\nmax_capacity = 33554432"),
            Err(SchedError::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("fps = \"fast\""),
            Err(SchedError::Config(_))
        ));
    }
}
