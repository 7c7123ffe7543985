//! Engine configuration
//!
//! Tunable limits governing disciplinary bookkeeping and roster admission.
//! Loaded once at engine construction and treated as immutable afterwards.

use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};

/// Configuration for the standings and stewarding engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of licence points a driver starts a category with
    ///
    /// Also the ceiling that `adjust_licence_points` clamps to. A driver
    /// whose balance reaches 0 is suspended from scoring until points are
    /// restored.
    pub licence_points_ceiling: u8,

    /// Warning count at which a `WarningThresholdReached` event is emitted
    ///
    /// The engine performs no escalation of its own; the event is the hook
    /// for external policy (e.g. converting warnings into a penalty).
    pub warning_threshold: u8,

    /// Lowest race number a driver may carry
    pub race_number_min: u16,

    /// Highest race number a driver may carry
    pub race_number_max: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            licence_points_ceiling: 10,
            warning_threshold: 3,
            race_number_min: 1,
            race_number_max: 999,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.licence_points_ceiling == 0 {
            return Err(EngineError::Config(
                "licence_points_ceiling must be at least 1".into(),
            ));
        }

        if self.warning_threshold == 0 {
            return Err(EngineError::Config(
                "warning_threshold must be at least 1".into(),
            ));
        }

        if self.race_number_min == 0 || self.race_number_min > self.race_number_max {
            return Err(EngineError::Config(format!(
                "race number domain {}..={} is empty or starts at 0",
                self.race_number_min, self.race_number_max
            )));
        }

        Ok(())
    }
}
