// src/engine/options.rs

use std::time::Duration;

use crate::errors::{EngineError, Result};
use crate::safety::ExecutionLimits;
use crate::types::{ControlMode, InputMode, TriggerSource};

pub const DEFAULT_CHECKPOINT_SLICE: Duration = Duration::from_millis(20);
pub const DEFAULT_RAPID_SPEED_THRESHOLD: f64 = 4.0;

/// Per-run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOptions {
    pub control_mode: ControlMode,
    /// Divides every wait duration; must be finite and > 0.
    pub speed_multiplier: f64,
    /// Countdown before the run. Honoured by the caller, not the engine.
    pub show_countdown: bool,
    pub countdown: Duration,
    pub input_mode: InputMode,
    pub trigger_source: TriggerSource,
    /// Delay before every input-producing operation, scaled like `sleep`.
    pub pre_delay: Duration,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            control_mode: ControlMode::AutonomousRun,
            speed_multiplier: 1.0,
            show_countdown: false,
            countdown: Duration::from_secs(3),
            input_mode: InputMode::Software,
            trigger_source: TriggerSource::Api,
            pre_delay: Duration::ZERO,
        }
    }
}

impl ExecutionOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.speed_multiplier.is_finite() || self.speed_multiplier <= 0.0 {
            return Err(EngineError::InvalidOptions(format!(
                "speed_multiplier must be a positive number (got {})",
                self.speed_multiplier
            )));
        }
        Ok(())
    }

    /// Wall-clock duration of a requested wait under this run's speed.
    ///
    /// Saturates at `Duration::MAX`; the wait is sliced, so limits and the
    /// kill switch still end it.
    pub fn scaled(&self, requested: Duration) -> Duration {
        Duration::try_from_secs_f64(requested.as_secs_f64() / self.speed_multiplier)
            .unwrap_or(Duration::MAX)
    }
}

/// Engine-wide settings shared by every session of a service.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub limits: ExecutionLimits,
    /// Longest uninterrupted sleep between checkpoint re-checks.
    pub checkpoint_slice: Duration,
    /// Speed multipliers above this need `RapidInput` authorization.
    pub rapid_speed_threshold: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            limits: ExecutionLimits::default(),
            checkpoint_slice: DEFAULT_CHECKPOINT_SLICE,
            rapid_speed_threshold: DEFAULT_RAPID_SPEED_THRESHOLD,
        }
    }
}
