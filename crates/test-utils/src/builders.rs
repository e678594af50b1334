#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use macroguard::engine::{EngineSettings, ExecutionOptions, ExecutionService, Script};
use macroguard::input::{FixedBackendProvider, InputBackend};
use macroguard::interpreter::LuaInterpreterFactory;
use macroguard::safety::{ExecutionLimits, SafetyService};
use macroguard::types::{ControlMode, InputMode, TriggerSource};

/// Script whose id and name are both `id`.
pub fn script(id: &str, source: &str) -> Script {
    Script::new(id, id, source)
}

/// Builder for `ExecutionOptions` to simplify test setup.
///
/// Starts from autonomous mode, speed 1.0, no countdown, no pre-delay.
pub struct OptionsBuilder {
    options: ExecutionOptions,
}

impl OptionsBuilder {
    pub fn new() -> Self {
        Self {
            options: ExecutionOptions {
                trigger_source: TriggerSource::DebugPanel,
                ..ExecutionOptions::default()
            },
        }
    }

    pub fn debug(mut self) -> Self {
        self.options.control_mode = ControlMode::DebugInteractive;
        self
    }

    pub fn speed(mut self, multiplier: f64) -> Self {
        self.options.speed_multiplier = multiplier;
        self
    }

    pub fn pre_delay(mut self, delay: Duration) -> Self {
        self.options.pre_delay = delay;
        self
    }

    pub fn input_mode(mut self, mode: InputMode) -> Self {
        self.options.input_mode = mode;
        self
    }

    pub fn build(self) -> ExecutionOptions {
        self.options
    }
}

impl Default for OptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `EngineSettings`.
///
/// Defaults to unlimited runs and a 10ms checkpoint slice so tests stay fast.
pub struct SettingsBuilder {
    settings: EngineSettings,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self {
            settings: EngineSettings {
                limits: ExecutionLimits::unlimited(),
                checkpoint_slice: Duration::from_millis(10),
                ..EngineSettings::default()
            },
        }
    }

    pub fn max_operations(mut self, limit: u64) -> Self {
        self.settings.limits.max_operations = Some(limit);
        self
    }

    pub fn max_duration(mut self, limit: Duration) -> Self {
        self.settings.limits.max_duration = Some(limit);
        self
    }

    pub fn checkpoint_slice(mut self, slice: Duration) -> Self {
        self.settings.checkpoint_slice = slice;
        self
    }

    pub fn rapid_speed_threshold(mut self, threshold: f64) -> Self {
        self.settings.rapid_speed_threshold = threshold;
        self
    }

    pub fn build(self) -> EngineSettings {
        self.settings
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Service wired to `backend` and the Lua interpreter.
pub fn service_with_backend(
    safety: Arc<SafetyService>,
    backend: Arc<dyn InputBackend>,
    settings: EngineSettings,
) -> ExecutionService {
    ExecutionService::new(
        safety,
        Arc::new(FixedBackendProvider::new(backend)),
        Arc::new(LuaInterpreterFactory),
        settings,
    )
}
