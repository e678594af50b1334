// src/config/model.rs

use serde::Deserialize;

use crate::engine::{EngineSettings, ExecutionOptions};
use crate::safety::OperationCategory;
use crate::types::{ControlMode, InputMode, TriggerSource};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [safety]
/// max_operations = 10000
/// max_duration = "10m"
/// kill_switch_trigger = "ctrl+alt+escape"
/// preauthorized = ["text_injection"]
///
/// [execution]
/// control_mode = "autonomous"
/// speed_multiplier = 1.0
/// countdown = "3s"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub safety: SafetySection,

    #[serde(default)]
    pub execution: ExecutionSection,
}

/// `[safety]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SafetySection {
    /// Operation cap per run; `0` disables the cap.
    #[serde(default = "default_max_operations")]
    pub max_operations: u64,

    /// Duration cap per run (e.g. `"10m"`); an empty string disables it.
    #[serde(default = "default_max_duration")]
    pub max_duration: String,

    /// Description of the global hotkey bound to the kill switch.
    ///
    /// Hotkey capture is external; the engine only reports this value.
    #[serde(default = "default_kill_switch_trigger")]
    pub kill_switch_trigger: String,

    /// Categories approved up front (`"text_injection"`, `"rapid_input"`).
    #[serde(default)]
    pub preauthorized: Vec<String>,

    /// Speed multipliers above this need `rapid_input` authorization.
    #[serde(default = "default_rapid_speed_threshold")]
    pub rapid_speed_threshold: f64,
}

fn default_max_operations() -> u64 {
    crate::safety::limits::DEFAULT_MAX_OPERATIONS
}

fn default_max_duration() -> String {
    "10m".to_string()
}

fn default_kill_switch_trigger() -> String {
    "ctrl+alt+escape".to_string()
}

fn default_rapid_speed_threshold() -> f64 {
    crate::engine::DEFAULT_RAPID_SPEED_THRESHOLD
}

impl Default for SafetySection {
    fn default() -> Self {
        Self {
            max_operations: default_max_operations(),
            max_duration: default_max_duration(),
            kill_switch_trigger: default_kill_switch_trigger(),
            preauthorized: Vec::new(),
            rapid_speed_threshold: default_rapid_speed_threshold(),
        }
    }
}

/// `[execution]` section: defaults for every run started from this config.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionSection {
    /// `"autonomous"` (default) or `"debug"`.
    #[serde(default)]
    pub control_mode: ControlMode,

    /// `"software"` (default), `"low_level"` or `"hardware_relay"`.
    #[serde(default)]
    pub input_mode: InputMode,

    #[serde(default = "default_speed_multiplier")]
    pub speed_multiplier: f64,

    /// Delay before every input-producing call, scaled by the speed.
    #[serde(default = "default_pre_delay")]
    pub pre_delay: String,

    #[serde(default = "default_show_countdown")]
    pub show_countdown: bool,

    #[serde(default = "default_countdown")]
    pub countdown: String,

    /// Longest uninterrupted sleep between checkpoint re-checks.
    #[serde(default = "default_checkpoint_slice")]
    pub checkpoint_slice: String,
}

fn default_speed_multiplier() -> f64 {
    1.0
}

fn default_pre_delay() -> String {
    "0ms".to_string()
}

fn default_show_countdown() -> bool {
    true
}

fn default_countdown() -> String {
    "3s".to_string()
}

fn default_checkpoint_slice() -> String {
    "20ms".to_string()
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            control_mode: ControlMode::default(),
            input_mode: InputMode::default(),
            speed_multiplier: default_speed_multiplier(),
            pre_delay: default_pre_delay(),
            show_countdown: default_show_countdown(),
            countdown: default_countdown(),
            checkpoint_slice: default_checkpoint_slice(),
        }
    }
}

/// Validated configuration, ready to build an engine from.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`) or
/// `Default`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub settings: EngineSettings,
    /// Default options for runs started from this config.
    pub options: ExecutionOptions,
    pub kill_switch_trigger: String,
    pub preauthorized: Vec<OperationCategory>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        settings: EngineSettings,
        options: ExecutionOptions,
        kill_switch_trigger: String,
        preauthorized: Vec<OperationCategory>,
    ) -> Self {
        Self {
            settings,
            options,
            kill_switch_trigger,
            preauthorized,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            settings: EngineSettings::default(),
            options: ExecutionOptions {
                show_countdown: default_show_countdown(),
                trigger_source: TriggerSource::CommandLine,
                ..ExecutionOptions::default()
            },
            kill_switch_trigger: default_kill_switch_trigger(),
            preauthorized: Vec::new(),
        }
    }
}
