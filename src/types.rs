use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Whether a run may be driven interactively.
///
/// - `DebugInteractive`: pause / resume / step / stop are honoured.
/// - `AutonomousRun`: the script runs to completion; only Terminate and the
///   kill switch can end it early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    #[serde(alias = "debug")]
    DebugInteractive,
    #[serde(alias = "autonomous")]
    AutonomousRun,
}

impl ControlMode {
    pub fn is_interactive(self) -> bool {
        matches!(self, ControlMode::DebugInteractive)
    }
}

impl Default for ControlMode {
    fn default() -> Self {
        ControlMode::AutonomousRun
    }
}

impl FromStr for ControlMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" | "debug_interactive" => Ok(ControlMode::DebugInteractive),
            "autonomous" | "autonomous_run" => Ok(ControlMode::AutonomousRun),
            other => Err(format!(
                "invalid control_mode: {other} (expected \"debug\" or \"autonomous\")"
            )),
        }
    }
}

/// Which input backend a session drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Direct software cursor / keyboard calls.
    Software,
    /// Software injection through the OS low-level input queue.
    LowLevel,
    /// External relay device that replays input as real hardware.
    HardwareRelay,
}

impl Default for InputMode {
    fn default() -> Self {
        InputMode::Software
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InputMode::Software => "software",
            InputMode::LowLevel => "low_level",
            InputMode::HardwareRelay => "hardware_relay",
        };
        f.write_str(s)
    }
}

impl FromStr for InputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "software" => Ok(InputMode::Software),
            "low_level" | "lowlevel" => Ok(InputMode::LowLevel),
            "hardware_relay" | "hardware" | "relay" => Ok(InputMode::HardwareRelay),
            other => Err(format!(
                "invalid input_mode: {other} (expected software, low_level or hardware_relay)"
            )),
        }
    }
}

/// Why a run was started. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    DebugPanel,
    Hotkey,
    CommandLine,
    Api,
}

impl Default for TriggerSource {
    fn default() -> Self {
        TriggerSource::Api
    }
}
