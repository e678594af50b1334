// src/config/validate.rs

use crate::config::duration::{parse_duration, parse_optional_duration};
use crate::config::model::{ConfigFile, ExecutionSection, RawConfigFile, SafetySection};
use crate::engine::{EngineSettings, ExecutionOptions};
use crate::errors::{EngineError, Result};
use crate::safety::{ExecutionLimits, OperationCategory};
use crate::types::TriggerSource;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::EngineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let settings = validate_safety(&raw.safety, &raw.execution)?;
        let options = validate_execution(&raw.execution)?;
        let preauthorized = validate_categories(&raw.safety)?;
        Ok(ConfigFile::new_unchecked(
            settings,
            options,
            raw.safety.kill_switch_trigger,
            preauthorized,
        ))
    }
}

fn config_error(message: impl Into<String>) -> EngineError {
    EngineError::ConfigError(message.into())
}

fn duration_field(section: &str, field: &str, value: &str) -> Result<std::time::Duration> {
    parse_duration(value).map_err(|e| config_error(format!("[{section}].{field}: {e}")))
}

fn validate_safety(safety: &SafetySection, execution: &ExecutionSection) -> Result<EngineSettings> {
    let max_duration = parse_optional_duration(&safety.max_duration)
        .map_err(|e| config_error(format!("[safety].max_duration: {e}")))?;

    if !safety.rapid_speed_threshold.is_finite() || safety.rapid_speed_threshold <= 0.0 {
        return Err(config_error(format!(
            "[safety].rapid_speed_threshold must be a positive number (got {})",
            safety.rapid_speed_threshold
        )));
    }

    let checkpoint_slice = duration_field("execution", "checkpoint_slice", &execution.checkpoint_slice)?;
    if checkpoint_slice.is_zero() {
        return Err(config_error("[execution].checkpoint_slice must be > 0"));
    }

    Ok(EngineSettings {
        limits: ExecutionLimits {
            max_operations: (safety.max_operations > 0).then_some(safety.max_operations),
            max_duration: max_duration.filter(|d| !d.is_zero()),
        },
        checkpoint_slice,
        rapid_speed_threshold: safety.rapid_speed_threshold,
    })
}

fn validate_execution(execution: &ExecutionSection) -> Result<ExecutionOptions> {
    let options = ExecutionOptions {
        control_mode: execution.control_mode,
        speed_multiplier: execution.speed_multiplier,
        show_countdown: execution.show_countdown,
        countdown: duration_field("execution", "countdown", &execution.countdown)?,
        input_mode: execution.input_mode,
        trigger_source: TriggerSource::CommandLine,
        pre_delay: duration_field("execution", "pre_delay", &execution.pre_delay)?,
    };

    options
        .validate()
        .map_err(|e| config_error(format!("[execution]: {e}")))?;
    Ok(options)
}

fn validate_categories(safety: &SafetySection) -> Result<Vec<OperationCategory>> {
    safety
        .preauthorized
        .iter()
        .map(|name| {
            name.parse::<OperationCategory>()
                .map_err(|e| config_error(format!("[safety].preauthorized: {e}")))
        })
        .collect()
}
