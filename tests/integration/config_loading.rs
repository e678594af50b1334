use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use macroguard::config::{ConfigFile, load_and_validate, load_or_default};
use macroguard::errors::EngineError;
use macroguard::safety::OperationCategory;
use macroguard::types::{ControlMode, InputMode, TriggerSource};

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn full_config_is_loaded_into_settings_and_options() {
    let file = config_file(
        r#"
[safety]
max_operations = 250
max_duration = "90s"
kill_switch_trigger = "ctrl+shift+k"
preauthorized = ["text_injection"]
rapid_speed_threshold = 6.0

[execution]
control_mode = "debug"
input_mode = "low_level"
speed_multiplier = 2.5
pre_delay = "15ms"
show_countdown = false
countdown = "5s"
checkpoint_slice = "50ms"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.settings.limits.max_operations, Some(250));
    assert_eq!(cfg.settings.limits.max_duration, Some(Duration::from_secs(90)));
    assert_eq!(cfg.settings.checkpoint_slice, Duration::from_millis(50));
    assert_eq!(cfg.settings.rapid_speed_threshold, 6.0);
    assert_eq!(cfg.kill_switch_trigger, "ctrl+shift+k");
    assert_eq!(cfg.preauthorized, vec![OperationCategory::TextInjection]);

    assert_eq!(cfg.options.control_mode, ControlMode::DebugInteractive);
    assert_eq!(cfg.options.input_mode, InputMode::LowLevel);
    assert_eq!(cfg.options.speed_multiplier, 2.5);
    assert_eq!(cfg.options.pre_delay, Duration::from_millis(15));
    assert!(!cfg.options.show_countdown);
    assert_eq!(cfg.options.countdown, Duration::from_secs(5));
    assert_eq!(cfg.options.trigger_source, TriggerSource::CommandLine);
}

#[test]
fn empty_file_matches_built_in_defaults() {
    let file = config_file("");
    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg, ConfigFile::default());
}

#[test]
fn unknown_category_is_a_config_error() {
    let file = config_file(
        r#"
[safety]
preauthorized = ["text_injection", "self_destruct"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(EngineError::ConfigError(msg)) => {
            assert!(msg.contains("preauthorized"));
            assert!(msg.contains("self_destruct"));
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn malformed_duration_is_a_config_error() {
    let file = config_file(
        r#"
[safety]
max_duration = "ten minutes"
"#,
    );

    match load_and_validate(file.path()) {
        Err(EngineError::ConfigError(msg)) => assert!(msg.contains("max_duration")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn non_positive_speed_is_a_config_error() {
    let file = config_file(
        r#"
[execution]
speed_multiplier = 0.0
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(EngineError::ConfigError(msg)) if msg.contains("[execution]")
    ));
}

#[test]
fn unknown_control_mode_is_a_toml_error() {
    let file = config_file(
        r#"
[execution]
control_mode = "turbo"
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(EngineError::TomlError(_))
    ));
}

#[test]
fn missing_explicit_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    assert!(matches!(
        load_or_default(Some(&path)),
        Err(EngineError::IoError(_))
    ));
}

#[test]
fn overflowing_duration_is_a_config_error() {
    let file = config_file(
        r#"
[safety]
max_duration = "99999999999999999h"
"#,
    );

    match load_and_validate(file.path()) {
        Err(EngineError::ConfigError(msg)) => {
            assert!(msg.contains("max_duration"));
            assert!(msg.contains("too large"));
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}
