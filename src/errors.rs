// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::engine::{ControlCommand, ExecutionState};
use crate::input::BackendError;
use crate::interpreter::InterpreterError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Script '{script}' is already running")]
    ConcurrencyConflict { script: String },

    #[error("No active session for script '{0}'")]
    NoActiveSession(String),

    #[error("{command:?} is not available while the session is {state}")]
    CommandUnavailable {
        command: ControlCommand,
        state: ExecutionState,
    },

    #[error("Invalid execution options: {0}")]
    InvalidOptions(String),

    #[error("Kill switch is active: {0}")]
    KillSwitchActive(String),

    #[error("Input backend unavailable: {0}")]
    BackendUnavailable(#[from] BackendError),

    #[error("Interpreter error: {0}")]
    Interpreter(#[from] InterpreterError),

    #[error("Execution worker failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, EngineError>;
