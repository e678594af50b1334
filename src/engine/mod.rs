// src/engine/mod.rs

//! Script execution engine.
//!
//! This module ties together:
//! - the pure session state machine ([`state`])
//! - one run of one script with its pause gate and abort slot ([`session`])
//! - the worker body that drives the interpreter ([`worker`])
//! - the public orchestrator and session registry ([`service`])
//!
//! The host API checkpoint the worker runs on every script call lives in
//! [`crate::bridge`]; kill switch, limits and authorization live in
//! [`crate::safety`].

pub mod events;
pub mod options;
pub mod outcome;
pub mod script;
pub mod service;
pub mod session;
pub mod state;
pub mod stats;
mod worker;

pub use events::{ChannelObserver, ExecutionEvent, ExecutionObserver, Observers};
pub use options::{
    DEFAULT_CHECKPOINT_SLICE, DEFAULT_RAPID_SPEED_THRESHOLD, EngineSettings, ExecutionOptions,
};
pub use outcome::{AbortReason, ExecutionFailure, ExecutionOutcome, ExecutionResult};
pub use script::{Script, ScriptId};
pub use service::{ExecutionService, SessionHandle};
pub use session::ExecutionSession;
pub use state::{ControlCommand, ExecutionState};
pub use stats::{ExecutionStatistics, estimate_remaining, progress_percent};
pub use crate::types::{ControlMode, InputMode, TriggerSource};
