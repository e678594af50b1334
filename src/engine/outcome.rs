// src/engine/outcome.rs

//! Why a run ended.

use std::time::Duration;

use thiserror::Error;

use crate::engine::script::ScriptId;
use crate::engine::state::ExecutionState;
use crate::safety::{LimitViolation, OperationCategory};

/// Run-ending failure recorded in the result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionFailure {
    #[error("execution limit exceeded: {0}")]
    LimitExceeded(LimitViolation),

    #[error("authorization denied for {0}")]
    AuthorizationDenied(OperationCategory),

    #[error("input backend failed during {operation}: {message}")]
    Backend { operation: String, message: String },

    #[error("script error: {0}")]
    Interpreter(String),
}

/// Signal raised at a checkpoint to unwind the interpreter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AbortReason {
    #[error("kill switch: {reason}")]
    KillSwitch { reason: String },

    #[error("terminated")]
    Terminated,

    #[error("stopped")]
    Stopped,

    #[error(transparent)]
    Failure(ExecutionFailure),
}

impl AbortReason {
    /// Higher wins when two abort requests race.
    pub fn priority(&self) -> u8 {
        match self {
            AbortReason::KillSwitch { .. } | AbortReason::Terminated => 3,
            AbortReason::Stopped => 2,
            AbortReason::Failure(_) => 1,
        }
    }

    pub fn final_state(&self) -> ExecutionState {
        match self {
            AbortReason::Failure(_) => ExecutionState::Failed,
            _ => ExecutionState::Terminated,
        }
    }
}

/// Final disposition of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Completed,
    Terminated(AbortReason),
    Failed(ExecutionFailure),
}

impl ExecutionOutcome {
    pub fn from_abort(reason: AbortReason) -> Self {
        match reason {
            AbortReason::Failure(failure) => ExecutionOutcome::Failed(failure),
            other => ExecutionOutcome::Terminated(other),
        }
    }

    pub fn state(&self) -> ExecutionState {
        match self {
            ExecutionOutcome::Completed => ExecutionState::Completed,
            ExecutionOutcome::Terminated(_) => ExecutionState::Terminated,
            ExecutionOutcome::Failed(_) => ExecutionState::Failed,
        }
    }
}

/// Reported once per run through `ExecutionCompleted` / `ExecutionError`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub script: ScriptId,
    pub script_name: String,
    pub outcome: ExecutionOutcome,
    /// Host API calls performed.
    pub operations: u64,
    /// Active time, excluding time parked at the pause gate.
    pub elapsed: Duration,
}

impl ExecutionResult {
    pub fn state(&self) -> ExecutionState {
        self.outcome.state()
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ExecutionOutcome::Completed)
    }

    pub fn failure(&self) -> Option<&ExecutionFailure> {
        match &self.outcome {
            ExecutionOutcome::Failed(f) => Some(f),
            _ => None,
        }
    }
}
