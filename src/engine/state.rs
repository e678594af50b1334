// src/engine/state.rs

//! Pure session state machine.
//!
//! No locks, threads or IO live here: only the state enum, the transition
//! table and the availability predicate that both the service and any UI use
//! to decide whether a control command may be issued.

use std::fmt;

use crate::types::ControlMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionState {
    /// Not started yet, or no session (after a finished run was reported).
    Idle,
    Running,
    Paused,
    /// Executing exactly one more operation before pausing again.
    Stepping,
    Completed,
    Failed,
    Terminated,
}

impl ExecutionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionState::Completed | ExecutionState::Failed | ExecutionState::Terminated
        )
    }

    /// Running, Paused or Stepping.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ExecutionState::Running | ExecutionState::Paused | ExecutionState::Stepping
        )
    }

    /// Whether a session may move from `self` to `next`.
    ///
    /// States only move forward; terminal states have no successors.
    pub fn can_transition_to(self, next: ExecutionState) -> bool {
        use ExecutionState::*;

        match (self, next) {
            (Idle, Running) => true,
            (Running, Paused) => true,
            (Paused, Running) | (Paused, Stepping) => true,
            (Stepping, Paused) | (Stepping, Running) => true,
            (from, to) if from.is_active() && to.is_terminal() => true,
            _ => false,
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionState::Idle => "idle",
            ExecutionState::Running => "running",
            ExecutionState::Paused => "paused",
            ExecutionState::Stepping => "stepping",
            ExecutionState::Completed => "completed",
            ExecutionState::Failed => "failed",
            ExecutionState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Control requests a caller can issue against a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlCommand {
    Pause,
    Resume,
    Step,
    Stop,
    Terminate,
}

impl ControlCommand {
    /// Whether the command is subject to the debug-only mode gate.
    pub fn requires_interactive(self) -> bool {
        !matches!(self, ControlCommand::Terminate)
    }

    /// The "can-execute" predicate.
    pub fn is_available(self, mode: ControlMode, state: ExecutionState) -> bool {
        if self.requires_interactive() && !mode.is_interactive() {
            return false;
        }

        match self {
            ControlCommand::Pause => state == ExecutionState::Running,
            ControlCommand::Resume => {
                matches!(state, ExecutionState::Paused | ExecutionState::Stepping)
            }
            ControlCommand::Step => state == ExecutionState::Paused,
            ControlCommand::Stop | ControlCommand::Terminate => state.is_active(),
        }
    }
}

impl std::str::FromStr for ControlCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pause" | "p" => Ok(ControlCommand::Pause),
            "resume" | "r" => Ok(ControlCommand::Resume),
            "step" | "s" => Ok(ControlCommand::Step),
            "stop" => Ok(ControlCommand::Stop),
            "terminate" | "kill" | "t" => Ok(ControlCommand::Terminate),
            other => Err(format!("unknown command '{other}'")),
        }
    }
}
