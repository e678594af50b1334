// src/engine/session.rs

//! One run of one script.
//!
//! The session owns:
//! - the state machine (`ExecutionState`) behind a per-session mutex
//! - the pause gate (`Condvar`) the worker parks on while paused
//! - the abort slot: the first (highest-priority) reason the run must unwind
//! - the operation counter, which only ever increases
//!
//! Control requests (`control`) come from the service and never block on
//! the worker; the worker side (`begin`, `pass_gate`, `record_operation`,
//! `finish`) is only called from the session's own worker thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, info, warn};

use crate::engine::events::{ExecutionEvent, Observers};
use crate::engine::options::ExecutionOptions;
use crate::engine::outcome::{AbortReason, ExecutionFailure, ExecutionOutcome, ExecutionResult};
use crate::engine::script::{Script, ScriptId};
use crate::engine::state::{ControlCommand, ExecutionState};
use crate::engine::stats::{ExecutionStatistics, operations_per_second, progress_percent};
use crate::errors::{EngineError, Result};
use crate::interpreter::RunOutcome;
use crate::sync::lock;
use crate::types::ControlMode;

#[derive(Debug)]
struct ControlState {
    state: ExecutionState,
    /// Operations granted by `Step` and not yet started.
    step_budget: u32,
    abort: Option<AbortReason>,
    paused_total: Duration,
    parked_since: Option<Instant>,
}

impl ControlState {
    /// Record `reason` unless a reason of equal or higher priority is set.
    fn record_abort(&mut self, reason: AbortReason) -> AbortReason {
        let replace = match &self.abort {
            None => true,
            Some(existing) => reason.priority() > existing.priority(),
        };
        if replace {
            self.abort = Some(reason);
        }
        self.abort.clone().unwrap_or(AbortReason::Terminated)
    }

    fn parked_time(&self) -> Duration {
        self.paused_total
            + self
                .parked_since
                .map(|since| since.elapsed())
                .unwrap_or_default()
    }
}

#[derive(Debug)]
pub struct ExecutionSession {
    script: Arc<Script>,
    options: ExecutionOptions,
    slice: Duration,
    expected_total: Option<u64>,
    operation_index: AtomicU64,
    started_at: SystemTime,
    started: Instant,
    control: Mutex<ControlState>,
    gate: Condvar,
    observers: Arc<Observers>,
}

impl ExecutionSession {
    pub(crate) fn new(
        script: Arc<Script>,
        options: ExecutionOptions,
        slice: Duration,
        expected_total: Option<u64>,
        observers: Arc<Observers>,
    ) -> Self {
        Self {
            script,
            options,
            slice,
            expected_total,
            operation_index: AtomicU64::new(0),
            started_at: SystemTime::now(),
            started: Instant::now(),
            control: Mutex::new(ControlState {
                state: ExecutionState::Idle,
                step_budget: 0,
                abort: None,
                paused_total: Duration::ZERO,
                parked_since: None,
            }),
            gate: Condvar::new(),
            observers,
        }
    }

    pub fn script(&self) -> &Arc<Script> {
        &self.script
    }

    pub fn script_id(&self) -> &ScriptId {
        &self.script.id
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    pub fn mode(&self) -> ControlMode {
        self.options.control_mode
    }

    pub fn state(&self) -> ExecutionState {
        lock(&self.control).state
    }

    pub fn operation_index(&self) -> u64 {
        self.operation_index.load(Ordering::Acquire)
    }

    pub fn expected_total(&self) -> Option<u64> {
        self.expected_total
    }

    pub fn abort_reason(&self) -> Option<AbortReason> {
        lock(&self.control).abort.clone()
    }

    /// Wall-clock time since start minus time parked at the pause gate.
    pub fn active_elapsed(&self) -> Duration {
        let parked = lock(&self.control).parked_time();
        self.started.elapsed().saturating_sub(parked)
    }

    pub fn statistics(&self) -> ExecutionStatistics {
        let operation_index = self.operation_index();
        let elapsed = self.active_elapsed();
        ExecutionStatistics {
            script: self.script.id.clone(),
            state: self.state(),
            operation_index,
            elapsed,
            started_at: Some(self.started_at),
            expected_total: self.expected_total,
            percent: progress_percent(operation_index, self.expected_total),
            operations_per_second: operations_per_second(operation_index, elapsed),
        }
    }

    /// Apply a control command.
    ///
    /// Debug-only commands against an autonomous session are ignored and
    /// return `Ok(false)`; otherwise the command must be available in the
    /// current state.
    pub(crate) fn control(&self, command: ControlCommand) -> Result<bool> {
        if command.requires_interactive() && !self.mode().is_interactive() {
            debug!(
                script = %self.script.name,
                ?command,
                "ignoring debug command for autonomous session"
            );
            return Ok(false);
        }

        let new_state = {
            let mut control = lock(&self.control);
            if command != ControlCommand::Terminate && control.abort.is_some() {
                debug!(script = %self.script.name, ?command, "session is already unwinding");
                return Ok(false);
            }
            if !command.is_available(self.mode(), control.state) {
                return Err(EngineError::CommandUnavailable {
                    command,
                    state: control.state,
                });
            }

            let new_state = match command {
                ControlCommand::Pause => Some(ExecutionState::Paused),
                ControlCommand::Resume => {
                    control.step_budget = 0;
                    Some(ExecutionState::Running)
                }
                ControlCommand::Step => {
                    control.step_budget = 1;
                    Some(ExecutionState::Stepping)
                }
                ControlCommand::Stop => {
                    control.record_abort(AbortReason::Stopped);
                    None
                }
                ControlCommand::Terminate => {
                    control.record_abort(AbortReason::Terminated);
                    None
                }
            };

            if let Some(state) = new_state {
                control.state = state;
            }
            self.gate.notify_all();
            new_state
        };

        info!(script = %self.script.name, ?command, "control command applied");
        if let Some(state) = new_state {
            self.publish_state(state);
        }
        Ok(true)
    }

    /// Force an abort regardless of mode (kill switch, service shutdown).
    pub(crate) fn abort(&self, reason: AbortReason) -> AbortReason {
        let effective = lock(&self.control).record_abort(reason);
        self.gate.notify_all();
        effective
    }

    pub(crate) fn begin(&self) {
        self.transition(ExecutionState::Running);
    }

    /// Block while the session is paused.
    ///
    /// `holds_step` tracks whether the current operation already consumed a
    /// step grant; an operation holding the grant may continue while the
    /// session is `Stepping`. `kill_switch` is polled on every wake-up.
    pub(crate) fn pass_gate(
        &self,
        holds_step: &mut bool,
        kill_switch: impl Fn() -> Option<AbortReason>,
    ) -> std::result::Result<(), AbortReason> {
        let mut paused_now = false;

        let result = {
            let mut control = lock(&self.control);
            loop {
                if let Some(reason) = kill_switch() {
                    control.record_abort(reason);
                }
                if let Some(reason) = &control.abort {
                    break Err(reason.clone());
                }

                match control.state {
                    ExecutionState::Stepping if *holds_step => break Ok(()),
                    ExecutionState::Stepping if control.step_budget > 0 => {
                        control.step_budget -= 1;
                        *holds_step = true;
                        break Ok(());
                    }
                    ExecutionState::Stepping => {
                        control.state = ExecutionState::Paused;
                        paused_now = true;
                    }
                    ExecutionState::Paused => {
                        control.parked_since = Some(Instant::now());
                        let (guard, _) = self
                            .gate
                            .wait_timeout(control, self.slice)
                            .unwrap_or_else(PoisonError::into_inner);
                        control = guard;
                        if let Some(since) = control.parked_since.take() {
                            control.paused_total += since.elapsed();
                        }
                    }
                    _ => break Ok(()),
                }
            }
        };

        if paused_now {
            self.publish_state(ExecutionState::Paused);
        }
        result
    }

    /// Count one finished operation and publish progress.
    ///
    /// An operation that held a step grant moves the session back to `Paused`.
    pub(crate) fn record_operation(&self, holds_step: bool) -> u64 {
        let index = self.operation_index.fetch_add(1, Ordering::AcqRel) + 1;

        let repaused = holds_step && {
            let mut control = lock(&self.control);
            if control.state == ExecutionState::Stepping && control.step_budget == 0 {
                control.state = ExecutionState::Paused;
                true
            } else {
                false
            }
        };

        self.observers.publish(ExecutionEvent::ProgressChanged {
            script: self.script.id.clone(),
            operation_index: index,
            total: self.expected_total,
            percent: progress_percent(index, self.expected_total),
        });

        if repaused {
            self.publish_state(ExecutionState::Paused);
        }
        index
    }

    /// Settle the final state from the interpreter outcome and the abort slot.
    ///
    /// A recorded abort always wins over what the interpreter returned, so a
    /// script that swallowed the abort with `pcall` still ends aborted.
    pub(crate) fn finish(&self, outcome: std::result::Result<RunOutcome, ExecutionFailure>) -> ExecutionResult {
        let outcome = match (self.abort_reason(), outcome) {
            (Some(reason), _) => ExecutionOutcome::from_abort(reason),
            (None, Ok(RunOutcome::Completed)) => ExecutionOutcome::Completed,
            (None, Ok(RunOutcome::Aborted(reason))) => ExecutionOutcome::from_abort(reason),
            (None, Ok(RunOutcome::Failed(message))) => {
                ExecutionOutcome::Failed(ExecutionFailure::Interpreter(message))
            }
            (None, Err(failure)) => ExecutionOutcome::Failed(failure),
        };

        // The terminal state is published by the service once the run is
        // deregistered, so subscribers may restart the script right away.
        let final_state = outcome.state();
        self.settle(final_state);

        let result = ExecutionResult {
            script: self.script.id.clone(),
            script_name: self.script.name.clone(),
            outcome,
            operations: self.operation_index(),
            elapsed: self.active_elapsed(),
        };

        info!(
            script = %self.script.name,
            state = %final_state,
            operations = result.operations,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "session finished"
        );
        result
    }

    fn transition(&self, next: ExecutionState) -> bool {
        let changed = self.settle(next);
        if changed {
            self.publish_state(next);
        }
        changed
    }

    /// Apply a legal transition without notifying observers.
    fn settle(&self, next: ExecutionState) -> bool {
        let mut control = lock(&self.control);
        if control.state.can_transition_to(next) {
            control.state = next;
            true
        } else {
            warn!(
                script = %self.script.name,
                from = %control.state,
                to = %next,
                "refusing illegal state transition"
            );
            false
        }
    }

    fn publish_state(&self, state: ExecutionState) {
        debug!(script = %self.script.name, %state, "state changed");
        self.observers.publish(ExecutionEvent::StateChanged {
            script: self.script.id.clone(),
            state,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ControlMode;

    fn session(mode: ControlMode) -> ExecutionSession {
        let script = Arc::new(Script::new("s", "s", "-- empty"));
        let options = ExecutionOptions {
            control_mode: mode,
            ..Default::default()
        };
        ExecutionSession::new(
            script,
            options,
            Duration::from_millis(5),
            None,
            Arc::new(Observers::default()),
        )
    }

    #[test]
    fn autonomous_sessions_ignore_debug_commands() {
        let s = session(ControlMode::AutonomousRun);
        s.begin();
        assert!(!s.control(ControlCommand::Pause).unwrap());
        assert!(!s.control(ControlCommand::Stop).unwrap());
        assert_eq!(s.state(), ExecutionState::Running);
        assert!(s.control(ControlCommand::Terminate).unwrap());
        assert_eq!(s.abort_reason(), Some(AbortReason::Terminated));
    }

    #[test]
    fn step_requires_paused() {
        let s = session(ControlMode::DebugInteractive);
        s.begin();
        let err = s.control(ControlCommand::Step).unwrap_err();
        assert!(matches!(
            err,
            EngineError::CommandUnavailable {
                command: ControlCommand::Step,
                state: ExecutionState::Running
            }
        ));
    }

    #[test]
    fn step_grant_covers_exactly_one_operation() {
        let s = session(ControlMode::DebugInteractive);
        s.begin();
        s.control(ControlCommand::Pause).unwrap();
        s.control(ControlCommand::Step).unwrap();

        let mut holds = false;
        s.pass_gate(&mut holds, || None).unwrap();
        assert!(holds);
        // Mid-operation re-checks pass while the grant is held.
        s.pass_gate(&mut holds, || None).unwrap();
        s.record_operation(holds);

        assert_eq!(s.state(), ExecutionState::Paused);
        assert_eq!(s.operation_index(), 1);
    }

    #[test]
    fn terminate_outranks_stop() {
        let s = session(ControlMode::DebugInteractive);
        s.begin();
        s.control(ControlCommand::Terminate).unwrap();
        s.abort(AbortReason::Stopped);
        assert_eq!(s.abort_reason(), Some(AbortReason::Terminated));
    }

    #[test]
    fn parked_worker_unwinds_on_stop() {
        let s = Arc::new(session(ControlMode::DebugInteractive));
        s.begin();
        s.control(ControlCommand::Pause).unwrap();

        let worker = {
            let s = s.clone();
            std::thread::spawn(move || {
                let mut holds = false;
                s.pass_gate(&mut holds, || None)
            })
        };

        std::thread::sleep(Duration::from_millis(30));
        s.control(ControlCommand::Stop).unwrap();
        assert_eq!(worker.join().unwrap(), Err(AbortReason::Stopped));
    }

    #[test]
    fn finish_prefers_recorded_abort() {
        let s = session(ControlMode::AutonomousRun);
        s.begin();
        s.abort(AbortReason::KillSwitch { reason: "k".into() });
        let result = s.finish(Ok(RunOutcome::Completed));
        assert_eq!(result.state(), ExecutionState::Terminated);
        assert_eq!(s.state(), ExecutionState::Terminated);
    }
}
