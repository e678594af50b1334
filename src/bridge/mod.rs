// src/bridge/mod.rs

//! Host API bridge: the functions scripts can call.
//!
//! Every call runs the checkpoint routine on the interpreter's worker thread:
//!
//! 1. sticky abort / kill switch
//! 2. execution limits
//! 3. pause gate (and step grants)
//! 4. authorization of dangerous categories
//! 5. scaled, sliced waits with steps 1-3 re-checked between slices
//! 6. dispatch to the input backend
//! 7. operation count + progress notification
//!
//! A failed check is returned as [`HostError::Abort`]; the interpreter
//! adapter unwinds the script and the session settles the final state from
//! the recorded abort reason.

mod args;

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::engine::{AbortReason, EngineSettings, ExecutionFailure, ExecutionSession};
use crate::input::{BackendResult, ButtonPhase, InputBackend, MouseButton, Point};
use crate::interpreter::{
    HostError, HostFunction, HostValue, InterpreterError, InterruptCheck, ScriptInterpreter,
};
use crate::safety::{OperationCategory, SafetyService};
use crate::sync::lock;

/// Names of the host functions registered with every interpreter.
pub const HOST_FUNCTIONS: [&str; 9] = [
    "move",
    "mouse_click",
    "mouse_down",
    "mouse_release",
    "type_text",
    "key_down",
    "key_release",
    "sleep",
    "msleep",
];

/// A decoded host call.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Move(Point),
    Click(MouseButton, ButtonPhase),
    Key { key: String, down: bool },
    TypeText(String),
    /// Requested (unscaled) wait.
    Sleep(Duration),
}

impl HostCall {
    /// Decode the arguments of host function `name`.
    pub fn parse(name: &str, values: &[HostValue]) -> Result<Self, HostError> {
        let call = match name {
            "move" => HostCall::Move(args::point(values, name)?),
            "mouse_click" => HostCall::Click(args::button(values, 0, name)?, ButtonPhase::Click),
            "mouse_down" => HostCall::Click(args::button(values, 0, name)?, ButtonPhase::Down),
            "mouse_release" => HostCall::Click(args::button(values, 0, name)?, ButtonPhase::Up),
            "type_text" => HostCall::TypeText(args::string(values, 0, name)?),
            "key_down" => HostCall::Key {
                key: args::key(values, 0, name)?,
                down: true,
            },
            "key_release" => HostCall::Key {
                key: args::key(values, 0, name)?,
                down: false,
            },
            "sleep" => HostCall::Sleep(args::duration(values, 0, name, 1.0)?),
            "msleep" => HostCall::Sleep(args::duration(values, 0, name, 1000.0)?),
            other => return Err(HostError::Script(format!("unknown host function '{other}'"))),
        };
        Ok(call)
    }

    /// Whether the call produces input (and so honours `pre_delay`).
    pub fn produces_input(&self) -> bool {
        !matches!(self, HostCall::Sleep(_))
    }
}

/// Buttons and keys pressed through the bridge and not released yet.
#[derive(Debug, Default)]
struct HeldInputs {
    buttons: BTreeSet<MouseButton>,
    keys: BTreeSet<String>,
}

/// Bridge between one session's interpreter and the rest of the engine.
pub struct HostApi {
    session: Arc<ExecutionSession>,
    safety: Arc<SafetyService>,
    backend: Arc<dyn InputBackend>,
    settings: EngineSettings,
    /// Categories already cleared during this run.
    authorized: Mutex<HashSet<OperationCategory>>,
    held: Mutex<HeldInputs>,
}

impl std::fmt::Debug for HostApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostApi")
            .field("script", self.session.script_id())
            .field("backend", &self.backend.name())
            .finish_non_exhaustive()
    }
}

impl HostApi {
    pub fn new(
        session: Arc<ExecutionSession>,
        safety: Arc<SafetyService>,
        backend: Arc<dyn InputBackend>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            session,
            safety,
            backend,
            settings,
            authorized: Mutex::new(HashSet::new()),
            held: Mutex::new(HeldInputs::default()),
        }
    }

    /// Register every host function and the interrupt check with `interpreter`.
    pub fn install(
        self: &Arc<Self>,
        interpreter: &mut dyn ScriptInterpreter,
    ) -> Result<(), InterpreterError> {
        for name in HOST_FUNCTIONS {
            let api = Arc::clone(self);
            let callback: HostFunction = Arc::new(move |values: &[HostValue]| {
                let call = HostCall::parse(name, values)?;
                api.invoke(name, call)
            });
            interpreter.register_function(name, callback)?;
        }

        let api = Arc::clone(self);
        let check: InterruptCheck = Arc::new(move || api.interrupt_requested());
        interpreter.set_interrupt(check);
        Ok(())
    }

    /// Run one host call through the full checkpoint routine.
    pub fn invoke(&self, name: &str, call: HostCall) -> Result<(), HostError> {
        let mut holds_step = false;
        self.checkpoint(&mut holds_step)?;

        for category in self.required_categories(&call) {
            self.authorize(category)?;
        }

        let options = self.session.options();
        let requested = match &call {
            HostCall::Sleep(requested) => *requested,
            call if call.produces_input() => options.pre_delay,
            _ => Duration::ZERO,
        };
        self.wait_sliced(name, options.scaled(requested), &mut holds_step)?;

        trace!(script = %self.session.script().name, function = name, ?call, "dispatching host call");
        self.dispatch(&call)
            .map_err(|e| {
                self.abort(AbortReason::Failure(ExecutionFailure::Backend {
                    operation: name.to_string(),
                    message: e.to_string(),
                }))
            })?;

        self.session.record_operation(holds_step);
        Ok(())
    }

    /// Steps 1-3 of the checkpoint. Also used between wait slices.
    fn checkpoint(&self, holds_step: &mut bool) -> Result<(), HostError> {
        if let Some(reason) = self.session.abort_reason() {
            return Err(HostError::Abort(reason));
        }

        if let Some(reason) = self.kill_switch_reason() {
            return Err(self.abort(reason));
        }

        if let Some(violation) = self.safety.check_execution_limits(
            self.session.operation_index(),
            self.session.active_elapsed(),
            &self.settings.limits,
        ) {
            warn!(script = %self.session.script().name, %violation, "execution limit exceeded");
            return Err(self.abort(AbortReason::Failure(ExecutionFailure::LimitExceeded(
                violation,
            ))));
        }

        let safety = &self.safety;
        self.session
            .pass_gate(holds_step, || kill_switch_abort(safety))
            .map_err(HostError::Abort)
    }

    fn required_categories(&self, call: &HostCall) -> Vec<OperationCategory> {
        let mut categories = Vec::new();
        if matches!(call, HostCall::TypeText(_)) {
            categories.push(OperationCategory::TextInjection);
        }
        if self.session.options().speed_multiplier > self.settings.rapid_speed_threshold {
            categories.push(OperationCategory::RapidInput);
        }
        categories
    }

    fn authorize(&self, category: OperationCategory) -> Result<(), HostError> {
        if lock(&self.authorized).contains(&category) {
            return Ok(());
        }

        let context = self.session.script().name.clone();
        if self.safety.request_authorization(category, &context) {
            lock(&self.authorized).insert(category);
            Ok(())
        } else {
            Err(self.abort(AbortReason::Failure(ExecutionFailure::AuthorizationDenied(
                category,
            ))))
        }
    }

    /// Sleep `total` in slices of at most `checkpoint_slice`, re-checking
    /// the kill switch, limits and pause gate after each slice.
    fn wait_sliced(&self, name: &str, total: Duration, holds_step: &mut bool) -> Result<(), HostError> {
        let slice = self.settings.checkpoint_slice;
        let mut remaining = total;

        while !remaining.is_zero() {
            let chunk = remaining.min(slice);
            self.backend.wait(chunk).map_err(|e| {
                self.abort(AbortReason::Failure(ExecutionFailure::Backend {
                    operation: name.to_string(),
                    message: e.to_string(),
                }))
            })?;
            remaining -= chunk;
            self.checkpoint(holds_step)?;
        }
        Ok(())
    }

    fn dispatch(&self, call: &HostCall) -> BackendResult {
        match call {
            HostCall::Move(point) => self.backend.move_to(*point),
            HostCall::Click(button, phase) => {
                self.backend.click(*button, *phase)?;
                let mut held = lock(&self.held);
                match phase {
                    ButtonPhase::Down => {
                        held.buttons.insert(*button);
                    }
                    ButtonPhase::Up => {
                        held.buttons.remove(button);
                    }
                    ButtonPhase::Click => {}
                }
                Ok(())
            }
            HostCall::Key { key, down } => {
                self.backend.press_key(key, *down)?;
                let mut held = lock(&self.held);
                if *down {
                    held.keys.insert(key.clone());
                } else {
                    held.keys.remove(key);
                }
                Ok(())
            }
            HostCall::TypeText(text) => self.backend.type_text(text),
            // The wait already happened in slices.
            HostCall::Sleep(_) => Ok(()),
        }
    }

    /// Release everything the script pressed and did not release.
    ///
    /// Called once the run has ended, whatever the outcome.
    pub fn release_held(&self) {
        let held = std::mem::take(&mut *lock(&self.held));

        for button in held.buttons {
            if let Err(e) = self.backend.click(button, ButtonPhase::Up) {
                warn!(%button, error = %e, "failed to release held mouse button");
            }
        }
        for key in held.keys {
            if let Err(e) = self.backend.press_key(&key, false) {
                warn!(key, error = %e, "failed to release held key");
            }
        }
        debug!(script = %self.session.script().name, "held inputs released");
    }

    /// Polled by the interpreter between VM instructions.
    ///
    /// Covers the sticky abort, the kill switch and Stop/Terminate requests
    /// so scripts spinning in pure Lua still unwind. Pause is only honoured
    /// at host calls.
    fn interrupt_requested(&self) -> Option<HostError> {
        if let Some(reason) = self.session.abort_reason() {
            return Some(HostError::Abort(reason));
        }
        self.kill_switch_reason().map(|reason| self.abort(reason))
    }

    fn kill_switch_reason(&self) -> Option<AbortReason> {
        kill_switch_abort(&self.safety)
    }

    /// Record `reason` on the session and build the unwinding error from
    /// whichever reason ends up recorded.
    fn abort(&self, reason: AbortReason) -> HostError {
        HostError::Abort(self.session.abort(reason))
    }
}

fn kill_switch_abort(safety: &SafetyService) -> Option<AbortReason> {
    if !safety.is_kill_switch_active() {
        return None;
    }
    let reason = safety
        .kill_switch_record()
        .map(|record| record.reason)
        .unwrap_or_else(|| "kill switch".to_string());
    Some(AbortReason::KillSwitch { reason })
}
