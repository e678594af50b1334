// src/engine/service.rs

//! Public orchestrator: session registry plus Start / Pause / Resume /
//! Stop / Step / Terminate.
//!
//! The registry holds at most one active session per script identity.
//! Control methods never wait on a worker; they flip session state and wake
//! the pause gate, so they stay responsive while a worker is parked.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::events::{ChannelObserver, ExecutionEvent, ExecutionObserver, Observers};
use crate::engine::options::{EngineSettings, ExecutionOptions};
use crate::engine::outcome::{
    AbortReason, ExecutionFailure, ExecutionOutcome, ExecutionResult,
};
use crate::engine::script::{Script, ScriptId};
use crate::engine::session::ExecutionSession;
use crate::engine::state::{ControlCommand, ExecutionState};
use crate::engine::stats::{ExecutionStatistics, estimate_remaining};
use crate::engine::worker::{WorkerContext, run_session};
use crate::errors::{EngineError, Result};
use crate::input::{InputBackend, InputBackendProvider, SimulatedBackendProvider};
use crate::interpreter::{InterpreterFactory, LuaInterpreterFactory};
use crate::safety::{KillSwitchRecord, SafetyService};
use crate::sync::lock;

/// A registered, not yet finished run.
struct ActiveRun {
    session: Arc<ExecutionSession>,
    backend: Arc<dyn InputBackend>,
}

struct ServiceInner {
    safety: Arc<SafetyService>,
    backends: Arc<dyn InputBackendProvider>,
    interpreters: Arc<dyn InterpreterFactory>,
    settings: EngineSettings,
    registry: Mutex<HashMap<ScriptId, ActiveRun>>,
    /// Operation count of the last completed run per script.
    last_totals: Mutex<HashMap<ScriptId, u64>>,
    observers: Arc<Observers>,
}

impl ServiceInner {
    fn lookup(&self, id: &ScriptId) -> Option<Arc<ExecutionSession>> {
        lock(&self.registry).get(id).map(|run| Arc::clone(&run.session))
    }

    fn require(&self, id: &ScriptId) -> Result<Arc<ExecutionSession>> {
        self.lookup(id)
            .ok_or_else(|| EngineError::NoActiveSession(id.to_string()))
    }

    /// Kill-switch listener: abort every active session and release inputs.
    fn on_kill_switch(&self, record: &KillSwitchRecord) {
        let runs: Vec<(Arc<ExecutionSession>, Arc<dyn InputBackend>)> = lock(&self.registry)
            .values()
            .map(|run| (Arc::clone(&run.session), Arc::clone(&run.backend)))
            .collect();

        for (session, backend) in runs {
            session.abort(AbortReason::KillSwitch {
                reason: record.reason.clone(),
            });
            release_all(backend.as_ref(), session.script_id());
        }
    }

    /// Deregister a finished session and publish its terminal state and
    /// result.
    ///
    /// The registry entry is removed before anything is published, so an
    /// observer reacting to the terminal state can start the script again.
    fn complete(&self, result: &ExecutionResult) {
        lock(&self.registry).remove(&result.script);

        if result.is_success() {
            lock(&self.last_totals).insert(result.script.clone(), result.operations);
        }

        self.observers.publish(ExecutionEvent::StateChanged {
            script: result.script.clone(),
            state: result.state(),
        });
        let event = match result.outcome {
            ExecutionOutcome::Failed(_) => ExecutionEvent::ExecutionError(result.clone()),
            _ => ExecutionEvent::ExecutionCompleted(result.clone()),
        };
        self.observers.publish(event);
        self.observers.publish(ExecutionEvent::StateChanged {
            script: result.script.clone(),
            state: ExecutionState::Idle,
        });
    }
}

fn release_all(backend: &dyn InputBackend, script: &ScriptId) {
    if let Err(e) = backend.release_all() {
        warn!(%script, error = %e, "failed to release held inputs");
    }
}

/// Handle to a started run.
#[derive(Debug)]
pub struct SessionHandle {
    script: ScriptId,
    join: JoinHandle<ExecutionResult>,
}

impl SessionHandle {
    pub fn script(&self) -> &ScriptId {
        &self.script
    }

    /// Wait for the run to reach a terminal state and be reported.
    pub async fn wait(self) -> Result<ExecutionResult> {
        self.join
            .await
            .map_err(|e| EngineError::Worker(e.to_string()))
    }
}

pub struct ExecutionService {
    inner: Arc<ServiceInner>,
}

impl std::fmt::Debug for ExecutionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionService")
            .field("active", &self.active_scripts())
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}

impl ExecutionService {
    pub fn new(
        safety: Arc<SafetyService>,
        backends: Arc<dyn InputBackendProvider>,
        interpreters: Arc<dyn InterpreterFactory>,
        settings: EngineSettings,
    ) -> Self {
        let inner = Arc::new(ServiceInner {
            safety: Arc::clone(&safety),
            backends,
            interpreters,
            settings,
            registry: Mutex::new(HashMap::new()),
            last_totals: Mutex::new(HashMap::new()),
            observers: Arc::new(Observers::default()),
        });

        let weak: Weak<ServiceInner> = Arc::downgrade(&inner);
        safety.subscribe_kill_switch(Arc::new(move |record: &KillSwitchRecord| {
            if let Some(inner) = weak.upgrade() {
                inner.on_kill_switch(record);
            }
        }));

        Self { inner }
    }

    /// Simulated input backend and the Lua interpreter.
    pub fn with_defaults(safety: Arc<SafetyService>, settings: EngineSettings) -> Self {
        Self::new(
            safety,
            Arc::new(SimulatedBackendProvider),
            Arc::new(LuaInterpreterFactory),
            settings,
        )
    }

    pub fn safety(&self) -> &Arc<SafetyService> {
        &self.inner.safety
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.inner.settings
    }

    pub fn subscribe(&self, observer: Arc<dyn ExecutionObserver>) {
        self.inner.observers.subscribe(observer);
    }

    /// Receive every event published from now on.
    pub fn events(&self) -> mpsc::UnboundedReceiver<ExecutionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribe(Arc::new(ChannelObserver::new(tx)));
        rx
    }

    /// Start a run of `script`.
    ///
    /// Fails with `ConcurrencyConflict` if the same script identity is
    /// already active; other scripts may run concurrently.
    pub async fn start_execution(
        &self,
        script: impl Into<Arc<Script>>,
        options: ExecutionOptions,
    ) -> Result<SessionHandle> {
        let script: Arc<Script> = script.into();
        options.validate()?;

        if self.inner.safety.is_kill_switch_active() {
            let reason = self
                .inner
                .safety
                .kill_switch_record()
                .map(|r| r.reason)
                .unwrap_or_default();
            return Err(EngineError::KillSwitchActive(reason));
        }

        let backend = self.inner.backends.backend_for(options.input_mode)?;
        let expected_total = lock(&self.inner.last_totals).get(&script.id).copied();

        let session = {
            let mut registry = lock(&self.inner.registry);
            if registry.contains_key(&script.id) {
                return Err(EngineError::ConcurrencyConflict {
                    script: script.name.clone(),
                });
            }

            let session = Arc::new(ExecutionSession::new(
                Arc::clone(&script),
                options,
                self.inner.settings.checkpoint_slice,
                expected_total,
                Arc::clone(&self.inner.observers),
            ));
            registry.insert(
                script.id.clone(),
                ActiveRun {
                    session: Arc::clone(&session),
                    backend: Arc::clone(&backend),
                },
            );
            session
        };
        session.begin();

        let ctx = WorkerContext {
            safety: Arc::clone(&self.inner.safety),
            backend: Arc::clone(&backend),
            interpreters: Arc::clone(&self.inner.interpreters),
            settings: self.inner.settings.clone(),
        };
        let inner = Arc::clone(&self.inner);
        let worker_session = Arc::clone(&session);

        let join = tokio::task::spawn_blocking(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                run_session(Arc::clone(&worker_session), ctx)
            }))
            .unwrap_or_else(|_| {
                error!(script = %worker_session.script().name, "execution worker panicked");
                // The bridge's held-input set died with the worker.
                release_all(backend.as_ref(), worker_session.script_id());
                worker_session.finish(Err(ExecutionFailure::Interpreter(
                    "execution worker panicked".to_string(),
                )))
            });
            inner.complete(&result);
            result
        });

        info!(script = %script.name, id = %script.id, "execution started");
        Ok(SessionHandle {
            script: script.id.clone(),
            join,
        })
    }

    pub fn pause_execution(&self, id: &ScriptId) -> Result<bool> {
        self.control(id, ControlCommand::Pause)
    }

    pub fn resume_execution(&self, id: &ScriptId) -> Result<bool> {
        self.control(id, ControlCommand::Resume)
    }

    pub fn step_execution(&self, id: &ScriptId) -> Result<bool> {
        self.control(id, ControlCommand::Step)
    }

    pub fn stop_execution(&self, id: &ScriptId) -> Result<bool> {
        self.control(id, ControlCommand::Stop)
    }

    /// Force the run to end `Terminated` and release held inputs now.
    pub fn terminate_execution(&self, id: &ScriptId) -> Result<()> {
        let backend = {
            let registry = lock(&self.inner.registry);
            let run = registry
                .get(id)
                .ok_or_else(|| EngineError::NoActiveSession(id.to_string()))?;
            run.session.control(ControlCommand::Terminate)?;
            Arc::clone(&run.backend)
        };
        release_all(backend.as_ref(), id);
        Ok(())
    }

    /// Dispatch any command by value (used by the CLI's stdin loop).
    pub fn control(&self, id: &ScriptId, command: ControlCommand) -> Result<bool> {
        if command == ControlCommand::Terminate {
            return self.terminate_execution(id).map(|()| true);
        }
        let session = self.inner.require(id)?;
        let applied = session.control(command)?;
        debug!(script = %id, ?command, applied, "control request handled");
        Ok(applied)
    }

    /// `Idle` when the script has no active session.
    pub fn state(&self, id: &ScriptId) -> ExecutionState {
        self.inner
            .lookup(id)
            .map(|s| s.state())
            .unwrap_or(ExecutionState::Idle)
    }

    pub fn statistics(&self, id: &ScriptId) -> ExecutionStatistics {
        self.inner
            .lookup(id)
            .map(|s| s.statistics())
            .unwrap_or_else(|| ExecutionStatistics::idle(id.clone()))
    }

    pub fn estimated_remaining_time(&self, id: &ScriptId) -> Option<Duration> {
        let session = self.inner.lookup(id)?;
        estimate_remaining(
            session.operation_index(),
            session.expected_total(),
            session.active_elapsed(),
        )
    }

    /// The "can-execute" gate for UI commands.
    pub fn is_available(&self, id: &ScriptId, command: ControlCommand) -> bool {
        self.inner
            .lookup(id)
            .map(|s| {
                command.is_available(s.mode(), s.state())
                    && (command == ControlCommand::Terminate || s.abort_reason().is_none())
            })
            .unwrap_or(false)
    }

    pub fn active_scripts(&self) -> Vec<ScriptId> {
        let mut ids: Vec<ScriptId> = lock(&self.inner.registry).keys().cloned().collect();
        ids.sort();
        ids
    }
}
