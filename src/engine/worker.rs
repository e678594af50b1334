// src/engine/worker.rs

//! Body of a session's worker thread.
//!
//! Runs on a Tokio blocking-pool thread: the interpreter is synchronous and
//! not reentrant, so it is created, used and dropped on this thread only.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::bridge::HostApi;
use crate::engine::options::EngineSettings;
use crate::engine::outcome::{ExecutionFailure, ExecutionResult};
use crate::engine::session::ExecutionSession;
use crate::input::InputBackend;
use crate::interpreter::{InterpreterFactory, RunOutcome};
use crate::safety::SafetyService;

/// Everything a worker needs besides the session itself.
pub(crate) struct WorkerContext {
    pub safety: Arc<SafetyService>,
    pub backend: Arc<dyn InputBackend>,
    pub interpreters: Arc<dyn InterpreterFactory>,
    pub settings: EngineSettings,
}

/// Execute the session's script to a terminal state.
pub(crate) fn run_session(session: Arc<ExecutionSession>, ctx: WorkerContext) -> ExecutionResult {
    let script = Arc::clone(session.script());
    info!(
        script = %script.name,
        backend = ctx.backend.name(),
        mode = ?session.mode(),
        trigger = ?session.options().trigger_source,
        "starting script"
    );

    let bridge = Arc::new(HostApi::new(
        Arc::clone(&session),
        ctx.safety,
        ctx.backend,
        ctx.settings,
    ));

    let outcome = interpret(&bridge, ctx.interpreters.as_ref(), &script.source, &script.name);
    if let Err(failure) = &outcome {
        error!(script = %script.name, %failure, "script could not be started");
    }

    bridge.release_held();
    session.finish(outcome)
}

fn interpret(
    bridge: &Arc<HostApi>,
    interpreters: &dyn InterpreterFactory,
    source: &str,
    chunk_name: &str,
) -> Result<RunOutcome, ExecutionFailure> {
    let to_failure = |e: crate::interpreter::InterpreterError| ExecutionFailure::Interpreter(e.to_string());

    let mut interpreter = interpreters.create().map_err(to_failure)?;
    bridge.install(interpreter.as_mut()).map_err(to_failure)?;
    interpreter.load(source, chunk_name).map_err(to_failure)?;

    debug!(script = chunk_name, "interpreter ready; running");
    Ok(interpreter.run())
}
