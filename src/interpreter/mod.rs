// src/interpreter/mod.rs

//! Embedded interpreter abstraction.
//!
//! The engine only needs to load a script, register host functions, install
//! an interrupt check and run the script to the end. Host callbacks run
//! synchronously on the caller's thread; returning
//! [`HostError::Abort`] from a callback (or from the interrupt check) must
//! unwind the whole script and surface as [`RunOutcome::Aborted`].
//!
//! [`lua`] is the mlua-backed implementation used in production.

pub mod lua;

use std::sync::Arc;

use thiserror::Error;

use crate::engine::AbortReason;

pub use lua::{LuaInterpreter, LuaInterpreterFactory};

/// Argument value passed from a script to a host function.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Nil,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
    /// Any other script value; carries the type name for diagnostics.
    Other(&'static str),
}

impl HostValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Nil => "nil",
            HostValue::Boolean(_) => "boolean",
            HostValue::Integer(_) => "integer",
            HostValue::Number(_) => "number",
            HostValue::String(_) => "string",
            HostValue::Other(name) => name,
        }
    }
}

/// Error raised by a host callback.
#[derive(Debug, Clone, Error)]
pub enum HostError {
    /// Unwind the script; the session decides the final state.
    #[error("execution aborted: {0}")]
    Abort(AbortReason),

    /// Ordinary script error (bad arguments and the like).
    #[error("{0}")]
    Script(String),
}

pub type HostFunction = Arc<dyn Fn(&[HostValue]) -> Result<(), HostError> + Send + Sync>;

/// Polled by the interpreter between VM instructions.
pub type InterruptCheck = Arc<dyn Fn() -> Option<HostError> + Send + Sync>;

/// How a run ended from the interpreter's point of view.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed,
    Aborted(AbortReason),
    /// Syntax or runtime error, with the interpreter's diagnostic.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpreterError {
    #[error("failed to initialise interpreter: {0}")]
    Init(String),

    #[error("script failed to compile: {0}")]
    Syntax(String),

    #[error("failed to register host function '{name}': {message}")]
    Registration { name: String, message: String },
}

pub trait ScriptInterpreter: Send {
    /// Compile `source`. `chunk_name` is used in diagnostics.
    fn load(&mut self, source: &str, chunk_name: &str) -> Result<(), InterpreterError>;

    fn register_function(
        &mut self,
        name: &str,
        callback: HostFunction,
    ) -> Result<(), InterpreterError>;

    fn set_interrupt(&mut self, check: InterruptCheck);

    /// Run the loaded script to completion or until aborted.
    fn run(&mut self) -> RunOutcome;
}

/// Creates one interpreter per session; interpreters are not reentrant.
pub trait InterpreterFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn ScriptInterpreter>, InterpreterError>;
}
