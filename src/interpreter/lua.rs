// src/interpreter/lua.rs

//! Lua 5.4 adapter built on `mlua`.
//!
//! The state is sandboxed: only the base, table, string, math, utf8 and
//! coroutine libraries are loaded, so scripts have no file or OS access.
//! `print` is routed to tracing.

use mlua::{Function, HookTriggers, Lua, LuaOptions, StdLib, Value, Variadic, VmState};
use tracing::info;

use crate::interpreter::{
    HostError, HostFunction, HostValue, InterpreterError, InterpreterFactory, InterruptCheck,
    RunOutcome, ScriptInterpreter,
};
use crate::logging::SCRIPT_LOG_TARGET;

/// How often (in VM instructions) the interrupt check runs.
pub const INTERRUPT_INSTRUCTION_INTERVAL: u32 = 10_000;

pub struct LuaInterpreter {
    lua: Lua,
    chunk: Option<Function>,
}

impl std::fmt::Debug for LuaInterpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuaInterpreter")
            .field("loaded", &self.chunk.is_some())
            .finish_non_exhaustive()
    }
}

impl LuaInterpreter {
    pub fn new() -> Result<Self, InterpreterError> {
        let libs = StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8 | StdLib::COROUTINE;
        let lua = Lua::new_with(libs, LuaOptions::default())
            .map_err(|e| InterpreterError::Init(e.to_string()))?;

        let print = lua
            .create_function(|_, args: Variadic<Value>| {
                let line = args.iter().map(display_value).collect::<Vec<_>>().join("\t");
                info!(target: SCRIPT_LOG_TARGET, "{line}");
                Ok(())
            })
            .map_err(|e| InterpreterError::Init(e.to_string()))?;
        lua.globals()
            .set("print", print)
            .map_err(|e| InterpreterError::Init(e.to_string()))?;

        Ok(Self { lua, chunk: None })
    }

    /// Compile `source` without running it (used by `--dry-run`).
    pub fn check_syntax(source: &str, chunk_name: &str) -> Result<(), InterpreterError> {
        let mut interpreter = Self::new()?;
        interpreter.load(source, chunk_name)
    }
}

impl ScriptInterpreter for LuaInterpreter {
    fn load(&mut self, source: &str, chunk_name: &str) -> Result<(), InterpreterError> {
        let function = self
            .lua
            .load(source)
            .set_name(format!("={chunk_name}"))
            .into_function()
            .map_err(|e| InterpreterError::Syntax(e.to_string()))?;
        self.chunk = Some(function);
        Ok(())
    }

    fn register_function(
        &mut self,
        name: &str,
        callback: HostFunction,
    ) -> Result<(), InterpreterError> {
        let registration_error = |e: mlua::Error| InterpreterError::Registration {
            name: name.to_string(),
            message: e.to_string(),
        };

        let function = self
            .lua
            .create_function(move |_, args: Variadic<Value>| {
                let values: Vec<HostValue> = args.iter().map(host_value).collect();
                callback(&values).map_err(mlua::Error::external)
            })
            .map_err(registration_error)?;

        self.lua
            .globals()
            .set(name, function)
            .map_err(registration_error)
    }

    fn set_interrupt(&mut self, check: InterruptCheck) {
        let triggers = HookTriggers::new().every_nth_instruction(INTERRUPT_INSTRUCTION_INTERVAL);
        self.lua.set_hook(triggers, move |_lua, _debug| match check() {
            Some(err) => Err(mlua::Error::external(err)),
            None => Ok(VmState::Continue),
        });
    }

    fn run(&mut self) -> RunOutcome {
        let Some(chunk) = self.chunk.take() else {
            return RunOutcome::Failed("no script loaded".to_string());
        };

        match chunk.call::<()>(()) {
            Ok(()) => RunOutcome::Completed,
            Err(err) => match find_host_error(&err) {
                Some(HostError::Abort(reason)) => RunOutcome::Aborted(reason.clone()),
                _ => RunOutcome::Failed(err.to_string()),
            },
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LuaInterpreterFactory;

impl InterpreterFactory for LuaInterpreterFactory {
    fn create(&self) -> Result<Box<dyn ScriptInterpreter>, InterpreterError> {
        Ok(Box::new(LuaInterpreter::new()?))
    }
}

/// Walk the mlua error chain looking for the error a host callback raised.
fn find_host_error(err: &mlua::Error) -> Option<&HostError> {
    match err {
        mlua::Error::CallbackError { cause, .. } => find_host_error(cause),
        mlua::Error::WithContext { cause, .. } => find_host_error(cause),
        mlua::Error::ExternalError(inner) => inner.downcast_ref::<HostError>(),
        _ => None,
    }
}

fn host_value(value: &Value) -> HostValue {
    match value {
        Value::Nil => HostValue::Nil,
        Value::Boolean(b) => HostValue::Boolean(*b),
        Value::Integer(i) => HostValue::Integer(*i),
        Value::Number(n) => HostValue::Number(*n),
        Value::String(s) => HostValue::String(s.to_string_lossy().to_string()),
        other => HostValue::Other(other.type_name()),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.to_string_lossy().to_string(),
        other => other.type_name().to_string(),
    }
}
