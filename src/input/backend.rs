// src/input/backend.rs

//! Pluggable input backend abstraction.
//!
//! The host API bridge talks to an `InputBackend` instead of any concrete
//! injection mechanism. Real OS injection and the hardware relay live
//! outside this crate; tests provide a recording backend.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::types::InputMode;

/// Absolute screen coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl FromStr for MouseButton {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" | "1" => Ok(MouseButton::Left),
            "right" | "2" => Ok(MouseButton::Right),
            "middle" | "3" => Ok(MouseButton::Middle),
            other => Err(format!(
                "unknown mouse button '{other}' (expected left, right, middle or 1-3)"
            )),
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        };
        f.write_str(s)
    }
}

/// Which half of a click to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonPhase {
    Down,
    Up,
    /// Down immediately followed by up.
    Click,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{backend} backend failed: {message}")]
pub struct BackendError {
    pub backend: String,
    pub message: String,
}

impl BackendError {
    pub fn new(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

pub type BackendResult = std::result::Result<(), BackendError>;

/// Capability that turns an operation into a real mouse / keyboard effect.
///
/// All calls are synchronous and made from the session's worker thread,
/// except [`InputBackend::release_all`], which may also be called from the
/// thread that requested Terminate.
pub trait InputBackend: Send + Sync {
    fn name(&self) -> &str;

    fn move_to(&self, point: Point) -> BackendResult;

    fn click(&self, button: MouseButton, phase: ButtonPhase) -> BackendResult;

    fn press_key(&self, key: &str, is_down: bool) -> BackendResult;

    fn type_text(&self, text: &str) -> BackendResult;

    /// Block for `duration`. Waits are issued in checkpoint-sized slices.
    fn wait(&self, duration: Duration) -> BackendResult {
        std::thread::sleep(duration);
        Ok(())
    }

    /// Release every button and key the backend believes is held.
    fn release_all(&self) -> BackendResult;
}

/// Selects the backend for a session from its [`InputMode`].
pub trait InputBackendProvider: Send + Sync {
    fn backend_for(&self, mode: InputMode) -> std::result::Result<Arc<dyn InputBackend>, BackendError>;
}

/// Provider that hands out the same backend for every mode.
pub struct FixedBackendProvider {
    backend: Arc<dyn InputBackend>,
}

impl FixedBackendProvider {
    pub fn new(backend: Arc<dyn InputBackend>) -> Self {
        Self { backend }
    }
}

impl InputBackendProvider for FixedBackendProvider {
    fn backend_for(&self, _mode: InputMode) -> std::result::Result<Arc<dyn InputBackend>, BackendError> {
        Ok(Arc::clone(&self.backend))
    }
}
