// src/input/simulated.rs

//! Backend that keeps a virtual cursor / held-input model and logs every
//! effect instead of touching the OS.
//!
//! Used by the CLI (actual injection backends are external) and as the
//! default provider of [`crate::engine::ExecutionService::with_defaults`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info};

use crate::input::backend::{
    BackendError, BackendResult, ButtonPhase, InputBackend, InputBackendProvider, MouseButton,
    Point,
};
use crate::sync::lock;
use crate::types::InputMode;

#[derive(Debug, Default)]
struct VirtualDevice {
    cursor: Point,
    buttons: HashSet<MouseButton>,
    keys: HashSet<String>,
    typed_chars: usize,
}

#[derive(Debug)]
pub struct SimulatedBackend {
    label: String,
    device: Mutex<VirtualDevice>,
}

impl SimulatedBackend {
    pub fn new(mode: InputMode) -> Self {
        Self {
            label: format!("simulated-{mode}"),
            device: Mutex::new(VirtualDevice::default()),
        }
    }

    pub fn cursor(&self) -> Point {
        lock(&self.device).cursor
    }

    pub fn held_buttons(&self) -> Vec<MouseButton> {
        lock(&self.device).buttons.iter().copied().collect()
    }

    pub fn held_keys(&self) -> Vec<String> {
        lock(&self.device).keys.iter().cloned().collect()
    }
}

impl InputBackend for SimulatedBackend {
    fn name(&self) -> &str {
        &self.label
    }

    fn move_to(&self, point: Point) -> BackendResult {
        lock(&self.device).cursor = point;
        info!(backend = %self.label, x = point.x, y = point.y, "move");
        Ok(())
    }

    fn click(&self, button: MouseButton, phase: ButtonPhase) -> BackendResult {
        let mut device = lock(&self.device);
        match phase {
            ButtonPhase::Down => {
                device.buttons.insert(button);
            }
            ButtonPhase::Up => {
                device.buttons.remove(&button);
            }
            ButtonPhase::Click => {}
        }
        info!(backend = %self.label, %button, ?phase, x = device.cursor.x, y = device.cursor.y, "mouse");
        Ok(())
    }

    fn press_key(&self, key: &str, is_down: bool) -> BackendResult {
        if key.trim().is_empty() {
            return Err(BackendError::new(&self.label, "empty key name"));
        }
        let mut device = lock(&self.device);
        if is_down {
            device.keys.insert(key.to_string());
        } else {
            device.keys.remove(key);
        }
        info!(backend = %self.label, key, down = is_down, "key");
        Ok(())
    }

    fn type_text(&self, text: &str) -> BackendResult {
        lock(&self.device).typed_chars += text.chars().count();
        info!(backend = %self.label, chars = text.chars().count(), "type text");
        Ok(())
    }

    fn wait(&self, duration: Duration) -> BackendResult {
        std::thread::sleep(duration);
        Ok(())
    }

    fn release_all(&self) -> BackendResult {
        let mut device = lock(&self.device);
        if !device.buttons.is_empty() || !device.keys.is_empty() {
            debug!(
                backend = %self.label,
                buttons = device.buttons.len(),
                keys = device.keys.len(),
                "releasing held inputs"
            );
        }
        device.buttons.clear();
        device.keys.clear();
        Ok(())
    }
}

/// Creates a fresh [`SimulatedBackend`] for each session.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedBackendProvider;

impl InputBackendProvider for SimulatedBackendProvider {
    fn backend_for(&self, mode: InputMode) -> Result<Arc<dyn InputBackend>, BackendError> {
        Ok(Arc::new(SimulatedBackend::new(mode)))
    }
}
