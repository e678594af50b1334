use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use macroguard::input::{
    BackendError, BackendResult, ButtonPhase, InputBackend, MouseButton, Point,
};

/// One effect the backend was asked to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum InputCall {
    Move(Point),
    Click(MouseButton, ButtonPhase),
    Key { key: String, down: bool },
    Text(String),
    ReleaseAll,
}

/// Backend that:
/// - records every effect (waits are only summed, not recorded)
/// - really sleeps in `wait`, so timing tests see wall-clock time
/// - can be told to fail on the Nth effect call, or to panic in `wait`
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<InputCall>>,
    waited: Mutex<Duration>,
    effects: AtomicUsize,
    fail_on: Option<usize>,
    panic_on_wait: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`th (1-based) move/click/key/text call.
    pub fn failing_on(n: usize) -> Self {
        Self {
            fail_on: Some(n),
            ..Self::default()
        }
    }

    /// Panic as soon as the engine asks for a wait.
    pub fn panicking_on_wait() -> Self {
        Self {
            panic_on_wait: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<InputCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn moves(&self) -> Vec<Point> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                InputCall::Move(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn total_waited(&self) -> Duration {
        *self.waited.lock().unwrap()
    }

    fn effect(&self, call: InputCall) -> BackendResult {
        let n = self.effects.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on == Some(n) {
            return Err(BackendError::new("recording", format!("injected failure on call {n}")));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl InputBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn move_to(&self, point: Point) -> BackendResult {
        self.effect(InputCall::Move(point))
    }

    fn click(&self, button: MouseButton, phase: ButtonPhase) -> BackendResult {
        self.effect(InputCall::Click(button, phase))
    }

    fn press_key(&self, key: &str, is_down: bool) -> BackendResult {
        self.effect(InputCall::Key {
            key: key.to_string(),
            down: is_down,
        })
    }

    fn type_text(&self, text: &str) -> BackendResult {
        self.effect(InputCall::Text(text.to_string()))
    }

    fn wait(&self, duration: Duration) -> BackendResult {
        if self.panic_on_wait {
            panic!("recording backend told to panic in wait");
        }
        std::thread::sleep(duration);
        *self.waited.lock().unwrap() += duration;
        Ok(())
    }

    fn release_all(&self) -> BackendResult {
        self.calls.lock().unwrap().push(InputCall::ReleaseAll);
        Ok(())
    }
}
