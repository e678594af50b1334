use std::sync::Mutex;

use macroguard::engine::{ExecutionEvent, ExecutionObserver, ExecutionResult, ExecutionState};

/// Observer that keeps every event it sees.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ExecutionEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ExecutionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<ExecutionState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ExecutionEvent::StateChanged { state, .. } => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn progress_indices(&self) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ExecutionEvent::ProgressChanged {
                    operation_index, ..
                } => Some(operation_index),
                _ => None,
            })
            .collect()
    }

    /// `ExecutionCompleted` results.
    pub fn completed(&self) -> Vec<ExecutionResult> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ExecutionEvent::ExecutionCompleted(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    /// `ExecutionError` results.
    pub fn errors(&self) -> Vec<ExecutionResult> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ExecutionEvent::ExecutionError(r) => Some(r),
                _ => None,
            })
            .collect()
    }
}

impl ExecutionObserver for RecordingObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Observer that panics on every event.
#[derive(Debug, Default)]
pub struct PanickingObserver;

impl ExecutionObserver for PanickingObserver {
    fn on_event(&self, _event: &ExecutionEvent) {
        panic!("observer failure");
    }
}
