// src/engine/events.rs

//! Notifications published by sessions and the service.
//!
//! Events are delivered synchronously on the thread that produced them
//! (usually a session worker). Each observer call is isolated: a panicking
//! observer is logged and skipped, it never reaches the worker.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::engine::outcome::ExecutionResult;
use crate::engine::script::ScriptId;
use crate::engine::state::ExecutionState;
use crate::sync::{call_isolated, lock};

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    StateChanged {
        script: ScriptId,
        state: ExecutionState,
    },
    ProgressChanged {
        script: ScriptId,
        operation_index: u64,
        /// Best-effort total (operation count of the previous run).
        total: Option<u64>,
        percent: Option<f64>,
    },
    /// The run ended `Failed`.
    ExecutionError(ExecutionResult),
    /// The run ended `Completed` or `Terminated`.
    ExecutionCompleted(ExecutionResult),
}

impl ExecutionEvent {
    pub fn script(&self) -> &ScriptId {
        match self {
            ExecutionEvent::StateChanged { script, .. }
            | ExecutionEvent::ProgressChanged { script, .. } => script,
            ExecutionEvent::ExecutionError(result) | ExecutionEvent::ExecutionCompleted(result) => {
                &result.script
            }
        }
    }
}

/// Subscriber interface. Implementations must marshal to their own context
/// and return quickly.
pub trait ExecutionObserver: Send + Sync {
    fn on_event(&self, event: &ExecutionEvent);
}

/// Forwards events into a Tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
        Self { tx }
    }
}

impl ExecutionObserver for ChannelObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.tx.send(event.clone());
    }
}

/// Observer list shared by the service and its sessions.
#[derive(Default)]
pub struct Observers {
    inner: Mutex<Vec<Arc<dyn ExecutionObserver>>>,
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("count", &lock(&self.inner).len())
            .finish()
    }
}

impl Observers {
    pub fn subscribe(&self, observer: Arc<dyn ExecutionObserver>) {
        lock(&self.inner).push(observer);
    }

    pub fn publish(&self, event: ExecutionEvent) {
        // Snapshot so observers may subscribe from inside a callback.
        let observers: Vec<Arc<dyn ExecutionObserver>> = lock(&self.inner).clone();
        for observer in observers {
            call_isolated("execution observer", || observer.on_event(&event));
        }
    }
}
