// src/safety/kill_switch.rs

//! Process-wide emergency stop.
//!
//! The flag itself is an `AtomicBool` so that every checkpoint in every
//! session can read it without taking a lock. The reason / timestamp of the
//! last activation and the listener list sit behind their own mutexes and
//! are only touched on activation, deactivation and subscription.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use tracing::{info, warn};

use crate::sync::{call_isolated, lock};

/// Reason and time of the most recent activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillSwitchRecord {
    pub reason: String,
    pub activated_at: SystemTime,
}

/// Callback invoked synchronously on activation.
pub type KillSwitchListener = Arc<dyn Fn(&KillSwitchRecord) + Send + Sync>;

#[derive(Default)]
pub struct KillSwitch {
    active: AtomicBool,
    record: Mutex<Option<KillSwitchRecord>>,
    listeners: Mutex<Vec<KillSwitchListener>>,
}

impl std::fmt::Debug for KillSwitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KillSwitch")
            .field("active", &self.is_active())
            .field("record", &self.record())
            .finish_non_exhaustive()
    }
}

impl KillSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock-free read used by every checkpoint.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn record(&self) -> Option<KillSwitchRecord> {
        lock(&self.record).clone()
    }

    /// Engage the kill switch.
    ///
    /// Returns `false` if it was already active; the original record is kept
    /// and listeners are not notified again.
    pub fn activate(&self, reason: impl Into<String>) -> bool {
        let record = {
            let mut guard = lock(&self.record);
            if self.active.load(Ordering::Acquire) {
                return false;
            }
            let record = KillSwitchRecord {
                reason: reason.into(),
                activated_at: SystemTime::now(),
            };
            *guard = Some(record.clone());
            self.active.store(true, Ordering::Release);
            record
        };

        warn!(reason = %record.reason, "kill switch activated");

        let listeners: Vec<KillSwitchListener> = lock(&self.listeners).clone();
        for listener in listeners {
            call_isolated("kill switch listener", || listener(&record));
        }

        true
    }

    /// Explicitly clear the kill switch. Returns `false` if it was not active.
    ///
    /// The last activation record is kept for diagnostics.
    pub fn deactivate(&self) -> bool {
        let _guard = lock(&self.record);
        let was_active = self.active.swap(false, Ordering::AcqRel);
        if was_active {
            info!("kill switch deactivated");
        }
        was_active
    }

    pub fn subscribe(&self, listener: KillSwitchListener) {
        lock(&self.listeners).push(listener);
    }
}
