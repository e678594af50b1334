// src/sync.rs

//! Small helpers shared by the engine and the safety service.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::error;

/// Lock a mutex, recovering the guard if a panicking holder poisoned it.
///
/// All state behind these mutexes is left consistent between statements, so
/// continuing after a poisoned lock is sound.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run an observer callback, swallowing (and logging) any panic it raises.
///
/// Returns `false` if the callback panicked.
pub(crate) fn call_isolated(what: &str, f: impl FnOnce()) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            error!(subscriber = what, panic = %message, "subscriber panicked; ignoring");
            false
        }
    }
}
