pub mod builders;
pub mod observer;
pub mod recording_backend;

use std::sync::Once;
use std::time::{Duration, Instant};

use macroguard::engine::{ExecutionService, ExecutionState, ScriptId};
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Poll until `cond` holds or 5 seconds pass. Returns whether it held.
pub async fn eventually<F>(mut cond: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

/// Poll until the service reports `state` for `id`.
pub async fn wait_for_state(service: &ExecutionService, id: &ScriptId, state: ExecutionState) {
    let reached = eventually(|| service.state(id) == state).await;
    assert!(
        reached,
        "script {id} never reached {state} (currently {})",
        service.state(id)
    );
}

/// Poll until the script has performed at least `count` operations.
pub async fn wait_for_operations(service: &ExecutionService, id: &ScriptId, count: u64) {
    let reached = eventually(|| service.statistics(id).operation_index >= count).await;
    assert!(reached, "script {id} never reached {count} operations");
}
