#![allow(dead_code)]

use std::sync::Arc;

use macroguard::engine::{EngineSettings, ExecutionService};
use macroguard::safety::SafetyService;
use macroguard_test_utils::builders::{SettingsBuilder, service_with_backend};
use macroguard_test_utils::observer::RecordingObserver;
use macroguard_test_utils::recording_backend::RecordingBackend;

pub use macroguard_test_utils::{
    eventually, init_tracing, wait_for_operations, wait_for_state, with_timeout,
};

/// A service wired to a recording backend and observer.
pub struct Harness {
    pub safety: Arc<SafetyService>,
    pub backend: Arc<RecordingBackend>,
    pub observer: Arc<RecordingObserver>,
    pub service: ExecutionService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(SettingsBuilder::new().build())
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        Self::build(Arc::new(SafetyService::new()), RecordingBackend::new(), settings)
    }

    pub fn build(
        safety: Arc<SafetyService>,
        backend: RecordingBackend,
        settings: EngineSettings,
    ) -> Self {
        init_tracing();
        let backend = Arc::new(backend);
        let service = service_with_backend(Arc::clone(&safety), backend.clone(), settings);
        let observer = Arc::new(RecordingObserver::new());
        service.subscribe(observer.clone());
        Self {
            safety,
            backend,
            observer,
            service,
        }
    }
}
