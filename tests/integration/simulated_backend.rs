use std::sync::Arc;

use macroguard::engine::{
    EngineSettings, ExecutionOptions, ExecutionService, ExecutionState, Script,
};
use macroguard::safety::{OperationCategory, SafetyService};
use macroguard_test_utils::{init_tracing, with_timeout};

const TOUR: &str = r#"
for i = 1, 5 do
    move(i * 10, i * 20)
end
mouse_down()
mouse_release()
key_down("alt")
key_release("alt")
type_text("hi")
msleep(5)
"#;

#[tokio::test]
async fn default_service_runs_a_script_end_to_end() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tour.lua");
    std::fs::write(&path, TOUR).unwrap();
    let script = Script::from_file(&path).unwrap();
    assert_eq!(script.name, "tour");

    let safety = Arc::new(SafetyService::new());
    safety.preauthorize(OperationCategory::TextInjection);
    let service = ExecutionService::with_defaults(safety, EngineSettings::default());
    let mut events = service.events();

    let handle = service
        .start_execution(script.clone(), ExecutionOptions::default())
        .await
        .unwrap();
    let result = with_timeout(handle.wait()).await.unwrap();

    assert!(result.is_success(), "{:?}", result.outcome);
    assert_eq!(result.operations, 11);
    assert_eq!(service.state(&script.id), ExecutionState::Idle);

    let mut last_state = None;
    while let Ok(event) = events.try_recv() {
        if let macroguard::engine::ExecutionEvent::StateChanged { state, .. } = event {
            last_state = Some(state);
        }
    }
    assert_eq!(last_state, Some(ExecutionState::Idle));
}

#[tokio::test]
async fn limits_from_default_settings_apply_to_runaway_scripts() {
    init_tracing();

    let mut settings = EngineSettings::default();
    settings.limits.max_operations = Some(20);
    let service = ExecutionService::with_defaults(Arc::new(SafetyService::new()), settings);

    let script = Script::new("runaway", "runaway", "while true do move(1, 1) end");
    let handle = service
        .start_execution(script, ExecutionOptions::default())
        .await
        .unwrap();
    let result = with_timeout(handle.wait()).await.unwrap();

    assert_eq!(result.state(), ExecutionState::Failed);
    assert_eq!(result.operations, 20);
}
