mod common;
use crate::common::{Harness, wait_for_operations, wait_for_state, with_timeout};

use std::error::Error;
use std::time::Duration;

use macroguard::engine::{
    AbortReason, ControlCommand, ExecutionOutcome, ExecutionState, ScriptId,
};
use macroguard::errors::EngineError;
use macroguard::input::{ButtonPhase, MouseButton, Point};
use macroguard_test_utils::builders::{OptionsBuilder, script};
use macroguard_test_utils::recording_backend::InputCall;

type TestResult = Result<(), Box<dyn Error>>;

/// 40 moves with a 10ms wait after each: 80 operations.
const WALK: &str = "for i = 1, 40 do\n  move(i, 0)\n  msleep(10)\nend";

fn walk_points() -> Vec<Point> {
    (1..=40).map(|i| Point::new(i, 0)).collect()
}

#[tokio::test]
async fn pause_and_resume_neither_skip_nor_repeat_calls() -> TestResult {
    let h = Harness::new();
    let id = ScriptId::new("walk");
    let handle = h
        .service
        .start_execution(script("walk", WALK), OptionsBuilder::new().debug().build())
        .await?;

    wait_for_operations(&h.service, &id, 4).await;
    assert!(h.service.pause_execution(&id)?);
    assert_eq!(h.service.state(&id), ExecutionState::Paused);

    // An operation already past the gate may still finish; after that, nothing moves.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let parked_at = h.service.statistics(&id).operation_index;
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(h.service.statistics(&id).operation_index, parked_at);

    assert!(h.service.resume_execution(&id)?);
    let result = with_timeout(handle.wait()).await?;

    assert!(result.is_success());
    assert_eq!(result.operations, 80);
    assert_eq!(h.backend.moves(), walk_points());
    assert!(h.observer.states().contains(&ExecutionState::Paused));
    Ok(())
}

#[tokio::test]
async fn step_advances_exactly_one_operation() -> TestResult {
    let h = Harness::new();
    let id = ScriptId::new("stepper");
    let handle = h
        .service
        .start_execution(script("stepper", WALK), OptionsBuilder::new().debug().build())
        .await?;

    wait_for_operations(&h.service, &id, 2).await;
    h.service.pause_execution(&id)?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let before = h.service.statistics(&id).operation_index;

    for n in 1..=3 {
        assert!(h.service.step_execution(&id)?);
        wait_for_state(&h.service, &id, ExecutionState::Paused).await;
        assert_eq!(h.service.statistics(&id).operation_index, before + n);
    }

    // Still parked after the last step.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.service.statistics(&id).operation_index, before + 3);

    h.service.resume_execution(&id)?;
    let result = with_timeout(handle.wait()).await?;
    assert_eq!(result.operations, 80);
    assert_eq!(h.backend.moves(), walk_points());
    Ok(())
}

#[tokio::test]
async fn stepping_past_the_last_call_completes() -> TestResult {
    let h = Harness::new();
    let id = ScriptId::new("short");
    let handle = h
        .service
        .start_execution(
            script("short", "move(1, 1)\nmsleep(100)"),
            OptionsBuilder::new().debug().build(),
        )
        .await?;

    wait_for_operations(&h.service, &id, 1).await;
    h.service.pause_execution(&id)?;
    h.service.step_execution(&id)?;

    let result = with_timeout(handle.wait()).await?;
    assert!(result.is_success());
    assert_eq!(result.operations, 2);
    Ok(())
}

#[tokio::test]
async fn debug_commands_are_no_ops_for_autonomous_runs() -> TestResult {
    let h = Harness::new();
    let id = ScriptId::new("auto");
    let handle = h
        .service
        .start_execution(script("auto", WALK), OptionsBuilder::new().build())
        .await?;

    wait_for_operations(&h.service, &id, 1).await;
    assert!(!h.service.pause_execution(&id)?);
    assert_eq!(h.service.state(&id), ExecutionState::Running);
    assert!(!h.service.resume_execution(&id)?);
    assert!(!h.service.step_execution(&id)?);
    assert!(!h.service.stop_execution(&id)?);
    assert_eq!(h.service.state(&id), ExecutionState::Running);

    for command in [ControlCommand::Pause, ControlCommand::Step, ControlCommand::Stop] {
        assert!(!h.service.is_available(&id, command));
    }
    assert!(h.service.is_available(&id, ControlCommand::Terminate));

    h.service.terminate_execution(&id)?;
    let result = with_timeout(handle.wait()).await?;
    assert_eq!(
        result.outcome,
        ExecutionOutcome::Terminated(AbortReason::Terminated)
    );
    Ok(())
}

#[tokio::test]
async fn commands_fail_fast_when_the_state_does_not_allow_them() -> TestResult {
    let h = Harness::new();
    let id = ScriptId::new("strict");
    let handle = h
        .service
        .start_execution(script("strict", WALK), OptionsBuilder::new().debug().build())
        .await?;

    let err = h.service.step_execution(&id).unwrap_err();
    assert!(matches!(
        err,
        EngineError::CommandUnavailable {
            command: ControlCommand::Step,
            state: ExecutionState::Running
        }
    ));
    assert!(matches!(
        h.service.resume_execution(&id),
        Err(EngineError::CommandUnavailable { .. })
    ));

    h.service.pause_execution(&id)?;
    assert!(matches!(
        h.service.pause_execution(&id),
        Err(EngineError::CommandUnavailable { .. })
    ));

    h.service.terminate_execution(&id)?;
    with_timeout(handle.wait()).await?;

    let missing = ScriptId::new("missing");
    assert!(matches!(
        h.service.pause_execution(&missing),
        Err(EngineError::NoActiveSession(name)) if name == "missing"
    ));
    assert!(matches!(
        h.service.terminate_execution(&missing),
        Err(EngineError::NoActiveSession(_))
    ));
    Ok(())
}

#[tokio::test]
async fn stop_ends_a_paused_run_without_performing_the_pending_call() -> TestResult {
    let h = Harness::new();
    let id = ScriptId::new("stoppable");
    let handle = h
        .service
        .start_execution(script("stoppable", WALK), OptionsBuilder::new().debug().build())
        .await?;

    wait_for_operations(&h.service, &id, 2).await;
    h.service.pause_execution(&id)?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let parked_at = h.service.statistics(&id).operation_index;

    assert!(h.service.stop_execution(&id)?);
    let result = with_timeout(handle.wait()).await?;

    assert_eq!(result.outcome, ExecutionOutcome::Terminated(AbortReason::Stopped));
    assert_eq!(result.operations, parked_at);
    assert_eq!(h.observer.completed().len(), 1);
    Ok(())
}

#[tokio::test]
async fn terminate_preempts_later_control_requests() -> TestResult {
    let h = Harness::new();
    let id = ScriptId::new("final");
    let handle = h
        .service
        .start_execution(script("final", WALK), OptionsBuilder::new().debug().build())
        .await?;

    wait_for_operations(&h.service, &id, 1).await;
    h.service.pause_execution(&id)?;
    h.service.terminate_execution(&id)?;

    // Whatever arrives after Terminate cannot revive or redirect the run.
    let _ = h.service.resume_execution(&id);
    let _ = h.service.stop_execution(&id);

    let result = with_timeout(handle.wait()).await?;
    assert_eq!(
        result.outcome,
        ExecutionOutcome::Terminated(AbortReason::Terminated)
    );
    Ok(())
}

#[tokio::test]
async fn terminate_releases_held_inputs() -> TestResult {
    let h = Harness::new();
    let id = ScriptId::new("holder");
    let handle = h
        .service
        .start_execution(
            script("holder", "mouse_down()\nkey_down('shift')\nsleep(30)"),
            OptionsBuilder::new().build(),
        )
        .await?;

    wait_for_operations(&h.service, &id, 2).await;
    h.service.terminate_execution(&id)?;
    let result = with_timeout(handle.wait()).await?;
    assert_eq!(result.state(), ExecutionState::Terminated);

    let calls = h.backend.calls();
    assert!(calls.contains(&InputCall::ReleaseAll));
    assert!(calls.contains(&InputCall::Click(MouseButton::Left, ButtonPhase::Up)));
    assert!(calls.contains(&InputCall::Key {
        key: "shift".into(),
        down: false
    }));
    Ok(())
}

#[tokio::test]
async fn statistics_estimate_remaining_time_from_the_previous_run() -> TestResult {
    let h = Harness::new();
    let id = ScriptId::new("estimate");

    let handle = h
        .service
        .start_execution(script("estimate", WALK), OptionsBuilder::new().build())
        .await?;
    with_timeout(handle.wait()).await?;
    assert_eq!(h.service.estimated_remaining_time(&id), None);

    let handle = h
        .service
        .start_execution(script("estimate", WALK), OptionsBuilder::new().debug().build())
        .await?;
    wait_for_operations(&h.service, &id, 6).await;
    h.service.pause_execution(&id)?;

    let stats = h.service.statistics(&id);
    assert_eq!(stats.expected_total, Some(80));
    let percent = stats.percent.unwrap();
    assert!(percent > 0.0 && percent < 100.0);
    assert!(stats.started_at.is_some());
    assert!(h.service.estimated_remaining_time(&id).unwrap() > Duration::ZERO);

    h.service.terminate_execution(&id)?;
    with_timeout(handle.wait()).await?;
    Ok(())
}
