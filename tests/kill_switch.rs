mod common;
use crate::common::{Harness, wait_for_operations, wait_for_state, with_timeout};

use std::error::Error;
use std::time::{Duration, Instant};

use macroguard::engine::{AbortReason, ExecutionOutcome, ExecutionState, ScriptId};
use macroguard::errors::EngineError;
use macroguard_test_utils::builders::{OptionsBuilder, SettingsBuilder, script};
use macroguard_test_utils::recording_backend::InputCall;

type TestResult = Result<(), Box<dyn Error>>;

fn killed(reason: &str) -> ExecutionOutcome {
    ExecutionOutcome::Terminated(AbortReason::KillSwitch {
        reason: reason.to_string(),
    })
}

#[tokio::test]
async fn kill_switch_interrupts_a_long_sleep_within_a_slice() -> TestResult {
    let h = Harness::new();
    let handle = h
        .service
        .start_execution(script("sleeper", "sleep(30)"), OptionsBuilder::new().build())
        .await?;

    tokio::time::sleep(Duration::from_millis(50)).await;
    let activated = Instant::now();
    assert!(h.safety.activate_kill_switch("panic button"));

    let result = with_timeout(handle.wait()).await?;
    // One 10ms slice plus scheduling slack.
    assert!(activated.elapsed() < Duration::from_millis(250));
    assert_eq!(result.outcome, killed("panic button"));
    assert_eq!(result.operations, 0);
    assert!(h.backend.calls().contains(&InputCall::ReleaseAll));
    Ok(())
}

#[tokio::test]
async fn kill_switch_stops_every_active_session() -> TestResult {
    let h = Harness::new();
    let a = h
        .service
        .start_execution(script("a", "sleep(30)"), OptionsBuilder::new().build())
        .await?;
    let b = h
        .service
        .start_execution(script("b", "sleep(30)"), OptionsBuilder::new().debug().build())
        .await?;

    tokio::time::sleep(Duration::from_millis(30)).await;
    h.safety.activate_kill_switch("all stop");

    let ra = with_timeout(a.wait()).await?;
    let rb = with_timeout(b.wait()).await?;
    assert_eq!(ra.state(), ExecutionState::Terminated);
    assert_eq!(rb.state(), ExecutionState::Terminated);
    assert!(h.service.active_scripts().is_empty());
    Ok(())
}

#[tokio::test]
async fn kill_switch_wakes_a_paused_session() -> TestResult {
    let h = Harness::new();
    let id = ScriptId::new("paused");
    let handle = h
        .service
        .start_execution(
            script("paused", "for i = 1, 1000 do move(i, i) msleep(5) end"),
            OptionsBuilder::new().debug().build(),
        )
        .await?;

    wait_for_operations(&h.service, &id, 2).await;
    assert!(h.service.pause_execution(&id)?);
    wait_for_state(&h.service, &id, ExecutionState::Paused).await;

    h.safety.activate_kill_switch("while paused");
    let result = with_timeout(handle.wait()).await?;
    assert_eq!(result.outcome, killed("while paused"));
    Ok(())
}

#[tokio::test]
async fn kill_switch_wins_over_a_pending_stop() -> TestResult {
    // A long slice keeps the worker asleep while both requests land.
    let h = Harness::with_settings(
        SettingsBuilder::new()
            .checkpoint_slice(Duration::from_millis(200))
            .build(),
    );
    let id = ScriptId::new("race");
    let handle = h
        .service
        .start_execution(script("race", "sleep(30)"), OptionsBuilder::new().debug().build())
        .await?;

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(h.service.stop_execution(&id)?);
    h.safety.activate_kill_switch("override");

    let result = with_timeout(handle.wait()).await?;
    assert_eq!(result.outcome, killed("override"));
    Ok(())
}

#[tokio::test]
async fn start_is_refused_until_the_kill_switch_is_cleared() -> TestResult {
    let h = Harness::new();
    h.safety.activate_kill_switch("engaged");

    let err = h
        .service
        .start_execution(script("blocked", "move(1, 1)"), OptionsBuilder::new().build())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KillSwitchActive(reason) if reason == "engaged"));

    assert!(h.safety.deactivate_kill_switch());
    let handle = h
        .service
        .start_execution(script("blocked", "move(1, 1)"), OptionsBuilder::new().build())
        .await?;
    assert!(with_timeout(handle.wait()).await?.is_success());
    Ok(())
}

#[tokio::test]
async fn kill_switch_interrupts_pure_script_loops() -> TestResult {
    let h = Harness::new();
    let id = ScriptId::new("spin");
    let handle = h
        .service
        .start_execution(
            script("spin", "move(0, 0)\nwhile true do end"),
            OptionsBuilder::new().build(),
        )
        .await?;

    wait_for_operations(&h.service, &id, 1).await;
    h.safety.activate_kill_switch("spin");

    let result = with_timeout(handle.wait()).await?;
    assert_eq!(result.outcome, killed("spin"));
    assert_eq!(result.operations, 1);
    Ok(())
}

#[tokio::test]
async fn scripts_cannot_swallow_the_abort() -> TestResult {
    let h = Harness::new();
    let id = ScriptId::new("stubborn");
    let handle = h
        .service
        .start_execution(
            script(
                "stubborn",
                "while true do\n  local ok = pcall(msleep, 5)\n  if not ok then move(9, 9) end\nend",
            ),
            OptionsBuilder::new().build(),
        )
        .await?;

    wait_for_operations(&h.service, &id, 3).await;
    h.service.terminate_execution(&id)?;

    let result = with_timeout(handle.wait()).await?;
    assert_eq!(result.outcome, ExecutionOutcome::Terminated(AbortReason::Terminated));
    // The retry after the swallowed abort never reached the backend.
    assert!(h.backend.moves().is_empty());
    Ok(())
}
