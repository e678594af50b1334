// src/lib.rs

pub mod bridge;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod input;
pub mod interpreter;
pub mod logging;
pub mod safety;
mod sync;
pub mod types;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_or_default};
use crate::engine::{
    ControlCommand, ExecutionEvent, ExecutionOptions, ExecutionService, Script, ScriptId,
};
use crate::interpreter::LuaInterpreter;
use crate::safety::{OperationCategory, SafetyService};
use crate::types::{ControlMode, InputMode};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - the safety service (pre-authorizations, Ctrl-C → kill switch)
/// - the execution service and one run of the given script
/// - the countdown and, in debug mode, stdin control commands
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref().map(Path::new))
        .context("loading configuration")?;
    let script = Script::from_file(&args.script)?;
    let options = apply_overrides(cfg.options.clone(), &args)?;

    if args.dry_run {
        LuaInterpreter::check_syntax(&script.source, &script.name)?;
        print_dry_run(&cfg, &script, &options);
        return Ok(());
    }

    let safety = Arc::new(SafetyService::new());
    for category in &cfg.preauthorized {
        safety.preauthorize(*category);
    }
    for name in &args.allow {
        let category: OperationCategory = name.parse().map_err(|e: String| anyhow!(e))?;
        safety.preauthorize(category);
    }

    let service = Arc::new(ExecutionService::with_defaults(
        Arc::clone(&safety),
        cfg.settings.clone(),
    ));

    // Ctrl-C → kill switch.
    {
        let safety = Arc::clone(&safety);
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            safety.activate_kill_switch("Ctrl-C");
        });
    }
    info!(
        trigger = %cfg.kill_switch_trigger,
        "kill switch armed (Ctrl-C here; the hotkey is handled by the host)"
    );

    if options.show_countdown {
        countdown(options.countdown, &safety).await;
    }

    spawn_event_logger(&service);

    let interactive = options.control_mode == ControlMode::DebugInteractive;
    let handle = service.start_execution(script, options).await?;
    if interactive {
        spawn_stdin_commands(Arc::clone(&service), handle.script().clone());
    }

    let result = handle.wait().await?;

    println!(
        "{}: {} after {} operation(s) in {:.2?}",
        result.script_name,
        result.state(),
        result.operations,
        result.elapsed
    );

    match result.outcome {
        crate::engine::ExecutionOutcome::Completed => Ok(()),
        crate::engine::ExecutionOutcome::Failed(failure) => bail!("run failed: {failure}"),
        crate::engine::ExecutionOutcome::Terminated(reason) => bail!("run terminated: {reason}"),
    }
}

fn apply_overrides(mut options: ExecutionOptions, args: &CliArgs) -> Result<ExecutionOptions> {
    if args.debug {
        options.control_mode = ControlMode::DebugInteractive;
    }
    if let Some(speed) = args.speed {
        options.speed_multiplier = speed;
    }
    if let Some(ref mode) = args.input_mode {
        options.input_mode = mode.parse::<InputMode>().map_err(|e| anyhow!(e))?;
    }
    if args.no_countdown {
        options.show_countdown = false;
    }
    options.validate()?;
    Ok(options)
}

/// Grace period before the run; cut short if the kill switch fires.
async fn countdown(total: Duration, safety: &SafetyService) {
    let mut remaining = total;
    while !remaining.is_zero() {
        if safety.is_kill_switch_active() {
            return;
        }
        let secs = remaining.as_secs_f64().ceil() as u64;
        info!("starting in {secs}s...");
        let tick = remaining.min(Duration::from_secs(1));
        tokio::time::sleep(tick).await;
        remaining -= tick;
    }
}

fn spawn_event_logger(service: &ExecutionService) {
    let mut events = service.events();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ExecutionEvent::StateChanged { script, state } => {
                    info!(%script, %state, "state changed");
                }
                ExecutionEvent::ProgressChanged {
                    operation_index,
                    percent,
                    ..
                } => {
                    debug!(operation_index, ?percent, "progress");
                }
                ExecutionEvent::ExecutionError(result) => {
                    if let Some(failure) = result.failure() {
                        warn!(script = %result.script_name, %failure, "execution failed");
                    }
                }
                ExecutionEvent::ExecutionCompleted(result) => {
                    info!(
                        script = %result.script_name,
                        state = %result.state(),
                        operations = result.operations,
                        "execution finished"
                    );
                }
            }
        }
    });
}

/// Read `pause` / `resume` / `step` / `stop` / `terminate` lines from stdin.
fn spawn_stdin_commands(service: Arc<ExecutionService>, id: ScriptId) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        eprintln!("commands: pause | resume | step | stop | terminate");

        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            let command = match line.parse::<ControlCommand>() {
                Ok(command) => command,
                Err(e) => {
                    eprintln!("{e}");
                    continue;
                }
            };

            match service.control(&id, command) {
                Ok(true) => {}
                Ok(false) => eprintln!("{command:?} ignored"),
                Err(e) => eprintln!("{e}"),
            }
        }
    });
}

/// Simple dry-run output: effective settings and options.
fn print_dry_run(cfg: &ConfigFile, script: &Script, options: &ExecutionOptions) {
    println!("macroguard dry-run");
    println!("  script = {} ({})", script.name, script.id);
    println!("  script compiles = true");
    println!();

    println!("safety:");
    match cfg.settings.limits.max_operations {
        Some(n) => println!("  max_operations = {n}"),
        None => println!("  max_operations = unlimited"),
    }
    match cfg.settings.limits.max_duration {
        Some(d) => println!("  max_duration = {d:?}"),
        None => println!("  max_duration = unlimited"),
    }
    println!("  kill_switch_trigger = {}", cfg.kill_switch_trigger);
    println!("  rapid_speed_threshold = {}", cfg.settings.rapid_speed_threshold);
    if !cfg.preauthorized.is_empty() {
        let names: Vec<String> = cfg.preauthorized.iter().map(|c| c.to_string()).collect();
        println!("  preauthorized = {:?}", names);
    }
    println!();

    println!("execution:");
    println!("  control_mode = {:?}", options.control_mode);
    println!("  input_mode = {}", options.input_mode);
    println!("  speed_multiplier = {}", options.speed_multiplier);
    println!("  pre_delay = {:?}", options.pre_delay);
    if options.show_countdown {
        println!("  countdown = {:?}", options.countdown);
    }
    println!("  checkpoint_slice = {:?}", cfg.settings.checkpoint_slice);

    debug!("dry-run complete (no execution)");
}
