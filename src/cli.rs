// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `macroguard`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "macroguard",
    version,
    about = "Run Lua input-automation scripts under kill-switch and limit control.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the Lua script to execute.
    #[arg(value_name = "SCRIPT")]
    pub script: String,

    /// Path to the config file (TOML).
    ///
    /// Default: `Macroguard.toml` in the current working directory. A missing
    /// default file means built-in defaults; a missing explicit file is an
    /// error.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Run in debug-interactive mode: read `pause`, `resume`, `step`, `stop`
    /// and `terminate` commands from stdin.
    #[arg(long)]
    pub debug: bool,

    /// Override `[execution].speed_multiplier`.
    #[arg(long, value_name = "FACTOR")]
    pub speed: Option<f64>,

    /// Override `[execution].input_mode` (software, low_level, hardware_relay).
    #[arg(long, value_name = "MODE")]
    pub input_mode: Option<String>,

    /// Approve a dangerous operation category for this process
    /// (`text_injection`, `rapid_input`). May be repeated.
    #[arg(long = "allow", value_name = "CATEGORY")]
    pub allow: Vec<String>,

    /// Skip the pre-run countdown.
    #[arg(long)]
    pub no_countdown: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MACROGUARD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate config and compile the script, but don't run it.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
