use std::path::Path;

use clap::Parser;
use tempfile::TempDir;

use macroguard::cli::CliArgs;

fn workspace(script: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("job.lua"), script).unwrap();
    std::fs::write(
        dir.path().join("Macroguard.toml"),
        "[execution]\nshow_countdown = false\n",
    )
    .unwrap();
    dir
}

fn args(dir: &Path, extra: &[&str]) -> CliArgs {
    let script = dir.join("job.lua");
    let config = dir.join("Macroguard.toml");
    let mut argv = vec![
        "macroguard".to_string(),
        script.display().to_string(),
        "--config".to_string(),
        config.display().to_string(),
    ];
    argv.extend(extra.iter().map(|s| s.to_string()));
    CliArgs::try_parse_from(argv).unwrap()
}

#[tokio::test]
async fn dry_run_compiles_without_executing() {
    let dir = workspace("move(1, 1)");
    macroguard::run(args(dir.path(), &["--dry-run"])).await.unwrap();
}

#[tokio::test]
async fn dry_run_reports_syntax_errors() {
    let dir = workspace("move(1,");
    let err = macroguard::run(args(dir.path(), &["--dry-run"]))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("compile"), "{err:#}");
}

#[tokio::test]
async fn completed_run_exits_ok() {
    let dir = workspace("move(1, 1)\nmouse_click()");
    macroguard::run(args(dir.path(), &[])).await.unwrap();
}

#[tokio::test]
async fn text_injection_needs_allow_flag() {
    let dir = workspace("type_text('secret')");

    let err = macroguard::run(args(dir.path(), &[])).await.unwrap_err();
    assert!(format!("{err:#}").contains("failed"), "{err:#}");

    macroguard::run(args(dir.path(), &["--allow", "text_injection"]))
        .await
        .unwrap();
}

#[tokio::test]
async fn unknown_allow_category_is_rejected() {
    let dir = workspace("move(1, 1)");
    let err = macroguard::run(args(dir.path(), &["--allow", "everything"]))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("unknown operation category"));
}
