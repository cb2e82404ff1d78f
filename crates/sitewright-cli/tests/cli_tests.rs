//! CLI integration tests for sitewright
//!
//! Exercises the binary end-to-end with assert_cmd against a throwaway
//! database. Nothing here touches the network: `build` is only run with
//! `--dry-run`.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command wired to an isolated database and config directory
fn sitewright_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("sitewright").unwrap();
    cmd.env("SITEWRIGHT_CONFIG_DIR", dir.path().join("config"));
    cmd.arg("--db");
    cmd.arg(dir.path().join("test.db"));
    cmd
}

fn create_plan(dir: &TempDir, project: &str) {
    sitewright_cmd(dir)
        .args([
            "plan",
            "A family-run pizzeria with weekly specials",
            "--niche",
            "restaurant",
            "--design-system",
            "classic-elegant",
            "--project",
            project,
            "--pages",
            "home,menu",
        ])
        .assert()
        .success();
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    sitewright_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("inspect"));
}

#[test]
fn test_catalog_lists_niches() {
    let dir = TempDir::new().unwrap();
    sitewright_cmd(&dir)
        .args(["catalog", "niches"])
        .assert()
        .success()
        .stdout(predicate::str::contains("restaurant"))
        .stdout(predicate::str::contains("portfolio"));
}

#[test]
fn test_plan_creates_and_prints_summary() {
    let dir = TempDir::new().unwrap();
    sitewright_cmd(&dir)
        .args([
            "plan",
            "A family-run pizzeria",
            "--niche",
            "restaurant",
            "--design-system",
            "classic-elegant",
            "--project",
            "pizzeria",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Plan created for project 'pizzeria'"))
        .stdout(predicate::str::contains("Estimated duration"))
        .stdout(predicate::str::contains("Estimated cost"));
}

#[test]
fn test_plan_rejects_unknown_niche() {
    let dir = TempDir::new().unwrap();
    sitewright_cmd(&dir)
        .args([
            "plan",
            "A flower shop",
            "--niche",
            "florist",
            "--design-system",
            "playful",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown niche"));
}

#[test]
fn test_plan_json_output_parses() {
    let dir = TempDir::new().unwrap();
    let output = sitewright_cmd(&dir)
        .args([
            "plan",
            "A yoga studio",
            "--niche",
            "fitness",
            "--design-system",
            "playful",
            "--project",
            "yoga",
            "--format",
            "json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let plan: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(plan["project_id"], "yoga");
    assert!(plan["steps"].as_array().unwrap().len() > 5);
}

#[test]
fn test_inspect_shows_every_step() {
    let dir = TempDir::new().unwrap();
    create_plan(&dir, "pz-1");

    sitewright_cmd(&dir)
        .args(["inspect", "pz-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Scaffold project"))
        .stdout(predicate::str::contains("Content: menu"))
        .stdout(predicate::str::contains("Export"));
}

#[test]
fn test_build_dry_run_reports_without_running() {
    let dir = TempDir::new().unwrap();
    create_plan(&dir, "pz-2");

    sitewright_cmd(&dir)
        .args(["build", "pz-2", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run for project 'pz-2'"))
        .stdout(predicate::str::contains("Estimated tokens"));

    // Dry run records nothing
    sitewright_cmd(&dir)
        .args(["status", "pz-2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No runs yet"));
}

#[test]
fn test_status_unknown_project_fails() {
    let dir = TempDir::new().unwrap();
    sitewright_cmd(&dir)
        .args(["status", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No plan found"));
}

#[test]
fn test_build_without_api_key_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    create_plan(&dir, "pz-3");

    sitewright_cmd(&dir)
        .args(["build", "pz-3"])
        .env_remove("SITEWRIGHT_API_KEY")
        .env_remove("OPENROUTER_API_KEY")
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key"));
}

#[test]
fn test_build_rejects_bad_tier() {
    let dir = TempDir::new().unwrap();
    create_plan(&dir, "pz-4");

    sitewright_cmd(&dir)
        .args(["build", "pz-4", "--tier", "turbo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown model tier"));
}
