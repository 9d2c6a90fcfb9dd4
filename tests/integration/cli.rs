// Integration tests for the depwatch binary

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Isolated config pointing the HTTP cache into `dir`.
fn write_config(dir: &Path, extra: &str) -> std::path::PathBuf {
    let config = dir.join("config.toml");
    let cache = dir.join("http-cache.bin");
    let content = format!("cache_path = '{}'\n{extra}", cache.display());
    std::fs::write(&config, content).unwrap();
    config
}

fn depwatch(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("depwatch").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("GITHUB_TOKEN")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config);
    cmd
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("depwatch")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("cache"));
}

#[test]
fn test_missing_root_exits_with_error() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), "");

    depwatch(&config)
        .args(["scan", "--no-cache"])
        .arg(temp.path().join("does-not-exist"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Path does not exist"));
}

#[test]
fn test_empty_tree_reports_nothing_found() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), "");
    let root = temp.path().join("empty");
    std::fs::create_dir(&root).unwrap();

    depwatch(&config)
        .arg("scan")
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("No manifests found"));
}

#[test]
fn test_invalid_config_is_fatal() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), "max_parallel = 0\n");

    depwatch(&config)
        .args(["scan", "."])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("max_parallel must be at least 1"));
}

#[test]
fn test_invalid_exclude_pattern_is_fatal() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), "");

    depwatch(&config)
        .args(["scan", "--no-cache", "--exclude", "[oops"])
        .arg(temp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid exclude pattern"));
}

#[test]
fn test_cache_info_and_clean() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), "");
    let cache = temp.path().join("http-cache.bin");

    depwatch(&config)
        .args(["cache", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains(cache.display().to_string()))
        .stdout(predicate::str::contains("none"));

    // An unreadable file still reports, as an empty cache
    std::fs::write(&cache, b"garbage").unwrap();
    depwatch(&config)
        .args(["cache", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries: 0"))
        .stdout(predicate::str::contains("7 B"));

    depwatch(&config).args(["cache", "clean"]).assert().success().stdout(predicate::str::contains("Removed"));
    assert!(!cache.exists());

    depwatch(&config)
        .args(["cache", "clean"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already empty"));
}
