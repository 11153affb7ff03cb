//! End-to-end tests for the `babel` binary using the offline mock provider.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// A `babel` invocation against `workspace` with the mock provider.
fn babel(workspace: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("babel").unwrap();
    cmd.env_remove("BABEL_WORKSPACE")
        .arg("--workspace")
        .arg(workspace.path())
        .arg("--provider")
        .arg("mock");
    cmd
}

fn write_config(workspace: &TempDir, content: &str) {
    let dir = workspace.path().join(".babel");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), content).unwrap();
}

#[test]
fn test_translate_prints_output() {
    let temp = TempDir::new().unwrap();

    babel(&temp)
        .args(["translate", "Hello", "--to", "ja"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[ja] Hello"));

    assert!(temp.path().join(".babel").join("cache.db").exists());
}

#[test]
fn test_second_run_is_served_from_durable_cache() {
    let temp = TempDir::new().unwrap();

    let first = babel(&temp)
        .args(["translate", "Good morning", "--to", "fr", "--from", "en", "--json"])
        .assert()
        .success();
    let first: serde_json::Value = serde_json::from_slice(&first.get_output().stdout).unwrap();
    assert_eq!(first["output"], "[fr] Good morning");
    assert_eq!(first["served_from_cache"], false);

    let second = babel(&temp)
        .args(["translate", "Good morning", "--to", "fr", "--from", "en", "--json"])
        .assert()
        .success();
    let second: serde_json::Value = serde_json::from_slice(&second.get_output().stdout).unwrap();
    assert_eq!(second["output"], "[fr] Good morning");
    assert_eq!(second["served_from_cache"], true);
}

#[test]
fn test_identical_languages_echo_input() {
    let temp = TempDir::new().unwrap();

    babel(&temp)
        .args(["translate", "Hola", "--to", "es", "--from", "es"])
        .assert()
        .success()
        .stdout(predicate::str::diff("Hola\n"));
}

#[test]
fn test_empty_input_fails() {
    let temp = TempDir::new().unwrap();

    babel(&temp)
        .args(["translate", "   ", "--to", "ja"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed input"));
}

#[test]
fn test_missing_api_key_fails() {
    let temp = TempDir::new().unwrap();
    write_config(&temp, "[inference]\nprovider = \"openai\"\napi_key_env = \"BABEL_TEST_MISSING_KEY\"\n");

    let mut cmd = Command::cargo_bin("babel").unwrap();
    cmd.env_remove("BABEL_TEST_MISSING_KEY")
        .arg("--workspace")
        .arg(temp.path())
        .args(["translate", "Hello", "--to", "ja"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("BABEL_TEST_MISSING_KEY"));
}

#[test]
fn test_invalid_config_fails() {
    let temp = TempDir::new().unwrap();
    write_config(&temp, "[retry]\nmax_attempts = 0\n");

    babel(&temp)
        .args(["translate", "Hello", "--to", "ja"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_attempts"));
}

#[test]
fn test_batch_prints_json_map() {
    let temp = TempDir::new().unwrap();

    let output = babel(&temp)
        .args(["batch", "Hello", "--to", "ja,fr,de,fr", "--from", "en", "--concurrency", "2"])
        .assert()
        .success();
    let map: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();

    let map = map.as_object().unwrap();
    assert_eq!(map.len(), 3);
    assert_eq!(map["ja"]["output"], "[ja] Hello");
    assert_eq!(map["fr"]["output"], "[fr] Hello");
    assert_eq!(map["de"]["output"], "[de] Hello");
}

#[test]
fn test_batch_rejects_zero_concurrency() {
    let temp = TempDir::new().unwrap();

    babel(&temp)
        .args(["batch", "Hello", "--to", "ja", "--concurrency", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("concurrency_limit"));
}

#[test]
fn test_stats_and_sweep() {
    let temp = TempDir::new().unwrap();

    babel(&temp).args(["translate", "Hello", "--to", "ja"]).assert().success();
    babel(&temp).args(["translate", "Hello", "--to", "ko"]).assert().success();

    let output = babel(&temp).args(["stats", "--json"]).assert().success();
    let stats: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(stats["durable_entries"], 2);
    assert_eq!(stats["schema_version"], 1);
    assert_eq!(stats["provider"], "mock");

    babel(&temp)
        .arg("sweep")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 expired entries"));
}

#[test]
fn test_custom_database_location() {
    let temp = TempDir::new().unwrap();
    write_config(&temp, "[cache]\ndatabase = \"data/translations.db\"\n");

    babel(&temp).args(["translate", "Hello", "--to", "ja"]).assert().success();

    assert!(temp.path().join("data").join("translations.db").exists());
    babel(&temp)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("translations.db"));
}
