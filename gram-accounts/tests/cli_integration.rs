//! CLI integration tests for gram-accounts
//!
//! Covers the offline surface: help text, the authorization URL, listing,
//! and error handling. The OAuth code exchange itself needs Instagram and
//! is exercised against the mock client in the library's tests.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to escape path for TOML on Windows
fn escape_path_for_toml(path: &str) -> String {
    path.replace('\\', "\\\\")
}

/// Helper to create a test environment with config and an empty database
fn setup_test_env() -> (TempDir, String) {
    let temp_dir = TempDir::new().unwrap();

    let config_path = temp_dir.path().join("config.toml");
    let db_path = temp_dir.path().join("gramcast.db");

    let config_content = format!(
        r#"
[instagram]
app_id = "12345"
app_secret = "shhh"
redirect_uri = "https://example.com/auth/callback"

[database]
path = "{}"
"#,
        escape_path_for_toml(&db_path.to_string_lossy())
    );
    fs::write(&config_path, config_content).unwrap();

    (temp_dir, config_path.to_string_lossy().to_string())
}

#[test]
fn test_help_flag_output() {
    let mut cmd = Command::cargo_bin("gram-accounts").unwrap();

    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Manage connected Instagram accounts"))
        .stdout(predicate::str::contains("USAGE"))
        .stdout(predicate::str::contains("connect-url"))
        .stdout(predicate::str::contains("connect"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("deactivate"));
}

#[test]
fn test_help_shows_exit_codes() {
    let mut cmd = Command::cargo_bin("gram-accounts").unwrap();

    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("EXIT CODES"))
        .stdout(predicate::str::contains("0 - Success"))
        .stdout(predicate::str::contains("2 - Account not found"))
        .stdout(predicate::str::contains("3 - Invalid input"));
}

#[test]
fn test_version_flag_output() {
    let mut cmd = Command::cargo_bin("gram-accounts").unwrap();

    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gram-accounts"));
}

#[test]
fn test_no_subcommand_shows_usage() {
    let mut cmd = Command::cargo_bin("gram-accounts").unwrap();

    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_connect_url_prints_authorization_page() {
    let (_temp_dir, config_path) = setup_test_env();

    let mut cmd = Command::cargo_bin("gram-accounts").unwrap();

    cmd.env("GRAMCAST_CONFIG", config_path)
        .arg("connect-url")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "https://www.instagram.com/oauth/authorize",
        ))
        .stdout(predicate::str::contains("client_id=12345"))
        .stdout(predicate::str::contains("response_type=code"));
}

#[test]
fn test_list_with_no_accounts() {
    let (_temp_dir, config_path) = setup_test_env();

    let mut cmd = Command::cargo_bin("gram-accounts").unwrap();

    cmd.env("GRAMCAST_CONFIG", config_path)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No accounts connected"));
}

#[test]
fn test_list_json_with_no_accounts() {
    let (_temp_dir, config_path) = setup_test_env();

    let mut cmd = Command::cargo_bin("gram-accounts").unwrap();

    cmd.env("GRAMCAST_CONFIG", config_path)
        .arg("list")
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn test_connect_rejects_empty_code() {
    let (_temp_dir, config_path) = setup_test_env();

    let mut cmd = Command::cargo_bin("gram-accounts").unwrap();

    cmd.env("GRAMCAST_CONFIG", config_path)
        .arg("connect")
        .write_stdin("   \n")
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("no authorization code provided"));
}

#[test]
fn test_deactivate_unknown_account_is_not_found() {
    let (_temp_dir, config_path) = setup_test_env();

    let mut cmd = Command::cargo_bin("gram-accounts").unwrap();

    cmd.env("GRAMCAST_CONFIG", config_path)
        .arg("deactivate")
        .arg("nonexistent")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("No active account"));
}

#[test]
fn test_missing_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let nonexistent_config = temp_dir.path().join("nonexistent.toml");

    let mut cmd = Command::cargo_bin("gram-accounts").unwrap();

    cmd.env("GRAMCAST_CONFIG", nonexistent_config.to_str().unwrap())
        .arg("list")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}
