//! CLI integration tests for bioseed.
//!
//! Each test runs the binary against its own SQLite document store in a temp
//! directory, so tests can run in parallel and need no MongoDB server.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::PathBuf;

use assert_cmd::Command;
use assert_fs::TempDir;
use predicates::prelude::*;
use serde_json::Value;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn db_path(&self) -> PathBuf {
        self.temp_dir.path().join("data").join("bioseed.db")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("bioseed").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd.env("RUST_LOG", "bioseed=warn");
        for var in [
            "MONGO_URI",
            "MONGO_APP_USERNAME",
            "MONGO_APP_PASSWORD",
            "BIOSEED_ADMIN_EMAIL",
        ] {
            cmd.env_remove(var);
        }
        cmd.env("MONGO_DATABASE", "fraud");
        cmd.env("BIOSEED_SQLITE_PATH", self.db_path());
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .env("MONGO_APP_USERNAME", "fraud_app")
            .env("MONGO_APP_PASSWORD", "app-password")
            .env("BIOSEED_ADMIN_EMAIL", "admin@example.com")
            .arg("init")
            .assert()
    }

    fn status_json(&self) -> Value {
        let output = self
            .cmd()
            .args(["status", "--json"])
            .output()
            .expect("failed to run command");
        assert!(output.status.success(), "status failed");

        serde_json::from_slice(&output.stdout).expect("failed to parse JSON")
    }
}

fn all_present(status: &Value) -> bool {
    let collections = status["collections"].as_array().expect("collections");
    let seeds = status["seeds"].as_array().expect("seeds");

    collections.iter().all(|c| {
        c["exists"] == true
            && c["indexes"]
                .as_array()
                .expect("indexes")
                .iter()
                .all(|i| i["present"] == true)
    }) && seeds.iter().all(|s| s["present"] == true)
}

#[test]
fn test_init_provisions_and_prints_admin_notice() {
    let ctx = TestContext::new();

    ctx.init()
        .success()
        .stdout(predicate::str::contains("IMPORTANT: an administrator account was created"))
        .stdout(predicate::str::contains("bioseed admin set-password"))
        .stdout(predicate::str::contains("8 created"));

    assert!(ctx.db_path().exists());
}

#[test]
fn test_second_init_changes_nothing() {
    let ctx = TestContext::new();
    ctx.init().success();
    let before = ctx.status_json();

    ctx.init()
        .success()
        .stdout(predicate::str::contains("IMPORTANT").not())
        .stdout(predicate::str::contains("8 already present"));

    let after = ctx.status_json();
    assert_eq!(before, after);
}

#[test]
fn test_status_before_and_after_init() {
    let ctx = TestContext::new();

    let empty = ctx.status_json();
    assert!(!all_present(&empty));
    assert!(empty.get("admin_credential_pending").is_none());

    ctx.init().success();

    let status = ctx.status_json();
    assert!(all_present(&status));
    assert_eq!(status["admin_credential_pending"], true);

    let names: Vec<&str> = status["collections"]
        .as_array()
        .expect("collections")
        .iter()
        .map(|c| c["name"].as_str().expect("name"))
        .collect();
    assert_eq!(
        names,
        vec![
            "users",
            "biometric_data",
            "documents",
            "fraud_notifications",
            "feature_flags",
            "model_metadata",
            "ab_test_results",
            "device_contexts",
        ]
    );
}

#[test]
fn test_status_text_output() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Database is fully provisioned."))
        .stdout(predicate::str::contains("username_1"))
        .stdout(predicate::str::contains("(unique)"));
}

#[test]
fn test_set_password_from_stdin_issues_credential() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args(["admin", "set-password", "--password-stdin"])
        .write_stdin("a-real-admin-password\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Password updated for 'admin'"));

    let status = ctx.status_json();
    assert_eq!(status["admin_credential_pending"], false);
}

#[test]
fn test_set_password_generate_prints_once() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args(["admin", "set-password", "--generate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated password for 'admin'"))
        .stdout(predicate::str::contains("must be changed at first login"));
}

#[test]
fn test_set_password_rejects_short_password() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args(["admin", "set-password", "--password-stdin"])
        .write_stdin("short\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 12 characters"));

    assert_eq!(ctx.status_json()["admin_credential_pending"], true);
}

#[test]
fn test_set_password_unknown_user() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args([
            "admin",
            "set-password",
            "--username",
            "ghost",
            "--generate",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("User 'ghost' not found"));
}

#[test]
fn test_set_password_non_interactive_requires_source() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args(["admin", "set-password", "--non-interactive"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--password-stdin or --generate"));
}

#[test]
fn test_init_requires_app_credentials() {
    let ctx = TestContext::new();

    ctx.cmd()
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--app-username"));

    assert!(!ctx.db_path().exists());
}

#[test]
fn test_init_rejects_invalid_database_name() {
    let ctx = TestContext::new();

    ctx.cmd()
        .env("MONGO_DATABASE", "bad.name")
        .env("MONGO_APP_USERNAME", "fraud_app")
        .env("MONGO_APP_PASSWORD", "app-password")
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("forbidden character"));
}

#[test]
fn test_init_fails_when_server_unreachable() {
    let ctx = TestContext::new();

    ctx.cmd()
        .env_remove("BIOSEED_SQLITE_PATH")
        .env("MONGO_URI", "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200")
        .env("MONGO_APP_USERNAME", "fraud_app")
        .env("MONGO_APP_PASSWORD", "app-password")
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot reach database"))
        .stdout(predicate::str::contains("IMPORTANT").not());

    assert!(!ctx.db_path().exists());
}
