//! Integration tests for the `poslink` CLI binary.
//!
//! Argument parsing, config handling and exit codes run without a backend;
//! request commands run against a wiremock server.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};
use std::process::Output;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `poslink` binary with env isolation.
///
/// Clears `POSLINK_*` variables and points every platform directory into
/// `home` so tests never touch the user's real config or token.
fn poslink_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("poslink");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("XDG_DATA_HOME", home.join(".local/share"))
        .env_remove("RUST_LOG")
        .env_remove("POSLINK_CONFIG")
        .env_remove("POSLINK_BASE_URL")
        .env_remove("POSLINK_INSECURE")
        .env_remove("POSLINK_TIMEOUT")
        .env_remove("POSLINK_USERNAME")
        .env_remove("POSLINK_PASSWORD")
        .env_remove("POSLINK_API__BASE_URL")
        .env_remove("POSLINK_TOKEN__DIR");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Config file pointing at `base_url`, with retries that do not sleep and
/// the token kept under `home/state`.
fn write_config(home: &Path, base_url: &str) -> PathBuf {
    let path = home.join("config.toml");
    let contents = format!(
        "[api]\nbase_url = \"{base_url}\"\nretry_delay_ms = 0\n\n[token]\ndir = \"{}\"\n",
        home.join("state").display()
    );
    std::fs::write(&path, contents).unwrap();
    path
}

fn token_path(home: &Path) -> PathBuf {
    home.join("state").join("token")
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run(mut cmd: assert_cmd::Command) -> Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

struct Backend {
    server: MockServer,
    home: TempDir,
    config: PathBuf,
}

impl Backend {
    async fn start() -> Self {
        let server = MockServer::start().await;
        let home = tempfile::tempdir().unwrap();
        let config = write_config(home.path(), &format!("{}/api", server.uri()));
        Self {
            server,
            home,
            config,
        }
    }

    fn cmd(&self, args: &[&str]) -> assert_cmd::Command {
        let mut cmd = poslink_cmd(self.home.path());
        cmd.arg("--config").arg(&self.config).args(args);
        cmd
    }
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = poslink_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = tempfile::tempdir().unwrap();
    poslink_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("POS backend")
            .and(predicate::str::contains("login"))
            .and(predicate::str::contains("request"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    poslink_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("poslink"));
}

#[test]
fn test_unknown_subcommand_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    poslink_cmd(home.path())
        .arg("frobnicate")
        .assert()
        .code(2);
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_follows_flag() {
    let home = tempfile::tempdir().unwrap();
    let path = home.path().join("custom.toml");
    poslink_cmd(home.path())
        .arg("--config")
        .arg(&path)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_config_show_defaults() {
    let home = tempfile::tempdir().unwrap();
    poslink_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[api]")
                .and(predicate::str::contains("http://localhost:5000/api"))
                .and(predicate::str::contains("[channel]"))
                .and(predicate::str::contains("backend = \"file\"")),
        );
}

#[test]
fn test_config_show_applies_flags_and_env() {
    let home = tempfile::tempdir().unwrap();
    poslink_cmd(home.path())
        .env("POSLINK_CHANNEL__MAX_ATTEMPTS", "9")
        .args(["-u", "https://shop.example.com/api", "config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("https://shop.example.com/api")
                .and(predicate::str::contains("max_attempts = 9")),
        );
}

#[test]
fn test_bad_base_url_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let output = poslink_cmd(home.path())
        .args(["-u", "ftp://pos.local", "logout"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("api.base_url"));
}

// ── Session ─────────────────────────────────────────────────────────

#[test]
fn test_token_without_login_exits_with_auth_code() {
    let home = tempfile::tempdir().unwrap();
    let config = write_config(home.path(), "http://127.0.0.1:9/api");
    poslink_cmd(home.path())
        .arg("--config")
        .arg(&config)
        .arg("token")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("no session token stored"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_login_persists_token_for_later_runs() {
    let backend = Backend::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "username": "cashier", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "jwt-cli",
            "user": { "id": 7, "username": "cashier" }
        })))
        .expect(1)
        .mount(&backend.server)
        .await;

    let output = run(backend.cmd(&["login", "cashier", "--password", "hunter2"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("\"username\": \"cashier\""));
    assert_eq!(
        std::fs::read_to_string(token_path(backend.home.path())).unwrap(),
        "jwt-cli"
    );

    let output = run(backend.cmd(&["token", "--show"])).await;
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "jwt-cli");

    let output = run(backend.cmd(&["logout"])).await;
    assert!(output.status.success());
    assert!(!token_path(backend.home.path()).exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rejected_login_exits_with_auth_code() {
    let backend = Backend::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid credentials" })),
        )
        .expect(1)
        .mount(&backend.server)
        .await;

    let output = run(backend.cmd(&["login", "cashier", "--password", "wrong"])).await;
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("Invalid credentials"));
    assert!(!token_path(backend.home.path()).exists());
}

// ── Requests ────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_request_sends_stored_token_and_prints_json() {
    let backend = Backend::start().await;
    std::fs::create_dir_all(backend.home.path().join("state")).unwrap();
    std::fs::write(token_path(backend.home.path()), "jwt-stored\n").unwrap();

    Mock::given(method("GET"))
        .and(path("/api/dashboard/stats"))
        .and(header("authorization", "Bearer jwt-stored"))
        .and(query_param("range", "today"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "totalSales": 12 })))
        .expect(1)
        .mount(&backend.server)
        .await;

    let output = run(backend.cmd(&["request", "get", "/dashboard/stats", "-q", "range=today"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body, json!({ "totalSales": 12 }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_not_found_exits_with_code_4() {
    let backend = Backend::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Product not found" })),
        )
        .expect(1)
        .mount(&backend.server)
        .await;

    let output = run(backend.cmd(&["products", "get", "missing"])).await;
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("Product not found"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_server_errors_exhaust_retries() {
    let backend = Backend::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reports/inventory"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&backend.server)
        .await;

    let output = run(backend.cmd(&["request", "get", "/reports/inventory"])).await;
    assert_eq!(output.status.code(), Some(7));
    assert!(combined_output(&output).contains("after 3 attempts"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_barcode_lookup_uses_query() {
    let backend = Backend::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(query_param("barcode", "8850999220017"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "p1" }])))
        .expect(1)
        .mount(&backend.server)
        .await;

    let output = run(backend.cmd(&["products", "barcode", "8850999220017"])).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("\"p1\""));
}

#[test]
fn test_malformed_header_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let config = write_config(home.path(), "http://127.0.0.1:9/api");
    poslink_cmd(home.path())
        .arg("--config")
        .arg(&config)
        .args(["request", "get", "/x", "-H", "no-colon-here"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Name: value"));
}
