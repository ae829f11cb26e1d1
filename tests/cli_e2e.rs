//! End-to-end CLI tests for the series-dl binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves a one-episode series whose file is `file_status` with `body`.
async fn mount_single_episode(server: &MockServer, file_status: u16, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path("/show.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "CLI Show",
            "servers": [{
                "name": "Primary",
                "episodes": [{"id": "1", "name": "Pilot", "link": "/episodes/1.json"}]
            }]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/episodes/1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "grabber": "/grabber",
            "params": {"token": "t", "options": ""}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/grabber"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"file": format!("{}/files/pilot.mp4", server.uri()), "label": "480p"}]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/pilot.mp4"))
        .respond_with(ResponseTemplate::new(file_status).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("series-dl").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Download every episode of a series"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let mut cmd = Command::cargo_bin("series-dl").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("series-dl"));
}

/// Test that a missing URL causes non-zero exit.
#[test]
fn test_binary_without_url_returns_error() {
    let mut cmd = Command::cargo_bin("series-dl").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("<URL>"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let mut cmd = Command::cargo_bin("series-dl").unwrap();
    cmd.args(["--invalid-flag", "https://example.com/show.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

/// Test that an unresolvable series is fatal with exit code 1.
#[test]
fn test_binary_unreachable_series_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("series-dl").unwrap();
    cmd.args(["--quiet", "-d"])
        .arg(temp_dir.path())
        .arg("http://127.0.0.1:9/show.json")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to resolve series"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_downloads_series() {
    let server = MockServer::start().await;
    mount_single_episode(&server, 200, b"pilot bytes").await;
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("series-dl").unwrap();
    cmd.args(["-l", "0", "-p", "S01E01 ", "-d"])
        .arg(temp_dir.path())
        .arg(format!("{}/show.json", server.uri()))
        .assert()
        .success()
        .stdout(predicate::str::contains("CLI Show"))
        .stdout(predicate::str::contains("Finished:"))
        .stdout(predicate::str::contains("Downloads finished."));

    let written = std::fs::read(temp_dir.path().join("S01E01 Pilot.mp4")).unwrap();
    assert_eq!(written, b"pilot bytes");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_failed_episode_exits_two() {
    let server = MockServer::start().await;
    mount_single_episode(&server, 404, b"").await;
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("series-dl").unwrap();
    cmd.args(["-l", "0", "-a", "2", "-d"])
        .arg(temp_dir.path())
        .arg(format!("{}/show.json", server.uri()))
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Failed:"))
        .stdout(predicate::str::contains("1 of 1 downloads failed."));
}
