//! Integration tests for the JSON manifest resolver and HTTP byte source.
//!
//! These tests verify resolution and full downloads against mock HTTP servers.

use std::sync::Arc;
use std::time::Duration;

use seriesdl_core::{
    BatchConfig, DownloadError, HttpClient, LinkResolver, ManifestResolver, RateLimiter,
    ResolveError, SeriesResolver, TaskStatus, select_quality, start_series,
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mounts a series manifest with two servers at `/show.json`.
async fn mount_series(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/show.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Test Show",
            "servers": [
                {
                    "name": "Primary",
                    "episodes": [
                        {"id": "101", "name": "Episode 1", "link": "/episodes/101.json"},
                        {"id": "102", "name": "Episode 2", "link": "/episodes/102.json"}
                    ]
                },
                {
                    "name": " Mirror ",
                    "episodes": [
                        {"id": "201", "name": "Episode 1", "link": "/mirror/201.json"}
                    ]
                }
            ]
        })))
        .mount(server)
        .await;
}

/// Mounts the two-step link resolution and the payload for episode `id`.
async fn mount_episode(server: &MockServer, id: &str, payload: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/episodes/{id}.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "grabber": "/grabber",
            "params": {"token": format!("tok-{id}"), "options": "hd"}
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/grabber"))
        .and(query_param("id", id))
        .and(query_param("token", format!("tok-{id}").as_str()))
        .and(query_param("options", "hd"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"file": format!("{}/files/{id}-360.mp4", server.uri()), "label": "360p"},
                {"file": format!("{}/files/{id}-720.mp4", server.uri()), "label": "720p"}
            ]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/files/{id}-720.mp4")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.to_vec()))
        .mount(server)
        .await;
}

// ==================== Series resolution ====================

#[tokio::test]
async fn test_resolve_series_uses_first_server_and_absolute_links() {
    let server = MockServer::start().await;
    mount_series(&server).await;

    let resolver = ManifestResolver::new(HttpClient::new(), None);
    let series = resolver
        .resolve_series(&format!("{}/show.json", server.uri()))
        .await
        .unwrap();

    assert_eq!(series.title, "Test Show");
    assert_eq!(series.server, "Primary");
    assert_eq!(series.items.len(), 2);
    assert_eq!(series.items[0].name, "Episode 1");
    assert_eq!(
        series.items[1].locator,
        format!("{}/episodes/102.json", server.uri())
    );
}

#[tokio::test]
async fn test_resolve_series_honours_forced_server() {
    let server = MockServer::start().await;
    mount_series(&server).await;

    let resolver = ManifestResolver::new(HttpClient::new(), Some("Mirror".to_string()));
    let series = resolver
        .resolve_series(&format!("{}/show.json", server.uri()))
        .await
        .unwrap();

    assert_eq!(series.server, "Mirror");
    assert_eq!(series.items.len(), 1);
    assert_eq!(series.items[0].id, "201");
}

#[tokio::test]
async fn test_resolve_series_without_servers_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/empty.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"title": "Empty", "servers": []})),
        )
        .mount(&server)
        .await;

    let resolver = ManifestResolver::new(HttpClient::new(), None);
    let result = resolver
        .resolve_series(&format!("{}/empty.json", server.uri()))
        .await;

    assert!(matches!(result, Err(ResolveError::NoServers { .. })));
}

#[tokio::test]
async fn test_resolve_series_malformed_body_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let resolver = ManifestResolver::new(HttpClient::new(), None);
    let result = resolver
        .resolve_series(&format!("{}/broken.json", server.uri()))
        .await;

    assert!(matches!(result, Err(ResolveError::Malformed { .. })));
}

#[tokio::test]
async fn test_resolve_series_http_404_is_error() {
    let server = MockServer::start().await;

    let resolver = ManifestResolver::new(HttpClient::new(), None);
    let result = resolver
        .resolve_series(&format!("{}/missing.json", server.uri()))
        .await;

    match result {
        Err(ResolveError::Http { source }) => {
            assert!(matches!(*source, DownloadError::HttpStatus { status: 404, .. }));
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

// ==================== Link resolution ====================

#[tokio::test]
async fn test_resolve_sources_follows_grabber() {
    let server = MockServer::start().await;
    mount_series(&server).await;
    mount_episode(&server, "101", b"payload").await;

    let resolver = ManifestResolver::new(HttpClient::new(), None);
    let series = resolver
        .resolve_series(&format!("{}/show.json", server.uri()))
        .await
        .unwrap();
    let files = resolver
        .resolve_sources(&series.items[0], &RateLimiter::disabled())
        .await
        .unwrap();

    assert_eq!(files.len(), 2);
    let chosen = select_quality(&files, None).unwrap();
    assert_eq!(chosen.quality, "720p");
    assert_eq!(chosen.url, format!("{}/files/101-720.mp4", server.uri()));
}

#[tokio::test]
async fn test_resolve_sources_waits_for_rate_limiter_between_requests() {
    let server = MockServer::start().await;
    mount_series(&server).await;
    mount_episode(&server, "101", b"payload").await;

    let resolver = ManifestResolver::new(HttpClient::new(), None);
    let series = resolver
        .resolve_series(&format!("{}/show.json", server.uri()))
        .await
        .unwrap();

    let interval = Duration::from_millis(150);
    let limiter = RateLimiter::new(interval);
    let first = limiter.acquire().await;
    resolver
        .resolve_sources(&series.items[0], &limiter)
        .await
        .unwrap();

    assert!(first.elapsed() >= interval);
}

// ==================== Full download ====================

#[tokio::test]
async fn test_start_series_downloads_over_http() {
    let server = MockServer::start().await;
    mount_series(&server).await;
    mount_episode(&server, "101", b"first episode bytes").await;
    mount_episode(&server, "102", &vec![7u8; 50_000]).await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    let client = HttpClient::new();
    let config = BatchConfig {
        output_dir: temp_dir.path().join("show"),
        prefix: "Show - ".to_string(),
        rate_limit: Duration::ZERO,
        ..BatchConfig::default()
    };
    let run = start_series(
        &config,
        &format!("{}/show.json", server.uri()),
        Arc::new(ManifestResolver::new(client.clone(), None)),
        Arc::new(client),
    )
    .await
    .unwrap();
    let monitor = run.handle.monitor();
    let summary = run.handle.wait().await;

    assert!(summary.all_finished(), "summary: {summary:?}");
    let first = std::fs::read(temp_dir.path().join("show/Show - Episode 1.mp4")).unwrap();
    assert_eq!(first, b"first episode bytes");
    let second = std::fs::read(temp_dir.path().join("show/Show - Episode 2.mp4")).unwrap();
    assert_eq!(second.len(), 50_000);

    for view in monitor.snapshot() {
        assert_eq!(view.status, TaskStatus::Finished);
        assert_eq!(view.resolved_quality, "720p");
    }
}

#[tokio::test]
async fn test_missing_file_fails_after_every_attempt() {
    let server = MockServer::start().await;
    mount_series(&server).await;

    Mock::given(method("GET"))
        .and(path("/episodes/101.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "grabber": "/grabber",
            "params": {"token": "t", "options": "hd"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/grabber"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"file": format!("{}/files/gone.mp4", server.uri()), "label": "720p"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/gone.mp4"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let client = HttpClient::new();
    let config = BatchConfig {
        output_dir: temp_dir.path().to_path_buf(),
        episodes: vec!["Episode 1".to_string()],
        max_attempts: 2,
        rate_limit: Duration::ZERO,
        ..BatchConfig::default()
    };
    let run = start_series(
        &config,
        &format!("{}/show.json", server.uri()),
        Arc::new(ManifestResolver::new(client.clone(), None)),
        Arc::new(client),
    )
    .await
    .unwrap();
    let monitor = run.handle.monitor();
    let summary = run.handle.wait().await;

    assert_eq!(summary.total, 1);
    assert_eq!(summary.failed, 1);
    let view = &monitor.snapshot()[0];
    assert_eq!(view.status, TaskStatus::Failed);
    assert_eq!(view.attempts_used, 2);
}
