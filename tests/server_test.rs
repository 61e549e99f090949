//! End-to-end tests: a real listener on a random port, a throwaway git
//! repo, and a local stand-in for the Groq completion endpoint.

use axum::{http::StatusCode, routing::post, Json, Router};
use revd::{config::ReviewerConfig, server::ReviewServer, AppContext};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

// ── Fixtures ─────────────────────────────────────────────────────────────────

fn git(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .status()
        .expect("spawn git");
    assert!(status.success(), "git {args:?} failed");
}

fn init_repo_with_commits(dir: &Path, commits: usize) {
    git(dir, &["init", "-q"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "user.name", "Test"]);
    for n in 0..commits {
        std::fs::write(dir.join("code.js"), format!("console.log('x{n}')\n")).unwrap();
        git(dir, &["add", "code.js"]);
        git(dir, &["commit", "-q", "-m", &format!("commit {n}")]);
    }
}

/// Stand-in completion endpoint: always answers `status` with `body`.
async fn spawn_mock_api(status: StatusCode, body: Value) -> SocketAddr {
    let handler = move || {
        let body = body.clone();
        async move { (status, Json(body)) }
    };
    let app = Router::new().route("/chat/completions", post(handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn completion_body(content: &str) -> Value {
    json!({
        "choices": [
            { "message": { "role": "assistant", "content": content } }
        ]
    })
}

fn test_config(tmp: &TempDir, api_key: &str, groq_api_url: String) -> ReviewerConfig {
    ReviewerConfig {
        groq_api_key: api_key.to_string(),
        model: "llama-3.3-70b-versatile".to_string(),
        port: 0, // random free port
        auto_start: false,
        bind_address: "127.0.0.1".to_string(),
        groq_api_url,
        data_dir: tmp.path().join("data"),
        log: "error".to_string(),
        log_format: "pretty".to_string(),
    }
}

async fn start_daemon(
    tmp: &TempDir,
    repo: &Path,
    api_key: &str,
    groq_api_url: String,
) -> (ReviewServer, SocketAddr, Arc<AppContext>) {
    let config = test_config(tmp, api_key, groq_api_url);
    let ctx = Arc::new(AppContext::new(config, repo.to_path_buf()));
    let mut server = ReviewServer::new(ctx.clone());
    let addr = server.start().await.expect("server start");
    (server, addr, ctx)
}

async fn post_review(addr: SocketAddr) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/review-diff"))
        .json(&json!({}))
        .send()
        .await
        .expect("request");
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
    let body: Value = response.json().await.expect("json body");
    (status, body)
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_review_succeeds_with_clean_model_answer() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    std::fs::create_dir_all(&repo).unwrap();
    init_repo_with_commits(&repo, 2);

    let api = spawn_mock_api(StatusCode::OK, completion_body(r#"{"issues":[]}"#)).await;
    let (mut server, addr, ctx) =
        start_daemon(&tmp, &repo, "gsk_test", format!("http://{api}")).await;

    // Subscribe before triggering so the completion event is observable.
    let mut events = ctx.broadcaster.subscribe();

    let (status, body) = post_review(addr).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["review"]["issues"], json!([]));

    // The result callback fired exactly once.
    let event = tokio::time::timeout(std::time::Duration::from_secs(2), events.recv())
        .await
        .expect("event within deadline")
        .expect("event");
    let event: Value = serde_json::from_str(&event).unwrap();
    assert_eq!(event["method"], json!("review.completed"));
    assert_eq!(event["params"]["review"]["issues"], json!([]));
    assert!(events.try_recv().is_err(), "only one event per review");

    server.stop().await;
}

#[tokio::test]
async fn test_fenced_model_answer_normalizes() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    std::fs::create_dir_all(&repo).unwrap();
    init_repo_with_commits(&repo, 2);

    let content = "```json\n{\"issues\":[{\"title\":\"Debug logging\"}]}\n```";
    let api = spawn_mock_api(StatusCode::OK, completion_body(content)).await;
    let (mut server, addr, _ctx) =
        start_daemon(&tmp, &repo, "gsk_test", format!("http://{api}")).await;

    let (status, body) = post_review(addr).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["review"]["issues"][0]["title"], json!("Debug logging"));
    // Missing fields render as empty placeholders, not parse failures.
    assert_eq!(body["review"]["issues"][0]["suggested_fix"], json!(""));

    server.stop().await;
}

#[tokio::test]
async fn test_unparseable_model_answer_degrades_to_parse_error_issue() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    std::fs::create_dir_all(&repo).unwrap();
    init_repo_with_commits(&repo, 2);

    let api = spawn_mock_api(
        StatusCode::OK,
        completion_body("Sure! Here is my review of the diff."),
    )
    .await;
    let (mut server, addr, _ctx) =
        start_daemon(&tmp, &repo, "gsk_test", format!("http://{api}")).await;

    let (status, body) = post_review(addr).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["review"]["issues"][0]["title"], json!("Parse Error"));

    server.stop().await;
}

#[tokio::test]
async fn test_first_commit_reports_no_diff_without_calling_the_api() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    std::fs::create_dir_all(&repo).unwrap();
    init_repo_with_commits(&repo, 1);

    // Dead endpoint: any attempted call would surface as a 500, not this 200.
    let (mut server, addr, _ctx) =
        start_daemon(&tmp, &repo, "gsk_test", "http://127.0.0.1:9".to_string()).await;

    let (status, body) = post_review(addr).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("No diff found"));

    server.stop().await;
}

#[tokio::test]
async fn test_missing_api_key_fails_fast() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    std::fs::create_dir_all(&repo).unwrap();
    init_repo_with_commits(&repo, 2);

    // Dead endpoint again: proves the failure is pre-network.
    let (mut server, addr, _ctx) =
        start_daemon(&tmp, &repo, "", "http://127.0.0.1:9".to_string()).await;

    let (status, body) = post_review(addr).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], json!(false));
    let message = body["error"].as_str().unwrap();
    assert!(
        message.starts_with("Groq API key not configured"),
        "unexpected error: {message}"
    );

    server.stop().await;
}

#[tokio::test]
async fn test_upstream_rate_limit_surfaces_status_and_message() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    std::fs::create_dir_all(&repo).unwrap();
    init_repo_with_commits(&repo, 2);

    let api = spawn_mock_api(
        StatusCode::TOO_MANY_REQUESTS,
        json!({ "error": { "message": "Rate limit reached", "type": "tokens" } }),
    )
    .await;
    let (mut server, addr, _ctx) =
        start_daemon(&tmp, &repo, "gsk_test", format!("http://{api}")).await;

    let (status, body) = post_review(addr).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("429"), "unexpected error: {message}");
    assert!(message.contains("Rate limit reached"), "unexpected error: {message}");

    server.stop().await;
}

#[tokio::test]
async fn test_health_endpoint() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    std::fs::create_dir_all(&repo).unwrap();
    init_repo_with_commits(&repo, 1);

    let (mut server, addr, _ctx) =
        start_daemon(&tmp, &repo, "gsk_test", "http://127.0.0.1:9".to_string()).await;

    let body: Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], json!("ok"));
    assert!(body["version"].is_string());

    server.stop().await;
}

#[tokio::test]
async fn test_start_twice_is_a_noop_and_stop_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    std::fs::create_dir_all(&repo).unwrap();
    init_repo_with_commits(&repo, 1);

    let (mut server, addr, _ctx) =
        start_daemon(&tmp, &repo, "gsk_test", "http://127.0.0.1:9".to_string()).await;

    let again = server.start().await.expect("second start");
    assert_eq!(again, addr, "second start should report the bound address");
    assert!(server.is_running());

    server.stop().await;
    assert!(!server.is_running());
    server.stop().await; // idempotent
}
