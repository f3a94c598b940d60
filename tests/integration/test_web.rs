//! Integration tests for the web server: a real listener driven over HTTP,
//! backed by a fake chat-completions upstream.

mod common;

use common::{serve, spawn_upstream, Behaviour, Upstream};
use eduforge_web::{create_router, AppState, ErrorResponse, HealthResponse, RunResponse};

/// Spawns the EduForge server against `upstream` and returns its base URL.
async fn spawn_app(upstream: &Upstream) -> String {
    let state = AppState::new(upstream.config(), upstream.pipeline());
    serve(create_router(state)).await
}

async fn post_form(base: &str, body: &'static str) -> String {
    reqwest::Client::new()
        .post(format!("{base}/"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body(body)
        .send()
        .await
        .expect("Failed to submit form")
        .text()
        .await
        .expect("Failed to read body")
}

#[tokio::test]
async fn test_form_page_is_served() {
    let upstream = spawn_upstream(Behaviour::Pass).await;
    let base = spawn_app(&upstream).await;

    let response = reqwest::get(format!("{base}/")).await.expect("GET /");
    assert!(response.status().is_success());
    let html = response.text().await.expect("body");

    assert!(html.contains("Generate &amp; Review"));
    assert!(html.contains("placeholder=\"e.g. Types of angles\""));
    assert!(html.contains("id=\"spinner\""));
}

#[tokio::test]
async fn test_form_submit_renders_panes() {
    let upstream = spawn_upstream(Behaviour::Fail).await;
    let base = spawn_app(&upstream).await;

    let html = post_form(&base, "grade=4&topic=Types+of+angles").await;

    assert!(html.contains("Pipeline Flow"));
    assert!(html.contains("A right angle is a square corner."));
    assert!(html.contains("badge fail"));
    assert_eq!(upstream.call_count(), 4);
}

#[tokio::test]
async fn test_form_blank_topic_never_calls_upstream() {
    let upstream = spawn_upstream(Behaviour::Pass).await;
    let base = spawn_app(&upstream).await;

    let html = post_form(&base, "grade=4&topic=").await;

    assert!(html.contains("Please enter a topic."));
    assert_eq!(upstream.call_count(), 0);
}

#[tokio::test]
async fn test_form_bad_grade_renders_page_with_error() {
    let upstream = spawn_upstream(Behaviour::Pass).await;
    let base = spawn_app(&upstream).await;

    for body in ["grade=300&topic=Fractions", "grade=&topic=Fractions"] {
        let response = reqwest::Client::new()
            .post(format!("{base}/"))
            .header("content-type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .expect("Failed to submit form");
        assert_eq!(response.status().as_u16(), 200, "{body}");

        let html = response.text().await.expect("Failed to read body");
        assert!(html.contains("<strong>Error:</strong>"), "{body}");
        assert!(html.contains("Grade must be"), "{body}");
    }
    assert_eq!(upstream.call_count(), 0);
}

#[tokio::test]
async fn test_form_shows_upstream_error() {
    let upstream = spawn_upstream(Behaviour::Status(401)).await;
    let base = spawn_app(&upstream).await;

    let html = post_form(&base, "grade=4&topic=Fractions").await;

    assert!(html.contains("<strong>Error:</strong>"));
    assert!(html.contains("authentication"));
}

#[tokio::test]
async fn test_api_run_round_trip() {
    let upstream = spawn_upstream(Behaviour::Pass).await;
    let base = spawn_app(&upstream).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/run"))
        .json(&serde_json::json!({"grade": 4, "topic": "Types of angles"}))
        .send()
        .await
        .expect("POST /api/run");
    assert_eq!(response.status().as_u16(), 200);

    let run: RunResponse = response.json().await.expect("run response");
    assert!(run.state.is_terminal());
    assert!(run.state.refined.is_none());
    assert!(run.panes.flow.ends_with("**Generate** ➜ **Review**"));
    assert!(run.panes.review.contains("_No issues found._"));
}

#[tokio::test]
async fn test_api_run_errors() {
    let upstream = spawn_upstream(Behaviour::Status(500)).await;
    let base = spawn_app(&upstream).await;
    let client = reqwest::Client::new();

    let blank = client
        .post(format!("{base}/api/run"))
        .json(&serde_json::json!({"grade": 4, "topic": ""}))
        .send()
        .await
        .expect("POST /api/run");
    assert_eq!(blank.status().as_u16(), 422);
    let error: ErrorResponse = blank.json().await.expect("error body");
    assert_eq!(error.error, "Please enter a topic.");
    assert_eq!(upstream.call_count(), 0);

    let failed = client
        .post(format!("{base}/api/run"))
        .json(&serde_json::json!({"grade": 4, "topic": "Fractions"}))
        .send()
        .await
        .expect("POST /api/run");
    assert_eq!(failed.status().as_u16(), 502);
    let error: ErrorResponse = failed.json().await.expect("error body");
    assert!(error.error.contains("server"));
}

#[tokio::test]
async fn test_health() {
    let upstream = spawn_upstream(Behaviour::Pass).await;
    let base = spawn_app(&upstream).await;

    let health: HealthResponse = reqwest::get(format!("{base}/api/health"))
        .await
        .expect("GET /api/health")
        .json()
        .await
        .expect("health body");

    assert_eq!(health.status, "ok");
    assert_eq!(health.model, "llama-3.1-8b-instant");
}

#[tokio::test]
async fn test_concurrent_submissions_all_complete() {
    let upstream = spawn_upstream(Behaviour::Pass).await;
    let base = spawn_app(&upstream).await;

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let base = base.clone();
            tokio::spawn(async move { post_form(&base, "grade=2&topic=Shapes").await })
        })
        .collect();

    for handle in handles {
        let html = handle.await.expect("task");
        assert!(html.contains("Pipeline Flow"));
    }
    assert_eq!(upstream.call_count(), 6);
}
