//! Shared fixtures: a fake chat-completions upstream and pipeline wiring.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use eduforge_pipeline::{ChatCompletionsClient, Config, Pipeline};
use serde_json::{json, Value};

/// How the fake upstream answers.
#[derive(Debug, Clone, Copy)]
pub enum Behaviour {
    /// Valid lessons; every review passes.
    Pass,
    /// Valid lessons; every review fails with `["x"]`.
    Fail,
    /// Valid lessons wrapped in code fences; reviews pass.
    Fenced,
    /// Lessons with only two questions.
    ShortLesson,
    /// Every request fails with this HTTP status.
    Status(u16),
}

/// A running fake upstream.
pub struct Upstream {
    /// Base URL to configure as `baseUrl`.
    pub base_url: String,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl Upstream {
    /// Request bodies received so far.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// Number of requests received so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    /// Configuration pointing the production client at this upstream.
    pub fn config(&self) -> Config {
        Config {
            api_key: "test-key".to_string(),
            base_url: Some(self.base_url.clone()),
            ..Config::default()
        }
    }

    /// A pipeline using the production chat-completions client.
    pub fn pipeline(&self) -> Pipeline {
        let config = self.config();
        Pipeline::from_config(&config, Arc::new(ChatCompletionsClient::from_config(&config)))
    }
}

type Shared = (Behaviour, Arc<Mutex<Vec<Value>>>);

/// Starts a fake upstream on an ephemeral loopback port.
pub async fn spawn_upstream(behaviour: Behaviour) -> Upstream {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
        .route("/chat/completions", post(handle_completion))
        .with_state((behaviour, Arc::clone(&requests)));

    let base_url = serve(router).await;
    Upstream { base_url, requests }
}

/// Serves `router` on 127.0.0.1 with an ephemeral port; returns `http://addr`.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });
    format!("http://{addr}")
}

async fn handle_completion(
    State((behaviour, requests)): State<Shared>,
    Json(body): Json<Value>,
) -> Response {
    let user = body["messages"][1]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    requests.lock().expect("requests lock").push(body);

    let is_review = user.contains("Content to review:");
    let content = match behaviour {
        Behaviour::Status(code) => {
            let status = StatusCode::from_u16(code).expect("valid status");
            return (
                status,
                Json(json!({"error": {"message": "fake upstream error"}})),
            )
                .into_response();
        }
        Behaviour::Pass | Behaviour::Fenced if is_review => review(true),
        Behaviour::Fail if is_review => review(false),
        Behaviour::ShortLesson if is_review => review(true),
        Behaviour::ShortLesson => lesson(2, &user),
        Behaviour::Fenced => format!("```json\n{}\n```", lesson(3, &user)),
        Behaviour::Pass | Behaviour::Fail => lesson(3, &user),
    };

    Json(json!({
        "id": "chatcmpl-test",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    }))
    .into_response()
}

fn lesson(questions: usize, user: &str) -> String {
    let refined = user.contains("Reviewer feedback:");
    let mcq = json!({
        "question": "Which angle is exactly 90 degrees?",
        "options": ["A) Acute", "B) Right", "C) Obtuse", "D) Straight"],
        "answer": "B"
    });
    json!({
        "explanation": if refined {
            "A right angle is a square corner."
        } else {
            "An angle is formed where two lines meet."
        },
        "mcqs": vec![mcq; questions]
    })
    .to_string()
}

fn review(pass: bool) -> String {
    if pass {
        json!({"status": "pass", "feedback": []}).to_string()
    } else {
        json!({"status": "fail", "feedback": ["x"]}).to_string()
    }
}
