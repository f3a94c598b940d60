//! Scripted model for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{EduError, Result};
use crate::model::{CompletionRequest, LanguageModel};

/// A call observed by [`ScriptedModel`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub contract: &'static str,
    pub temperature: f32,
    pub user: String,
}

/// Replays queued replies in order and records every request.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedModel {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String>>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::default(),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn contracts(&self) -> Vec<&'static str> {
        self.calls().iter().map(|c| c.contract).collect()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.calls.lock().unwrap().push(RecordedCall {
            contract: request.contract,
            temperature: request.temperature,
            user: request.user.clone(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(EduError::invalid_request("script exhausted")))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// A valid lesson reply whose explanation carries `marker`.
pub fn content_json(marker: &str) -> String {
    let mcq = serde_json::json!({
        "question": "Which angle is exactly 90 degrees?",
        "options": ["A) Acute", "B) Right", "C) Obtuse", "D) Straight"],
        "answer": "B"
    });
    serde_json::json!({
        "explanation": format!("Angles measure turns. {marker}"),
        "mcqs": [mcq, mcq, mcq]
    })
    .to_string()
}

pub fn pass_json() -> String {
    r#"{"status": "pass", "feedback": []}"#.to_string()
}

pub fn fail_json(issue: &str) -> String {
    serde_json::json!({"status": "fail", "feedback": [issue]}).to_string()
}
