//! Lesson generation and refinement.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::Result;
use crate::model::{request_structured, LanguageModel};
use crate::prompts;
use crate::schema::{ContentRequest, GeneratedContent, CONTENT_CONTRACT};

/// Produces lesson drafts and refined versions of them.
///
/// Each call is exactly one model request; nothing is cached or retried.
#[derive(Clone)]
pub struct ContentGenerator {
    model: Arc<dyn LanguageModel>,
    temperature: f32,
}

impl ContentGenerator {
    /// Creates a generator sampling at `temperature`.
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, temperature: f32) -> Self {
        Self { model, temperature }
    }

    /// Generates the first draft for `request`.
    ///
    /// # Errors
    ///
    /// Propagates provider errors, and returns [`crate::EduError::SchemaError`]
    /// when the reply is not a valid lesson.
    pub async fn generate(&self, request: &ContentRequest) -> Result<GeneratedContent> {
        info!(grade = request.grade, topic = %request.topic, "Generating draft");
        let prompt = prompts::generate(request);
        self.ask(prompt).await
    }

    /// Rewrites `previous` so that every item in `feedback` is addressed.
    ///
    /// # Errors
    ///
    /// Same as [`ContentGenerator::generate`].
    pub async fn refine(
        &self,
        request: &ContentRequest,
        previous: &GeneratedContent,
        feedback: &[String],
    ) -> Result<GeneratedContent> {
        info!(
            grade = request.grade,
            topic = %request.topic,
            issues = feedback.len(),
            "Refining draft"
        );
        let prompt = prompts::refine(request, previous, feedback)?;
        self.ask(prompt).await
    }

    async fn ask(&self, prompt: prompts::Prompt) -> Result<GeneratedContent> {
        let content: GeneratedContent =
            request_structured(self.model.as_ref(), CONTENT_CONTRACT, prompt, self.temperature)
                .await?;
        content.validate()?;
        debug!(mcqs = content.mcqs.len(), "Lesson accepted");
        Ok(content)
    }
}

impl std::fmt::Debug for ContentGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentGenerator")
            .field("model", &self.model.model_name())
            .field("temperature", &self.temperature)
            .finish()
    }
}
