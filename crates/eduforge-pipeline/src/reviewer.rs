//! Lesson review.

use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::model::{request_structured, LanguageModel};
use crate::prompts;
use crate::schema::{ContentRequest, GeneratedContent, ReviewResult, REVIEW_CONTRACT};

/// Judges a lesson against age appropriateness, correctness and clarity.
#[derive(Clone)]
pub struct ContentReviewer {
    model: Arc<dyn LanguageModel>,
    temperature: f32,
}

impl ContentReviewer {
    /// Creates a reviewer sampling at `temperature`.
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, temperature: f32) -> Self {
        Self { model, temperature }
    }

    /// Reviews `content` written for `request`.
    ///
    /// # Errors
    ///
    /// Propagates provider errors, and returns [`crate::EduError::SchemaError`]
    /// when the verdict and feedback disagree or the reply does not parse.
    pub async fn review(
        &self,
        request: &ContentRequest,
        content: &GeneratedContent,
    ) -> Result<ReviewResult> {
        let prompt = prompts::review(request, content)?;
        let review: ReviewResult =
            request_structured(self.model.as_ref(), REVIEW_CONTRACT, prompt, self.temperature)
                .await?;
        review.validate()?;
        info!(
            status = %review.status,
            issues = review.feedback.len(),
            "Review complete"
        );
        Ok(review)
    }
}

impl std::fmt::Debug for ContentReviewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentReviewer")
            .field("model", &self.model.model_name())
            .field("temperature", &self.temperature)
            .finish()
    }
}
