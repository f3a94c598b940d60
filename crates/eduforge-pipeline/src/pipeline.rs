//! The generate → review → refine orchestrator.
//!
//! A run is a walk over [`PipelineStage`]: each iteration dispatches on the
//! current stage, performs at most one model call, and records the result
//! through a checked transition. The walk always ends in `Done` after two or
//! four model calls, or stops early at the first error.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{EduError, Result};
use crate::generator::ContentGenerator;
use crate::model::LanguageModel;
use crate::reviewer::ContentReviewer;
use crate::schema::ContentRequest;
use crate::state::{PipelineStage, PipelineState, PipelineStep, RefineDecision, StepRecord};

/// Runs the generate/review/refine workflow for one request at a time.
#[derive(Debug, Clone)]
pub struct Pipeline {
    generator: ContentGenerator,
    reviewer: ContentReviewer,
    max_refinement_passes: u32,
    model_name: String,
}

impl Pipeline {
    /// Assembles a pipeline from its collaborators.
    #[must_use]
    pub fn new(
        generator: ContentGenerator,
        reviewer: ContentReviewer,
        max_refinement_passes: u32,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            reviewer,
            max_refinement_passes,
            model_name: model_name.into(),
        }
    }

    /// Builds the generator and reviewer around `model` using the configured
    /// temperatures and refinement bound.
    #[must_use]
    pub fn from_config(config: &Config, model: Arc<dyn LanguageModel>) -> Self {
        let model_name = model.model_name().to_string();
        Self::new(
            ContentGenerator::new(Arc::clone(&model), config.generation_temperature),
            ContentReviewer::new(model, config.review_temperature),
            config.max_refinement_passes,
            model_name,
        )
    }

    /// Name of the model every step talks to.
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Maximum number of refinement passes.
    #[must_use]
    pub const fn max_refinement_passes(&self) -> u32 {
        self.max_refinement_passes
    }

    /// Runs the whole workflow for `request` and returns the final state.
    ///
    /// # Errors
    ///
    /// Returns [`EduError::InvalidRequest`] before any model call if the
    /// request is invalid. Provider and schema errors from any step are
    /// returned unchanged and end the run.
    pub async fn run(&self, request: ContentRequest) -> Result<PipelineState> {
        request.validate()?;
        info!(
            grade = request.grade,
            topic = %request.topic,
            model = %self.model_name,
            "Starting pipeline run"
        );

        let mut state = PipelineState::new(request);
        while !state.is_terminal() {
            self.step(&mut state).await?;
            debug!(stage = %state.stage, pass = state.pass_number, "Pipeline advanced");
        }

        info!(
            passed = state.final_review().is_some_and(crate::ReviewResult::passed),
            refined = state.was_refined(),
            calls = state.history.len(),
            elapsed_ms = state.elapsed().num_milliseconds(),
            "Pipeline run complete"
        );
        Ok(state)
    }

    async fn step(&self, state: &mut PipelineState) -> Result<()> {
        match state.stage {
            PipelineStage::Start => {
                let started = Utc::now();
                let draft = self.generator.generate(&state.request).await?;
                state.record_draft(draft, StepRecord::new(PipelineStep::Generate, started, Utc::now()))
            }
            PipelineStage::Generated => {
                let started = Utc::now();
                let draft = state
                    .draft
                    .as_ref()
                    .ok_or_else(|| missing(state.stage, PipelineStage::Reviewed))?;
                let review = self.reviewer.review(&state.request, draft).await?;
                state.record_review(review, StepRecord::new(PipelineStep::Review, started, Utc::now()))
            }
            PipelineStage::Reviewed => match state.refine_decision(self.max_refinement_passes)? {
                RefineDecision::Done => state.finish(),
                RefineDecision::Refine => state.begin_refinement(),
            },
            PipelineStage::Refining => {
                let started = Utc::now();
                let (Some(draft), Some(review)) = (state.draft.as_ref(), state.review.as_ref())
                else {
                    return Err(missing(state.stage, PipelineStage::Refined));
                };
                let refined = self
                    .generator
                    .refine(&state.request, draft, &review.feedback)
                    .await?;
                state.record_refined(refined, StepRecord::new(PipelineStep::Refine, started, Utc::now()))
            }
            PipelineStage::Refined => {
                let started = Utc::now();
                let refined = state
                    .refined
                    .as_ref()
                    .ok_or_else(|| missing(state.stage, PipelineStage::ReReviewed))?;
                let review = self.reviewer.review(&state.request, refined).await?;
                state.record_refined_review(
                    review,
                    StepRecord::new(PipelineStep::ReviewRefined, started, Utc::now()),
                )
            }
            PipelineStage::ReReviewed => state.finish(),
            PipelineStage::Done => Ok(()),
        }
    }
}

fn missing(from: PipelineStage, to: PipelineStage) -> EduError {
    EduError::invalid_transition(from, to)
}
