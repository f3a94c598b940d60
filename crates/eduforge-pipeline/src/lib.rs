//! EduForge Pipeline
//!
//! Generates a grade-level lesson with a hosted model, reviews it, and runs at
//! most one refinement pass when the review fails.

pub mod config;
pub mod error;
pub mod generator;
pub mod model;
pub mod pipeline;
pub mod prompts;
pub mod reviewer;
pub mod schema;
pub mod state;

#[cfg(test)]
mod testing;

pub use config::{Config, LlmProvider, MAX_REFINEMENT_PASSES};
pub use error::{EduError, LlmErrorKind, Result};
pub use generator::ContentGenerator;
pub use model::{request_structured, ChatCompletionsClient, CompletionRequest, LanguageModel};
pub use pipeline::Pipeline;
pub use reviewer::ContentReviewer;
pub use schema::{
    ContentRequest, GeneratedContent, MultipleChoiceQuestion, ReviewResult, ReviewStatus,
    BLANK_TOPIC_MESSAGE, CONTENT_CONTRACT, MAX_GRADE, MCQ_COUNT, MIN_GRADE, OPTION_COUNT,
    REVIEW_CONTRACT,
};
pub use state::{PipelineStage, PipelineState, PipelineStep, RefineDecision, StepRecord};
