//! EduForge Rendering
//!
//! Turns a finished [`PipelineState`] into the four display regions shown to
//! the user: the pipeline flow, the generated draft, the review feedback, and
//! the refined output.
//!
//! # Renderers
//!
//! - [`Panes`] - Markdown panes, used by the CLI and the JSON API
//! - [`HtmlPanes`] - escaped HTML fragments, used by the web form
//! - [`json::JsonGenerator`] - compact or pretty JSON of the whole state
//!
//! # Example
//!
//! ```rust
//! use eduforge_render::Panes;
//!
//! let panes = Panes::blank_topic();
//! assert_eq!(panes.draft, "⚠️ Please enter a topic.");
//! assert!(panes.review.is_empty());
//! ```

mod html;
pub mod json;
mod markdown;

pub use html::{escape_html, HtmlPanes};
pub use markdown::{format_content, format_error, format_flow, format_review};

use eduforge_pipeline::{PipelineState, PipelineStep, BLANK_TOPIC_MESSAGE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shown in the refined pane when no refinement ran.
pub const NO_REFINEMENT_MESSAGE: &str = "No refinement needed — content passed review.";

/// Separator between the refined content and its review.
const REFINED_REVIEW_SEPARATOR: &str = "\n\n---\n\n";

/// Tab titles, in display order: draft, review, refined.
pub const TAB_TITLES: [&str; 3] = ["📝 Generated Draft", "🔍 Review Feedback", "✨ Refined Output"];

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Failed to serialize the state to JSON.
    #[error("failed to serialize pipeline state: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to write rendered output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;

// ============================================================================
// Panes
// ============================================================================

/// The four display regions, as Markdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panes {
    /// Pipeline flow indicator.
    pub flow: String,
    /// Generated draft, or the warning/error message.
    pub draft: String,
    /// Review of the draft.
    pub review: String,
    /// Refined content with its review, or the no-refinement note.
    pub refined: String,
}

impl Panes {
    /// Renders a finished run.
    #[must_use]
    pub fn from_state(state: &PipelineState) -> Self {
        let refined = match &state.refined {
            Some(refined) => {
                let mut pane = format_content(refined);
                if let Some(review) = &state.review_refined {
                    pane.push_str(REFINED_REVIEW_SEPARATOR);
                    pane.push_str(&format_review(review));
                }
                pane
            }
            None => format!("_{NO_REFINEMENT_MESSAGE}_"),
        };

        Self {
            flow: format_flow(state),
            draft: state.draft.as_ref().map(format_content).unwrap_or_default(),
            review: state.review.as_ref().map(format_review).unwrap_or_default(),
            refined,
        }
    }

    /// Panes for a blank topic: only the warning, in the draft region.
    #[must_use]
    pub fn blank_topic() -> Self {
        Self {
            draft: format!("⚠️ {BLANK_TOPIC_MESSAGE}"),
            ..Self::default()
        }
    }

    /// Panes for a failed run: the error, in the draft region.
    #[must_use]
    pub fn error(error: &dyn std::fmt::Display) -> Self {
        Self {
            draft: format_error(error),
            ..Self::default()
        }
    }

    /// Joins the panes into one Markdown document with a heading per tab.
    #[must_use]
    pub fn to_document(&self) -> String {
        let mut sections = Vec::with_capacity(4);
        if !self.flow.is_empty() {
            sections.push(self.flow.trim_end().to_string());
        }
        for (title, body) in TAB_TITLES.iter().zip([&self.draft, &self.review, &self.refined]) {
            if !body.is_empty() {
                sections.push(format!("## {title}\n\n{}", body.trim_end()));
            }
        }
        let mut document = sections.join("\n\n");
        document.push('\n');
        document
    }
}

/// The steps a finished run went through, in order.
#[must_use]
pub fn flow_steps(state: &PipelineState) -> Vec<PipelineStep> {
    let mut steps = vec![PipelineStep::Generate, PipelineStep::Review];
    if state.was_refined() {
        steps.extend([PipelineStep::Refine, PipelineStep::ReviewRefined]);
    }
    steps
}
