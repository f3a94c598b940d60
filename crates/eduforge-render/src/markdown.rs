//! Markdown formatting of lessons, reviews and the pipeline flow.
//!
//! Model text is inserted as-is: explanations and questions may carry their
//! own Markdown, and the panes are meant to be rendered, not re-parsed.

use std::fmt::Write;

use eduforge_pipeline::{GeneratedContent, PipelineState, ReviewResult};

use crate::flow_steps;

/// Formats a lesson: explanation section, then numbered questions.
///
/// # Example
///
/// ```rust
/// use eduforge_pipeline::{GeneratedContent, MultipleChoiceQuestion};
/// use eduforge_render::format_content;
///
/// let content = GeneratedContent {
///     explanation: "Plants make food from light.".to_string(),
///     mcqs: vec![MultipleChoiceQuestion {
///         question: "What do plants need?".to_string(),
///         options: vec!["A) Light".into(), "B) Sand".into(), "C) Salt".into(), "D) Ice".into()],
///         answer: "A".to_string(),
///     }],
/// };
/// let markdown = format_content(&content);
/// assert!(markdown.contains("**Q1. What do plants need?**"));
/// assert!(markdown.contains("✅ **Answer:** A"));
/// ```
#[must_use]
pub fn format_content(content: &GeneratedContent) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "### 📖 Explanation\n");
    let _ = writeln!(output, "{}\n", content.explanation);
    let _ = writeln!(output, "### ❓ MCQs");

    for (i, mcq) in content.mcqs.iter().enumerate() {
        let _ = writeln!(output, "\n**Q{}. {}**", i + 1, mcq.question);
        for option in &mcq.options {
            let _ = writeln!(output, "- {option}");
        }
        let _ = writeln!(output, "  \n✅ **Answer:** {}", mcq.answer);
    }

    output
}

/// Formats a review: status badge, then feedback bullets or a no-issues note.
#[must_use]
pub fn format_review(review: &ReviewResult) -> String {
    let badge = if review.passed() {
        "✅ **PASS**"
    } else {
        "❌ **FAIL**"
    };

    let mut output = format!("### Status: {badge}\n\n");
    if review.feedback.is_empty() {
        output.push_str("_No issues found._");
    } else {
        output.push_str("**Feedback:**");
        for item in &review.feedback {
            let _ = write!(output, "\n- {item}");
        }
    }
    output
}

/// Formats the flow indicator for a finished run.
#[must_use]
pub fn format_flow(state: &PipelineState) -> String {
    let steps = flow_steps(state)
        .iter()
        .map(|step| format!("**{}**", step.label()))
        .collect::<Vec<_>>()
        .join(" ➜ ");
    format!("### 🔄 Pipeline Flow\n\n{steps}")
}

/// Formats a run failure for the draft pane.
#[must_use]
pub fn format_error(error: &dyn std::fmt::Display) -> String {
    format!("❌ **Error:** {error}")
}
