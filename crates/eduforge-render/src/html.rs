//! HTML fragments for the web form.
//!
//! Every piece of model or user text goes through [`escape_html`]; the
//! surrounding markup is fixed.

use std::fmt::Write;

use eduforge_pipeline::{GeneratedContent, PipelineState, ReviewResult, BLANK_TOPIC_MESSAGE};
use serde::Serialize;

use crate::{flow_steps, NO_REFINEMENT_MESSAGE};

/// The four display regions as HTML fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HtmlPanes {
    /// Pipeline flow indicator.
    pub flow: String,
    /// Generated draft, or the warning/error message.
    pub draft: String,
    /// Review of the draft.
    pub review: String,
    /// Refined content with its review, or the no-refinement note.
    pub refined: String,
}

impl HtmlPanes {
    /// Renders a finished run.
    #[must_use]
    pub fn from_state(state: &PipelineState) -> Self {
        let refined = match &state.refined {
            Some(refined) => {
                let mut pane = content_html(refined);
                if let Some(review) = &state.review_refined {
                    pane.push_str("<hr>\n");
                    pane.push_str(&review_html(review));
                }
                pane
            }
            None => format!("<p><em>{}</em></p>\n", escape_html(NO_REFINEMENT_MESSAGE)),
        };

        Self {
            flow: flow_html(state),
            draft: state.draft.as_ref().map(content_html).unwrap_or_default(),
            review: state.review.as_ref().map(review_html).unwrap_or_default(),
            refined,
        }
    }

    /// Panes for a blank topic.
    #[must_use]
    pub fn blank_topic() -> Self {
        Self {
            draft: format!(
                "<p class=\"warning\">⚠️ {}</p>\n",
                escape_html(BLANK_TOPIC_MESSAGE)
            ),
            ..Self::default()
        }
    }

    /// Panes for a failed run.
    #[must_use]
    pub fn error(error: &dyn std::fmt::Display) -> Self {
        Self {
            draft: format!(
                "<p class=\"error\">❌ <strong>Error:</strong> {}</p>\n",
                escape_html(&error.to_string())
            ),
            ..Self::default()
        }
    }

    /// Returns `true` if nothing has been rendered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flow.is_empty()
            && self.draft.is_empty()
            && self.review.is_empty()
            && self.refined.is_empty()
    }
}

fn content_html(content: &GeneratedContent) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "<h3>📖 Explanation</h3>");
    let _ = writeln!(output, "<p>{}</p>", escape_html(&content.explanation));
    let _ = writeln!(output, "<h3>❓ MCQs</h3>");

    for (i, mcq) in content.mcqs.iter().enumerate() {
        let correct = mcq.answer_index();
        let _ = writeln!(output, "<div class=\"mcq\">");
        let _ = writeln!(
            output,
            "<p><strong>Q{}. {}</strong></p>",
            i + 1,
            escape_html(&mcq.question)
        );
        let _ = writeln!(output, "<ul>");
        for (j, option) in mcq.options.iter().enumerate() {
            let class = if correct == Some(j) { " class=\"correct\"" } else { "" };
            let _ = writeln!(output, "<li{class}>{}</li>", escape_html(option));
        }
        let _ = writeln!(output, "</ul>");
        let _ = writeln!(
            output,
            "<p class=\"answer\">✅ <strong>Answer:</strong> {}</p>",
            escape_html(&mcq.answer)
        );
        let _ = writeln!(output, "</div>");
    }

    output
}

fn review_html(review: &ReviewResult) -> String {
    let (class, badge) = if review.passed() {
        ("pass", "✅ PASS")
    } else {
        ("fail", "❌ FAIL")
    };

    let mut output = format!("<h3>Status: <span class=\"badge {class}\">{badge}</span></h3>\n");
    if review.feedback.is_empty() {
        output.push_str("<p><em>No issues found.</em></p>\n");
    } else {
        output.push_str("<p><strong>Feedback:</strong></p>\n<ul>\n");
        for item in &review.feedback {
            let _ = writeln!(output, "<li>{}</li>", escape_html(item));
        }
        output.push_str("</ul>\n");
    }
    output
}

fn flow_html(state: &PipelineState) -> String {
    let steps = flow_steps(state)
        .iter()
        .map(|step| format!("<strong>{}</strong>", step.label()))
        .collect::<Vec<_>>()
        .join(" ➜ ");
    format!("<h3>🔄 Pipeline Flow</h3>\n<p>{steps}</p>\n")
}

/// Escapes `&`, `<`, `>`, `"` and `'` for use in HTML text and attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(ch),
        }
    }
    result
}
