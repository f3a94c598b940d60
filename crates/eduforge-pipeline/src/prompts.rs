//! Prompt templates for generation, refinement and review.

use serde::Serialize;

use crate::error::Result;
use crate::schema::{ContentRequest, GeneratedContent};

/// A rendered system + user message pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// System message.
    pub system: String,
    /// User message.
    pub user: String,
}

/// Prompt for the first draft.
#[must_use]
pub fn generate(request: &ContentRequest) -> Prompt {
    let grade = request.grade;
    Prompt {
        system: format!(
            "You are an expert educational content creator. \
             Generate content that is age-appropriate for Grade {grade} students. \
             Use simple vocabulary and short sentences for lower grades. \
             All concepts must be factually correct."
        ),
        user: format!(
            "Create an educational lesson on the topic: \"{topic}\" for Grade {grade}.\n\n\
             Produce:\n\
             1. A clear explanation of the topic (3-5 sentences, grade-appropriate language).\n\
             2. Exactly 3 multiple-choice questions, each with 4 options (A, B, C, D) \
             and the correct answer letter.\n\n\
             Return ONLY the structured JSON.",
            topic = request.topic,
        ),
    }
}

/// Prompt for a refinement pass over `previous` using the reviewer's `feedback`.
///
/// # Errors
///
/// Returns [`crate::EduError::Json`] if the previous draft cannot be serialized.
pub fn refine(
    request: &ContentRequest,
    previous: &GeneratedContent,
    feedback: &[String],
) -> Result<Prompt> {
    let grade = request.grade;
    Ok(Prompt {
        system: format!(
            "You are an expert educational content creator. \
             A reviewer found issues with your previous draft. \
             Fix every issue while keeping the content for Grade {grade}."
        ),
        user: format!(
            "Topic: \"{topic}\"  |  Grade: {grade}\n\n\
             Previous draft:\n{draft}\n\n\
             Reviewer feedback:\n{feedback}\n\n\
             Produce a fully corrected version. \
             Return ONLY the structured JSON.",
            topic = request.topic,
            draft = pretty_json(previous)?,
            feedback = bullet_list(feedback),
        ),
    })
}

/// Prompt for reviewing `content`.
///
/// # Errors
///
/// Returns [`crate::EduError::Json`] if the content cannot be serialized.
pub fn review(request: &ContentRequest, content: &GeneratedContent) -> Result<Prompt> {
    let grade = request.grade;
    Ok(Prompt {
        system: format!(
            "You are a strict educational content reviewer. \
             Evaluate the content against three criteria:\n\
             1. Age appropriateness: vocabulary and sentence length must suit Grade {grade}.\n\
             2. Conceptual correctness: all facts and MCQ answers must be accurate.\n\
             3. Clarity: the explanation must be easy to follow; questions must be unambiguous.\n\n\
             Be fair but thorough. Only mark 'fail' if there are real problems."
        ),
        user: format!(
            "Grade: {grade}  |  Topic: \"{topic}\"\n\n\
             Content to review:\n{content}\n\n\
             Return a JSON with:\n\
             - \"status\": \"pass\" or \"fail\"\n\
             - \"feedback\": a list of specific issues (empty list if pass)\n\n\
             Return ONLY the structured JSON.",
            topic = request.topic,
            content = pretty_json(content)?,
        ),
    })
}

fn pretty_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Renders feedback as `- item` lines.
fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
