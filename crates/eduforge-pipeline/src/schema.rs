//! Request and content shapes exchanged with the model.
//!
//! Everything the model returns is parsed into these types and then checked
//! with `validate`, so a value that leaves this module always satisfies the
//! lesson invariants: three questions, four options each, an answer that
//! names one of the options, and review feedback that agrees with the status.

use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{EduError, Result};

/// Lowest supported grade level.
pub const MIN_GRADE: u8 = 1;

/// Highest supported grade level.
pub const MAX_GRADE: u8 = 12;

/// Number of questions every lesson carries.
pub const MCQ_COUNT: usize = 3;

/// Number of options every question carries.
pub const OPTION_COUNT: usize = 4;

/// Warning shown when the topic is blank.
pub const BLANK_TOPIC_MESSAGE: &str = "Please enter a topic.";

/// Contract name for [`GeneratedContent`] replies.
pub const CONTENT_CONTRACT: &str = "generated_content";

/// Contract name for [`ReviewResult`] replies.
pub const REVIEW_CONTRACT: &str = "review_result";

/// Matches a leading option label such as `A)`, `(B)`, `C.` or `D:`.
static OPTION_LABEL: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^\s*\(?([A-Da-d])\s*[\).:]\s*").ok());

/// Matches an answer given as a bare or labelled letter: `A`, `b)`, `(C) text`.
static ANSWER_LABEL: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^\s*\(?([A-Da-d])\s*(?:[\).:]|$)").ok());

// ============================================================================
// ContentRequest
// ============================================================================

/// A single user request: which grade, which topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRequest {
    /// Student grade level (1-12).
    pub grade: u8,
    /// Topic to generate content for, trimmed and non-empty.
    pub topic: String,
}

impl ContentRequest {
    /// Creates a validated request, trimming surrounding whitespace from the topic.
    ///
    /// # Examples
    ///
    /// ```
    /// use eduforge_pipeline::ContentRequest;
    ///
    /// let request = ContentRequest::new(4, "  Types of angles ").unwrap();
    /// assert_eq!(request.topic, "Types of angles");
    ///
    /// assert!(ContentRequest::new(4, "   ").is_err());
    /// assert!(ContentRequest::new(13, "Fractions").is_err());
    /// ```
    pub fn new(grade: u8, topic: impl AsRef<str>) -> Result<Self> {
        let request = Self {
            grade,
            topic: topic.as_ref().trim().to_string(),
        };
        request.validate()?;
        Ok(request)
    }

    /// Checks the grade range and that the topic is not blank.
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(EduError::invalid_request(BLANK_TOPIC_MESSAGE));
        }
        if !(MIN_GRADE..=MAX_GRADE).contains(&self.grade) {
            return Err(EduError::invalid_request(format!(
                "Grade must be between {MIN_GRADE} and {MAX_GRADE} (got {})",
                self.grade
            )));
        }
        Ok(())
    }
}

// ============================================================================
// MultipleChoiceQuestion
// ============================================================================

/// One multiple-choice question with four options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MultipleChoiceQuestion {
    /// The question text.
    pub question: String,
    /// Exactly four options, in display order (A, B, C, D).
    pub options: Vec<String>,
    /// The correct option, given as its letter (e.g. "B").
    pub answer: String,
}

impl MultipleChoiceQuestion {
    /// Returns the label letter for the option at `index` (0 => 'A').
    #[must_use]
    pub fn label_for(index: usize) -> Option<char> {
        if index < OPTION_COUNT {
            u8::try_from(index).ok().map(|i| char::from(b'A' + i))
        } else {
            None
        }
    }

    /// Resolves the answer to the index of the option it names.
    ///
    /// The answer may be the option text itself (with or without its label),
    /// or a letter label such as `B`, `B)`, `(B)` or `B. text`. Text matches
    /// are tried first so that an answer like "A right angle" is not read as
    /// the letter A.
    #[must_use]
    pub fn answer_index(&self) -> Option<usize> {
        let answer = self.answer.trim();
        if answer.is_empty() {
            return None;
        }

        let by_text = self.options.iter().position(|option| {
            option.trim().eq_ignore_ascii_case(answer)
                || strip_option_label(option).eq_ignore_ascii_case(strip_option_label(answer))
        });
        if by_text.is_some() {
            return by_text;
        }

        let re = ANSWER_LABEL.as_ref()?;
        let letter = re.captures(answer)?.get(1)?.as_str().chars().next()?;
        let index = usize::from(letter.to_ascii_uppercase() as u8 - b'A');
        (index < self.options.len()).then_some(index)
    }

    /// Returns the text of the correct option, if the answer resolves.
    #[must_use]
    pub fn correct_option(&self) -> Option<&str> {
        self.answer_index()
            .and_then(|i| self.options.get(i))
            .map(String::as_str)
    }

    fn validate(&self, number: usize) -> Result<()> {
        if self.question.trim().is_empty() {
            return Err(EduError::schema(
                CONTENT_CONTRACT,
                format!("question {number} has empty text"),
            ));
        }
        if self.options.len() != OPTION_COUNT {
            return Err(EduError::schema(
                CONTENT_CONTRACT,
                format!(
                    "question {number} has {} options, expected exactly {OPTION_COUNT}",
                    self.options.len()
                ),
            ));
        }
        if self.options.iter().any(|o| o.trim().is_empty()) {
            return Err(EduError::schema(
                CONTENT_CONTRACT,
                format!("question {number} has an empty option"),
            ));
        }
        if self.answer_index().is_none() {
            return Err(EduError::schema(
                CONTENT_CONTRACT,
                format!(
                    "question {number} answer '{}' does not match any option",
                    self.answer
                ),
            ));
        }
        Ok(())
    }
}

/// Removes a leading `A)` / `(A)` / `A.` / `A:` label from an option.
fn strip_option_label(option: &str) -> &str {
    let trimmed = option.trim();
    OPTION_LABEL
        .as_ref()
        .and_then(|re| re.find(trimmed))
        .map_or(trimmed, |m| trimmed[m.end()..].trim())
}

// ============================================================================
// GeneratedContent
// ============================================================================

/// A lesson: a short explanation plus three multiple-choice questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedContent {
    /// A 3-5 sentence explanation of the topic.
    pub explanation: String,
    /// Exactly three multiple-choice questions.
    pub mcqs: Vec<MultipleChoiceQuestion>,
}

impl GeneratedContent {
    /// Checks the lesson invariants.
    ///
    /// # Errors
    ///
    /// Returns [`EduError::SchemaError`] when the explanation is empty, the
    /// question count is not three, or any question is malformed.
    pub fn validate(&self) -> Result<()> {
        if self.explanation.trim().is_empty() {
            return Err(EduError::schema(CONTENT_CONTRACT, "explanation is empty"));
        }
        if self.mcqs.len() != MCQ_COUNT {
            return Err(EduError::schema(
                CONTENT_CONTRACT,
                format!(
                    "expected exactly {MCQ_COUNT} mcqs, got {}",
                    self.mcqs.len()
                ),
            ));
        }
        for (i, mcq) in self.mcqs.iter().enumerate() {
            mcq.validate(i + 1)?;
        }
        Ok(())
    }
}

// ============================================================================
// ReviewResult
// ============================================================================

/// Verdict of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    /// Content meets all criteria.
    Pass,
    /// Content has at least one real problem.
    Fail,
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// Reviewer output: a status and the list of issues found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReviewResult {
    /// "pass" or "fail".
    pub status: ReviewStatus,
    /// Specific issues; empty when the status is pass.
    #[serde(default)]
    pub feedback: Vec<String>,
}

impl ReviewResult {
    /// A passing review with no feedback.
    #[must_use]
    pub const fn pass() -> Self {
        Self {
            status: ReviewStatus::Pass,
            feedback: Vec::new(),
        }
    }

    /// A failing review with the given issues.
    #[must_use]
    pub fn fail<I, S>(feedback: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            status: ReviewStatus::Fail,
            feedback: feedback.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if the review passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == ReviewStatus::Pass
    }

    /// Checks that feedback is empty exactly when the status is pass.
    ///
    /// # Errors
    ///
    /// Returns [`EduError::SchemaError`] on a pass with feedback or a fail
    /// without any.
    pub fn validate(&self) -> Result<()> {
        match self.status {
            ReviewStatus::Pass if !self.feedback.is_empty() => Err(EduError::schema(
                REVIEW_CONTRACT,
                "status is pass but feedback is not empty",
            )),
            ReviewStatus::Fail if self.feedback.is_empty() => Err(EduError::schema(
                REVIEW_CONTRACT,
                "status is fail but no feedback was given",
            )),
            ReviewStatus::Fail if self.feedback.iter().any(|f| f.trim().is_empty()) => {
                Err(EduError::schema(REVIEW_CONTRACT, "feedback contains a blank item"))
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
