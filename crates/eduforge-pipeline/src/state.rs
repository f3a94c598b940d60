//! Pipeline state types.
//!
//! [`PipelineState`] is created empty at the start of a run, filled in by each
//! step, and handed back whole to the caller. [`PipelineStage`] is the
//! explicit tag the orchestrator dispatches on; every mutation goes through a
//! method that checks the transition first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EduError, Result};
use crate::schema::{ContentRequest, GeneratedContent, ReviewResult};

// ============================================================================
// PipelineStage
// ============================================================================

/// Where a run currently is.
///
/// The stages progress as:
/// - `Start` -> `Generated` -> `Reviewed`
/// - From `Reviewed`:
///   - `Done` (review passed, or the refinement budget is spent)
///   - `Refining` -> `Refined` -> `ReReviewed` -> `Done`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Nothing has been generated yet.
    #[default]
    Start,
    /// A draft exists.
    Generated,
    /// The draft has been reviewed.
    Reviewed,
    /// A refinement has been requested.
    Refining,
    /// Refined content exists.
    Refined,
    /// The refined content has been reviewed.
    ReReviewed,
    /// The run is finished.
    Done,
}

impl PipelineStage {
    /// Returns `true` if the run is finished.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns `true` if moving from `self` to `next` is a legal transition.
    ///
    /// # Examples
    ///
    /// ```
    /// use eduforge_pipeline::PipelineStage;
    ///
    /// assert!(PipelineStage::Reviewed.can_transition_to(PipelineStage::Done));
    /// assert!(PipelineStage::Reviewed.can_transition_to(PipelineStage::Refining));
    /// assert!(!PipelineStage::ReReviewed.can_transition_to(PipelineStage::Refining));
    /// ```
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Start, Self::Generated)
                | (Self::Generated, Self::Reviewed)
                | (Self::Reviewed, Self::Done | Self::Refining)
                | (Self::Refining, Self::Refined)
                | (Self::Refined, Self::ReReviewed)
                | (Self::ReReviewed, Self::Done)
        )
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Generated => write!(f, "generated"),
            Self::Reviewed => write!(f, "reviewed"),
            Self::Refining => write!(f, "refining"),
            Self::Refined => write!(f, "refined"),
            Self::ReReviewed => write!(f, "re_reviewed"),
            Self::Done => write!(f, "done"),
        }
    }
}

// ============================================================================
// PipelineStep and StepRecord
// ============================================================================

/// A model call made during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    /// Draft generation.
    Generate,
    /// Review of the draft.
    Review,
    /// Refinement of the draft.
    Refine,
    /// Review of the refined content.
    ReviewRefined,
}

impl PipelineStep {
    /// Human-readable step name used in the flow indicator.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Generate => "Generate",
            Self::Review => "Review",
            Self::Refine => "Refine",
            Self::ReviewRefined => "Review Refined",
        }
    }
}

impl std::fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Timing of one model call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Which step ran.
    pub step: PipelineStep,
    /// When the call was issued.
    pub started_at: DateTime<Utc>,
    /// When the reply was accepted.
    pub ended_at: DateTime<Utc>,
}

impl StepRecord {
    /// Creates a record with explicit timestamps.
    #[must_use]
    pub const fn new(step: PipelineStep, started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> Self {
        Self {
            step,
            started_at,
            ended_at,
        }
    }

    /// Wall-clock time the step took.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.ended_at - self.started_at
    }
}

// ============================================================================
// RefineDecision
// ============================================================================

/// Outcome of the branch after the first review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefineDecision {
    /// Stop here.
    Done,
    /// Run one refinement pass.
    Refine,
}

// ============================================================================
// PipelineState
// ============================================================================

/// Everything produced by one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// The request this run serves.
    pub request: ContentRequest,

    /// Current stage.
    pub stage: PipelineStage,

    /// First generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<GeneratedContent>,

    /// Review of the draft.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewResult>,

    /// Refined content, present only when the draft failed review.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refined: Option<GeneratedContent>,

    /// Review of the refined content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_refined: Option<ReviewResult>,

    /// Number of reviews of the draft performed so far.
    pub pass_number: u32,

    /// Timing of each model call, in order.
    #[serde(default)]
    pub history: Vec<StepRecord>,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineState {
    /// Creates an empty state in the `Start` stage.
    ///
    /// # Examples
    ///
    /// ```
    /// use eduforge_pipeline::{ContentRequest, PipelineStage, PipelineState};
    ///
    /// let request = ContentRequest::new(4, "Types of angles").unwrap();
    /// let state = PipelineState::new(request);
    /// assert_eq!(state.stage, PipelineStage::Start);
    /// assert_eq!(state.pass_number, 0);
    /// assert!(state.draft.is_none());
    /// ```
    #[must_use]
    pub fn new(request: ContentRequest) -> Self {
        Self {
            request,
            stage: PipelineStage::Start,
            draft: None,
            review: None,
            refined: None,
            review_refined: None,
            pass_number: 0,
            history: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Returns `true` if the run is finished.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Returns `true` if a refinement pass ran.
    #[must_use]
    pub const fn was_refined(&self) -> bool {
        self.refined.is_some()
    }

    /// The review that decides the final verdict: the refined review if one
    /// exists, otherwise the draft review.
    #[must_use]
    pub fn final_review(&self) -> Option<&ReviewResult> {
        self.review_refined.as_ref().or(self.review.as_ref())
    }

    /// Steps taken so far, in order.
    pub fn steps(&self) -> impl Iterator<Item = PipelineStep> + '_ {
        self.history.iter().map(|r| r.step)
    }

    /// Returns the duration since the run started, or its total duration once finished.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at.unwrap_or_else(Utc::now) - self.started_at
    }

    fn transition(&mut self, next: PipelineStage) -> Result<()> {
        if !self.stage.can_transition_to(next) {
            return Err(EduError::invalid_transition(self.stage, next));
        }
        self.stage = next;
        Ok(())
    }

    /// Records the draft: `Start` -> `Generated`.
    pub fn record_draft(&mut self, draft: GeneratedContent, record: StepRecord) -> Result<()> {
        self.transition(PipelineStage::Generated)?;
        self.draft = Some(draft);
        self.history.push(record);
        Ok(())
    }

    /// Records the draft review and bumps the pass counter: `Generated` -> `Reviewed`.
    pub fn record_review(&mut self, review: ReviewResult, record: StepRecord) -> Result<()> {
        self.transition(PipelineStage::Reviewed)?;
        self.review = Some(review);
        self.pass_number += 1;
        self.history.push(record);
        Ok(())
    }

    /// Decides the branch after the first review.
    ///
    /// Refine only if the review failed and `pass_number` has not exceeded
    /// `max_refinement_passes`.
    pub fn refine_decision(&self, max_refinement_passes: u32) -> Result<RefineDecision> {
        if self.stage != PipelineStage::Reviewed {
            return Err(EduError::invalid_transition(self.stage, PipelineStage::Refining));
        }
        let failed = self.review.as_ref().is_some_and(|r| !r.passed());
        if failed && self.pass_number <= max_refinement_passes {
            Ok(RefineDecision::Refine)
        } else {
            Ok(RefineDecision::Done)
        }
    }

    /// Enters the refinement branch: `Reviewed` -> `Refining`.
    pub fn begin_refinement(&mut self) -> Result<()> {
        self.transition(PipelineStage::Refining)
    }

    /// Records refined content: `Refining` -> `Refined`.
    pub fn record_refined(&mut self, refined: GeneratedContent, record: StepRecord) -> Result<()> {
        self.transition(PipelineStage::Refined)?;
        self.refined = Some(refined);
        self.history.push(record);
        Ok(())
    }

    /// Records the refined review: `Refined` -> `ReReviewed`.
    pub fn record_refined_review(&mut self, review: ReviewResult, record: StepRecord) -> Result<()> {
        self.transition(PipelineStage::ReReviewed)?;
        self.review_refined = Some(review);
        self.history.push(record);
        Ok(())
    }

    /// Finishes the run: `Reviewed` or `ReReviewed` -> `Done`.
    pub fn finish(&mut self) -> Result<()> {
        self.transition(PipelineStage::Done)?;
        self.finished_at = Some(Utc::now());
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::schema::MultipleChoiceQuestion;

    fn request() -> ContentRequest {
        ContentRequest::new(4, "Types of angles").unwrap()
    }

    fn content() -> GeneratedContent {
        let mcq = MultipleChoiceQuestion {
            question: "Which angle is 90 degrees?".to_string(),
            options: vec![
                "A) Acute".to_string(),
                "B) Right".to_string(),
                "C) Obtuse".to_string(),
                "D) Straight".to_string(),
            ],
            answer: "B".to_string(),
        };
        GeneratedContent {
            explanation: "Angles are measured in degrees.".to_string(),
            mcqs: vec![mcq.clone(), mcq.clone(), mcq],
        }
    }

    fn record(step: PipelineStep) -> StepRecord {
        let now = Utc::now();
        StepRecord::new(step, now, now)
    }

    fn reviewed(review: ReviewResult) -> PipelineState {
        let mut state = PipelineState::new(request());
        state
            .record_draft(content(), record(PipelineStep::Generate))
            .unwrap();
        state
            .record_review(review, record(PipelineStep::Review))
            .unwrap();
        state
    }

    // ------------------------------------------------------------------------
    // PipelineStage tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_stage_is_terminal() {
        assert!(PipelineStage::Done.is_terminal());
        assert!(!PipelineStage::Start.is_terminal());
        assert!(!PipelineStage::Reviewed.is_terminal());
        assert!(!PipelineStage::ReReviewed.is_terminal());
    }

    #[test]
    fn test_stage_transitions() {
        use PipelineStage::*;

        let legal = [
            (Start, Generated),
            (Generated, Reviewed),
            (Reviewed, Done),
            (Reviewed, Refining),
            (Refining, Refined),
            (Refined, ReReviewed),
            (ReReviewed, Done),
        ];
        let all = [Start, Generated, Reviewed, Refining, Refined, ReReviewed, Done];

        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_stage_serialization() {
        assert_eq!(
            serde_json::to_string(&PipelineStage::ReReviewed).unwrap(),
            r#""re_reviewed""#
        );
        assert_eq!(PipelineStage::ReReviewed.to_string(), "re_reviewed");
        let stage: PipelineStage = serde_json::from_str(r#""refining""#).unwrap();
        assert_eq!(stage, PipelineStage::Refining);
    }

    // ------------------------------------------------------------------------
    // PipelineState tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_state_new() {
        let state = PipelineState::new(request());

        assert_eq!(state.stage, PipelineStage::Start);
        assert_eq!(state.pass_number, 0);
        assert!(state.draft.is_none());
        assert!(state.review.is_none());
        assert!(state.refined.is_none());
        assert!(state.review_refined.is_none());
        assert!(state.history.is_empty());
        assert!(state.finished_at.is_none());
    }

    #[test]
    fn test_record_review_increments_pass_number() {
        let state = reviewed(ReviewResult::pass());
        assert_eq!(state.stage, PipelineStage::Reviewed);
        assert_eq!(state.pass_number, 1);
        assert_eq!(
            state.steps().collect::<Vec<_>>(),
            vec![PipelineStep::Generate, PipelineStep::Review]
        );
    }

    #[test]
    fn test_refine_decision() {
        let passed = reviewed(ReviewResult::pass());
        assert_eq!(passed.refine_decision(1).unwrap(), RefineDecision::Done);

        let failed = reviewed(ReviewResult::fail(["too hard"]));
        assert_eq!(failed.refine_decision(1).unwrap(), RefineDecision::Refine);
        assert_eq!(failed.refine_decision(0).unwrap(), RefineDecision::Done);
    }

    #[test]
    fn test_refine_decision_requires_reviewed_stage() {
        let state = PipelineState::new(request());
        assert!(state.refine_decision(1).is_err());
    }

    #[test]
    fn test_full_refinement_path() {
        let mut state = reviewed(ReviewResult::fail(["Question 2 is ambiguous"]));

        state.begin_refinement().unwrap();
        state
            .record_refined(content(), record(PipelineStep::Refine))
            .unwrap();
        state
            .record_refined_review(ReviewResult::pass(), record(PipelineStep::ReviewRefined))
            .unwrap();
        state.finish().unwrap();

        assert!(state.is_terminal());
        assert!(state.was_refined());
        assert!(state.review_refined.is_some());
        assert!(state.final_review().unwrap().passed());
        assert!(state.finished_at.is_some());
        assert_eq!(state.history.len(), 4);
    }

    #[test]
    fn test_no_second_refinement() {
        let mut state = reviewed(ReviewResult::fail(["x"]));
        state.begin_refinement().unwrap();
        state
            .record_refined(content(), record(PipelineStep::Refine))
            .unwrap();
        state
            .record_refined_review(ReviewResult::fail(["x"]), record(PipelineStep::ReviewRefined))
            .unwrap();

        let err = state.begin_refinement().unwrap_err();
        assert!(matches!(err, EduError::InvalidStateTransition { .. }));
        assert!(state.finish().is_ok());
    }

    #[test]
    fn test_out_of_order_records_rejected() {
        let mut state = PipelineState::new(request());
        let err = state
            .record_review(ReviewResult::pass(), record(PipelineStep::Review))
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("cannot go from start to reviewed"));
        assert_eq!(state.pass_number, 0);
        assert!(state.finish().is_err());
    }

    #[test]
    fn test_final_review_prefers_refined() {
        let mut state = reviewed(ReviewResult::fail(["x"]));
        assert!(!state.final_review().unwrap().passed());

        state.begin_refinement().unwrap();
        state
            .record_refined(content(), record(PipelineStep::Refine))
            .unwrap();
        state
            .record_refined_review(ReviewResult::pass(), record(PipelineStep::ReviewRefined))
            .unwrap();
        assert!(state.final_review().unwrap().passed());
    }

    #[test]
    fn test_step_record_duration() {
        let start = DateTime::parse_from_rfc3339("2026-02-03T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let end = DateTime::parse_from_rfc3339("2026-02-03T10:00:02Z")
            .unwrap()
            .with_timezone(&Utc);
        let record = StepRecord::new(PipelineStep::Generate, start, end);
        assert_eq!(record.duration().num_seconds(), 2);
    }

    #[test]
    fn test_state_serialization_skips_absent_refinement() {
        let mut state = reviewed(ReviewResult::pass());
        state.finish().unwrap();

        let json = serde_json::to_string_pretty(&state).unwrap();
        assert!(json.contains(r#""stage": "done""#));
        assert!(json.contains(r#""pass_number": 1"#));
        assert!(json.contains(r#""draft""#));
        assert!(!json.contains(r#""refined""#));
        assert!(!json.contains(r#""review_refined""#));

        let restored: PipelineState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.stage, PipelineStage::Done);
        assert!(restored.refined.is_none());
    }
}
