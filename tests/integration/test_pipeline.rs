//! Integration tests for the pipeline running against a fake chat-completions
//! upstream through the production HTTP client.

mod common;

use common::{spawn_upstream, Behaviour};
use eduforge_pipeline::{
    ContentRequest, EduError, LlmErrorKind, PipelineStage, PipelineStep, MAX_GRADE, MCQ_COUNT,
    MIN_GRADE, OPTION_COUNT,
};

fn request(grade: u8) -> ContentRequest {
    ContentRequest::new(grade, "Types of angles").expect("valid request")
}

#[tokio::test]
async fn test_passing_run_makes_two_calls() {
    let upstream = spawn_upstream(Behaviour::Pass).await;

    let state = upstream
        .pipeline()
        .run(request(4))
        .await
        .expect("run should succeed");

    assert_eq!(state.stage, PipelineStage::Done);
    assert!(state.review.as_ref().expect("review").passed());
    assert!(state.refined.is_none());
    assert!(state.review_refined.is_none());
    assert_eq!(upstream.call_count(), 2);

    let requests = upstream.requests();
    assert_eq!(requests[0]["model"], "llama-3.1-8b-instant");
    assert_eq!(requests[0]["response_format"]["type"], "json_object");
    assert!((requests[0]["temperature"].as_f64().expect("temperature") - 0.3).abs() < 1e-6);
    assert!(requests[1]["temperature"].as_f64().expect("temperature").abs() < 1e-6);
}

#[tokio::test]
async fn test_failing_review_refines_exactly_once() {
    let upstream = spawn_upstream(Behaviour::Fail).await;

    let state = upstream
        .pipeline()
        .run(request(4))
        .await
        .expect("run should succeed");

    assert_eq!(upstream.call_count(), 4);
    assert!(state.was_refined());
    assert_eq!(
        state.refined.as_ref().expect("refined").explanation,
        "A right angle is a square corner."
    );
    assert!(!state.review_refined.as_ref().expect("second review").passed());
    assert_eq!(
        state.steps().collect::<Vec<_>>(),
        vec![
            PipelineStep::Generate,
            PipelineStep::Review,
            PipelineStep::Refine,
            PipelineStep::ReviewRefined
        ]
    );

    let refine_prompt = upstream.requests()[2]["messages"][1]["content"]
        .as_str()
        .expect("user message")
        .to_string();
    assert!(refine_prompt.contains("Reviewer feedback:\n- x"));
    assert!(refine_prompt.contains("An angle is formed where two lines meet."));
}

#[tokio::test]
async fn test_every_grade_yields_well_formed_draft() {
    let upstream = spawn_upstream(Behaviour::Pass).await;
    let pipeline = upstream.pipeline();

    for grade in MIN_GRADE..=MAX_GRADE {
        let state = pipeline.run(request(grade)).await.expect("run should succeed");
        let draft = state.draft.expect("draft");
        assert_eq!(draft.mcqs.len(), MCQ_COUNT);
        assert!(draft.mcqs.iter().all(|q| q.options.len() == OPTION_COUNT));
    }
}

#[tokio::test]
async fn test_fenced_replies_are_accepted() {
    let upstream = spawn_upstream(Behaviour::Fenced).await;

    let state = upstream
        .pipeline()
        .run(request(7))
        .await
        .expect("run should succeed");

    assert_eq!(state.draft.expect("draft").mcqs.len(), MCQ_COUNT);
}

#[tokio::test]
async fn test_wrong_question_count_is_schema_error() {
    let upstream = spawn_upstream(Behaviour::ShortLesson).await;

    let err = upstream
        .pipeline()
        .run(request(4))
        .await
        .expect_err("run should fail");

    assert!(matches!(err, EduError::SchemaError { .. }));
    assert_eq!(upstream.call_count(), 1);
}

#[tokio::test]
async fn test_http_status_is_classified() {
    let cases = [
        (401, LlmErrorKind::Authentication),
        (429, LlmErrorKind::RateLimit),
        (503, LlmErrorKind::Server),
    ];

    for (status, expected) in cases {
        let upstream = spawn_upstream(Behaviour::Status(status)).await;
        let err = upstream
            .pipeline()
            .run(request(4))
            .await
            .expect_err("run should fail");

        match err {
            EduError::LlmApiError { kind, .. } => assert_eq!(kind, expected, "status {status}"),
            other => panic!("unexpected error for {status}: {other}"),
        }
        assert_eq!(upstream.call_count(), 1);
    }
}

#[tokio::test]
async fn test_missing_api_key_never_reaches_upstream() {
    let upstream = spawn_upstream(Behaviour::Pass).await;
    let mut config = upstream.config();
    config.api_key.clear();
    let model = std::sync::Arc::new(eduforge_pipeline::ChatCompletionsClient::from_config(&config));
    let pipeline = eduforge_pipeline::Pipeline::from_config(&config, model);

    let err = pipeline.run(request(4)).await.expect_err("run should fail");

    assert!(matches!(err, EduError::MissingApiKey { .. }));
    assert_eq!(upstream.call_count(), 0);
}

#[tokio::test]
async fn test_repeated_runs_have_same_shape() {
    let upstream = spawn_upstream(Behaviour::Fail).await;
    let pipeline = upstream.pipeline();

    let first = pipeline.run(request(5)).await.expect("first run");
    let second = pipeline.run(request(5)).await.expect("second run");

    assert_eq!(first.draft.is_some(), second.draft.is_some());
    assert_eq!(first.refined.is_some(), second.refined.is_some());
    assert_eq!(first.review_refined.is_some(), second.review_refined.is_some());
    assert_eq!(first.refined, second.refined);
}
