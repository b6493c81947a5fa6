//! End-to-end pipeline scenarios over scripted providers.
//!
//! Each scenario scripts the exact provider responses the pipeline will
//! consume, so call ordering is asserted implicitly: a deviation exhausts
//! the script or leaves responses unconsumed, failing the scenario.

use promptcheck_core::{CompletionConfig, CompletionService, MockProvider};
use promptcheck_eval::{
    EvalError, PhaseStatus, Pipeline, PipelineRequest, ProgressReporter, RubricJudge,
    PASS_THRESHOLD, RUBRIC_PASS_THRESHOLD,
};
use std::sync::Arc;

fn service_with(provider: MockProvider) -> CompletionService {
    CompletionService::new(Arc::new(provider), CompletionConfig::default())
}

fn request() -> PipelineRequest {
    PipelineRequest::new("Answer: {{input}}")
        .with_goal("short factual answers")
        .with_prompt_name("qa-v1")
        .with_case_count(1)
}

#[tokio::test]
async fn rubric_judge_scores_one_on_yes() {
    let judge = RubricJudge::new(service_with(MockProvider::always("yes")));
    let verdict = judge.judge("Paris", &["must mention Paris".to_string()]).await;

    assert_eq!(verdict.score, RUBRIC_PASS_THRESHOLD);
    assert!(verdict.criteria[0].passed);
    assert!(verdict.failure_reason.is_none());
}

#[tokio::test]
async fn primary_outage_recovers_through_fallback() {
    // Primary never answers; every completion flows through the fallback,
    // whose script covers generation, execution, and judging in order.
    let primary = MockProvider::failing("primary down");
    let fallback = MockProvider::with_responses(vec![
        Ok(r#"[{"input": "capital of France?", "rubric": ["must mention Paris"]}]"#.to_string()),
        Ok("fallback text".to_string()), // execution output
        Ok("yes".to_string()),           // correctness
        Ok("yes".to_string()),           // comparison
    ]);
    let service = CompletionService::new(Arc::new(primary), CompletionConfig::default())
        .with_fallback(Arc::new(fallback));

    let report = Pipeline::new(service)
        .evaluate(request(), &mut ProgressReporter::new())
        .await
        .unwrap();

    assert_eq!(report.original_results[0].output, "fallback text");
    assert_eq!(report.original_summary.passed, 1);
}

#[tokio::test]
async fn generation_without_array_terminates_with_error_event() {
    let pipeline = Pipeline::new(service_with(MockProvider::always(
        "Sorry, I can't produce test cases right now.",
    )));
    let mut reporter = ProgressReporter::new();

    let err = pipeline.run(request(), &mut reporter).await.unwrap_err();
    assert!(matches!(err, EvalError::GenerationParse(_)));

    let events = reporter.events();
    assert_eq!(events.last().unwrap().status, PhaseStatus::Error);
    assert!(!events.iter().any(|e| e.phase == "complete"));
}

#[tokio::test]
async fn threshold_is_strict_at_the_boundary() {
    // Two cases: one judged 0.75 overall (one "no" of four), one judged
    // 1.0. Only the 0.75 case is failing, so exactly one failure drives
    // optimization.
    let pipeline = Pipeline::new(service_with(MockProvider::with_responses(vec![
        // generation: both cases carry a tone so all four dimensions are judged
        Ok(r#"[
            {"input": "a", "metadata": {"tone": "formal"}},
            {"input": "b", "metadata": {"tone": "formal"}}
        ]"#
        .to_string()),
        // case "a": 0.75 (tone fails)
        Ok("output a".to_string()),
        Ok("yes".to_string()),
        Ok("yes".to_string()),
        Ok("no".to_string()),
        // case "b": 1.0
        Ok("output b".to_string()),
        Ok("yes".to_string()),
        Ok("yes".to_string()),
        Ok("yes".to_string()),
        // optimization sees exactly one failing case
        Ok(r#"{"prompt": "Better: {{input}}", "reasoning": "r", "changes": ["c"]}"#.to_string()),
        // optimized re-run over both cases, all passing
        Ok("output a2".to_string()),
        Ok("yes".to_string()),
        Ok("yes".to_string()),
        Ok("yes".to_string()),
        Ok("output b2".to_string()),
        Ok("yes".to_string()),
        Ok("yes".to_string()),
        Ok("yes".to_string()),
    ])));

    let report = pipeline
        .run(request().with_case_count(2), &mut ProgressReporter::new())
        .await
        .unwrap();

    assert_eq!(report.original_results[0].scores.overall, 0.75);
    assert!(!report.original_results[0].scores.passes(PASS_THRESHOLD));
    assert!(report.original_results[1].scores.passes(PASS_THRESHOLD));
    assert_eq!(report.original_summary.failed, 1);
    assert_eq!(report.optimized_prompt, "Better: {{input}}");
    assert_eq!(report.optimized_summary.passed, 2);
}

#[tokio::test]
async fn zero_failures_leaves_prompt_untouched() {
    // Script ends after the first evaluation: an optimizer call would
    // exhaust it and fail the run.
    let pipeline = Pipeline::new(service_with(MockProvider::with_responses(vec![
        Ok(r#"[{"input": "2+2?", "rubric": ["must state 4"]}]"#.to_string()),
        Ok("4".to_string()),
        Ok("yes".to_string()),
        Ok("yes".to_string()),
    ])));

    let report = pipeline
        .run(request(), &mut ProgressReporter::new())
        .await
        .unwrap();

    assert_eq!(report.optimized_prompt, report.original_prompt);
    assert!(report.changes.is_empty());
    assert_eq!(report.original_summary.pass_rate, 1.0);
}

#[tokio::test]
async fn event_timestamps_never_decrease() {
    let pipeline = Pipeline::new(service_with(MockProvider::with_responses(vec![
        Ok(r#"[{"input": "q1"}, {"input": "q2"}]"#.to_string()),
        Ok("a1".to_string()),
        Ok("yes".to_string()),
        Ok("yes".to_string()),
        Ok("a2".to_string()),
        Ok("yes".to_string()),
        Ok("yes".to_string()),
    ])));

    let report = pipeline
        .run(request().with_case_count(2), &mut ProgressReporter::new())
        .await
        .unwrap();

    assert!(report.events.len() >= 2);
    for pair in report.events.windows(2) {
        assert!(
            pair[0].timestamp <= pair[1].timestamp,
            "event log went backwards: {:?} then {:?}",
            pair[0],
            pair[1]
        );
    }
}

#[tokio::test]
async fn per_case_provider_failure_never_aborts_the_run() {
    // Second case's completion fails outright; the run still produces a
    // full result list and proceeds into optimization.
    let pipeline = Pipeline::new(service_with(MockProvider::with_responses(vec![
        Ok(r#"[{"input": "q1"}, {"input": "q2"}]"#.to_string()),
        Ok("a1".to_string()),
        Ok("yes".to_string()),
        Ok("yes".to_string()),
        Err(promptcheck_core::ProviderError::Other("outage".to_string())),
        // optimization for the zero-scored failure
        Ok(r#"{"prompt": "Better: {{input}}", "reasoning": "", "changes": []}"#.to_string()),
        // optimized re-run
        Ok("a1b".to_string()),
        Ok("yes".to_string()),
        Ok("yes".to_string()),
        Ok("a2b".to_string()),
        Ok("yes".to_string()),
        Ok("yes".to_string()),
    ])));

    let report = pipeline
        .run(request().with_case_count(2), &mut ProgressReporter::new())
        .await
        .unwrap();

    assert_eq!(report.original_results.len(), 2);
    assert_eq!(report.original_results[1].scores.overall, 0.0);
    assert!(report.original_results[1].failure_reason.is_some());
    assert_eq!(report.optimized_summary.passed, 2);
}
