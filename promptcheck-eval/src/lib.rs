//! # Promptcheck Eval
//!
//! Evaluation and optimization pipeline for prompt templates.
//!
//! ## Overview
//!
//! Given a prompt template with a `{{input}}` placeholder, the pipeline:
//!
//! 1. **Generates** a small set of synthetic test cases with an LLM
//! 2. **Executes** the prompt against each case (render → complete)
//! 3. **Judges** each output with a second LLM call
//! 4. **Aggregates** pass/fail counts and dimension scores
//! 5. **Optimizes** the prompt from the failing results, then re-runs the
//!    revised prompt on the same cases for a like-for-like comparison
//!
//! Progress is reported as ordered, timestamped events over a channel so
//! an observer (the web UI, the CLI) can stream them live.
//!
//! ## Quick start
//!
//! ```no_run
//! use promptcheck_core::{CompletionConfig, CompletionService, HttpProvider};
//! use promptcheck_eval::{Pipeline, PipelineRequest, ProgressReporter};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), promptcheck_eval::EvalError> {
//! let primary = Arc::new(HttpProvider::new(
//!     "openai", "https://api.openai.com/v1", "api-key", "gpt-4o-mini",
//! ));
//! let service = CompletionService::new(primary, CompletionConfig::default());
//!
//! let request = PipelineRequest::new("Answer: {{input}}")
//!     .with_goal("Answer short factual questions")
//!     .with_prompt_name("qa-v1");
//!
//! let mut reporter = ProgressReporter::new();
//! let report = Pipeline::new(service).run(request, &mut reporter).await?;
//! println!("pass rate: {:.2}", report.original_summary.pass_rate);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod generator;
pub mod judge;
pub mod optimizer;
pub mod pipeline;
pub mod progress;
pub mod results;
pub mod runner;
pub mod sink;

// Re-export public API
pub use error::EvalError;
pub use generator::{GeneratorConfig, TestCaseGenerator};
pub use judge::{DimensionJudge, RubricJudge};
pub use optimizer::Optimizer;
pub use pipeline::{Pipeline, PipelineConfig, PipelineReport, PipelineRequest};
pub use progress::{PhaseStatus, ProgressEvent, ProgressReporter};
pub use results::{
    CaseMetadata, CriterionResult, ExecutionResult, OptimizationProposal, PromptCategory,
    RubricVerdict, Scores, Summary, TestCase, PASS_THRESHOLD, RUBRIC_PASS_THRESHOLD,
};
pub use runner::{EvalRunner, ScoringMode};
pub use sink::{HttpRunSink, MemorySink, RunRecord, RunSink, SinkError};
