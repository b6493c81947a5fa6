//! Full evaluate-optimize-re-evaluate pipeline.
//!
//! Phases, each bracketed by progress events: `generation` → `evaluation`
//! (original prompt) → `analysis` → `optimization` (skipped when nothing
//! failed) → `evaluation_optimized` (same test cases, never regenerated) →
//! `complete`. Request validation precedes all external calls. A phase
//! error aborts the invocation; the event log accumulated so far survives
//! in the reporter.

use crate::error::EvalError;
use crate::generator::{GeneratorConfig, TestCaseGenerator};
use crate::optimizer::Optimizer;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::results::{ExecutionResult, Summary, PASS_THRESHOLD, RUBRIC_PASS_THRESHOLD};
use crate::runner::{EvalRunner, ScoringMode};
use crate::sink::{RunRecord, RunSink};
use promptcheck_core::CompletionService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Inbound request for a pipeline invocation.
///
/// `prompt` is required everywhere; `goal` and `prompt_name` are
/// additionally required for the optimizing pipeline. Field names accept
/// the wire's camelCase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineRequest {
    /// Prompt template containing the `{{input}}` placeholder
    #[serde(default)]
    pub prompt: String,

    /// What the prompt is supposed to achieve
    #[serde(default)]
    pub goal: String,

    /// Human-readable name for the prompt under test
    #[serde(default, rename = "promptName")]
    pub prompt_name: String,

    /// Criteria every output is judged against
    #[serde(default)]
    pub rubric: Vec<String>,

    /// Test cases to generate (falls back to the generator default)
    #[serde(default, rename = "caseCount", skip_serializing_if = "Option::is_none")]
    pub case_count: Option<usize>,

    /// Dataset label attached to run records sent to an external sink
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
}

impl PipelineRequest {
    /// Create a request for the given prompt template.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Set the goal.
    #[must_use]
    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    /// Set the prompt name.
    #[must_use]
    pub fn with_prompt_name(mut self, name: impl Into<String>) -> Self {
        self.prompt_name = name.into();
        self
    }

    /// Set the rubric.
    #[must_use]
    pub fn with_rubric(mut self, rubric: Vec<String>) -> Self {
        self.rubric = rubric;
        self
    }

    /// Set the case count.
    #[must_use]
    pub fn with_case_count(mut self, count: usize) -> Self {
        self.case_count = Some(count);
        self
    }

    /// Set the dataset label.
    #[must_use]
    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    /// Validate fields required by every invocation.
    fn validate_for_evaluation(&self) -> Result<(), EvalError> {
        if self.prompt.trim().is_empty() {
            return Err(EvalError::MissingField("prompt"));
        }
        Ok(())
    }

    /// Validate fields the optimizing pipeline additionally requires.
    fn validate_for_optimization(&self) -> Result<(), EvalError> {
        self.validate_for_evaluation()?;
        if self.goal.trim().is_empty() {
            return Err(EvalError::MissingField("goal"));
        }
        if self.prompt_name.trim().is_empty() {
            return Err(EvalError::MissingField("promptName"));
        }
        Ok(())
    }
}

/// Tunables for a pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Minimum `overall` at which a result passes
    pub pass_threshold: f64,

    /// Generator tunables (default case count, output budget)
    pub generator: GeneratorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pass_threshold: PASS_THRESHOLD,
            generator: GeneratorConfig::default(),
        }
    }
}

/// Everything a pipeline invocation produced.
///
/// For an evaluation-only run, and for an optimizing run where nothing
/// failed, the optimized fields mirror the originals and `changes` is
/// empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub original_prompt: String,
    pub optimized_prompt: String,
    pub original_results: Vec<ExecutionResult>,
    pub optimized_results: Vec<ExecutionResult>,
    pub original_summary: Summary,
    pub optimized_summary: Summary,
    /// Optimizer's explanation of the revision (empty when skipped)
    pub reasoning: String,
    /// Concrete changes the optimizer made (empty when skipped)
    pub changes: Vec<String>,
    /// Full progress log of the invocation
    pub events: Vec<ProgressEvent>,
}

/// Pipeline orchestrator over one completion service.
#[derive(Clone)]
pub struct Pipeline {
    service: CompletionService,
    config: PipelineConfig,
    sink: Option<Arc<dyn RunSink>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("service", &self.service)
            .field("config", &self.config)
            .field("sink", &self.sink.as_ref().map(|s| s.name()))
            .finish()
    }
}

impl Pipeline {
    /// Create a pipeline with default tunables and no sink.
    pub fn new(service: CompletionService) -> Self {
        Self {
            service,
            config: PipelineConfig::default(),
            sink: None,
        }
    }

    /// Replace the tunables.
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach an external sink that receives one record per judged
    /// example, keyed by run. Delivery is best-effort.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn RunSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Scoring mode and pass threshold for a request.
    ///
    /// An explicit request rubric switches the run to binary rubric
    /// scoring: one yes/no call per criterion, pass only when every
    /// criterion passes. Without one, the four-dimension judge applies.
    fn scoring_for(&self, request: &PipelineRequest) -> (ScoringMode, f64) {
        if request.rubric.is_empty() {
            (ScoringMode::Dimensions, self.config.pass_threshold)
        } else {
            (
                ScoringMode::Rubric(request.rubric.clone()),
                RUBRIC_PASS_THRESHOLD,
            )
        }
    }

    /// Evaluate the prompt without optimizing it.
    ///
    /// Requires only `prompt`. The report's optimized fields mirror the
    /// originals.
    pub async fn evaluate(
        &self,
        request: PipelineRequest,
        reporter: &mut ProgressReporter,
    ) -> Result<PipelineReport, EvalError> {
        request.validate_for_evaluation()?;
        let (mode, threshold) = self.scoring_for(&request);
        let run_id = Uuid::new_v4().to_string();

        let cases = self.generate_cases(&request, reporter).await?;
        let results = self
            .evaluate_prompt(&request.prompt, &cases, &request.goal, mode, "evaluation", reporter)
            .await;
        let summary = Summary::from_results(&results, threshold);
        self.record_results(&run_id, &request, "original", &results).await;

        reporter.completed(
            "complete",
            format!("{}/{} cases passed", summary.passed, summary.total),
        );

        Ok(PipelineReport {
            original_prompt: request.prompt.clone(),
            optimized_prompt: request.prompt,
            original_results: results.clone(),
            optimized_results: results,
            original_summary: summary,
            optimized_summary: summary,
            reasoning: String::new(),
            changes: Vec::new(),
            events: reporter.events().to_vec(),
        })
    }

    /// Run the full pipeline: evaluate, optimize from the failing results,
    /// re-evaluate the revision on the same test cases.
    ///
    /// Requires `prompt`, `goal`, and `prompt_name`. When every case
    /// passes, the optimizer is never invoked and the optimized prompt
    /// equals the original.
    pub async fn run(
        &self,
        request: PipelineRequest,
        reporter: &mut ProgressReporter,
    ) -> Result<PipelineReport, EvalError> {
        request.validate_for_optimization()?;
        log::info!("Starting pipeline for prompt '{}'", request.prompt_name);
        let (mode, threshold) = self.scoring_for(&request);
        let run_id = Uuid::new_v4().to_string();

        let cases = self.generate_cases(&request, reporter).await?;
        let original_results = self
            .evaluate_prompt(
                &request.prompt,
                &cases,
                &request.goal,
                mode.clone(),
                "evaluation",
                reporter,
            )
            .await;
        self.record_results(&run_id, &request, "original", &original_results)
            .await;

        reporter.running("analysis", "partitioning results");
        let original_summary = Summary::from_results(&original_results, threshold);
        let failing: Vec<ExecutionResult> = original_results
            .iter()
            .filter(|r| !r.scores.passes(threshold))
            .cloned()
            .collect();
        reporter.completed(
            "analysis",
            format!(
                "{}/{} passed, {} failing",
                original_summary.passed, original_summary.total, failing.len()
            ),
        );

        if failing.is_empty() {
            reporter.completed("optimization", "no failing cases, optimization skipped");
            reporter.completed(
                "complete",
                format!("{}/{} cases passed", original_summary.passed, original_summary.total),
            );
            return Ok(PipelineReport {
                original_prompt: request.prompt.clone(),
                optimized_prompt: request.prompt,
                original_results: original_results.clone(),
                optimized_results: original_results,
                original_summary,
                optimized_summary: original_summary,
                reasoning: String::new(),
                changes: Vec::new(),
                events: reporter.events().to_vec(),
            });
        }

        reporter.running(
            "optimization",
            format!("revising prompt from {} failing cases", failing.len()),
        );
        let optimizer = Optimizer::new(self.service.clone());
        let proposal = match optimizer
            .propose(&request.prompt, &failing, &request.goal, &request.rubric)
            .await
        {
            Ok(proposal) => proposal,
            Err(e) => {
                reporter.error("optimization", e.to_string());
                return Err(e);
            }
        };
        reporter.completed("optimization", format!("{} changes proposed", proposal.changes.len()));

        // Re-run on the same cases so the comparison is like-for-like.
        let optimized_results = self
            .evaluate_prompt(
                &proposal.prompt,
                &cases,
                &request.goal,
                mode,
                "evaluation_optimized",
                reporter,
            )
            .await;
        self.record_results(&run_id, &request, "optimized", &optimized_results)
            .await;
        let optimized_summary = Summary::from_results(&optimized_results, threshold);

        reporter.completed(
            "complete",
            format!(
                "pass rate {:.2} -> {:.2}",
                original_summary.pass_rate, optimized_summary.pass_rate
            ),
        );

        Ok(PipelineReport {
            original_prompt: request.prompt,
            optimized_prompt: proposal.prompt,
            original_results,
            optimized_results,
            original_summary,
            optimized_summary,
            reasoning: proposal.reasoning,
            changes: proposal.changes,
            events: reporter.events().to_vec(),
        })
    }

    async fn generate_cases(
        &self,
        request: &PipelineRequest,
        reporter: &mut ProgressReporter,
    ) -> Result<Vec<crate::results::TestCase>, EvalError> {
        let count = request.case_count.unwrap_or(self.config.generator.case_count);
        reporter.running("generation", format!("generating {} test cases", count));

        let generator = TestCaseGenerator::new(self.service.clone())
            .with_config(self.config.generator.clone());
        match generator
            .generate(&request.prompt, &request.goal, &request.rubric, count)
            .await
        {
            Ok(cases) => {
                reporter.completed("generation", format!("generated {} test cases", cases.len()));
                Ok(cases)
            }
            Err(e) => {
                reporter.error("generation", e.to_string());
                Err(e)
            }
        }
    }

    async fn evaluate_prompt(
        &self,
        prompt: &str,
        cases: &[crate::results::TestCase],
        goal: &str,
        mode: ScoringMode,
        phase: &str,
        reporter: &mut ProgressReporter,
    ) -> Vec<ExecutionResult> {
        reporter.running(phase, format!("running {} cases", cases.len()));
        let runner = EvalRunner::new(self.service.clone()).with_scoring(mode);
        let results = runner.run(prompt, cases, goal, reporter).await;
        reporter.completed(phase, format!("{} results", results.len()));
        results
    }

    /// Forward one record per result to the attached sink, if any.
    /// Delivery failures are logged and never fail the run.
    async fn record_results(
        &self,
        run_id: &str,
        request: &PipelineRequest,
        variant: &str,
        results: &[ExecutionResult],
    ) {
        let Some(sink) = &self.sink else {
            return;
        };
        for result in results {
            let record = RunRecord {
                run_id: run_id.to_string(),
                dataset: request.dataset.clone(),
                prompt_name: request.prompt_name.clone(),
                variant: variant.to_string(),
                input: result.input.clone(),
                output: result.output.clone(),
                scores: result.scores,
            };
            if let Err(e) = sink.record(&record).await {
                log::warn!("sink '{}' failed to record example: {}", sink.name(), e);
            }
        }
    }
}
