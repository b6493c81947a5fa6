//! Sequential evaluation of a prompt template over a test-case set.

use crate::judge::{DimensionJudge, RubricJudge};
use crate::progress::ProgressReporter;
use crate::results::{ExecutionResult, TestCase};
use promptcheck_core::{render, CompletionService};

/// How each output is scored.
#[derive(Debug, Clone, Default)]
pub enum ScoringMode {
    /// Four binary dimensions, overall = their mean
    #[default]
    Dimensions,
    /// One yes/no call per criterion, overall = 0/1. The carried criteria
    /// apply to every case, ahead of the case's own rubric.
    Rubric(Vec<String>),
}

/// Runs a prompt variant over test cases, one case at a time.
///
/// Strictly sequential: each case fully completes (render, complete, judge)
/// before the next begins, so progress events map one-to-one onto case
/// order. A completion failure for a case becomes a zero-scored result with
/// a `failure_reason`; the run itself never aborts for a single provider
/// failure.
#[derive(Debug, Clone)]
pub struct EvalRunner {
    service: CompletionService,
    judge: DimensionJudge,
    rubric_judge: RubricJudge,
    mode: ScoringMode,
}

impl EvalRunner {
    /// Create a runner scoring by dimensions; the same service backs
    /// execution and judging.
    pub fn new(service: CompletionService) -> Self {
        let judge = DimensionJudge::new(service.clone());
        let rubric_judge = RubricJudge::new(service.clone());
        Self {
            service,
            judge,
            rubric_judge,
            mode: ScoringMode::Dimensions,
        }
    }

    /// Set the scoring mode.
    #[must_use]
    pub fn with_scoring(mut self, mode: ScoringMode) -> Self {
        self.mode = mode;
        self
    }

    /// Replace the dimension judge (e.g. a different model).
    #[must_use]
    pub fn with_judge(mut self, judge: DimensionJudge) -> Self {
        self.judge = judge;
        self
    }

    /// Execute and judge every case against `prompt_template`, in order.
    ///
    /// Returns one [`ExecutionResult`] per case, in case order.
    pub async fn run(
        &self,
        prompt_template: &str,
        cases: &[TestCase],
        goal: &str,
        reporter: &mut ProgressReporter,
    ) -> Vec<ExecutionResult> {
        let total = cases.len();
        let max_tokens = self.service.config().max_tokens;
        let mut results = Vec::with_capacity(total);

        for (i, case) in cases.iter().enumerate() {
            reporter.running("execution", format!("case {}/{}", i + 1, total));

            let rendered = render(prompt_template, &case.input);
            let result = match self.service.complete(&rendered, max_tokens).await {
                Ok(output) => self.judge_output(output, case, goal).await,
                Err(e) => {
                    log::warn!("completion failed for case {}/{}: {}", i + 1, total, e);
                    ExecutionResult::completion_failed(case, e.to_string())
                }
            };

            results.push(result);
            reporter.completed("execution", format!("case {}/{}", i + 1, total));
        }

        results
    }

    async fn judge_output(&self, output: String, case: &TestCase, goal: &str) -> ExecutionResult {
        match &self.mode {
            ScoringMode::Dimensions => {
                let reference = case.reference();
                let scores = self.judge.score(&output, case, goal, &reference).await;
                ExecutionResult {
                    input: case.input.clone(),
                    output,
                    rubric: case.rubric.clone(),
                    scores,
                    failure_reason: None,
                    criteria: None,
                }
            }
            ScoringMode::Rubric(shared) => {
                let mut rubric = shared.clone();
                rubric.extend(case.rubric.iter().cloned());
                let verdict = self.rubric_judge.judge(&output, &rubric).await;
                ExecutionResult::from_verdict(case, output, rubric, verdict)
            }
        }
    }
}
