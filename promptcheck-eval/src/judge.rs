//! LLM judges: dimension scoring and binary rubric verdicts.
//!
//! Each dimension or criterion is one yes/no question to the completion
//! service. A judgment call that fails — provider error or an answer that
//! is not yes/no — degrades that dimension (or criterion) to a failure and
//! is logged; judging never aborts a run. The conservative bias means an
//! unreliable judge depresses scores rather than crashing the pipeline.

use crate::results::{CriterionResult, PromptCategory, RubricVerdict, Scores, TestCase};
use promptcheck_core::CompletionService;

/// Output budget for a yes/no judgment call.
const JUDGE_MAX_TOKENS: u32 = 16;

/// Framing prepended to every judgment question.
const JUDGE_INSTRUCTION: &str = "You are a strict evaluator. Answer the \
question with a single word: yes or no. No explanation.";

/// Parse a yes/no answer from judge output.
///
/// Accepts a leading "yes" or "no" in any case; anything else is a
/// judgment failure.
fn parse_yes_no(text: &str) -> Option<bool> {
    let lowered = text.trim().to_ascii_lowercase();
    if lowered.starts_with("yes") {
        Some(true)
    } else if lowered.starts_with("no") {
        Some(false)
    } else {
        None
    }
}

/// Ask one yes/no question; `Err` carries the reason the judgment failed.
async fn ask_binary(service: &CompletionService, question: &str) -> Result<bool, String> {
    let prompt = format!("{}\n\n{}", JUDGE_INSTRUCTION, question);
    let answer = service
        .complete(&prompt, JUDGE_MAX_TOKENS)
        .await
        .map_err(|e| e.to_string())?;
    parse_yes_no(&answer)
        .ok_or_else(|| format!("judge answered neither yes nor no: {:?}", answer.trim()))
}

/// Scores one output across four binary dimensions.
///
/// Correctness and comparison questions are tailored by the case's
/// [`PromptCategory`]: a recommendation prompt has no single right answer,
/// so it is judged for topical relevance and adequacy instead of factual
/// match. Format is a local JSON parse (no LLM call); tone is only judged
/// when the case specifies one, otherwise it scores 1.0.
#[derive(Debug, Clone)]
pub struct DimensionJudge {
    service: CompletionService,
}

impl DimensionJudge {
    /// Create a judge over a completion service.
    pub fn new(service: CompletionService) -> Self {
        Self { service }
    }

    /// Score `output` for `case`. Infallible: a failed dimension judgment
    /// logs a warning and scores 0.0.
    pub async fn score(&self, output: &str, case: &TestCase, goal: &str, reference: &str) -> Scores {
        let correctness = self
            .judge_dimension("correctness", &self.correctness_question(output, case, goal, reference))
            .await;
        let comparison = self
            .judge_dimension("comparison", &self.comparison_question(output, case, reference))
            .await;
        let format = self.format_score(output, case);
        let tone = match &case.metadata.tone {
            None => 1.0,
            Some(tone) => {
                self.judge_dimension("tone", &self.tone_question(output, tone))
                    .await
            }
        };

        Scores::from_dimensions(correctness, comparison, format, tone)
    }

    async fn judge_dimension(&self, dimension: &str, question: &str) -> f64 {
        match ask_binary(&self.service, question).await {
            Ok(true) => 1.0,
            Ok(false) => 0.0,
            Err(reason) => {
                log::warn!("{} judgment failed, scoring 0: {}", dimension, reason);
                0.0
            }
        }
    }

    /// Local check: 1.0 unless the case requires JSON output.
    fn format_score(&self, output: &str, case: &TestCase) -> f64 {
        if !case.metadata.requires_json {
            return 1.0;
        }
        if serde_json::from_str::<serde_json::Value>(output.trim()).is_ok() {
            1.0
        } else {
            0.0
        }
    }

    fn correctness_question(
        &self,
        output: &str,
        case: &TestCase,
        goal: &str,
        reference: &str,
    ) -> String {
        match case.metadata.category {
            PromptCategory::Recommendation => format!(
                "The request was: {}\nThe goal is: {}\n\nResponse:\n{}\n\n\
                Is the response on-topic for the request and concrete enough to act on?",
                case.input, goal, output
            ),
            PromptCategory::Factual | PromptCategory::Creative => format!(
                "The request was: {}\nThe goal is: {}\nReference criteria: {}\n\n\
                Response:\n{}\n\n\
                Is the response factually correct and consistent with the reference criteria?",
                case.input, goal, reference, output
            ),
        }
    }

    fn comparison_question(&self, output: &str, case: &TestCase, reference: &str) -> String {
        match case.metadata.category {
            PromptCategory::Recommendation => format!(
                "The request was: {}\n\nResponse:\n{}\n\n\
                Is the response helpful and adequate for the request?",
                case.input, output
            ),
            PromptCategory::Factual | PromptCategory::Creative => format!(
                "Reference criteria: {}\n\nResponse:\n{}\n\n\
                Is the response at least as good as what the reference criteria describe?",
                reference, output
            ),
        }
    }

    fn tone_question(&self, output: &str, tone: &str) -> String {
        format!(
            "Expected tone: {}\n\nResponse:\n{}\n\n\
            Does the response match the expected tone?",
            tone, output
        )
    }
}

/// Judges one output against an explicit rubric, one yes/no call per
/// criterion. The verdict is binary: 1.0 iff every criterion passed.
#[derive(Debug, Clone)]
pub struct RubricJudge {
    service: CompletionService,
}

impl RubricJudge {
    /// Create a judge over a completion service.
    pub fn new(service: CompletionService) -> Self {
        Self { service }
    }

    /// Judge `output` against `rubric`. Infallible: a failed criterion
    /// judgment logs a warning and marks that criterion failed.
    pub async fn judge(&self, output: &str, rubric: &[String]) -> RubricVerdict {
        let mut criteria = Vec::with_capacity(rubric.len());

        for criterion in rubric {
            let question = format!(
                "Criterion: {}\n\nResponse:\n{}\n\nDoes the response satisfy the criterion?",
                criterion, output
            );
            let passed = match ask_binary(&self.service, &question).await {
                Ok(passed) => passed,
                Err(reason) => {
                    log::warn!(
                        "rubric judgment failed for {:?}, marking failed: {}",
                        criterion,
                        reason
                    );
                    false
                }
            };
            criteria.push(CriterionResult {
                criterion: criterion.clone(),
                passed,
            });
        }

        let failed: Vec<&str> = criteria
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.criterion.as_str())
            .collect();

        RubricVerdict {
            score: if failed.is_empty() { 1.0 } else { 0.0 },
            failure_reason: if failed.is_empty() {
                None
            } else {
                Some(format!("Failed criteria: {}", failed.join("; ")))
            },
            criteria,
        }
    }
}
