//! Prompt revision from failing evaluation results.
//!
//! The optimizer shows the model the prompt, its goal, and the failing
//! results, and asks for a revised template. Extraction failures are
//! terminal ([`EvalError::OptimizationParse`]) — a proposal is never
//! silently defaulted, because re-running the original prompt as if it were
//! a revision would report a no-op improvement as real.

use crate::error::EvalError;
use crate::results::{ExecutionResult, OptimizationProposal};
use promptcheck_core::{extract_json, truncate, CompletionService, Shape};

/// Maximum candidate proposals returned by [`Optimizer::propose_candidates`].
const MAX_CANDIDATES: usize = 3;

/// Output shown per failing result in the optimizer prompt.
const FAILURE_EXCERPT_CHARS: usize = 300;

const OPTIMIZER_INSTRUCTION: &str = "You are a prompt engineer. Revise the \
prompt template below so the failing cases pass, without breaking what \
already works. Keep the {{input}} placeholder. Respond with ONLY JSON, no \
prose before or after.";

/// Proposes prompt revisions from failing results.
#[derive(Debug, Clone)]
pub struct Optimizer {
    service: CompletionService,
    max_tokens: u32,
}

impl Optimizer {
    /// Create an optimizer over a completion service.
    pub fn new(service: CompletionService) -> Self {
        Self {
            service,
            max_tokens: 2048,
        }
    }

    /// Set the output budget for the optimization call.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Propose a single revised prompt.
    ///
    /// # Errors
    ///
    /// - `EvalError::Completion` when the service fails
    /// - `EvalError::OptimizationParse` when no balanced JSON object is
    ///   found in the response or it does not parse as a proposal
    pub async fn propose(
        &self,
        prompt: &str,
        failing: &[ExecutionResult],
        goal: &str,
        rubric: &[String],
    ) -> Result<OptimizationProposal, EvalError> {
        let request = self.build_request(prompt, failing, goal, rubric, 1);
        log::info!("Requesting prompt revision for {} failing cases", failing.len());

        let response = self.service.complete(&request, self.max_tokens).await?;
        extract_json(&response, Shape::Object)
            .map_err(|e| EvalError::OptimizationParse(e.to_string()))
    }

    /// Propose up to three candidate revisions.
    ///
    /// # Errors
    ///
    /// Same as [`propose`](Self::propose), for array extraction; an empty
    /// array is a parse failure.
    pub async fn propose_candidates(
        &self,
        prompt: &str,
        failing: &[ExecutionResult],
        goal: &str,
        rubric: &[String],
    ) -> Result<Vec<OptimizationProposal>, EvalError> {
        let request = self.build_request(prompt, failing, goal, rubric, MAX_CANDIDATES);

        let response = self.service.complete(&request, self.max_tokens).await?;
        let mut candidates: Vec<OptimizationProposal> = extract_json(&response, Shape::Array)
            .map_err(|e| EvalError::OptimizationParse(e.to_string()))?;

        if candidates.is_empty() {
            return Err(EvalError::OptimizationParse(
                "optimizer returned an empty candidate array".to_string(),
            ));
        }
        candidates.truncate(MAX_CANDIDATES);
        Ok(candidates)
    }

    fn build_request(
        &self,
        prompt: &str,
        failing: &[ExecutionResult],
        goal: &str,
        rubric: &[String],
        count: usize,
    ) -> String {
        let mut request = format!(
            "{}\n\nCurrent prompt template:\n{}\n\nGoal:\n{}\n",
            OPTIMIZER_INSTRUCTION, prompt, goal
        );

        if !rubric.is_empty() {
            request.push_str("\nOutputs are judged against:\n");
            for criterion in rubric {
                request.push_str("- ");
                request.push_str(criterion);
                request.push('\n');
            }
        }

        request.push_str("\nFailing cases:\n");
        for result in failing {
            request.push_str(&format!(
                "- input: {}\n  output: {}\n  overall score: {:.2}\n",
                result.input,
                truncate(&result.output, FAILURE_EXCERPT_CHARS),
                result.scores.overall
            ));
            if let Some(reason) = &result.failure_reason {
                request.push_str(&format!("  failure: {}\n", reason));
            }
        }

        let schema = r#"{"prompt": "<revised template with {{input}}>", "reasoning": "<why>", "changes": ["<change>", ...]}"#;
        if count == 1 {
            request.push_str(&format!("\nRespond with one JSON object:\n{}\n", schema));
        } else {
            request.push_str(&format!(
                "\nRespond with a JSON array of up to {} candidate objects, best first:\n[{}]\n",
                count, schema
            ));
        }
        request
    }
}
