//! LLM-backed synthetic test-case generation.
//!
//! The generator asks the completion service for a JSON array of test cases
//! tailored to the prompt under evaluation, then extracts and validates the
//! array from whatever prose the model wraps it in. Parse problems are
//! terminal ([`EvalError::GenerationParse`]); provider failures are only
//! recovered through the service's single fallback.

use crate::error::EvalError;
use crate::results::TestCase;
use promptcheck_core::{extract_json, CompletionService, Shape};

/// Default number of test cases to request.
pub const DEFAULT_CASE_COUNT: usize = 5;

/// System framing for the generation request.
const GENERATOR_INSTRUCTION: &str = "You are a test designer for prompt templates. \
Given a prompt template and its goal, produce diverse test inputs that probe \
typical usage, edge cases, and failure modes. Respond with ONLY a JSON array, \
no prose before or after.";

/// Configuration for the test-case generator.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// How many cases to request when the caller does not say
    pub case_count: usize,

    /// Output budget for the generation call
    pub max_tokens: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            case_count: DEFAULT_CASE_COUNT,
            max_tokens: 2048,
        }
    }
}

impl GeneratorConfig {
    /// Set the default case count.
    #[must_use]
    pub fn with_case_count(mut self, count: usize) -> Self {
        self.case_count = count;
        self
    }

    /// Set the output budget.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Generates synthetic test cases for a prompt template.
#[derive(Debug, Clone)]
pub struct TestCaseGenerator {
    service: CompletionService,
    config: GeneratorConfig,
}

impl TestCaseGenerator {
    /// Create a generator over a completion service.
    pub fn new(service: CompletionService) -> Self {
        Self {
            service,
            config: GeneratorConfig::default(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Generate up to `count` test cases for `prompt`.
    ///
    /// The model is asked for a JSON array of
    /// `{input, rubric?, metadata?}` objects; the first balanced array in
    /// the response is parsed. Each case must carry a non-empty `input`.
    /// The result is truncated to `count` if the model over-delivers.
    ///
    /// # Errors
    ///
    /// - `EvalError::Completion` when the service (primary and fallback)
    ///   fails — generation cannot proceed without text
    /// - `EvalError::GenerationParse` when no array is found, the array
    ///   does not parse, it is empty, or a case has an empty input
    pub async fn generate(
        &self,
        prompt: &str,
        goal: &str,
        rubric: &[String],
        count: usize,
    ) -> Result<Vec<TestCase>, EvalError> {
        let request = self.build_request(prompt, goal, rubric, count);
        log::info!("Generating {} test cases", count);

        let response = self
            .service
            .complete(&request, self.config.max_tokens)
            .await?;

        let mut cases: Vec<TestCase> = extract_json(&response, Shape::Array)
            .map_err(|e| EvalError::GenerationParse(e.to_string()))?;

        if cases.is_empty() {
            return Err(EvalError::GenerationParse(
                "generator returned an empty array".to_string(),
            ));
        }
        if let Some(bad) = cases.iter().position(|c| c.input.trim().is_empty()) {
            return Err(EvalError::GenerationParse(format!(
                "case {} has an empty input",
                bad
            )));
        }

        cases.truncate(count);
        log::info!("Generated {} test cases", cases.len());
        Ok(cases)
    }

    fn build_request(&self, prompt: &str, goal: &str, rubric: &[String], count: usize) -> String {
        let mut request = format!(
            "{}\n\nPrompt template under test:\n{}\n\nGoal of the prompt:\n{}\n",
            GENERATOR_INSTRUCTION, prompt, goal
        );

        if !rubric.is_empty() {
            request.push_str("\nEvery output will be judged against these criteria:\n");
            for criterion in rubric {
                request.push_str("- ");
                request.push_str(criterion);
                request.push('\n');
            }
        }

        request.push_str(&format!(
            "\nProduce exactly {} test cases as a JSON array. Each element:\n\
            {{\"input\": \"<text substituted into the template>\", \
            \"rubric\": [\"<pass/fail criterion>\", ...], \
            \"metadata\": {{\"tone\": \"<expected tone or omit>\", \
            \"requiresJson\": <true if the output must be JSON>, \
            \"category\": \"factual\"|\"recommendation\"|\"creative\"}}}}\n",
            count
        ));
        request
    }
}
