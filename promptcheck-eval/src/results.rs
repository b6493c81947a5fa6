//! Pipeline data model: test cases, scores, results, summaries.
//!
//! All types serialize to JSON for the event stream and report payloads.
//! Aggregates ([`Summary`]) are always derived from a result list, never
//! stored independently, so they can be recomputed at any time.

use serde::{Deserialize, Serialize};

/// Minimum `overall` score at which a dimension-scored result passes.
pub const PASS_THRESHOLD: f64 = 0.8;

/// Pass threshold for binary rubric scoring.
pub const RUBRIC_PASS_THRESHOLD: f64 = 1.0;

/// Intent category of a prompt, guessed by the generator.
///
/// The category drives which judging questions are asked: recommendation
/// prompts have no single correct answer, so they are judged for on-topic
/// relevance and concreteness instead of factual match. The label is an LLM
/// guess and the mapping is a tunable policy, not a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptCategory {
    /// Single verifiable answer exists
    #[default]
    Factual,
    /// Many acceptable answers; judged for relevance and concreteness
    Recommendation,
    /// Open-ended output; judged against the reference loosely
    Creative,
}

/// Open metadata attached to a generated test case.
///
/// Known fields are typed; anything else the generator emits is preserved
/// in `extra` so downstream consumers can read it without a schema change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseMetadata {
    /// Expected tone of the output, when the case specifies one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,

    /// Whether the output must parse as JSON
    #[serde(default, rename = "requiresJson")]
    pub requires_json: bool,

    /// Minimum output length in characters, when specified
    #[serde(default, rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    /// Substrings the output is expected to contain
    #[serde(
        default,
        rename = "requiredSubstrings",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub required_substrings: Vec<String>,

    /// Generator-assigned intent category
    #[serde(default)]
    pub category: PromptCategory,

    /// Anything else the generator attached
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Accept a bare string as a one-element criterion list.
///
/// Generators emit both forms; a scalar criterion must not fail the whole
/// generation.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        One(String),
        Many(Vec<String>),
    }

    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::One(criterion) => vec![criterion],
        StringOrList::Many(criteria) => criteria,
    })
}

/// A single synthetic test case.
///
/// Created by the generator, immutable thereafter, scoped to one
/// evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Input substituted into the prompt template
    pub input: String,

    /// Ordered pass/fail criteria for judging the output
    #[serde(default, alias = "expected", deserialize_with = "string_or_list")]
    pub rubric: Vec<String>,

    /// Open metadata (tone, JSON requirement, category, ...)
    #[serde(default)]
    pub metadata: CaseMetadata,
}

impl TestCase {
    /// Create a test case with just an input.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            rubric: Vec::new(),
            metadata: CaseMetadata::default(),
        }
    }

    /// Add a rubric criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: impl Into<String>) -> Self {
        self.rubric.push(criterion.into());
        self
    }

    /// Set the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: CaseMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The reference text judges compare against: the joined rubric.
    pub fn reference(&self) -> String {
        self.rubric.join("; ")
    }
}

/// Dimension scores for one judged output.
///
/// All four dimensions are always present; a dimension that does not apply
/// (no tone specified, no JSON required) scores 1.0 automatically.
/// `overall` is the unweighted arithmetic mean of the four.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    /// Factual correctness (or topical relevance for recommendations), 0/1
    pub correctness: f64,

    /// Output at least as good as the reference, 0/1
    pub comparison: f64,

    /// JSON format validity (1.0 when no JSON was required), 0/1
    pub format: f64,

    /// Tone match (1.0 when no tone was specified), 0/1
    pub tone: f64,

    /// Arithmetic mean of the four dimensions
    pub overall: f64,
}

impl Scores {
    /// Build a scores record from the four dimensions, deriving `overall`.
    pub fn from_dimensions(correctness: f64, comparison: f64, format: f64, tone: f64) -> Self {
        Self {
            correctness,
            comparison,
            format,
            tone,
            overall: (correctness + comparison + format + tone) / 4.0,
        }
    }

    /// All dimensions zero, for results whose output never materialized.
    pub fn zero() -> Self {
        Self::uniform(0.0)
    }

    /// All dimensions pinned to one value. Used by binary rubric scoring,
    /// where the verdict is a single 0/1 score rather than four judgments.
    pub fn uniform(score: f64) -> Self {
        Self {
            correctness: score,
            comparison: score,
            format: score,
            tone: score,
            overall: score,
        }
    }

    /// Whether this result passes the dimension threshold.
    pub fn passes(&self, threshold: f64) -> bool {
        self.overall >= threshold
    }
}

/// Result of executing and judging one test case against one prompt
/// variant. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// The test case input
    pub input: String,

    /// Raw text from the completion service (empty when the call failed)
    pub output: String,

    /// Rubric copied from the test case
    #[serde(default)]
    pub rubric: Vec<String>,

    /// Dimension scores
    pub scores: Scores,

    /// Why the case failed, when known
    #[serde(
        default,
        rename = "failureReason",
        skip_serializing_if = "Option::is_none"
    )]
    pub failure_reason: Option<String>,

    /// Per-criterion outcomes, present under binary rubric scoring
    #[serde(
        default,
        rename = "rubricResults",
        skip_serializing_if = "Option::is_none"
    )]
    pub criteria: Option<Vec<CriterionResult>>,
}

impl ExecutionResult {
    /// Result for a case whose completion call failed: empty output, all
    /// scores zero.
    pub fn completion_failed(case: &TestCase, reason: String) -> Self {
        Self {
            input: case.input.clone(),
            output: String::new(),
            rubric: case.rubric.clone(),
            scores: Scores::zero(),
            failure_reason: Some(reason),
            criteria: None,
        }
    }

    /// Result for a judged output under binary rubric scoring.
    pub fn from_verdict(case: &TestCase, output: String, rubric: Vec<String>, verdict: RubricVerdict) -> Self {
        Self {
            input: case.input.clone(),
            output,
            rubric,
            scores: Scores::uniform(verdict.score),
            failure_reason: verdict.failure_reason,
            criteria: Some(verdict.criteria),
        }
    }
}

/// Per-criterion outcome from the rubric judge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionResult {
    /// The criterion text
    pub criterion: String,
    /// Whether the output satisfied it
    pub passed: bool,
}

/// Verdict from the rubric judge: binary score plus per-criterion detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricVerdict {
    /// 1.0 iff every criterion passed
    pub score: f64,

    /// Names the failed criteria, when any
    #[serde(
        default,
        rename = "failureReason",
        skip_serializing_if = "Option::is_none"
    )]
    pub failure_reason: Option<String>,

    /// Per-criterion pass/fail
    #[serde(rename = "rubricResults")]
    pub criteria: Vec<CriterionResult>,
}

/// Aggregate counts over a result list.
///
/// Always recomputable from its source list: `total == len(results)` and
/// `passed + failed == total`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Number of results
    pub total: usize,
    /// Results at or above the pass threshold
    pub passed: usize,
    /// Results below the pass threshold
    pub failed: usize,
    /// `passed / total` (0.0 for an empty list)
    #[serde(rename = "passRate")]
    pub pass_rate: f64,
}

impl Summary {
    /// Derive a summary by partitioning results at `threshold`.
    pub fn from_results(results: &[ExecutionResult], threshold: f64) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.scores.passes(threshold)).count();
        let failed = total - passed;
        let pass_rate = if total > 0 {
            passed as f64 / total as f64
        } else {
            0.0
        };

        Self {
            total,
            passed,
            failed,
            pass_rate,
        }
    }
}

/// A proposed prompt revision from the optimizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationProposal {
    /// Revised prompt template
    pub prompt: String,

    /// Free-text explanation of the revision
    #[serde(default)]
    pub reasoning: String,

    /// Ordered list of concrete changes made
    #[serde(default)]
    pub changes: Vec<String>,
}
