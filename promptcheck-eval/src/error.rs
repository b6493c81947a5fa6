use promptcheck_core::CompletionError;
use thiserror::Error;

/// Errors that abort a pipeline invocation.
///
/// Recovered conditions never appear here: a provider failure during test
/// execution becomes a zero-scored result, and a failed single-dimension
/// judgment degrades that dimension to 0. What remains is the terminal
/// taxonomy — configuration errors caught before any external call, parse
/// failures on generator/optimizer output, and completion failures in
/// phases that cannot proceed without text.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EvalError {
    /// A required request field is missing (no external call attempted)
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// The completion service failed where its output is mandatory
    /// (generation, optimization)
    #[error("Completion failed: {0}")]
    Completion(#[from] CompletionError),

    /// Generator response had no parseable test-case array
    #[error("Failed to parse generated test cases: {0}")]
    GenerationParse(String),

    /// Optimizer response had no parseable proposal
    #[error("Failed to parse optimization proposal: {0}")]
    OptimizationParse(String),
}

impl EvalError {
    /// Check if this error was detected before any external call was made.
    pub fn is_configuration(&self) -> bool {
        match self {
            EvalError::MissingField(_) => true,
            EvalError::Completion(e) => e.is_configuration(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::missing_field(EvalError::MissingField("goal"), &["Missing", "goal"])]
    #[case::generation(
        EvalError::GenerationParse("no array found".into()),
        &["test cases", "no array found"]
    )]
    #[case::optimization(
        EvalError::OptimizationParse("no object found".into()),
        &["proposal", "no object found"]
    )]
    fn test_error_display(#[case] error: EvalError, #[case] expected: &[&str]) {
        let display = error.to_string();
        for s in expected {
            assert!(display.contains(s), "Expected '{}' in '{}'", s, display);
        }
    }

    #[test]
    fn test_is_configuration() {
        assert!(EvalError::MissingField("prompt").is_configuration());
        assert!(!EvalError::GenerationParse("x".into()).is_configuration());

        let completion = EvalError::Completion(CompletionError::InvalidRequest("empty".into()));
        assert!(completion.is_configuration());
    }

    #[test]
    fn test_completion_error_conversion() {
        let err: EvalError = CompletionError::Timeout(10_000).into();
        assert!(matches!(err, EvalError::Completion(_)));
    }
}
