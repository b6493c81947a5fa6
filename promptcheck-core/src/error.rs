use thiserror::Error;

/// Errors produced by a single completion provider.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderError {
    /// Transport-level failure (connection, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx status from the provider API
    #[error("Provider returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    /// Response was 2xx but did not have the expected shape
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// A scripted provider ran out of responses
    #[error("Provider script exhausted")]
    Exhausted,

    /// Other provider-specific error
    #[error("{0}")]
    Other(String),
}

/// Errors produced by the completion service.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompletionError {
    /// Invalid request detected before any provider call
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The call exceeded the configured wall-clock timeout
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// The primary provider failed and no fallback is configured
    #[error("Provider '{provider}' failed: {source}")]
    Provider {
        provider: String,
        source: ProviderError,
    },

    /// Both the primary and the fallback provider failed
    #[error("All providers failed; primary: {primary}; fallback: {fallback}")]
    AllProvidersFailed { primary: String, fallback: String },
}

impl CompletionError {
    /// Check if this error was detected before any external call was made.
    pub fn is_configuration(&self) -> bool {
        matches!(self, CompletionError::InvalidRequest(_))
    }
}
