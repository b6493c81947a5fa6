//! Completion service with single-fallback dispatch.

use crate::config::CompletionConfig;
use crate::error::CompletionError;
use crate::provider::CompletionProvider;
use std::sync::Arc;

/// Completion service wrapping a primary provider and an optional fallback.
///
/// On any primary failure — transport error, non-2xx status, malformed
/// response, or the configured wall-clock timeout — the call falls back
/// exactly once to the secondary provider with the same prompt and budget.
/// There are no retries beyond the single fallback; this bounds pipeline
/// latency rather than guaranteeing delivery.
///
/// # Example
///
/// ```no_run
/// use promptcheck_core::{CompletionConfig, CompletionService, HttpProvider};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), promptcheck_core::CompletionError> {
/// let primary = Arc::new(HttpProvider::new(
///     "openai", "https://api.openai.com/v1", "key-a", "gpt-4o-mini",
/// ));
/// let fallback = Arc::new(HttpProvider::new(
///     "groq", "https://api.groq.com/openai/v1", "key-b", "llama-3.1-8b-instant",
/// ));
///
/// let service = CompletionService::new(primary, CompletionConfig::default())
///     .with_fallback(fallback);
/// let text = service.complete("Say hello", 64).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CompletionService {
    primary: Arc<dyn CompletionProvider>,
    fallback: Option<Arc<dyn CompletionProvider>>,
    config: CompletionConfig,
}

impl std::fmt::Debug for CompletionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionService")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.as_ref().map(|p| p.name()))
            .field("config", &self.config)
            .finish()
    }
}

impl CompletionService {
    /// Create a service with a primary provider and no fallback.
    pub fn new(primary: Arc<dyn CompletionProvider>, config: CompletionConfig) -> Self {
        Self {
            primary,
            fallback: None,
            config,
        }
    }

    /// Add a fallback provider, tried exactly once after a primary failure.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn CompletionProvider>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Get a reference to the service configuration.
    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    /// Generate text for a rendered prompt with the given output budget.
    ///
    /// # Errors
    ///
    /// - `CompletionError::InvalidRequest` for an empty prompt (no provider
    ///   is contacted)
    /// - `CompletionError::Timeout` when the primary exceeds the configured
    ///   timeout and no fallback is configured
    /// - `CompletionError::Provider` when the primary fails and no fallback
    ///   is configured
    /// - `CompletionError::AllProvidersFailed` when both providers fail,
    ///   carrying both error messages
    pub async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, CompletionError> {
        if prompt.is_empty() {
            return Err(CompletionError::InvalidRequest(
                "Prompt cannot be empty".to_string(),
            ));
        }

        let primary_error = match self.call_provider(&self.primary, prompt, max_tokens).await {
            Ok(text) => return Ok(text),
            Err(e) => e,
        };

        let Some(ref fallback) = self.fallback else {
            return Err(primary_error);
        };

        log::warn!(
            "Primary provider '{}' failed ({}), falling back to '{}'",
            self.primary.name(),
            primary_error,
            fallback.name()
        );

        match self.call_provider(fallback, prompt, max_tokens).await {
            Ok(text) => Ok(text),
            Err(fallback_error) => Err(CompletionError::AllProvidersFailed {
                primary: primary_error.to_string(),
                fallback: fallback_error.to_string(),
            }),
        }
    }

    /// Execute a single provider call bounded by the configured timeout.
    async fn call_provider(
        &self,
        provider: &Arc<dyn CompletionProvider>,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, CompletionError> {
        match tokio::time::timeout(self.config.timeout, provider.complete(prompt, max_tokens))
            .await
        {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(CompletionError::Provider {
                provider: provider.name().to_string(),
                source: e,
            }),
            Err(_) => Err(CompletionError::Timeout(
                self.config.timeout.as_millis() as u64
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;
    use std::time::Duration;

    fn service_with(
        primary: MockProvider,
        fallback: Option<MockProvider>,
    ) -> CompletionService {
        let mut service =
            CompletionService::new(Arc::new(primary), CompletionConfig::default());
        if let Some(fb) = fallback {
            service = service.with_fallback(Arc::new(fb));
        }
        service
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let primary = MockProvider::always("primary text");
        let fallback = MockProvider::failing("should not be called");
        let service = service_with(primary, Some(fallback));

        let text = service.complete("prompt", 64).await.unwrap();
        assert_eq!(text, "primary text");
    }

    #[tokio::test]
    async fn test_primary_failure_uses_fallback_once() {
        let primary = MockProvider::failing("primary down");
        let fallback = MockProvider::always("fallback text");
        let service = service_with(primary, Some(fallback));

        let text = service.complete("prompt", 64).await.unwrap();
        assert_eq!(text, "fallback text");
    }

    #[tokio::test]
    async fn test_both_fail_combines_errors() {
        let primary = MockProvider::failing("primary down");
        let fallback = MockProvider::failing("fallback down");
        let service = service_with(primary, Some(fallback));

        let err = service.complete("prompt", 64).await.unwrap_err();
        match err {
            CompletionError::AllProvidersFailed { primary, fallback } => {
                assert!(primary.contains("primary down"), "got: {}", primary);
                assert!(fallback.contains("fallback down"), "got: {}", fallback);
            }
            other => panic!("Expected AllProvidersFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_primary_failure_without_fallback() {
        let service = service_with(MockProvider::failing("down"), None);

        let err = service.complete("prompt", 64).await.unwrap_err();
        assert!(matches!(err, CompletionError::Provider { .. }));
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected_before_any_call() {
        // An exhausted script would error if contacted; the validation
        // failure must come first.
        let service = service_with(MockProvider::with_responses(vec![]), None);

        let err = service.complete("", 64).await.unwrap_err();
        assert!(matches!(err, CompletionError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_timeout_without_fallback_reports_timeout() {
        let primary = MockProvider::always("slow").with_delay(Duration::from_millis(200));
        let config = CompletionConfig::default().with_timeout(Duration::from_millis(20));
        let service = CompletionService::new(Arc::new(primary), config);

        let err = service.complete("prompt", 64).await.unwrap_err();
        assert!(matches!(err, CompletionError::Timeout(20)), "got: {:?}", err);
    }

    #[tokio::test]
    async fn test_timeout_triggers_fallback() {
        let primary = MockProvider::always("slow").with_delay(Duration::from_millis(200));
        let fallback = MockProvider::always("fallback text");

        let config = CompletionConfig::default().with_timeout(Duration::from_millis(20));
        let service = CompletionService::new(Arc::new(primary), config)
            .with_fallback(Arc::new(fallback));

        let text = service.complete("prompt", 64).await.unwrap();
        assert_eq!(text, "fallback text");
    }

    #[test]
    fn test_debug_names_providers() {
        let service = service_with(
            MockProvider::always("x"),
            Some(MockProvider::always("y")),
        );
        let debug_output = format!("{:?}", service);
        assert!(debug_output.contains("mock"));
    }
}
