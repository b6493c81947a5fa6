use std::time::Duration;

/// Configuration for the completion service.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct CompletionConfig {
    /// Wall-clock timeout for a single provider call
    ///
    /// Default: 10 seconds. Exceeding it is treated as a provider failure
    /// and triggers the fallback provider.
    pub timeout: Duration,

    /// Default maximum output tokens when the caller does not size the call
    ///
    /// Default: 1024
    pub max_tokens: u32,

    /// Temperature for generation (0.0 - 1.0)
    ///
    /// Default: 0.7
    pub temperature: f32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

impl CompletionConfig {
    /// Set the wall-clock timeout for a single provider call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the default maximum output tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the temperature for generation (0.0 - 1.0).
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}
