//! Mock completion provider for deterministic tests.
//!
//! The pipeline treats providers as injected [`CompletionProvider`] values,
//! so tests substitute a [`MockProvider`] that replays scripted responses:
//!
//! - **Scripted mode**: a queue of `Ok`/`Err` outcomes consumed in call
//!   order
//! - **Fixed mode**: the same response for every call (useful for
//!   idempotence tests)
//! - **Failing mode**: every call fails with the given message
//!
//! # Example
//!
//! ```
//! use promptcheck_core::{CompletionProvider, MockProvider};
//!
//! # async fn example() {
//! let mock = MockProvider::with_responses(vec![
//!     Ok("first".to_string()),
//!     Ok("second".to_string()),
//! ]);
//!
//! assert_eq!(mock.complete("p", 64).await.unwrap(), "first");
//! assert_eq!(mock.complete("p", 64).await.unwrap(), "second");
//! assert!(mock.complete("p", 64).await.is_err()); // script exhausted
//! # }
//! ```

use crate::error::ProviderError;
use crate::provider::CompletionProvider;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Deterministic provider replaying scripted responses.
pub struct MockProvider {
    name: String,
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    fixed: Option<String>,
    fail_with: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Create a mock that consumes the given responses in order.
    ///
    /// Once the script is exhausted, further calls fail with
    /// [`ProviderError::Exhausted`].
    pub fn with_responses(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            name: "mock".to_string(),
            script: Mutex::new(responses.into()),
            fixed: None,
            fail_with: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock that returns the same text for every call.
    pub fn always(text: impl Into<String>) -> Self {
        Self {
            name: "mock".to_string(),
            script: Mutex::new(VecDeque::new()),
            fixed: Some(text.into()),
            fail_with: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock whose every call fails with the given message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            name: "mock".to_string(),
            script: Mutex::new(VecDeque::new()),
            fixed: None,
            fail_with: Some(message.into()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Set a custom provider name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add an artificial delay before each response.
    ///
    /// Useful for exercising the service timeout.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `complete` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = {
            let mut script = self
                .script
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            script.pop_front()
        };
        if let Some(outcome) = scripted {
            return outcome;
        }

        if let Some(ref text) = self.fixed {
            return Ok(text.clone());
        }
        if let Some(ref message) = self.fail_with {
            return Err(ProviderError::Other(message.clone()));
        }
        Err(ProviderError::Exhausted)
    }
}
