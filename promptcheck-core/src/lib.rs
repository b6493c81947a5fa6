//! # Promptcheck Core
//!
//! Completion-provider layer for the promptcheck pipeline.
//!
//! This crate provides the building blocks the evaluation pipeline is
//! assembled from:
//!
//! - **Providers**: the [`CompletionProvider`] trait and an OpenAI-compatible
//!   HTTP implementation
//! - **Completion service**: primary-with-fallback dispatch and wall-clock
//!   timeouts
//! - **Templating**: placeholder substitution for prompt templates
//! - **Extraction**: pulling balanced JSON fragments out of free-form model
//!   text
//!
//! ## Example
//!
//! ```no_run
//! use promptcheck_core::{CompletionConfig, CompletionService, HttpProvider};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), promptcheck_core::CompletionError> {
//! let primary = HttpProvider::new(
//!     "openai",
//!     "https://api.openai.com/v1",
//!     "api-key",
//!     "gpt-4o-mini",
//! );
//! let service = CompletionService::new(Arc::new(primary), CompletionConfig::default());
//!
//! let text = service.complete("Say hello", 64).await?;
//! println!("{}", text);
//! # Ok(())
//! # }
//! ```

pub mod completion;
pub mod config;
pub mod error;
pub mod extract;
pub mod mock;
pub mod provider;
pub mod template;
pub mod utils;

// Re-export public API
pub use completion::CompletionService;
pub use config::CompletionConfig;
pub use error::{CompletionError, ProviderError};
pub use extract::{extract_array, extract_json, extract_object, ExtractError, Shape};
pub use mock::MockProvider;
pub use provider::{CompletionProvider, HttpProvider};
pub use template::{render, PLACEHOLDER};
pub use utils::truncate;
