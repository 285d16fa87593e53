//! LLM access for candidate extraction.

pub mod chain;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod provider;

#[cfg(test)]
mod tests;

pub use chain::{ProviderChain, RetryPolicy};
pub use error::LlmError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockLlm;
pub use provider::GenaiProvider;

use async_trait::async_trait;

/// A text-in, text-out language model.
#[async_trait]
pub trait LlmService: Send + Sync {
    async fn invoke(&self, prompt: &str) -> Result<String, LlmError>;

    fn name(&self) -> &str;
}
