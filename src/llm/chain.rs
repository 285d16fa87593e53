//! Ordered provider fallback with bounded retries.
//!
//! Each provider is tried in turn. Transient errors are retried on the same provider
//! with exponential backoff until its attempts run out; any other error moves straight
//! on to the next provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{LlmError, LlmService};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per provider, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(16),
        }
    }
}

impl RetryPolicy {
    /// Retries immediately. Useful in tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Backoff before retry number `attempt + 1`: `min(base * 2^attempt, max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be > 0".to_string());
        }
        if self.base_delay > self.max_delay {
            return Err("base_delay must not exceed max_delay".to_string());
        }
        Ok(())
    }
}

pub struct ProviderChain {
    providers: Vec<Arc<dyn LlmService>>,
    policy: RetryPolicy,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn LlmService>>, policy: RetryPolicy) -> Self {
        Self { providers, policy }
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|p| p.name())
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderChain")
            .field("providers", &self.providers().collect::<Vec<_>>())
            .field("policy", &self.policy)
            .finish()
    }
}

#[async_trait]
impl LlmService for ProviderChain {
    async fn invoke(&self, prompt: &str) -> Result<String, LlmError> {
        let mut attempts = 0u32;
        let mut last: Option<LlmError> = None;

        for provider in &self.providers {
            for attempt in 0..self.policy.max_attempts {
                attempts += 1;
                match provider.invoke(prompt).await {
                    Ok(text) => {
                        debug!(provider = provider.name(), attempts, "LLM call succeeded");
                        return Ok(text);
                    }
                    Err(e) if e.is_transient() && attempt + 1 < self.policy.max_attempts => {
                        let delay = self.policy.delay_for(attempt);
                        warn!(
                            provider = provider.name(),
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Transient LLM error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    Err(e) => {
                        warn!(provider = provider.name(), error = %e, "LLM provider failed, trying next");
                        last = Some(e);
                        break;
                    }
                }
            }
        }

        match last {
            Some(last) => Err(LlmError::Exhausted {
                attempts,
                last: Box::new(last),
            }),
            None => Err(LlmError::NoProviders),
        }
    }

    fn name(&self) -> &str {
        "provider-chain"
    }
}
