use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("provider '{provider}' is rate limited: {reason}")]
    RateLimited { provider: String, reason: String },

    #[error("transport error talking to '{provider}': {reason}")]
    Transport { provider: String, reason: String },

    #[error("provider '{provider}' failed: {reason}")]
    Provider { provider: String, reason: String },

    #[error("provider '{provider}' returned an empty response")]
    EmptyResponse { provider: String },

    #[error("no LLM providers configured")]
    NoProviders,

    #[error("all LLM providers failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<LlmError> },
}

impl LlmError {
    /// Rate-limit and transport failures may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. } | LlmError::Transport { .. })
    }

    /// Classifies a provider error message.
    pub fn classify(provider: &str, message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        let provider = provider.to_string();
        let reason = message.to_string();

        if lower.contains("429")
            || lower.contains("resource_exhausted")
            || lower.contains("rate limit")
            || lower.contains("rate_limit")
            || lower.contains("quota")
        {
            LlmError::RateLimited { provider, reason }
        } else if lower.contains("timed out")
            || lower.contains("timeout")
            || lower.contains("connection")
            || lower.contains("502")
            || lower.contains("503")
        {
            LlmError::Transport { provider, reason }
        } else {
            LlmError::Provider { provider, reason }
        }
    }
}
