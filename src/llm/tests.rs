use super::*;
use std::sync::Arc;
use std::time::Duration;

fn rate_limited() -> LlmError {
    LlmError::RateLimited {
        provider: "p".to_string(),
        reason: "429".to_string(),
    }
}

fn provider_error() -> LlmError {
    LlmError::Provider {
        provider: "p".to_string(),
        reason: "bad request".to_string(),
    }
}

fn chain_of(providers: &[&Arc<MockLlm>], policy: RetryPolicy) -> ProviderChain {
    let providers: Vec<Arc<dyn LlmService>> = providers
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn LlmService>)
        .collect();
    ProviderChain::new(providers, policy)
}

#[test]
fn test_classify() {
    assert!(matches!(
        LlmError::classify("m", "HTTP 429 Too Many Requests"),
        LlmError::RateLimited { .. }
    ));
    assert!(matches!(
        LlmError::classify("m", "RESOURCE_EXHAUSTED: quota"),
        LlmError::RateLimited { .. }
    ));
    assert!(matches!(
        LlmError::classify("m", "connection reset by peer"),
        LlmError::Transport { .. }
    ));
    assert!(matches!(
        LlmError::classify("m", "invalid api key"),
        LlmError::Provider { .. }
    ));
    assert!(LlmError::classify("m", "request timed out").is_transient());
    assert!(!LlmError::classify("m", "invalid api key").is_transient());
}

#[test]
fn test_retry_delays_are_capped() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay_for(0), Duration::from_secs(2));
    assert_eq!(policy.delay_for(1), Duration::from_secs(4));
    assert_eq!(policy.delay_for(3), Duration::from_secs(16));
    assert_eq!(policy.delay_for(40), Duration::from_secs(16));
}

#[test]
fn test_retry_policy_validate() {
    assert!(RetryPolicy::default().validate().is_ok());
    assert!(RetryPolicy::default().with_max_attempts(0).validate().is_err());
    assert!(
        RetryPolicy::default()
            .with_base_delay(Duration::from_secs(60))
            .validate()
            .is_err()
    );
}

#[tokio::test]
async fn test_transient_error_is_retried_on_same_provider() {
    let primary = Arc::new(
        MockLlm::replying("ok")
            .named("primary")
            .then(Err(rate_limited()))
            .then(Err(rate_limited())),
    );
    let chain = chain_of(&[&primary], RetryPolicy::immediate(3));

    assert_eq!(chain.invoke("prompt").await.expect("succeeds"), "ok");
    assert_eq!(primary.calls(), 3);
}

#[tokio::test]
async fn test_non_transient_error_falls_through_without_retry() {
    let primary = Arc::new(MockLlm::failing(provider_error()).named("primary"));
    let secondary = Arc::new(MockLlm::replying("from secondary").named("secondary"));
    let chain = chain_of(&[&primary, &secondary], RetryPolicy::immediate(3));

    assert_eq!(chain.invoke("prompt").await.expect("ok"), "from secondary");
    assert_eq!(primary.calls(), 1);
    assert_eq!(secondary.calls(), 1);
    assert_eq!(secondary.last_prompt().as_deref(), Some("prompt"));
}

#[tokio::test]
async fn test_exhausted_after_all_providers_fail() {
    let primary = Arc::new(MockLlm::failing(rate_limited()));
    let secondary = Arc::new(MockLlm::failing(provider_error()));
    let chain = chain_of(&[&primary, &secondary], RetryPolicy::immediate(2));

    match chain.invoke("prompt").await {
        Err(LlmError::Exhausted { attempts, last }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, LlmError::Provider { .. }));
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
    assert_eq!(primary.calls(), 2);
}

#[tokio::test]
async fn test_empty_chain() {
    let chain = ProviderChain::new(Vec::new(), RetryPolicy::default());
    assert!(chain.is_empty());
    assert!(matches!(
        chain.invoke("prompt").await,
        Err(LlmError::NoProviders)
    ));
}

#[test]
fn test_genai_provider_reports_model_name() {
    let provider = GenaiProvider::new("gemini-2.0-flash");
    assert_eq!(provider.name(), "gemini-2.0-flash");
    assert_eq!(provider.model(), "gemini-2.0-flash");
}
