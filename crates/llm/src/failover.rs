//! Primary/secondary generation with failover.
//!
//! Each invocation gives the primary provider exactly one attempt. Any
//! failure (transport error, timeout, malformed or empty response) hands an
//! equivalent request to the secondary, which also gets exactly one attempt.
//! When both fail the caller receives `AppError::GenerationFailed` carrying
//! both messages.

use crate::client::{LlmClient, LlmRequest};
use crate::factory::create_client;
use crate::types::ProviderRole;
use multihop_core::{AppError, AppResult, ProviderSettings};
use std::sync::Arc;
use std::time::Duration;

/// A provider-agnostic generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Full prompt: instructions, evidence and question
    pub prompt_text: String,

    /// Sampling temperature applied to whichever provider serves the call
    pub temperature: Option<f32>,

    /// Generation cap applied to whichever provider serves the call
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(prompt_text: impl Into<String>) -> Self {
        Self {
            prompt_text: prompt_text.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn to_llm_request(&self, model: &str) -> LlmRequest {
        let mut request = LlmRequest::new(self.prompt_text.clone(), model);
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        request
    }
}

/// Generated text plus the slot that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub provider_used: ProviderRole,
    pub provider_name: String,
    pub model: String,
}

/// One configured provider.
#[derive(Clone)]
pub struct ProviderSlot {
    role: ProviderRole,
    client: Arc<dyn LlmClient>,
    model: String,
    timeout: Duration,
}

impl ProviderSlot {
    pub fn new(
        role: ProviderRole,
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            role,
            client,
            model: model.into(),
            timeout,
        }
    }

    /// Build the slot's client through the provider factory.
    pub fn from_settings(role: ProviderRole, settings: &ProviderSettings) -> AppResult<Self> {
        let client = create_client(settings)?;
        Ok(Self::new(role, client, settings.model.clone(), settings.timeout()))
    }

    pub fn role(&self) -> ProviderRole {
        self.role
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.client.provider_name(), self.model)
    }

    /// Single attempt, bounded by the slot's timeout.
    async fn attempt(&self, request: &GenerationRequest) -> AppResult<String> {
        let llm_request = request.to_llm_request(&self.model);

        let response = tokio::time::timeout(self.timeout, self.client.complete(&llm_request))
            .await
            .map_err(|_| {
                AppError::Llm(format!(
                    "{} timed out after {:.1}s",
                    self.describe(),
                    self.timeout.as_secs_f64()
                ))
            })??;

        if response.content.trim().is_empty() {
            return Err(AppError::Llm(format!(
                "{} returned an empty response",
                self.describe()
            )));
        }

        Ok(response.content)
    }
}

impl std::fmt::Debug for ProviderSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSlot")
            .field("role", &self.role)
            .field("provider", &self.client.provider_name())
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Sends generation requests to the primary provider, falling back once to
/// the secondary.
#[derive(Debug, Clone)]
pub struct GenerationInvoker {
    primary: ProviderSlot,
    secondary: ProviderSlot,
}

impl GenerationInvoker {
    /// Pair two slots. Roles are forced to match their position.
    pub fn new(mut primary: ProviderSlot, mut secondary: ProviderSlot) -> Self {
        primary.role = ProviderRole::Primary;
        secondary.role = ProviderRole::Secondary;
        Self { primary, secondary }
    }

    /// Build both clients from configuration.
    pub fn from_settings(
        primary: &ProviderSettings,
        secondary: &ProviderSettings,
    ) -> AppResult<Self> {
        Ok(Self::new(
            ProviderSlot::from_settings(ProviderRole::Primary, primary)?,
            ProviderSlot::from_settings(ProviderRole::Secondary, secondary)?,
        ))
    }

    /// Generate text, failing over to the secondary provider at most once.
    ///
    /// # Errors
    /// `AppError::GenerationFailed` when both providers fail; its message
    /// names both underlying failures.
    pub async fn generate(&self, request: &GenerationRequest) -> AppResult<Generation> {
        let primary_error = match self.primary.attempt(request).await {
            Ok(text) => return Ok(self.generation(&self.primary, text)),
            Err(err) => err,
        };

        tracing::warn!(
            provider = %self.primary.describe(),
            error = %primary_error,
            "Primary provider failed, falling back to secondary"
        );

        match self.secondary.attempt(request).await {
            Ok(text) => {
                tracing::info!(
                    provider = %self.secondary.describe(),
                    "Secondary provider served request"
                );
                Ok(self.generation(&self.secondary, text))
            }
            Err(secondary_error) => {
                tracing::error!(
                    primary = %primary_error,
                    secondary = %secondary_error,
                    "Both generation providers failed"
                );
                Err(AppError::GenerationFailed {
                    primary: format!("{}: {}", self.primary.describe(), primary_error),
                    secondary: format!("{}: {}", self.secondary.describe(), secondary_error),
                })
            }
        }
    }

    fn generation(&self, slot: &ProviderSlot, text: String) -> Generation {
        Generation {
            text,
            provider_used: slot.role,
            provider_name: slot.client.provider_name().to_string(),
            model: slot.model.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ScriptedClient;

    const SLOT_TIMEOUT: Duration = Duration::from_secs(5);

    fn invoker(primary: Arc<ScriptedClient>, secondary: Arc<ScriptedClient>) -> GenerationInvoker {
        GenerationInvoker::new(
            ProviderSlot::new(ProviderRole::Primary, primary, "model-a", SLOT_TIMEOUT),
            ProviderSlot::new(ProviderRole::Secondary, secondary, "model-b", SLOT_TIMEOUT),
        )
    }

    #[tokio::test]
    async fn test_primary_success_never_touches_secondary() {
        let primary = Arc::new(ScriptedClient::replying("alpha", "from primary"));
        let secondary = Arc::new(ScriptedClient::replying("beta", "from secondary"));

        let generation = invoker(primary.clone(), secondary.clone())
            .generate(&GenerationRequest::new("q"))
            .await
            .unwrap();

        assert_eq!(generation.text, "from primary");
        assert_eq!(generation.provider_used, ProviderRole::Primary);
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_primary_failure_falls_back_once() {
        let primary = Arc::new(ScriptedClient::failing("alpha", "connection refused"));
        let secondary = Arc::new(ScriptedClient::replying("beta", "from secondary"));

        let generation = invoker(primary.clone(), secondary.clone())
            .generate(&GenerationRequest::new("q").with_temperature(0.1))
            .await
            .unwrap();

        assert_eq!(generation.provider_used, ProviderRole::Secondary);
        assert_eq!(generation.provider_name, "beta");
        assert_eq!(generation.model, "model-b");
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);

        // The secondary sees an equivalent request under its own model
        let forwarded = &secondary.requests()[0];
        assert_eq!(forwarded.prompt, "q");
        assert_eq!(forwarded.model, "model-b");
        assert_eq!(forwarded.temperature, Some(0.1));
    }

    #[tokio::test]
    async fn test_primary_timeout_triggers_fallback() {
        let primary = Arc::new(
            ScriptedClient::replying("slow", "too late").with_delay(Duration::from_secs(30)),
        );
        let secondary = Arc::new(ScriptedClient::replying("beta", "on time"));

        let invoker = GenerationInvoker::new(
            ProviderSlot::new(
                ProviderRole::Primary,
                primary.clone(),
                "m",
                Duration::from_millis(20),
            ),
            ProviderSlot::new(ProviderRole::Secondary, secondary.clone(), "m", SLOT_TIMEOUT),
        );

        let generation = invoker.generate(&GenerationRequest::new("q")).await.unwrap();
        assert_eq!(generation.provider_used, ProviderRole::Secondary);
        assert_eq!(generation.text, "on time");
    }

    #[tokio::test]
    async fn test_empty_primary_response_counts_as_failure() {
        let primary = Arc::new(ScriptedClient::replying("alpha", "   "));
        let secondary = Arc::new(ScriptedClient::replying("beta", "real answer"));

        let generation = invoker(primary, secondary)
            .generate(&GenerationRequest::new("q"))
            .await
            .unwrap();
        assert_eq!(generation.provider_used, ProviderRole::Secondary);
    }

    #[tokio::test]
    async fn test_both_failures_are_reported() {
        let primary = Arc::new(ScriptedClient::failing("alpha", "primary exploded"));
        let secondary = Arc::new(ScriptedClient::failing("beta", "quota exceeded"));

        let err = invoker(primary.clone(), secondary.clone())
            .generate(&GenerationRequest::new("q"))
            .await
            .unwrap_err();

        match &err {
            AppError::GenerationFailed { primary, secondary } => {
                assert!(primary.contains("primary exploded"));
                assert!(secondary.contains("quota exceeded"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.is_fatal());
        // No retries on either provider
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
    }

    #[test]
    fn test_roles_follow_position() {
        let a = Arc::new(ScriptedClient::replying("a", "x"));
        let b = Arc::new(ScriptedClient::replying("b", "y"));
        let invoker = GenerationInvoker::new(
            ProviderSlot::new(ProviderRole::Secondary, a, "m", SLOT_TIMEOUT),
            ProviderSlot::new(ProviderRole::Primary, b, "m", SLOT_TIMEOUT),
        );
        assert_eq!(invoker.primary.role(), ProviderRole::Primary);
        assert_eq!(invoker.secondary.role(), ProviderRole::Secondary);
    }
}
