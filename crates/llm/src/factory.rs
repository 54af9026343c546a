//! LLM provider factory.
//!
//! This module builds generation clients from provider settings. It handles
//! provider resolution, secret lookup and transport timeouts.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use multihop_core::{AppError, AppResult, ProviderSettings};
use std::sync::Arc;

/// Create an LLM client for one provider slot.
///
/// This function:
/// 1. Matches the provider string to a known provider type
/// 2. Resolves the API key from the configured environment variable
/// 3. Creates the client with the configured endpoint and timeout
///
/// # Errors
/// Returns `AppError::Config` if:
/// - Provider is unknown
/// - A hosted provider has no API key available
/// - The HTTP client cannot be built
pub fn create_client(settings: &ProviderSettings) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(&settings.provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", settings.provider)))?;

    let endpoint = settings
        .endpoint
        .as_deref()
        .unwrap_or_else(|| provider_type.default_endpoint());

    match provider_type {
        ProviderType::Ollama => {
            let client = OllamaClient::with_timeout(endpoint, settings.timeout())?;
            Ok(Arc::new(client))
        }
        ProviderType::OpenAI => {
            let api_key = settings.resolve_api_key().ok_or_else(|| {
                AppError::Config(format!(
                    "OpenAI provider requires API key (env: {})",
                    settings.api_key_env.as_deref().unwrap_or("<unset>")
                ))
            })?;
            let client = OpenAiClient::new(api_key, endpoint, settings.timeout())?;
            Ok(Arc::new(client))
        }
    }
}
