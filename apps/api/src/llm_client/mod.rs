/// LLM Client — the single point of entry for all chat model calls.
///
/// ARCHITECTURAL RULE: No other module may talk to a model endpoint directly.
/// Callers obtain an `Arc<dyn ChatModel>` from a `ModelGateway` and only ever
/// call `invoke`. Retries live in `analysis::retry`, not here.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

mod chat;
pub mod prompts;
pub mod provider;

pub use chat::HttpChatModel;
pub use provider::{Provider, ProviderConfig};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Invalid provider configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// What a model hands back for one prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub content: String,
}

/// A chat-capable model handle. One `invoke` is one network round trip.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn invoke(&self, prompt: &str) -> Result<ModelResponse, LlmError>;
}

/// Builds model handles from provider configuration.
///
/// The batch controller holds an `Arc<dyn ModelGateway>` so tests can swap in
/// scripted models without touching the network.
pub trait ModelGateway: Send + Sync {
    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn ChatModel>, LlmError>;
}

/// Default gateway: real HTTP-backed models.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpModelGateway;

impl ModelGateway for HttpModelGateway {
    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn ChatModel>, LlmError> {
        create_chat_model(config)
    }
}

/// Constructs a chat model for `config`. No network traffic happens here.
pub fn create_chat_model(config: &ProviderConfig) -> Result<Arc<dyn ChatModel>, LlmError> {
    let provider = config.validate()?;
    let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    let model = HttpChatModel::new(client, provider, config);
    debug!(
        "Chat model created: provider={}, model={}, endpoint={}",
        provider,
        config.model,
        model.endpoint()
    );
    Ok(Arc::new(model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_chat_model_rejects_unknown_provider() {
        let config: ProviderConfig =
            serde_json::from_value(json!({"provider": "telegraph", "model": "x"})).unwrap();
        assert!(matches!(
            create_chat_model(&config),
            Err(LlmError::UnsupportedProvider(_))
        ));
    }

    #[test]
    fn test_create_chat_model_for_ollama_without_credentials() {
        let config: ProviderConfig = serde_json::from_value(
            json!({"provider": "ollama", "model": "llama3", "temperature": "0.2"}),
        )
        .unwrap();
        assert!(HttpModelGateway.create(&config).is_ok());
    }

    #[test]
    fn test_create_chat_model_reports_missing_fields() {
        let config: ProviderConfig =
            serde_json::from_value(json!({"provider": "anthropic", "model": "claude"})).unwrap();
        assert!(matches!(
            create_chat_model(&config),
            Err(LlmError::InvalidConfig(msg)) if msg.contains("apiKey")
        ));
    }
}
