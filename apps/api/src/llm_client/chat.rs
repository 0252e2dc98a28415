use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ChatModel, LlmError, ModelResponse, Provider, ProviderConfig};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 4096;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

// ── Request bodies ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<ChatMessage<'a>>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

// ── Response bodies ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: Option<OpenAiMessage>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    text: Option<String>,
}

// ── Model ───────────────────────────────────────────────────────────────────

/// HTTP-backed chat model bound to one provider endpoint.
#[derive(Clone)]
pub struct HttpChatModel {
    client: Client,
    provider: Provider,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl HttpChatModel {
    /// `config` must already have passed `ProviderConfig::validate`.
    pub fn new(client: Client, provider: Provider, config: &ProviderConfig) -> Self {
        Self {
            client,
            provider,
            endpoint: resolve_endpoint(provider, config),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_request(&self, prompt: &str) -> reqwest::RequestBuilder {
        let messages = vec![ChatMessage {
            role: "user",
            content: prompt,
        }];
        let api_key = self.api_key.as_deref().unwrap_or_default();

        match self.provider {
            Provider::OpenAi | Provider::OpenRouter | Provider::Custom => {
                let body = OpenAiRequest {
                    model: &self.model,
                    temperature: self.temperature,
                    messages,
                };
                let request = self.client.post(&self.endpoint).json(&body);
                if api_key.is_empty() {
                    request
                } else {
                    request.bearer_auth(api_key)
                }
            }
            Provider::Azure => {
                // The deployment in the URL selects the model.
                let body = OpenAiRequest {
                    model: "",
                    temperature: self.temperature,
                    messages,
                };
                self.client
                    .post(&self.endpoint)
                    .header("api-key", api_key)
                    .json(&body)
            }
            Provider::Anthropic => {
                let body = AnthropicRequest {
                    model: &self.model,
                    max_tokens: ANTHROPIC_MAX_TOKENS,
                    temperature: self.temperature,
                    messages,
                };
                self.client
                    .post(&self.endpoint)
                    .header("x-api-key", api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&body)
            }
            Provider::Google => {
                let body = GeminiRequest {
                    contents: vec![GeminiContent {
                        role: "user",
                        parts: vec![GeminiPart { text: prompt }],
                    }],
                    generation_config: GeminiGenerationConfig {
                        temperature: self.temperature,
                    },
                };
                self.client
                    .post(&self.endpoint)
                    .query(&[("key", api_key)])
                    .json(&body)
            }
            Provider::Ollama => {
                let body = OllamaRequest {
                    model: &self.model,
                    stream: false,
                    messages,
                    options: OllamaOptions {
                        temperature: self.temperature,
                    },
                };
                self.client.post(&self.endpoint).json(&body)
            }
        }
    }
}

#[async_trait]
impl ChatModel for HttpChatModel {
    async fn invoke(&self, prompt: &str) -> Result<ModelResponse, LlmError> {
        let response = self.build_request(prompt).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("{} returned {}: {}", self.provider, status, truncate(&body, 500));
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let content = extract_content(self.provider, &body)?;
        debug!(
            "{} call succeeded: {} chars returned",
            self.provider,
            content.len()
        );
        Ok(ModelResponse { content })
    }
}

/// Computes the URL a provider's chat requests are posted to.
fn resolve_endpoint(provider: Provider, config: &ProviderConfig) -> String {
    let base = |default: &str| {
        config
            .base_url
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    };

    match provider {
        Provider::OpenAi => format!("{}/chat/completions", base(OPENAI_BASE_URL)),
        Provider::OpenRouter => format!("{}/chat/completions", base(OPENROUTER_BASE_URL)),
        Provider::Custom => format!("{}/chat/completions", base(OPENAI_BASE_URL)),
        Provider::Azure => {
            let instance = config.instance_name.as_deref().unwrap_or_default();
            let host = base(&format!("https://{instance}.openai.azure.com"));
            format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                host,
                config.deployment_name.as_deref().unwrap_or_default(),
                config.api_version.as_deref().unwrap_or_default()
            )
        }
        Provider::Anthropic => format!("{}/v1/messages", base(ANTHROPIC_BASE_URL)),
        Provider::Google => format!(
            "{}/v1beta/models/{}:generateContent",
            base(GOOGLE_BASE_URL),
            config.model
        ),
        Provider::Ollama => format!("{}/api/chat", base(OLLAMA_BASE_URL)),
    }
}

/// Pulls the assistant text out of a provider's success body.
fn extract_content(provider: Provider, body: &str) -> Result<String, LlmError> {
    let text = match provider {
        Provider::OpenAi | Provider::OpenRouter | Provider::Custom | Provider::Azure => {
            let parsed: OpenAiResponse = serde_json::from_str(body)?;
            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
        }
        Provider::Anthropic => {
            let parsed: AnthropicResponse = serde_json::from_str(body)?;
            parsed
                .content
                .into_iter()
                .find(|b| b.block_type == "text")
                .and_then(|b| b.text)
        }
        Provider::Google => {
            let parsed: GeminiResponse = serde_json::from_str(body)?;
            parsed
                .candidates
                .into_iter()
                .next()
                .and_then(|c| c.content)
                .map(|c| {
                    c.parts
                        .into_iter()
                        .filter_map(|p| p.text)
                        .collect::<Vec<_>>()
                        .join("")
                })
        }
        Provider::Ollama => {
            let parsed: OllamaResponse = serde_json::from_str(body)?;
            parsed.message.and_then(|m| m.content)
        }
    };

    text.filter(|t| !t.trim().is_empty())
        .ok_or(LlmError::EmptyContent)
}

/// Best-effort extraction of `error.message` from an error body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| truncate(body, 500))
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
