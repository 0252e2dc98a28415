//! Provider configuration as supplied by configuration management.
//!
//! The pipeline only checks structural shape here (which fields a provider
//! variant needs). Credentials are never validated against the endpoint.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize};

use super::LlmError;

pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Supported chat model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Azure,
    Anthropic,
    Google,
    Ollama,
    OpenRouter,
    /// Any OpenAI-compatible endpoint reachable at `baseUrl`.
    Custom,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Azure => "azure",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
            Provider::Ollama => "ollama",
            Provider::OpenRouter => "openrouter",
            Provider::Custom => "custom",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = LlmError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "azure" | "azure-openai" => Ok(Provider::Azure),
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "google" | "gemini" => Ok(Provider::Google),
            "ollama" => Ok(Provider::Ollama),
            "openrouter" => Ok(Provider::OpenRouter),
            "custom" | "openai-compatible" => Ok(Provider::Custom),
            _ => Err(LlmError::UnsupportedProvider(tag.to_string())),
        }
    }
}

/// Connection settings for one chat model.
///
/// `provider` stays the raw tag so an unknown provider surfaces at gateway
/// construction rather than at deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub provider: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
    #[serde(
        default = "default_temperature",
        deserialize_with = "deserialize_temperature"
    )]
    pub temperature: f32,
    #[serde(default)]
    pub deployment_name: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub instance_name: Option<String>,
}

impl ProviderConfig {
    /// Parses the provider tag and checks the fields that variant requires.
    pub fn validate(&self) -> Result<Provider, LlmError> {
        let provider: Provider = self.provider.parse()?;

        let mut missing = Vec::new();
        if self.model.trim().is_empty() && provider != Provider::Azure {
            missing.push("model");
        }

        let required: Vec<(&str, &Option<String>)> = match provider {
            Provider::OpenAi | Provider::Anthropic | Provider::Google | Provider::OpenRouter => {
                vec![("apiKey", &self.api_key)]
            }
            Provider::Azure => vec![
                ("apiKey", &self.api_key),
                ("deploymentName", &self.deployment_name),
                ("instanceName", &self.instance_name),
                ("apiVersion", &self.api_version),
            ],
            Provider::Custom => vec![("baseUrl", &self.base_url)],
            Provider::Ollama => vec![],
        };
        missing.extend(
            required
                .iter()
                .filter(|(_, value)| is_blank(value))
                .map(|(name, _)| *name),
        );

        if missing.is_empty() {
            Ok(provider)
        } else {
            Err(LlmError::InvalidConfig(format!(
                "provider '{}' requires: {}",
                provider,
                missing.join(", ")
            )))
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

/// Accepts `0.2` or `"0.2"`; configuration stores usually hand us strings.
fn deserialize_temperature<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTemperature {
        Number(f32),
        Text(String),
    }

    match RawTemperature::deserialize(deserializer)? {
        RawTemperature::Number(value) => Ok(value),
        RawTemperature::Text(text) if text.trim().is_empty() => Ok(DEFAULT_TEMPERATURE),
        RawTemperature::Text(text) => text
            .trim()
            .parse::<f32>()
            .map_err(|e| de::Error::custom(format!("invalid temperature '{text}': {e}"))),
    }
}
