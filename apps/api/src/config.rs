use anyhow::{bail, Context, Result};

use crate::llm_client::provider::DEFAULT_TEMPERATURE;
use crate::llm_client::ProviderConfig;

/// Where jobs and records are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    /// Required when `store_backend` is `Postgres`.
    pub database_url: Option<String>,
    /// `None` when `LLM_PROVIDER` is unset; batches then fail with `ConfigMissing`.
    pub provider: Option<ProviderConfig>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_backend = match lookup("STORE_BACKEND").as_deref().map(str::trim) {
            None | Some("") | Some("memory") => StoreBackend::Memory,
            Some("postgres") => StoreBackend::Postgres,
            Some(other) => bail!("STORE_BACKEND must be 'memory' or 'postgres', got '{other}'"),
        };

        let database_url = match store_backend {
            StoreBackend::Postgres => Some(require(&lookup, "DATABASE_URL")?),
            StoreBackend::Memory => lookup("DATABASE_URL"),
        };

        Ok(Config {
            store_backend,
            database_url,
            provider: provider_from_lookup(&lookup)?,
            port: lookup("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn provider_from_lookup<F>(lookup: &F) -> Result<Option<ProviderConfig>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(provider) = lookup("LLM_PROVIDER").filter(|p| !p.trim().is_empty()) else {
        return Ok(None);
    };

    let temperature = match lookup("LLM_TEMPERATURE") {
        Some(raw) => raw
            .trim()
            .parse::<f32>()
            .with_context(|| format!("LLM_TEMPERATURE must be a number, got '{raw}'"))?,
        None => DEFAULT_TEMPERATURE,
    };

    Ok(Some(ProviderConfig {
        provider: provider.trim().to_string(),
        base_url: lookup("LLM_BASE_URL"),
        api_key: lookup("LLM_API_KEY"),
        model: lookup("LLM_MODEL").unwrap_or_default(),
        temperature,
        deployment_name: lookup("LLM_DEPLOYMENT_NAME"),
        api_version: lookup("LLM_API_VERSION"),
        instance_name: lookup("LLM_INSTANCE_NAME"),
    }))
}

fn require<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_to_memory_without_provider() {
        let config = config(&[]).unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert!(config.provider.is_none());
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
    }

    #[test]
    fn test_postgres_requires_database_url() {
        assert!(config(&[("STORE_BACKEND", "postgres")]).is_err());
        let config = config(&[
            ("STORE_BACKEND", "postgres"),
            ("DATABASE_URL", "postgres://localhost/screener"),
        ])
        .unwrap();
        assert_eq!(config.store_backend, StoreBackend::Postgres);
    }

    #[test]
    fn test_provider_from_env() {
        let config = config(&[
            ("LLM_PROVIDER", "ollama"),
            ("LLM_MODEL", "llama3.1"),
            ("LLM_TEMPERATURE", "0.7"),
            ("PORT", "9000"),
        ])
        .unwrap();
        let provider = config.provider.unwrap();
        assert_eq!(provider.provider, "ollama");
        assert_eq!(provider.model, "llama3.1");
        assert!((provider.temperature - 0.7).abs() < f32::EPSILON);
        assert!(provider.api_key.is_none());
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_bad_values_are_rejected() {
        assert!(config(&[("STORE_BACKEND", "redis")]).is_err());
        assert!(config(&[("PORT", "http")]).is_err());
        assert!(config(&[("LLM_PROVIDER", "openai"), ("LLM_TEMPERATURE", "hot")]).is_err());
    }
}
