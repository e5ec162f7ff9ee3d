//! siumai-backed language model
//!
//! One client per run. Every research stage goes through
//! `LanguageModel::infer`, which sends a system and a user message and
//! returns the text of the reply.

use async_trait::async_trait;
use delve_core::{config_error, llm_error, DelveError, DelveResult, LanguageModel, LlmConfig};
use siumai::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Model, temperature and token limit are set the same way on every builder
macro_rules! with_sampling {
    ($builder:expr, $config:expr) => {{
        let builder = $builder
            .model(&$config.model)
            .temperature($config.temperature);
        match $config.max_tokens {
            Some(max_tokens) => builder.max_tokens(max_tokens),
            None => builder,
        }
    }};
}

pub struct DelveLlmClient {
    client: Box<dyn LlmClient>,
    provider: String,
    model: String,
}

impl DelveLlmClient {
    pub async fn new(config: LlmConfig) -> DelveResult<Self> {
        let client = connect(&config).await?;

        info!(
            provider = %config.provider,
            model = %config.model,
            "Language model client ready"
        );

        Ok(Self {
            client,
            provider: config.provider,
            model: config.model,
        })
    }
}

async fn connect(config: &LlmConfig) -> DelveResult<Box<dyn LlmClient>> {
    let client: Box<dyn LlmClient> = match config.provider.as_str() {
        "openai" => {
            let api_key = resolve_api_key(config, "OPENAI_API_KEY")?;
            let mut builder = with_sampling!(LlmBuilder::new().openai().api_key(&api_key), config);
            if let Some(base_url) = &config.base_url {
                builder = builder.base_url(base_url);
            }
            Box::new(builder.build().await.map_err(build_failed(config))?)
        }
        "anthropic" => {
            let api_key = resolve_api_key(config, "ANTHROPIC_API_KEY")?;
            let builder = with_sampling!(LlmBuilder::new().anthropic().api_key(&api_key), config);
            Box::new(builder.build().await.map_err(build_failed(config))?)
        }
        "ollama" => {
            let base_url = config.base_url.as_deref().unwrap_or(OLLAMA_DEFAULT_URL);
            let builder = with_sampling!(LlmBuilder::new().ollama().base_url(base_url), config);
            Box::new(builder.build().await.map_err(build_failed(config))?)
        }
        "groq" => {
            let api_key = resolve_api_key(config, "GROQ_API_KEY")?;
            let builder = with_sampling!(LlmBuilder::new().groq().api_key(&api_key), config);
            Box::new(builder.build().await.map_err(build_failed(config))?)
        }
        provider => {
            return Err(config_error!(
                format!("Unsupported LLM provider: {}", provider),
                "llm_client"
            ))
        }
    };

    Ok(client)
}

fn build_failed<E: std::fmt::Display>(config: &LlmConfig) -> impl FnOnce(E) -> DelveError + '_ {
    move |e| {
        llm_error!(
            format!("Failed to build {} client: {}", config.provider, e),
            config.provider,
            config.model
        )
    }
}

#[async_trait]
impl LanguageModel for DelveLlmClient {
    async fn infer(&self, system_prompt: &str, user_prompt: &str) -> DelveResult<String> {
        let started = Instant::now();

        let response = self
            .client
            .chat(vec![system!(system_prompt), user!(user_prompt)])
            .await
            .map_err(|e| llm_error!(format!("Inference failed: {}", e), self.provider, self.model))?;

        let text = response.content_text().ok_or_else(|| {
            llm_error!("No text content in model reply", self.provider, self.model)
        })?;

        debug!(
            chars = text.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Inference completed"
        );
        Ok(text.to_string())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// API key from the config, or from `env_var` when the config leaves it unset.
/// Blank values count as unset in both places.
fn resolve_api_key(config: &LlmConfig, env_var: &str) -> DelveResult<String> {
    let usable = |key: &String| !key.trim().is_empty();

    config
        .api_key
        .clone()
        .filter(usable)
        .or_else(|| std::env::var(env_var).ok().filter(usable))
        .ok_or_else(|| {
            config_error!(
                format!("{} API key not found (set {})", config.provider, env_var),
                "llm_client"
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_api_key_wins() {
        let config = LlmConfig {
            api_key: Some("sk-configured".to_string()),
            ..LlmConfig::default()
        };

        let key = resolve_api_key(&config, "DELVE_TEST_UNSET_KEY").unwrap();
        assert_eq!(key, "sk-configured");
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let config = LlmConfig {
            api_key: Some("  ".to_string()),
            ..LlmConfig::default()
        };

        let err = resolve_api_key(&config, "DELVE_TEST_DEFINITELY_UNSET_KEY").unwrap_err();
        assert!(matches!(err, DelveError::Config { .. }));
    }

    #[test]
    fn test_blank_env_api_key_is_rejected() {
        std::env::set_var("DELVE_TEST_BLANK_ENV_KEY", "   ");
        let config = LlmConfig {
            api_key: None,
            ..LlmConfig::default()
        };

        let err = resolve_api_key(&config, "DELVE_TEST_BLANK_ENV_KEY").unwrap_err();
        assert!(matches!(err, DelveError::Config { .. }));
    }

    #[test]
    fn test_env_api_key_used_when_config_unset() {
        std::env::set_var("DELVE_TEST_ENV_KEY", "sk-from-env");
        let config = LlmConfig {
            api_key: None,
            ..LlmConfig::default()
        };

        let key = resolve_api_key(&config, "DELVE_TEST_ENV_KEY").unwrap();
        assert_eq!(key, "sk-from-env");
    }

    #[tokio::test]
    async fn test_unsupported_provider() {
        let config = LlmConfig {
            provider: "carrier-pigeon".to_string(),
            ..LlmConfig::default()
        };

        match DelveLlmClient::new(config).await {
            Err(DelveError::Config { message, .. }) => {
                assert!(message.contains("carrier-pigeon"));
            }
            Err(other) => panic!("Expected Config error, got {other}"),
            Ok(_) => panic!("Expected an error"),
        }
    }
}
