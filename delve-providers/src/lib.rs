//! Delve Providers - concrete language model and web search backends
//!
//! Implements the `LanguageModel` and `SearchProvider` traits from
//! `delve-core` on top of siumai and the DuckDuckGo instant answer API.

pub mod llm_client;
pub mod web_search;

pub use llm_client::DelveLlmClient;
pub use web_search::{create_search_provider, extract_snippets, DuckDuckGoSearch};

use delve_core::{DelveResult, LanguageModel, LlmConfig};
use std::sync::Arc;

/// Build a shareable language model from configuration
pub async fn create_llm_client(config: &LlmConfig) -> DelveResult<Arc<dyn LanguageModel>> {
    Ok(Arc::new(DelveLlmClient::new(config.clone()).await?))
}

/// Default settings for common providers
pub mod configs {
    use delve_core::LlmConfig;

    pub fn openai_gpt4() -> LlmConfig {
        LlmConfig {
            provider: "openai".to_string(),
            model: "gpt-4".to_string(),
            ..LlmConfig::default()
        }
    }

    pub fn anthropic_claude_haiku() -> LlmConfig {
        LlmConfig {
            provider: "anthropic".to_string(),
            model: "claude-3-5-haiku-20241022".to_string(),
            ..LlmConfig::default()
        }
    }

    pub fn ollama_local(model: &str) -> LlmConfig {
        LlmConfig {
            provider: "ollama".to_string(),
            model: model.to_string(),
            base_url: Some("http://localhost:11434".to_string()),
            ..LlmConfig::default()
        }
    }

    pub fn groq_llama() -> LlmConfig {
        LlmConfig {
            provider: "groq".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            ..LlmConfig::default()
        }
    }

    /// Preset for a provider name, if one exists
    pub fn for_provider(provider: &str) -> Option<LlmConfig> {
        match provider {
            "openai" => Some(openai_gpt4()),
            "anthropic" => Some(anthropic_claude_haiku()),
            "ollama" => Some(ollama_local("llama3.2")),
            "groq" => Some(groq_llama()),
            _ => None,
        }
    }
}
