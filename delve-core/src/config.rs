//! Configuration management

use crate::error::{DelveError, DelveResult};
use crate::types::{
    DelveConfig, LlmConfig, PromptConfig, ResearchConfig, SearchConfig, MAX_ITERATIONS,
    MAX_SUB_QUESTIONS, MIN_ITERATIONS, MIN_SUB_QUESTIONS,
};
use crate::ErrorContext;

use std::path::Path;

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.7,
            max_tokens: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: "duckduckgo".to_string(),
            max_results: 5,
            timeout_secs: 10,
            user_agent: format!("delve/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            sub_question_count: 3,
            max_iterations: 2,
            parallel_retrieval: false,
            reflection_window: 50,
        }
    }
}

impl Default for DelveConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            search: SearchConfig::default(),
            research: ResearchConfig::default(),
            prompts: PromptConfig::default(),
            logging: crate::logging::LoggingConfig::default(),
        }
    }
}

impl DelveConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> DelveResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DelveError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: DelveConfig = toml::from_str(&content).map_err(|e| DelveError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> DelveResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| DelveError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| DelveError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> DelveResult<()> {
        if self.llm.model.trim().is_empty() {
            return Err(invalid("llm.model must not be empty", "Set llm.model"));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(invalid(
                "llm.temperature must be between 0.0 and 2.0",
                "Set llm.temperature to a value such as 0.7",
            ));
        }

        if self.search.max_results == 0 {
            return Err(invalid(
                "search.max_results must be greater than 0",
                "Set search.max_results to a positive value",
            ));
        }

        if !(MIN_SUB_QUESTIONS..=MAX_SUB_QUESTIONS).contains(&self.research.sub_question_count) {
            return Err(invalid(
                &format!(
                    "research.sub_question_count must be between {} and {}",
                    MIN_SUB_QUESTIONS, MAX_SUB_QUESTIONS
                ),
                "Lower research.sub_question_count",
            ));
        }

        if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&self.research.max_iterations) {
            return Err(invalid(
                &format!(
                    "research.max_iterations must be between {} and {}",
                    MIN_ITERATIONS, MAX_ITERATIONS
                ),
                "Set research.max_iterations within range",
            ));
        }

        if self.research.reflection_window == 0 {
            return Err(invalid(
                "research.reflection_window must be greater than 0",
                "Set research.reflection_window to 50",
            ));
        }

        Ok(())
    }
}

fn invalid(message: &str, suggestion: &str) -> DelveError {
    DelveError::Config {
        message: message.to_string(),
        source: None,
        context: ErrorContext::new("config")
            .with_operation("validate")
            .with_suggestion(suggestion),
    }
}
