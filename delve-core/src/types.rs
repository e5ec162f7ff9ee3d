//! Core data type definitions

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

/// Smallest number of sub-questions a run may request
pub const MIN_SUB_QUESTIONS: usize = 1;
/// Largest number of sub-questions a run may request.
///
/// Bounded by the size of the fallback question set so decomposition can
/// always return exactly the requested count.
pub const MAX_SUB_QUESTIONS: usize = 5;
pub const MIN_ITERATIONS: usize = 1;
pub const MAX_ITERATIONS: usize = 5;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DelveConfig {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub research: ResearchConfig,
    pub prompts: PromptConfig,
    pub logging: LoggingConfig,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider type (openai, anthropic, ollama, groq)
    pub provider: String,
    /// Model name
    pub model: String,
    /// API key (optional, can be set via environment)
    pub api_key: Option<String>,
    /// Base URL for custom providers
    pub base_url: Option<String>,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

/// Web search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search backend (duckduckgo)
    pub provider: String,
    /// Maximum number of result snippets folded into one evidence blob
    pub max_results: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// User agent sent with search requests
    pub user_agent: String,
}

/// Research loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Number of sub-questions to decompose the topic into
    pub sub_question_count: usize,
    /// Maximum number of analysis iterations before the report is forced
    pub max_iterations: usize,
    /// Issue all searches at once instead of one after another
    pub parallel_retrieval: bool,
    /// Number of leading characters of the critique inspected for a verdict
    pub reflection_window: usize,
}

/// Optional system prompt overrides; unset entries fall back to the defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    pub question: Option<String>,
    pub analysis: Option<String>,
    pub reflection: Option<String>,
    pub report: Option<String>,
}

impl PromptConfig {
    /// Whether any override is set to a non-blank value
    pub fn has_overrides(&self) -> bool {
        [
            &self.question,
            &self.analysis,
            &self.reflection,
            &self.report,
        ]
        .iter()
        .any(|p| p.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}
