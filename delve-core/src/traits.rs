//! Core trait definitions

use crate::error::DelveResult;
use async_trait::async_trait;

/// Text completion capability consumed by every research stage.
///
/// A failed call is fatal for the run that issued it.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `user_prompt` under `system_prompt`
    async fn infer(&self, system_prompt: &str, user_prompt: &str) -> DelveResult<String>;

    /// Model identifier used in logs and exported reports
    fn model_name(&self) -> &str;
}

/// Web search capability used to gather evidence.
///
/// Failures are expected; callers absorb them per query.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for `query` and return the raw result text
    async fn search(&self, query: &str) -> DelveResult<String>;

    /// Backend name
    fn name(&self) -> &str;
}
