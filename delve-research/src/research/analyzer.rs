//! Evidence analysis

use super::prompts::analysis_prompt;
use super::types::ResearchStage;
use crate::{ResearchError, ResearchResult};
use delve_core::LanguageModel;
use std::sync::Arc;
use tracing::info;

/// Folds all evidence for a topic into one analysis text
pub struct ResearchAnalyzer {
    llm: Arc<dyn LanguageModel>,
    system_prompt: String,
}

impl ResearchAnalyzer {
    pub fn new(llm: Arc<dyn LanguageModel>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
        }
    }

    pub async fn analyze(&self, topic: &str, evidence: &[String]) -> ResearchResult<String> {
        let context = evidence.join("\n\n");

        let analysis = self
            .llm
            .infer(&self.system_prompt, &analysis_prompt(topic, &context))
            .await
            .map_err(|e| ResearchError::inference(ResearchStage::Analysis, e))?;

        info!("Analysis completed ({} chars)", analysis.len());
        Ok(analysis)
    }
}
