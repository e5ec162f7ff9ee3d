//! Final report synthesis

use super::prompts::report_prompt;
use super::types::ResearchStage;
use crate::{ResearchError, ResearchResult};
use delve_core::LanguageModel;
use std::sync::Arc;
use tracing::info;

/// Writes the structured report from the final analysis
pub struct ReportSynthesizer {
    llm: Arc<dyn LanguageModel>,
    system_prompt: String,
}

impl ReportSynthesizer {
    pub fn new(llm: Arc<dyn LanguageModel>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
        }
    }

    /// Generate the report; the model's answer is returned verbatim
    pub async fn generate(&self, topic: &str, analysis: &str) -> ResearchResult<String> {
        info!("Creating final report for topic: {}", topic);

        let report = self
            .llm
            .infer(&self.system_prompt, &report_prompt(topic, analysis))
            .await
            .map_err(|e| ResearchError::inference(ResearchStage::Report, e))?;

        info!("Report generated ({} chars)", report.len());
        Ok(report)
    }
}
