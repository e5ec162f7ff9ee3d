//! Reflection gate: decide whether an analysis is ready for the report

use super::prompts::reflection_prompt;
use super::types::{ReflectionDecision, ResearchStage};
use crate::{ResearchError, ResearchResult};
use delve_core::LanguageModel;
use std::sync::Arc;
use tracing::{debug, info};

/// Turns free-form critique text into a verdict
pub trait VerdictParser: Send + Sync {
    fn parse(&self, critique: &str) -> ReflectionDecision;
}

/// Finalizes when "yes" appears in the first `window` characters of the
/// lower-cased critique.
///
/// "No, yes the analysis..." reads as finalize.
#[derive(Debug, Clone, Copy)]
pub struct LeadingAffirmativeParser {
    pub window: usize,
}

impl Default for LeadingAffirmativeParser {
    fn default() -> Self {
        Self { window: 50 }
    }
}

impl VerdictParser for LeadingAffirmativeParser {
    fn parse(&self, critique: &str) -> ReflectionDecision {
        let head: String = critique.to_lowercase().chars().take(self.window).collect();
        if head.contains("yes") {
            ReflectionDecision::Finalize
        } else {
            ReflectionDecision::Continue
        }
    }
}

/// Result of one pass through the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// The iteration cap was hit; no critique was requested.
    CapReached,
    /// The critique was consulted.
    Reviewed {
        decision: ReflectionDecision,
        critique: String,
    },
}

impl GateOutcome {
    pub fn decision(&self) -> ReflectionDecision {
        match self {
            GateOutcome::CapReached => ReflectionDecision::Finalize,
            GateOutcome::Reviewed { decision, .. } => *decision,
        }
    }
}

pub struct ReflectionGate {
    llm: Arc<dyn LanguageModel>,
    system_prompt: String,
    parser: Arc<dyn VerdictParser>,
}

impl ReflectionGate {
    pub fn new(llm: Arc<dyn LanguageModel>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
            parser: Arc::new(LeadingAffirmativeParser::default()),
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn VerdictParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Decide whether to re-analyze or report
    pub async fn decide(
        &self,
        analysis: &str,
        iteration_count: usize,
        max_iterations: usize,
    ) -> ResearchResult<ReflectionDecision> {
        Ok(self
            .evaluate(analysis, iteration_count, max_iterations)
            .await?
            .decision())
    }

    /// Like `decide`, but also returns the critique when one was requested
    pub async fn evaluate(
        &self,
        analysis: &str,
        iteration_count: usize,
        max_iterations: usize,
    ) -> ResearchResult<GateOutcome> {
        if iteration_count >= max_iterations {
            info!("Max iterations ({}) reached", max_iterations);
            return Ok(GateOutcome::CapReached);
        }

        let critique = self
            .llm
            .infer(&self.system_prompt, &reflection_prompt(analysis))
            .await
            .map_err(|e| ResearchError::inference(ResearchStage::Reflection, e))?;

        let decision = self.parser.parse(&critique);
        debug!(?decision, "Reflection verdict");

        Ok(GateOutcome::Reviewed { decision, critique })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_affirmative() {
        let parser = LeadingAffirmativeParser::default();
        assert_eq!(
            parser.parse("Yes, this is thorough"),
            ReflectionDecision::Finalize
        );
        assert_eq!(
            parser.parse("No, the analysis lacks sources."),
            ReflectionDecision::Continue
        );
        // Known misclassification
        assert_eq!(
            parser.parse("No, yes the analysis is partly there"),
            ReflectionDecision::Finalize
        );
    }

    #[test]
    fn test_window_limits_inspection() {
        let parser = LeadingAffirmativeParser::default();
        let late = format!("{}yes", "x".repeat(50));
        assert_eq!(parser.parse(&late), ReflectionDecision::Continue);

        let edge = format!("{}yes", "x".repeat(47));
        assert_eq!(parser.parse(&edge), ReflectionDecision::Finalize);

        let wide = LeadingAffirmativeParser { window: 100 };
        assert_eq!(wide.parse(&late), ReflectionDecision::Finalize);
    }

    #[test]
    fn test_case_insensitive() {
        let parser = LeadingAffirmativeParser::default();
        assert_eq!(parser.parse("YES."), ReflectionDecision::Finalize);
    }
}
