//! Research planning and question decomposition

use super::prompts::{fallback_questions, question_generation_prompt};
use super::types::{DecompositionSource, ResearchStage};
use crate::{ResearchError, ResearchResult};
use delve_core::LanguageModel;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lines at or below this many characters are discarded as noise
const MIN_QUESTION_CHARS: usize = 10;

/// Splits a topic into a fixed number of sub-questions
pub struct ResearchPlanner {
    llm: Arc<dyn LanguageModel>,
    system_prompt: String,
}

impl ResearchPlanner {
    pub fn new(llm: Arc<dyn LanguageModel>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
        }
    }

    /// Produce exactly `count` sub-questions for `topic`.
    ///
    /// Falls back to the template set when the model yields fewer than
    /// `count` usable lines. Inference errors are returned as-is.
    pub async fn decompose(
        &self,
        topic: &str,
        count: usize,
    ) -> ResearchResult<(Vec<String>, DecompositionSource)> {
        info!("Planning {} sub-questions for topic: {}", count, topic);

        let response = self
            .llm
            .infer(&self.system_prompt, &question_generation_prompt(topic, count))
            .await
            .map_err(|e| ResearchError::inference(ResearchStage::Decomposition, e))?;

        let questions = parse_questions(&response, count);
        if questions.len() < count {
            warn!(
                "Model produced {} usable questions, expected {}; using fallback set",
                questions.len(),
                count
            );
            return Ok((fallback_questions(topic, count), DecompositionSource::Fallback));
        }

        for question in &questions {
            debug!("  - {}", question);
        }
        Ok((questions, DecompositionSource::Generated))
    }
}

/// Trimmed lines longer than the noise threshold, at most `count` of them
pub fn parse_questions(response: &str, count: usize) -> Vec<String> {
    response
        .lines()
        .map(str::trim)
        .filter(|line| line.chars().count() > MIN_QUESTION_CHARS)
        .take(count)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_discards_short_lines() {
        let response = "\n  What drives adoption of heat pumps?  \nShort one\n\n0123456789\nHow do heat pumps perform in cold climates?\n";
        let questions = parse_questions(response, 5);
        assert_eq!(
            questions,
            vec![
                "What drives adoption of heat pumps?".to_string(),
                "How do heat pumps perform in cold climates?".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_takes_first_count() {
        let response = "Question number one?\nQuestion number two?\nQuestion number three?";
        assert_eq!(parse_questions(response, 2).len(), 2);
        assert_eq!(parse_questions(response, 2)[1], "Question number two?");
    }

    #[test]
    fn test_parse_counts_characters_not_bytes() {
        // Ten characters, more than ten bytes.
        assert!(parse_questions("éééééééééé", 1).is_empty());
        assert_eq!(parse_questions("ééééééééééé", 1).len(), 1);
    }
}
