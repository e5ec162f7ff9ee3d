//! Evidence gathering for sub-questions

use super::types::ResearchProgress;
use delve_core::SearchProvider;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Turns sub-questions into evidence blobs, one per question, in order.
///
/// Search failures never escape: they are folded into the blob text.
pub struct EvidenceRetriever {
    search: Arc<dyn SearchProvider>,
    parallel: bool,
}

impl EvidenceRetriever {
    pub fn new(search: Arc<dyn SearchProvider>) -> Self {
        Self {
            search,
            parallel: false,
        }
    }

    /// Issue every search at once instead of one after another
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub async fn retrieve(&self, questions: &[String]) -> Vec<String> {
        self.retrieve_with_progress(questions, None).await
    }

    pub async fn retrieve_with_progress(
        &self,
        questions: &[String],
        progress_tx: Option<&mpsc::UnboundedSender<ResearchProgress>>,
    ) -> Vec<String> {
        info!(
            "Retrieving evidence for {} questions ({} mode, backend: {})",
            questions.len(),
            if self.parallel { "parallel" } else { "sequential" },
            self.search.name()
        );

        if self.parallel {
            let searches = questions
                .iter()
                .enumerate()
                .map(|(index, question)| self.retrieve_one(index, question, progress_tx));
            // join_all yields outputs in input order regardless of completion order
            join_all(searches).await
        } else {
            let mut evidence = Vec::with_capacity(questions.len());
            for (index, question) in questions.iter().enumerate() {
                evidence.push(self.retrieve_one(index, question, progress_tx).await);
            }
            evidence
        }
    }

    async fn retrieve_one(
        &self,
        index: usize,
        question: &str,
        progress_tx: Option<&mpsc::UnboundedSender<ResearchProgress>>,
    ) -> String {
        if let Some(tx) = progress_tx {
            let _ = tx.send(ResearchProgress::SearchStarted {
                index,
                question: question.to_string(),
            });
        }

        let outcome = match self.search.search(question).await {
            Ok(results) if results.trim().is_empty() => Err("no results returned".to_string()),
            Ok(results) => Ok(results),
            Err(e) => Err(e.to_string()),
        };

        if let Some(tx) = progress_tx {
            let _ = tx.send(ResearchProgress::SearchFinished {
                index,
                question: question.to_string(),
                success: outcome.is_ok(),
            });
        }

        match outcome {
            Ok(results) => {
                debug!(index, chars = results.len(), "Search succeeded");
                evidence_blob(question, &results)
            }
            Err(detail) => {
                warn!(index, question = %question, error = %detail, "Search failed");
                error_blob(question, &detail)
            }
        }
    }
}

pub fn evidence_blob(question: &str, results: &str) -> String {
    format!("Question: {question}\n\nResults: {results}\n\n")
}

pub fn error_blob(question: &str, detail: &str) -> String {
    format!("Question: {question}\n\nResults: Error performing search - {detail}\n\n")
}
