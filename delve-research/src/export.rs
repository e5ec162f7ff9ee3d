//! Markdown export of a finished research run

use crate::research::ResearchState;
use crate::ResearchResult;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

pub const DEFAULT_REPORT_FILENAME: &str = "research_report.md";

/// A report plus the settings that produced it
#[derive(Debug, Clone, Serialize)]
pub struct ReportDocument {
    pub topic: String,
    pub model: String,
    pub sub_question_count: usize,
    pub max_iterations: usize,
    pub sub_questions: Vec<String>,
    pub report: String,
}

impl ReportDocument {
    pub fn from_state(
        state: &ResearchState,
        model: impl Into<String>,
        sub_question_count: usize,
        max_iterations: usize,
    ) -> Self {
        Self {
            topic: state.topic().to_string(),
            model: model.into(),
            sub_question_count,
            max_iterations,
            sub_questions: state.sub_questions().to_vec(),
            report: state.report().to_string(),
        }
    }

    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Research Report\n\n");
        let _ = write!(out, "**Query:** {}\n\n", self.topic);
        out.push_str("**Configuration:**\n");
        let _ = writeln!(out, "- Model: {}", self.model);
        let _ = writeln!(out, "- Sub-questions: {}", self.sub_question_count);
        let _ = write!(out, "- Max iterations: {}\n\n", self.max_iterations);
        out.push_str("## Sub-Questions\n\n");
        for (i, question) in self.sub_questions.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, question);
        }
        out.push_str("\n## Report\n\n");
        out.push_str(&self.report);
        out
    }

    /// Write the Markdown rendering to `path`, replacing any existing file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ResearchResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.render_markdown())?;
        info!("Saved research report to {}", path.display());
        Ok(())
    }
}
