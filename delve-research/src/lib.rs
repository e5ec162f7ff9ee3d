//! Delve Research - iterative research orchestration
//!
//! Given a topic, the engine decomposes it into sub-questions, gathers web
//! evidence for each, analyzes the evidence, critiques the analysis and either
//! re-analyzes or writes a final report. The loop is bounded by a configured
//! iteration cap.
//!
//! ## Architecture
//!
//! - **research**: the state machine and its stages
//! - **export**: Markdown rendering of a finished run
//!
//! Language inference and web search are consumed through the
//! `LanguageModel` and `SearchProvider` traits from `delve-core`.

pub mod export;
pub mod research;

pub use export::{ReportDocument, DEFAULT_REPORT_FILENAME};
pub use research::{
    DecompositionSource, EvidenceRetriever, LeadingAffirmativeParser, ReflectionDecision,
    ReflectionGate, ResearchAnalyzer, ResearchEngine, ResearchPhase, ResearchPlanner,
    ResearchProgress, ResearchPrompts, ResearchRequest, ResearchStage, ResearchState,
    ReportSynthesizer, VerdictParser,
};

use delve_core::DelveError;

/// Research-level error type
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("Core error: {0}")]
    Core(#[from] DelveError),

    #[error("Inference failed during {stage}: {source}")]
    Inference {
        stage: ResearchStage,
        #[source]
        source: DelveError,
    },

    #[error("Research error: {message}")]
    Research { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ResearchResult<T> = Result<T, ResearchError>;

impl ResearchError {
    /// Wrap a language model failure with the stage it happened in
    pub fn inference(stage: ResearchStage, source: DelveError) -> Self {
        Self::Inference { stage, source }
    }

    /// Create a research error
    pub fn research<S: Into<String>>(message: S) -> Self {
        Self::Research {
            message: message.into(),
        }
    }

    /// Stage whose inference call failed, if this is an inference error
    pub fn stage(&self) -> Option<ResearchStage> {
        match self {
            Self::Inference { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
