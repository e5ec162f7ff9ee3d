//! Iterative research loop
//!
//! Stages, leaves first:
//! - planner: topic to sub-questions, with a template fallback
//! - retriever: one evidence blob per sub-question, never failing
//! - analyzer: evidence to analysis
//! - reflection: re-analyze or finalize
//! - synthesizer: analysis to report
//!
//! `ResearchEngine` sequences them as a state machine over `ResearchState`.

pub mod analyzer;
pub mod engine;
pub mod planner;
pub mod prompts;
pub mod reflection;
pub mod retriever;
pub mod synthesizer;
pub mod types;

pub use analyzer::ResearchAnalyzer;
pub use engine::ResearchEngine;
pub use planner::ResearchPlanner;
pub use prompts::ResearchPrompts;
pub use reflection::{GateOutcome, LeadingAffirmativeParser, ReflectionGate, VerdictParser};
pub use retriever::EvidenceRetriever;
pub use synthesizer::ReportSynthesizer;
pub use types::*;
