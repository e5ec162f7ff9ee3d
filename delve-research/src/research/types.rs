//! Types for the research loop

use crate::research::prompts::ResearchPrompts;
use crate::{ResearchError, ResearchResult};
use chrono::{DateTime, Utc};
use delve_core::{
    validation_error, DelveResult, ResearchConfig, MAX_ITERATIONS, MAX_SUB_QUESTIONS,
    MIN_ITERATIONS, MIN_SUB_QUESTIONS,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Current phase of a research run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResearchPhase {
    /// Topic recorded, nothing else done.
    Init,
    /// Sub-questions fixed.
    Decomposed,
    /// One evidence blob per sub-question collected.
    Retrieved,
    /// At least one analysis produced.
    Analyzed,
    /// Final report written. Terminal.
    Reported,
}

impl ResearchPhase {
    /// Whether the state machine may move from `self` to `next`
    pub fn can_transition_to(self, next: ResearchPhase) -> bool {
        use ResearchPhase::*;
        matches!(
            (self, next),
            (Init, Decomposed)
                | (Decomposed, Retrieved)
                | (Retrieved, Analyzed)
                | (Analyzed, Analyzed)
                | (Analyzed, Reported)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == ResearchPhase::Reported
    }
}

impl fmt::Display for ResearchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResearchPhase::Init => "init",
            ResearchPhase::Decomposed => "decomposed",
            ResearchPhase::Retrieved => "retrieved",
            ResearchPhase::Analyzed => "analyzed",
            ResearchPhase::Reported => "reported",
        };
        f.write_str(name)
    }
}

/// Stage that issued an inference call
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResearchStage {
    Decomposition,
    Analysis,
    Reflection,
    Report,
}

impl fmt::Display for ResearchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResearchStage::Decomposition => "decomposition",
            ResearchStage::Analysis => "analysis",
            ResearchStage::Reflection => "reflection",
            ResearchStage::Report => "report",
        };
        f.write_str(name)
    }
}

/// Outcome of the reflection gate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionDecision {
    /// Analyze the same evidence again.
    Continue,
    /// Proceed to the report.
    Finalize,
}

/// Where the sub-questions came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecompositionSource {
    /// Parsed from the language model's answer.
    Generated,
    /// The deterministic template set.
    Fallback,
}

/// Progress updates emitted while a run advances
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ResearchProgress {
    Started {
        run_id: Uuid,
        topic: String,
    },
    Decomposing {
        count: usize,
    },
    QuestionsReady {
        questions: Vec<String>,
        source: DecompositionSource,
    },
    SearchStarted {
        index: usize,
        question: String,
    },
    SearchFinished {
        index: usize,
        question: String,
        success: bool,
    },
    /// `iteration` is 1-based.
    AnalysisStarted {
        iteration: usize,
    },
    AnalysisFinished {
        iteration: usize,
        chars: usize,
    },
    Reflecting,
    ReflectionVerdict {
        decision: ReflectionDecision,
        critique: String,
    },
    IterationCapReached {
        max_iterations: usize,
    },
    GeneratingReport,
    Completed {
        report_chars: usize,
    },
}

/// Parameters of a single research run
#[derive(Debug, Clone)]
pub struct ResearchRequest {
    pub topic: String,
    pub sub_question_count: usize,
    pub max_iterations: usize,
    pub prompts: ResearchPrompts,
}

impl ResearchRequest {
    /// Request with default prompts
    pub fn new(topic: impl Into<String>, sub_question_count: usize, max_iterations: usize) -> Self {
        Self {
            topic: topic.into(),
            sub_question_count,
            max_iterations,
            prompts: ResearchPrompts::default(),
        }
    }

    /// Request sized from the `[research]` configuration section
    pub fn from_config(topic: impl Into<String>, config: &ResearchConfig) -> Self {
        Self::new(topic, config.sub_question_count, config.max_iterations)
    }

    pub fn with_prompts(mut self, prompts: ResearchPrompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Reject empty topics and out-of-range counts
    pub fn validate(&self) -> DelveResult<()> {
        if self.topic.trim().is_empty() {
            return Err(validation_error!(
                "Research topic cannot be empty",
                "topic",
                "research_request"
            ));
        }

        if !(MIN_SUB_QUESTIONS..=MAX_SUB_QUESTIONS).contains(&self.sub_question_count) {
            return Err(validation_error!(
                format!(
                    "sub_question_count must be between {} and {}, got {}",
                    MIN_SUB_QUESTIONS, MAX_SUB_QUESTIONS, self.sub_question_count
                ),
                "sub_question_count",
                "research_request"
            ));
        }

        if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&self.max_iterations) {
            return Err(validation_error!(
                format!(
                    "max_iterations must be between {} and {}, got {}",
                    MIN_ITERATIONS, MAX_ITERATIONS, self.max_iterations
                ),
                "max_iterations",
                "research_request"
            ));
        }

        Ok(())
    }
}

/// The record threaded through every stage of a run.
///
/// Only the engine in this crate can advance it; callers get it back at the
/// terminal phase and read it through accessors.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchState {
    run_id: Uuid,
    topic: String,
    phase: ResearchPhase,
    sub_questions: Vec<String>,
    question_source: Option<DecompositionSource>,
    evidence: Vec<String>,
    analysis: String,
    report: String,
    iteration_count: usize,
    reflection_count: usize,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl ResearchState {
    pub(crate) fn new(topic: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            topic: topic.into(),
            phase: ResearchPhase::Init,
            sub_questions: Vec::new(),
            question_source: None,
            evidence: Vec::new(),
            analysis: String::new(),
            report: String::new(),
            iteration_count: 0,
            reflection_count: 0,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn phase(&self) -> ResearchPhase {
        self.phase
    }

    pub fn sub_questions(&self) -> &[String] {
        &self.sub_questions
    }

    pub fn question_source(&self) -> Option<DecompositionSource> {
        self.question_source
    }

    /// Evidence blobs, index-aligned with `sub_questions`
    pub fn evidence(&self) -> &[String] {
        &self.evidence
    }

    /// Latest analysis; earlier iterations are overwritten
    pub fn analysis(&self) -> &str {
        &self.analysis
    }

    pub fn report(&self) -> &str {
        &self.report
    }

    /// Number of analyzer invocations so far
    pub fn iteration_count(&self) -> usize {
        self.iteration_count
    }

    /// Number of times the critique was actually consulted
    pub fn reflection_count(&self) -> usize {
        self.reflection_count
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub(crate) fn transition(&mut self, next: ResearchPhase) -> ResearchResult<()> {
        if !self.phase.can_transition_to(next) {
            return Err(ResearchError::research(format!(
                "illegal phase transition {} -> {}",
                self.phase, next
            )));
        }
        self.phase = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    pub(crate) fn set_sub_questions(
        &mut self,
        questions: Vec<String>,
        source: DecompositionSource,
    ) {
        self.sub_questions = questions;
        self.question_source = Some(source);
    }

    pub(crate) fn append_evidence(&mut self, blobs: Vec<String>) {
        self.evidence.extend(blobs);
    }

    pub(crate) fn record_analysis(&mut self, analysis: String) {
        self.analysis = analysis;
        self.iteration_count += 1;
    }

    pub(crate) fn record_reflection(&mut self) {
        self.reflection_count += 1;
    }

    pub(crate) fn set_report(&mut self, report: String) {
        self.report = report;
    }
}
