//! Main research engine implementation

use super::{
    analyzer::ResearchAnalyzer,
    planner::ResearchPlanner,
    reflection::{GateOutcome, LeadingAffirmativeParser, ReflectionGate, VerdictParser},
    retriever::EvidenceRetriever,
    synthesizer::ReportSynthesizer,
    types::*,
};
use crate::ResearchResult;
use delve_core::{performance::measure_async, LanguageModel, ResearchConfig, SearchProvider};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, info_span, Instrument};

/// Drives one research run through
/// `INIT -> DECOMPOSED -> RETRIEVED -> ANALYZED (-> ANALYZED)* -> REPORTED`.
pub struct ResearchEngine {
    llm: Arc<dyn LanguageModel>,
    search: Arc<dyn SearchProvider>,
    parallel_retrieval: bool,
    verdict_parser: Arc<dyn VerdictParser>,
    progress_tx: Option<mpsc::UnboundedSender<ResearchProgress>>,
}

impl ResearchEngine {
    /// Create a new research engine
    pub fn new(llm: Arc<dyn LanguageModel>, search: Arc<dyn SearchProvider>) -> Self {
        Self {
            llm,
            search,
            parallel_retrieval: false,
            verdict_parser: Arc::new(LeadingAffirmativeParser::default()),
            progress_tx: None,
        }
    }

    /// Engine tuned by the `[research]` configuration section
    pub fn from_config(
        llm: Arc<dyn LanguageModel>,
        search: Arc<dyn SearchProvider>,
        config: &ResearchConfig,
    ) -> Self {
        Self::new(llm, search)
            .with_parallel_retrieval(config.parallel_retrieval)
            .with_verdict_parser(Arc::new(LeadingAffirmativeParser {
                window: config.reflection_window,
            }))
    }

    pub fn with_parallel_retrieval(mut self, parallel: bool) -> Self {
        self.parallel_retrieval = parallel;
        self
    }

    pub fn with_verdict_parser(mut self, parser: Arc<dyn VerdictParser>) -> Self {
        self.verdict_parser = parser;
        self
    }

    pub fn set_progress_channel(&mut self, tx: mpsc::UnboundedSender<ResearchProgress>) {
        self.progress_tx = Some(tx);
    }

    fn send_progress(&self, progress: ResearchProgress) {
        if let Some(tx) = &self.progress_tx {
            let _ = tx.send(progress);
        }
    }

    /// Run the full loop and return the terminal state.
    ///
    /// Any inference failure aborts the run; search failures are absorbed
    /// into the evidence.
    pub async fn run(&self, request: ResearchRequest) -> ResearchResult<ResearchState> {
        request.validate()?;

        let state = ResearchState::new(request.topic.clone());
        let span = info_span!("research_run", run_id = %state.run_id());
        self.drive(state, request).instrument(span).await
    }

    async fn drive(
        &self,
        mut state: ResearchState,
        request: ResearchRequest,
    ) -> ResearchResult<ResearchState> {
        let ResearchRequest {
            sub_question_count,
            max_iterations,
            prompts,
            ..
        } = request;

        info!(
            "Starting research for topic: {} ({} sub-questions, max {} iterations)",
            state.topic(),
            sub_question_count,
            max_iterations
        );
        self.send_progress(ResearchProgress::Started {
            run_id: state.run_id(),
            topic: state.topic().to_string(),
        });

        let planner = ResearchPlanner::new(self.llm.clone(), prompts.question);
        let retriever =
            EvidenceRetriever::new(self.search.clone()).parallel(self.parallel_retrieval);
        let analyzer = ResearchAnalyzer::new(self.llm.clone(), prompts.analysis);
        let gate = ReflectionGate::new(self.llm.clone(), prompts.reflection)
            .with_parser(self.verdict_parser.clone());
        let synthesizer = ReportSynthesizer::new(self.llm.clone(), prompts.report);

        // INIT -> DECOMPOSED
        self.send_progress(ResearchProgress::Decomposing {
            count: sub_question_count,
        });
        let (questions, source) = measure_async(
            "decompose",
            planner.decompose(state.topic(), sub_question_count),
        )
        .await?;
        state.set_sub_questions(questions, source);
        state.transition(ResearchPhase::Decomposed)?;
        self.send_progress(ResearchProgress::QuestionsReady {
            questions: state.sub_questions().to_vec(),
            source,
        });

        // DECOMPOSED -> RETRIEVED
        let evidence = measure_async(
            "retrieve",
            retriever.retrieve_with_progress(state.sub_questions(), self.progress_tx.as_ref()),
        )
        .await;
        state.append_evidence(evidence);
        state.transition(ResearchPhase::Retrieved)?;

        // RETRIEVED -> ANALYZED, then ANALYZED -> ANALYZED until the gate finalizes
        loop {
            let iteration = state.iteration_count() + 1;
            self.send_progress(ResearchProgress::AnalysisStarted { iteration });

            let analysis = measure_async(
                "analyze",
                analyzer.analyze(state.topic(), state.evidence()),
            )
            .await?;
            let chars = analysis.len();
            state.record_analysis(analysis);
            state.transition(ResearchPhase::Analyzed)?;
            self.send_progress(ResearchProgress::AnalysisFinished { iteration, chars });

            self.send_progress(ResearchProgress::Reflecting);
            let outcome = measure_async(
                "reflect",
                gate.evaluate(state.analysis(), state.iteration_count(), max_iterations),
            )
            .await?;

            match outcome {
                GateOutcome::CapReached => {
                    self.send_progress(ResearchProgress::IterationCapReached { max_iterations });
                    break;
                }
                GateOutcome::Reviewed { decision, critique } => {
                    state.record_reflection();
                    self.send_progress(ResearchProgress::ReflectionVerdict { decision, critique });
                    if decision == ReflectionDecision::Finalize {
                        break;
                    }
                    info!("Analysis needs improvement, re-analyzing");
                }
            }
        }

        // ANALYZED -> REPORTED
        self.send_progress(ResearchProgress::GeneratingReport);
        let report = measure_async(
            "report",
            synthesizer.generate(state.topic(), state.analysis()),
        )
        .await?;
        let report_chars = report.len();
        state.set_report(report);
        state.transition(ResearchPhase::Reported)?;
        self.send_progress(ResearchProgress::Completed { report_chars });

        info!(
            "Research completed after {} iterations and {} reflections",
            state.iteration_count(),
            state.reflection_count()
        );
        Ok(state)
    }
}
