//! Tests for the individual research stages

mod common;

use common::{numbered_questions, Call, ScriptedLlm, ScriptedSearch};
use delve_research::export::ReportDocument;
use delve_research::research::prompts::DEFAULT_ANALYSIS_PROMPT;
use delve_research::{
    DecompositionSource, EvidenceRetriever, ReflectionDecision, ReflectionGate, ResearchAnalyzer,
    ResearchEngine, ResearchPlanner, ResearchRequest, ReportSynthesizer, VerdictParser,
};
use std::collections::HashSet;
use std::sync::Arc;

#[tokio::test]
async fn test_decompose_returns_exact_count() {
    for count in 1..=5 {
        let llm = Arc::new(ScriptedLlm::default());
        let planner = ResearchPlanner::new(llm.clone(), "system");
        let (questions, source) = planner.decompose("ocean acidification", count).await.unwrap();
        assert_eq!(questions.len(), count);
        assert_eq!(source, DecompositionSource::Generated);

        // Nothing usable from the model
        let llm = Arc::new(ScriptedLlm::default().with_questions(""));
        let planner = ResearchPlanner::new(llm, "system");
        let (questions, source) = planner.decompose("ocean acidification", count).await.unwrap();
        assert_eq!(questions.len(), count);
        assert_eq!(source, DecompositionSource::Fallback);
    }
}

#[tokio::test]
async fn test_decompose_under_production_discards_generated_list() {
    let llm = Arc::new(
        ScriptedLlm::default().with_questions("A perfectly good question?\nAnother good question?"),
    );
    let planner = ResearchPlanner::new(llm, "system");

    let (questions, source) = planner.decompose("kelp", 3).await.unwrap();
    assert_eq!(source, DecompositionSource::Fallback);
    assert_eq!(
        questions,
        vec![
            "What are the key concepts of kelp?".to_string(),
            "What are the current trends and developments in kelp?".to_string(),
            "What are the practical applications of kelp?".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_retrieve_all_failures_keeps_alignment() {
    let questions = numbered_questions(4);
    let search = Arc::new(ScriptedSearch::failing_at(&[0, 1, 2, 3]));
    let retriever = EvidenceRetriever::new(search);

    let evidence = retriever.retrieve(&questions).await;
    assert_eq!(evidence.len(), 4);
    for (question, blob) in questions.iter().zip(&evidence) {
        assert!(blob.starts_with(&format!("Question: {question}\n\n")));
        assert!(blob.contains("Results: Error performing search - "));
        assert!(blob.ends_with("\n\n"));
    }
}

#[tokio::test]
async fn test_retrieve_empty_result_is_a_failure() {
    let questions = numbered_questions(2);
    let search = Arc::new(ScriptedSearch {
        empty: HashSet::from([1]),
        ..ScriptedSearch::default()
    });

    let evidence = EvidenceRetriever::new(search).retrieve(&questions).await;
    assert_eq!(
        evidence[1],
        format!(
            "Question: {}\n\nResults: Error performing search - no results returned\n\n",
            questions[1]
        )
    );
    assert_eq!(
        evidence[0],
        format!(
            "Question: {}\n\nResults: results for {}\n\n",
            questions[0], questions[0]
        )
    );
}

#[tokio::test]
async fn test_parallel_retrieve_preserves_input_order() {
    let questions = numbered_questions(5);
    let search = Arc::new(ScriptedSearch {
        staggered: true,
        failing: HashSet::from([2]),
        ..ScriptedSearch::default()
    });
    let retriever = EvidenceRetriever::new(search.clone()).parallel(true);

    let evidence = retriever.retrieve(&questions).await;

    // Later questions finished first...
    let completion_order = search.queries();
    assert_eq!(completion_order.first(), Some(&questions[4]));
    assert_eq!(completion_order.last(), Some(&questions[0]));

    // ...but evidence stays index-aligned
    for (i, blob) in evidence.iter().enumerate() {
        assert!(blob.starts_with(&format!("Question: {}", questions[i])));
    }
    assert!(evidence[2].contains("Error performing search"));
}

#[tokio::test]
async fn test_gate_finalizes_at_cap_without_critique() {
    // The scripted critique would say continue
    let llm = Arc::new(ScriptedLlm::default());
    let gate = ReflectionGate::new(llm.clone(), "system");

    let decision = gate.decide("analysis", 3, 3).await.unwrap();
    assert_eq!(decision, ReflectionDecision::Finalize);
    let decision = gate.decide("analysis", 4, 3).await.unwrap();
    assert_eq!(decision, ReflectionDecision::Finalize);
    assert_eq!(llm.count(Call::Reflect), 0);
}

#[tokio::test]
async fn test_gate_continues_without_affirmative() {
    let llm = Arc::new(ScriptedLlm::default().with_critiques(&["Not yet. Missing citations."]));
    let gate = ReflectionGate::new(llm.clone(), "system");

    let decision = gate.decide("analysis", 1, 3).await.unwrap();
    assert_eq!(decision, ReflectionDecision::Continue);
    assert_eq!(llm.count(Call::Reflect), 1);

    let (_, prompt) = &llm.prompts(Call::Reflect)[0];
    assert!(prompt.starts_with("Analysis:\nanalysis\n\n"));
}

struct AlwaysFinalize;

impl VerdictParser for AlwaysFinalize {
    fn parse(&self, _critique: &str) -> ReflectionDecision {
        ReflectionDecision::Finalize
    }
}

#[tokio::test]
async fn test_custom_verdict_parser() {
    let llm = Arc::new(ScriptedLlm::default());
    let search = Arc::new(ScriptedSearch::default());

    let state = ResearchEngine::new(llm.clone(), search)
        .with_verdict_parser(Arc::new(AlwaysFinalize))
        .run(ResearchRequest::new("kelp", 1, 5))
        .await
        .unwrap();

    assert_eq!(state.iteration_count(), 1);
    assert_eq!(llm.count(Call::Reflect), 1);
}

#[tokio::test]
async fn test_analyzer_and_synthesizer_prompts() {
    let llm = Arc::new(ScriptedLlm::default());

    let analyzer = ResearchAnalyzer::new(llm.clone(), DEFAULT_ANALYSIS_PROMPT);
    let evidence = vec!["blob one".to_string(), "blob two".to_string()];
    let analysis = analyzer.analyze("kelp", &evidence).await.unwrap();
    assert_eq!(analysis, "Analysis #1");

    let (system, user) = &llm.prompts(Call::Analyze)[0];
    assert_eq!(system, DEFAULT_ANALYSIS_PROMPT);
    assert!(user.starts_with("Research Query: kelp\n\nSearch Results:\nblob one\n\nblob two\n\n"));

    let synthesizer = ReportSynthesizer::new(llm.clone(), "writer");
    let report = synthesizer.generate("kelp", &analysis).await.unwrap();
    assert_eq!(report, "# Report\n\nFinal findings.");
    let (_, user) = &llm.prompts(Call::Report)[0];
    assert!(user.starts_with("Research Topic: kelp\n\nAnalysis:\nAnalysis #1\n\n"));
}

#[tokio::test]
async fn test_export_round_trip_to_disk() {
    let llm = Arc::new(ScriptedLlm::default());
    let search = Arc::new(ScriptedSearch::default());
    let state = ResearchEngine::new(llm, search)
        .run(ResearchRequest::new("kelp farming", 2, 1))
        .await
        .unwrap();

    let doc = ReportDocument::from_state(&state, "gpt-4", 2, 1);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("research_report.md");
    doc.save(&path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    let query = written.find("**Query:** kelp farming").unwrap();
    let config = written.find("- Model: gpt-4").unwrap();
    let first = written.find("1. What is the history of the topic?").unwrap();
    let second = written.find("2. How is the topic used in industry today?").unwrap();
    let report = written.find("## Report\n\n# Report").unwrap();
    assert!(written.starts_with("# Research Report\n\n"));
    assert!(query < config && config < first && first < second && second < report);
    assert!(written.ends_with("Final findings."));
}
