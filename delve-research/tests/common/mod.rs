//! Scripted language model and search backends shared by the research tests

#![allow(dead_code)]

use async_trait::async_trait;
use delve_core::{llm_error, search_error, DelveResult, LanguageModel, SearchProvider};
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Decompose,
    Analyze,
    Reflect,
    Report,
}

fn classify(user_prompt: &str) -> Call {
    if user_prompt.starts_with("Given the research topic") {
        Call::Decompose
    } else if user_prompt.starts_with("Research Query:") {
        Call::Analyze
    } else if user_prompt.starts_with("Research Topic:") {
        Call::Report
    } else {
        Call::Reflect
    }
}

/// Language model that answers by prompt kind and records every call
pub struct ScriptedLlm {
    pub questions: String,
    pub critiques: Mutex<VecDeque<String>>,
    pub default_critique: String,
    pub report: String,
    pub fail_on: Option<Call>,
    calls: Mutex<Vec<(Call, String, String)>>,
}

impl Default for ScriptedLlm {
    fn default() -> Self {
        Self {
            questions: "What is the history of the topic?\n\
                        How is the topic used in industry today?\n\
                        Which open problems remain for the topic?\n\
                        Who are the leading researchers on the topic?\n\
                        What regulation applies to the topic?"
                .to_string(),
            critiques: Mutex::new(VecDeque::new()),
            default_critique: "No, the analysis needs more depth.".to_string(),
            report: "# Report\n\nFinal findings.".to_string(),
            fail_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedLlm {
    pub fn with_questions(mut self, questions: &str) -> Self {
        self.questions = questions.to_string();
        self
    }

    pub fn with_critiques(self, critiques: &[&str]) -> Self {
        *self.critiques.lock().unwrap() = critiques.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn failing_on(mut self, call: Call) -> Self {
        self.fail_on = Some(call);
        self
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _, _)| *c == call)
            .count()
    }

    /// (system, user) prompts of every call of the given kind
    pub fn prompts(&self, call: Call) -> Vec<(String, String)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _, _)| *c == call)
            .map(|(_, s, u)| (s.clone(), u.clone()))
            .collect()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn infer(&self, system_prompt: &str, user_prompt: &str) -> DelveResult<String> {
        let call = classify(user_prompt);
        self.calls.lock().unwrap().push((
            call,
            system_prompt.to_string(),
            user_prompt.to_string(),
        ));

        if self.fail_on == Some(call) {
            return Err(llm_error!("scripted failure", "mock", "mock-model"));
        }

        Ok(match call {
            Call::Decompose => self.questions.clone(),
            Call::Analyze => format!("Analysis #{}", self.count(Call::Analyze)),
            Call::Reflect => self
                .critiques
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.default_critique.clone()),
            Call::Report => self.report.clone(),
        })
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Search backend that fails for selected call indices
#[derive(Default)]
pub struct ScriptedSearch {
    pub failing: HashSet<usize>,
    pub empty: HashSet<usize>,
    /// Earlier queries sleep longer, so later ones finish first when run together
    pub staggered: bool,
    pub queries: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    pub fn failing_at(indices: &[usize]) -> Self {
        Self {
            failing: indices.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn completed(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, query: &str) -> DelveResult<String> {
        let index = query
            .rsplit('#')
            .next()
            .and_then(|n| n.trim_end_matches('?').parse::<usize>().ok())
            .unwrap_or(0);

        if self.staggered {
            tokio::time::sleep(Duration::from_millis(20 * (5 - index.min(5)) as u64)).await;
        }
        self.queries.lock().unwrap().push(query.to_string());

        if self.failing.contains(&index) {
            return Err(search_error!("connection reset", "mock_search"));
        }
        if self.empty.contains(&index) {
            return Ok("   ".to_string());
        }
        Ok(format!("results for {query}"))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Questions numbered `#0..#n` so the search mock can tell them apart
pub fn numbered_questions(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("Sub-question number #{i}?")).collect()
}

/// Decomposition answer yielding `numbered_questions(n)`
pub fn numbered_answer(n: usize) -> String {
    numbered_questions(n).join("\n")
}
