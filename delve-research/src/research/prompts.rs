//! Prompt text for each research stage
//!
//! System prompts can be overridden per run; the user prompts that carry the
//! topic, evidence and analysis are fixed.

use delve_core::PromptConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_QUESTION_PROMPT: &str = "You are an expert research analyst. Generate specific, focused sub-questions for research topics.";

pub const DEFAULT_ANALYSIS_PROMPT: &str = "You are an expert research analyst. Analyze the provided search results and synthesize key insights that directly answer the research query.";

pub const DEFAULT_REFLECTION_PROMPT: &str =
    "You are a critical reviewer. Evaluate if the analysis is comprehensive and well-supported.";

pub const DEFAULT_REPORT_PROMPT: &str = "You are an expert research report writer. Create well-structured, comprehensive reports with clear sections and citations.";

/// System prompts for the four inference stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchPrompts {
    pub question: String,
    pub analysis: String,
    pub reflection: String,
    pub report: String,
}

impl Default for ResearchPrompts {
    fn default() -> Self {
        Self {
            question: DEFAULT_QUESTION_PROMPT.to_string(),
            analysis: DEFAULT_ANALYSIS_PROMPT.to_string(),
            reflection: DEFAULT_REFLECTION_PROMPT.to_string(),
            report: DEFAULT_REPORT_PROMPT.to_string(),
        }
    }
}

impl ResearchPrompts {
    /// Defaults with any non-blank override applied
    pub fn from_overrides(overrides: &PromptConfig) -> Self {
        fn pick(custom: &Option<String>, default: &str) -> String {
            match custom.as_deref().map(str::trim) {
                Some(text) if !text.is_empty() => text.to_string(),
                _ => default.to_string(),
            }
        }

        Self {
            question: pick(&overrides.question, DEFAULT_QUESTION_PROMPT),
            analysis: pick(&overrides.analysis, DEFAULT_ANALYSIS_PROMPT),
            reflection: pick(&overrides.reflection, DEFAULT_REFLECTION_PROMPT),
            report: pick(&overrides.report, DEFAULT_REPORT_PROMPT),
        }
    }
}

pub fn question_generation_prompt(topic: &str, count: usize) -> String {
    format!(
        "Given the research topic: {topic}\n\n\
         Generate exactly {count} specific, focused sub-questions that will help thoroughly research this topic. \
         Return only the {count} questions, one per line, without numbering or extra text."
    )
}

pub fn analysis_prompt(topic: &str, context: &str) -> String {
    format!(
        "Research Query: {topic}\n\n\
         Search Results:\n{context}\n\n\
         Analyze these search results and provide:\n\
         1. Key findings and insights\n\
         2. Important patterns or trends\n\
         3. Relevant facts and data points\n\
         4. Potential gaps or areas needing more research\n\n\
         Provide a comprehensive analysis."
    )
}

pub fn reflection_prompt(analysis: &str) -> String {
    format!(
        "Analysis:\n{analysis}\n\n\
         Is this analysis comprehensive, well-supported, and ready for report generation? \
         Answer with 'yes' or 'no' and briefly explain why."
    )
}

pub fn report_prompt(topic: &str, analysis: &str) -> String {
    format!(
        "Research Topic: {topic}\n\n\
         Analysis:\n{analysis}\n\n\
         Create a comprehensive research report with the following structure:\n\
         1. Executive Summary: Synthesize the main conclusion and the top three key findings into a single, concise paragraph. \
         Focus on actionable insights, not just facts.\n\
         2. Introduction: Define the scope of the research (the original user query). \
         State the methodology used (e.g., \"Iterative search across web and academic sources using a Multi-Agent system\"). \
         Define the sub-questions addressed.\n\
         3. Key Findings: Present the answers to the sub-questions as numbered or bulleted claims. \
         Every claim must be immediately followed by an inline citation\n\
         4. Detailed Analysis: This section must demonstrate synthesis and reasoning. Do not simply list facts. \
         Instead, compare and contrast conflicting sources, analyze trends, and discuss the implications of the Key Findings\n\
         5. Conclusions and Recommendations: Restate the primary conclusion. \
         Offer 2-3 forward-looking recommendations based on the analysis (e.g., \"Further research is recommended on...\") \
         or suggest a business strategy. Provide all sources as well.\n\n\
         Make it informative, well-organized, and professional.\n\
         Include a short summary of the steps taken (Planner's sub-questions, Reflection loops, Confidence Score)\n"
    )
}

/// Template sub-questions used when generation under-produces
pub fn fallback_questions(topic: &str, count: usize) -> Vec<String> {
    [
        format!("What are the key concepts of {topic}?"),
        format!("What are the current trends and developments in {topic}?"),
        format!("What are the practical applications of {topic}?"),
        format!("What are the challenges and limitations of {topic}?"),
        format!("What is the future outlook for {topic}?"),
    ]
    .into_iter()
    .take(count)
    .collect()
}
