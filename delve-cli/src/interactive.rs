//! Guided research session on stdin/stdout

use crate::display::{display_configuration, display_results, print_section_header, print_subsection_header};
use delve_core::{
    validation_error, DelveConfig, DelveResult, PromptConfig, MAX_ITERATIONS, MAX_SUB_QUESTIONS,
    MIN_ITERATIONS, MIN_SUB_QUESTIONS,
};
use delve_research::{ReportDocument, ResearchPrompts, ResearchRequest, DEFAULT_REPORT_FILENAME};
use std::io::{self, Write};

/// Print `label` and read one trimmed line
fn prompt(label: &str) -> DelveResult<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Parse `input` as a count in `min..=max`.
///
/// Empty input takes the default silently; anything else invalid takes the
/// default with a warning message.
pub fn parse_in_range(
    input: &str,
    min: usize,
    max: usize,
    default: usize,
) -> (usize, Option<String>) {
    if input.is_empty() {
        return (default, None);
    }
    match input.parse::<usize>() {
        Ok(n) if (min..=max).contains(&n) => (n, None),
        Ok(_) => (
            default,
            Some(format!("Value out of range. Using default: {}", default)),
        ),
        Err(_) => (
            default,
            Some(format!("Invalid input. Using default: {}", default)),
        ),
    }
}

fn read_count(label: &str, min: usize, max: usize, default: usize) -> DelveResult<usize> {
    let input = prompt(&format!("{} ({}-{}) [default: {}]: ", label, min, max, default))?;
    let (value, warning) = parse_in_range(&input, min, max, default);
    if let Some(warning) = warning {
        println!("⚠️  {}", warning);
    }
    Ok(value)
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

pub async fn run(mut config: DelveConfig) -> DelveResult<()> {
    print_section_header("🔬 DEEP RESEARCH AGENT");

    let topic = prompt("\n📝 Enter your research topic: ")?;
    if topic.is_empty() {
        return Err(validation_error!(
            "Research topic cannot be empty",
            "topic",
            "interactive"
        ));
    }

    print_subsection_header("⚙️  CONFIGURATION");

    let model = prompt(&format!(
        "Select model ({} provider) [default: {}]: ",
        config.llm.provider, config.llm.model
    ))?;
    if !model.is_empty() {
        config.llm.model = model;
    }

    let sub_question_count = read_count(
        "Number of sub-questions",
        MIN_SUB_QUESTIONS,
        MAX_SUB_QUESTIONS,
        config.research.sub_question_count,
    )?;
    let max_iterations = read_count(
        "Max reflection iterations",
        MIN_ITERATIONS,
        MAX_ITERATIONS,
        config.research.max_iterations,
    )?;

    let custom = prompt("\nUse custom system prompts? (y/n) [default: n]: ")?;
    if custom.eq_ignore_ascii_case("y") {
        println!("\n📋 Custom Prompts (press Enter to use default):");
        config.prompts = PromptConfig {
            question: non_empty(prompt("Question generation prompt: ")?),
            analysis: non_empty(prompt("Analysis prompt: ")?),
            reflection: non_empty(prompt("Reflection prompt: ")?),
            report: non_empty(prompt("Report generation prompt: ")?),
        };
    }

    display_configuration(
        &config.llm.model,
        sub_question_count,
        max_iterations,
        config.prompts.has_overrides(),
    );

    let request = ResearchRequest::new(topic, sub_question_count, max_iterations)
        .with_prompts(ResearchPrompts::from_overrides(&config.prompts));
    let state = crate::execute_research(&config, request, true).await?;

    display_results(&state);

    let save = prompt("\n💾 Save report to file? (y/n) [default: n]: ")?;
    if save.eq_ignore_ascii_case("y") {
        let filename = prompt(&format!("Enter filename [default: {}]: ", DEFAULT_REPORT_FILENAME))?;
        let filename = non_empty(filename).unwrap_or_else(|| DEFAULT_REPORT_FILENAME.to_string());

        let document =
            ReportDocument::from_state(&state, &config.llm.model, sub_question_count, max_iterations);
        match document.save(&filename) {
            Ok(()) => println!("✅ Report saved to {}", filename),
            Err(e) => println!("❌ Error saving file: {}", e),
        }
    }

    println!("\n✅ Research completed successfully!");
    Ok(())
}
