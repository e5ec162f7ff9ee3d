//! Terminal rendering of research progress and results

use delve_research::{DecompositionSource, ReflectionDecision, ResearchProgress, ResearchState};

const RULE_WIDTH: usize = 60;

pub fn print_section_header(title: &str) {
    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("{}", title);
    println!("{}", "=".repeat(RULE_WIDTH));
}

pub fn print_subsection_header(title: &str) {
    println!("\n{}", "-".repeat(RULE_WIDTH));
    println!("{}", title);
    println!("{}", "-".repeat(RULE_WIDTH));
}

fn print_step(message: &str) {
    println!("  {}", message);
}

pub fn print_numbered_list(items: &[String]) {
    for (i, item) in items.iter().enumerate() {
        println!("  {}. {}", i + 1, item);
    }
}

pub fn display_configuration(
    model: &str,
    sub_question_count: usize,
    max_iterations: usize,
    custom_prompts: bool,
) {
    print_section_header("🚀 STARTING RESEARCH WORKFLOW");
    println!("\n📊 Configuration:");
    println!("  • Model: {}", model);
    println!("  • Sub-questions: {}", sub_question_count);
    println!("  • Max iterations: {}", max_iterations);
    println!(
        "  • Custom prompts: {}",
        if custom_prompts { "Yes" } else { "No" }
    );
}

pub fn display_results(state: &ResearchState) {
    print_section_header("📊 FINAL RESEARCH REPORT");
    println!("\n🔍 Query: {}", state.topic());
    println!("\n📋 Sub-Questions:");
    print_numbered_list(state.sub_questions());
    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("{}", state.report());
    println!("{}", "=".repeat(RULE_WIDTH));
}

pub fn print_progress(event: &ResearchProgress) {
    match event {
        ResearchProgress::Started { .. } => {}
        ResearchProgress::Decomposing { .. } => {
            print_section_header("🔵 GENERATING SUB-QUESTIONS...");
        }
        ResearchProgress::QuestionsReady { questions, source } => {
            println!("\n✅ Sub-questions generated:");
            print_numbered_list(questions);
            if *source == DecompositionSource::Fallback {
                print_step("(model output unusable, using default questions)");
            }
        }
        ResearchProgress::SearchStarted { index, question } => {
            if *index == 0 {
                print_section_header("🔍 SEARCHING THE WEB...");
            }
            print_step(&format!("[{}] {}", index + 1, question));
        }
        ResearchProgress::SearchFinished { index, success, .. } => {
            if *success {
                print_step(&format!("  ✓ results received for [{}]", index + 1));
            } else {
                print_step(&format!("  ⚠️  search failed for [{}], continuing", index + 1));
            }
        }
        ResearchProgress::AnalysisStarted { iteration } => {
            print_section_header(&format!("🧠 ANALYZING RESULTS (Iteration {})...", iteration));
        }
        ResearchProgress::AnalysisFinished { chars, .. } => {
            println!("\n✅ Analysis completed ({} chars)", chars);
        }
        ResearchProgress::Reflecting => {
            print_section_header("🤔 REFLECTING ON ANALYSIS...");
        }
        ResearchProgress::ReflectionVerdict { decision, .. } => match decision {
            ReflectionDecision::Finalize => {
                print_step("✓ Analysis is comprehensive");
                print_step("→ Proceeding to report generation");
            }
            ReflectionDecision::Continue => {
                print_step("⚠️  Analysis needs improvement");
                print_step("→ Re-analyzing with more depth");
            }
        },
        ResearchProgress::IterationCapReached { max_iterations } => {
            print_step(&format!("⏱️  Max iterations ({}) reached", max_iterations));
            print_step("→ Proceeding to report generation");
        }
        ResearchProgress::GeneratingReport => {
            print_section_header("📄 GENERATING FINAL REPORT...");
        }
        ResearchProgress::Completed { report_chars } => {
            println!("\n✅ Report generated ({} chars)", report_chars);
        }
    }
}
