//! Delve CLI - Command-line interface for iterative web research
//!
//! Decomposes a topic into sub-questions, searches the web for each, analyzes
//! and critiques the findings, then writes a structured report.

mod display;
mod interactive;

use clap::{Parser, Subcommand};
use delve_core::{
    config_error, init_logging, log_operation_start, log_operation_success,
    DelveConfig, DelveError, DelveResult, ErrorContext, LoggingConfig, PromptConfig,
};
use delve_providers::{configs, create_llm_client, create_search_provider};
use delve_research::{
    ReportDocument, ResearchEngine, ResearchError, ResearchPrompts, ResearchRequest,
    ResearchState,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser)]
#[command(name = "delve")]
#[command(about = "Iterative web research with a language model")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Research a topic and print the report
    Research {
        /// Research topic
        topic: String,

        /// Number of sub-questions (1-5)
        #[arg(short, long)]
        questions: Option<usize>,

        /// Maximum analysis iterations (1-5)
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Model name
        #[arg(short, long)]
        model: Option<String>,

        /// LLM provider (openai, anthropic, ollama, groq)
        #[arg(short, long)]
        provider: Option<String>,

        /// Run all web searches concurrently
        #[arg(long)]
        parallel: bool,

        /// Save the report as Markdown
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the final research state as JSON instead of the report
        #[arg(long)]
        json: bool,

        /// System prompt for sub-question generation
        #[arg(long)]
        question_prompt: Option<String>,

        /// System prompt for analysis
        #[arg(long)]
        analysis_prompt: Option<String>,

        /// System prompt for reflection
        #[arg(long)]
        reflection_prompt: Option<String>,

        /// System prompt for report generation
        #[arg(long)]
        report_prompt: Option<String>,
    },

    /// Guided research session
    Interactive,

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Initialize default configuration
        #[arg(long)]
        init: bool,

        /// Set a configuration value (key=value format)
        #[arg(long)]
        set: Option<String>,

        /// Get a configuration value
        #[arg(long)]
        get: Option<String>,

        /// Validate current configuration
        #[arg(long)]
        validate: bool,
    },
}

#[tokio::main]
async fn main() -> DelveResult<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;

    let logging_config = if cli.verbose {
        LoggingConfig::verbose()
    } else {
        config.logging.clone()
    };
    init_logging(&logging_config).map_err(|e| DelveError::Config {
        message: format!("Failed to initialize logging: {}", e),
        source: Some(e),
        context: ErrorContext::new("cli")
            .with_operation("init_logging")
            .with_suggestion("Check the [logging] section of your configuration"),
    })?;

    info!("Starting Delve CLI v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Research {
            topic,
            questions,
            max_iterations,
            model,
            provider,
            parallel,
            output,
            json,
            question_prompt,
            analysis_prompt,
            reflection_prompt,
            report_prompt,
        } => {
            let options = ResearchOptions {
                questions,
                max_iterations,
                model,
                provider,
                parallel,
                output,
                json,
                prompts: PromptConfig {
                    question: question_prompt,
                    analysis: analysis_prompt,
                    reflection: reflection_prompt,
                    report: report_prompt,
                },
            };
            handle_research(topic, options, config).await?;
        }
        Commands::Interactive => {
            log_operation_start!("interactive");
            interactive::run(config).await.map_err(|e| {
                e.log();
                e
            })?;
            log_operation_success!("interactive");
        }
        Commands::Config {
            show,
            init,
            set,
            get,
            validate,
        } => {
            handle_config(cli.config.as_deref(), show, init, set, get, validate)?;
        }
    }

    Ok(())
}

struct ResearchOptions {
    questions: Option<usize>,
    max_iterations: Option<usize>,
    model: Option<String>,
    provider: Option<String>,
    parallel: bool,
    output: Option<PathBuf>,
    json: bool,
    prompts: PromptConfig,
}

async fn handle_research(
    topic: String,
    options: ResearchOptions,
    mut config: DelveConfig,
) -> DelveResult<()> {
    log_operation_start!("research", topic = %topic);

    if let Some(provider) = options.provider {
        // A provider switch without an explicit model takes that provider's preset model
        if options.model.is_none() {
            if let Some(preset) = configs::for_provider(&provider) {
                config.llm.model = preset.model;
                if config.llm.base_url.is_none() {
                    config.llm.base_url = preset.base_url;
                }
            }
        }
        config.llm.provider = provider;
    }
    if let Some(model) = options.model {
        config.llm.model = model;
    }
    if let Some(count) = options.questions {
        config.research.sub_question_count = count;
    }
    if let Some(max_iterations) = options.max_iterations {
        config.research.max_iterations = max_iterations;
    }
    if options.parallel {
        config.research.parallel_retrieval = true;
    }
    for (slot, value) in [
        (&mut config.prompts.question, options.prompts.question),
        (&mut config.prompts.analysis, options.prompts.analysis),
        (&mut config.prompts.reflection, options.prompts.reflection),
        (&mut config.prompts.report, options.prompts.report),
    ] {
        if value.is_some() {
            *slot = value;
        }
    }

    let request = ResearchRequest::from_config(topic.clone(), &config.research)
        .with_prompts(ResearchPrompts::from_overrides(&config.prompts));

    if !options.json {
        display::display_configuration(
            &config.llm.model,
            request.sub_question_count,
            request.max_iterations,
            config.prompts.has_overrides(),
        );
    }

    let state = execute_research(&config, request, !options.json)
        .await
        .map_err(|e| {
            e.log();
            e
        })?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        display::display_results(&state);
    }

    if let Some(path) = options.output {
        let document = ReportDocument::from_state(
            &state,
            &config.llm.model,
            config.research.sub_question_count,
            config.research.max_iterations,
        );
        document.save(&path).map_err(into_delve_error)?;
        if !options.json {
            println!("✅ Report saved to {}", path.display());
        }
    }

    log_operation_success!(
        "research",
        iterations = state.iteration_count(),
        reflections = state.reflection_count()
    );
    Ok(())
}

/// Build clients from `config` and run one research loop
pub(crate) async fn execute_research(
    config: &DelveConfig,
    request: ResearchRequest,
    show_progress: bool,
) -> DelveResult<ResearchState> {
    config.validate()?;

    let llm = create_llm_client(&config.llm).await?;
    let search = create_search_provider(&config.search)?;
    let mut engine = ResearchEngine::from_config(llm, search, &config.research);

    let printer = if show_progress {
        let (tx, mut rx) = mpsc::unbounded_channel();
        engine.set_progress_channel(tx);
        Some(tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                display::print_progress(&event);
            }
        }))
    } else {
        None
    };

    let result = engine.run(request).await;

    // Dropping the engine closes the channel so the printer drains and exits
    drop(engine);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    result.map_err(into_delve_error)
}

fn into_delve_error(error: ResearchError) -> DelveError {
    match error {
        ResearchError::Core(inner) => inner,
        ResearchError::Io(inner) => DelveError::Io(inner),
        other => {
            let operation = other
                .stage()
                .map(|stage| stage.to_string())
                .unwrap_or_else(|| "run".to_string());
            DelveError::Internal {
                message: other.to_string(),
                context: ErrorContext::new("research").with_operation(&operation),
                source: Some(Box::new(other)),
            }
        }
    }
}

fn load_config(config_path: Option<&Path>) -> DelveResult<DelveConfig> {
    if let Some(path) = config_path {
        info!("Loading configuration from {:?}", path);
        return DelveConfig::from_file(path);
    }

    let default_paths = [
        dirs::config_dir().map(|d| d.join("delve").join("config.toml")),
        dirs::home_dir().map(|d| d.join(".delve").join("config.toml")),
        Some(PathBuf::from("delve.toml")),
    ];

    for path in default_paths.iter().flatten() {
        if path.exists() {
            info!("Loading configuration from {:?}", path);
            return DelveConfig::from_file(path);
        }
    }

    info!("No configuration file found, using defaults");
    Ok(DelveConfig::default())
}

/// Get the default configuration file path
fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|d| d.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("delve")
        .join("config.toml")
}

fn handle_config(
    config_path: Option<&Path>,
    show: bool,
    init: bool,
    set: Option<String>,
    get: Option<String>,
    validate: bool,
) -> DelveResult<()> {
    let target = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);

    if init {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        DelveConfig::default().save_to_file(&target)?;
        println!("✅ Configuration initialized at: {:?}", target);
        println!("📝 Edit the file to add your API keys and customize settings.");
    }

    if show {
        let mut config = load_config(config_path)?;
        if config.llm.api_key.is_some() {
            config.llm.api_key = Some("********".to_string());
        }
        let rendered = toml::to_string_pretty(&config).map_err(|e| {
            config_error!(format!("Failed to render configuration: {}", e), "config_show")
        })?;
        println!("📋 Current configuration:");
        println!("{}", rendered);
    }

    if validate {
        let config = load_config(config_path)?;
        match config.validate() {
            Ok(()) => println!("✅ Configuration is valid"),
            Err(e) => {
                println!("❌ Configuration validation failed: {}", e);
                return Err(e);
            }
        }
    }

    if let Some(key_value) = set {
        let Some((key, value)) = key_value.split_once('=') else {
            return Err(DelveError::Config {
                message: "Invalid format. Use key=value format".to_string(),
                source: None,
                context: ErrorContext::new("config_set")
                    .with_suggestion("Example: --set research.max_iterations=3"),
            });
        };
        let (key, value) = (key.trim(), value.trim());

        let mut config = if target.exists() {
            DelveConfig::from_file(&target)?
        } else {
            DelveConfig::default()
        };
        set_config_value(&mut config, key, value)?;
        config.validate()?;

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        config.save_to_file(&target)?;
        println!("✅ Set {} = {}", key, value);
    }

    if let Some(key) = get {
        let config = load_config(config_path)?;
        println!("{} = {}", key, get_config_value(&config, &key)?);
    }

    Ok(())
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> DelveResult<T> {
    value.parse().map_err(|_| DelveError::Config {
        message: format!("Invalid value for {}: {}", key, value),
        source: None,
        context: ErrorContext::new("config_set").with_metadata("key", key),
    })
}

fn optional(value: &str) -> Option<String> {
    match value {
        "" | "none" => None,
        other => Some(other.to_string()),
    }
}

fn unknown_key(key: &str) -> DelveError {
    DelveError::Config {
        message: format!("Unknown configuration key: {}", key),
        source: None,
        context: ErrorContext::new("config")
            .with_suggestion("Use --show to see available configuration keys"),
    }
}

/// Set a configuration value by dotted key
fn set_config_value(config: &mut DelveConfig, key: &str, value: &str) -> DelveResult<()> {
    let parts: Vec<&str> = key.split('.').collect();
    match parts.as_slice() {
        ["llm", "provider"] => config.llm.provider = value.to_string(),
        ["llm", "model"] => config.llm.model = value.to_string(),
        ["llm", "api_key"] => config.llm.api_key = optional(value),
        ["llm", "base_url"] => config.llm.base_url = optional(value),
        ["llm", "temperature"] => config.llm.temperature = parse_value(key, value)?,
        ["llm", "max_tokens"] => {
            config.llm.max_tokens = match optional(value) {
                Some(v) => Some(parse_value(key, &v)?),
                None => None,
            }
        }
        ["search", "provider"] => config.search.provider = value.to_string(),
        ["search", "max_results"] => config.search.max_results = parse_value(key, value)?,
        ["search", "timeout_secs"] => config.search.timeout_secs = parse_value(key, value)?,
        ["search", "user_agent"] => config.search.user_agent = value.to_string(),
        ["research", "sub_question_count"] => {
            config.research.sub_question_count = parse_value(key, value)?
        }
        ["research", "max_iterations"] => {
            config.research.max_iterations = parse_value(key, value)?
        }
        ["research", "parallel_retrieval"] => {
            config.research.parallel_retrieval = parse_value(key, value)?
        }
        ["research", "reflection_window"] => {
            config.research.reflection_window = parse_value(key, value)?
        }
        ["prompts", "question"] => config.prompts.question = optional(value),
        ["prompts", "analysis"] => config.prompts.analysis = optional(value),
        ["prompts", "reflection"] => config.prompts.reflection = optional(value),
        ["prompts", "report"] => config.prompts.report = optional(value),
        ["logging", "level"] => config.logging.level = value.to_string(),
        _ => return Err(unknown_key(key)),
    }
    Ok(())
}

/// Read a configuration value by dotted key
fn get_config_value(config: &DelveConfig, key: &str) -> DelveResult<String> {
    fn show(value: &Option<String>) -> String {
        value.clone().unwrap_or_else(|| "(unset)".to_string())
    }

    let parts: Vec<&str> = key.split('.').collect();
    let value = match parts.as_slice() {
        ["llm", "provider"] => config.llm.provider.clone(),
        ["llm", "model"] => config.llm.model.clone(),
        ["llm", "api_key"] => match config.llm.api_key {
            Some(_) => "********".to_string(),
            None => "(unset)".to_string(),
        },
        ["llm", "base_url"] => show(&config.llm.base_url),
        ["llm", "temperature"] => config.llm.temperature.to_string(),
        ["llm", "max_tokens"] => show(&config.llm.max_tokens.map(|t| t.to_string())),
        ["search", "provider"] => config.search.provider.clone(),
        ["search", "max_results"] => config.search.max_results.to_string(),
        ["search", "timeout_secs"] => config.search.timeout_secs.to_string(),
        ["search", "user_agent"] => config.search.user_agent.clone(),
        ["research", "sub_question_count"] => config.research.sub_question_count.to_string(),
        ["research", "max_iterations"] => config.research.max_iterations.to_string(),
        ["research", "parallel_retrieval"] => config.research.parallel_retrieval.to_string(),
        ["research", "reflection_window"] => config.research.reflection_window.to_string(),
        ["prompts", "question"] => show(&config.prompts.question),
        ["prompts", "analysis"] => show(&config.prompts.analysis),
        ["prompts", "reflection"] => show(&config.prompts.reflection),
        ["prompts", "report"] => show(&config.prompts.report),
        ["logging", "level"] => config.logging.level.clone(),
        _ => return Err(unknown_key(key)),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_research_flags() {
        let cli = Cli::try_parse_from([
            "delve",
            "research",
            "quantum error correction",
            "--questions",
            "4",
            "--max-iterations",
            "3",
            "--parallel",
            "--json",
            "--reflection-prompt",
            "Be harsh.",
        ])
        .unwrap();

        match cli.command {
            Commands::Research {
                topic,
                questions,
                max_iterations,
                parallel,
                json,
                reflection_prompt,
                ..
            } => {
                assert_eq!(topic, "quantum error correction");
                assert_eq!(questions, Some(4));
                assert_eq!(max_iterations, Some(3));
                assert!(parallel);
                assert!(json);
                assert_eq!(reflection_prompt.as_deref(), Some("Be harsh."));
            }
            _ => panic!("Expected research command"),
        }
    }

    #[test]
    fn test_set_and_get_config_values() {
        let mut config = DelveConfig::default();

        set_config_value(&mut config, "research.max_iterations", "4").unwrap();
        set_config_value(&mut config, "research.parallel_retrieval", "true").unwrap();
        set_config_value(&mut config, "llm.max_tokens", "1500").unwrap();
        set_config_value(&mut config, "prompts.report", "Short reports.").unwrap();

        assert_eq!(get_config_value(&config, "research.max_iterations").unwrap(), "4");
        assert_eq!(
            get_config_value(&config, "research.parallel_retrieval").unwrap(),
            "true"
        );
        assert_eq!(get_config_value(&config, "llm.max_tokens").unwrap(), "1500");
        assert_eq!(
            get_config_value(&config, "prompts.report").unwrap(),
            "Short reports."
        );

        set_config_value(&mut config, "llm.max_tokens", "none").unwrap();
        assert_eq!(get_config_value(&config, "llm.max_tokens").unwrap(), "(unset)");
    }

    #[test]
    fn test_config_value_errors() {
        let mut config = DelveConfig::default();
        assert!(set_config_value(&mut config, "research.max_iterations", "many").is_err());
        assert!(set_config_value(&mut config, "rag.top_k", "5").is_err());
        assert!(get_config_value(&config, "nope").is_err());
    }

    #[test]
    fn test_api_key_is_masked() {
        let mut config = DelveConfig::default();
        set_config_value(&mut config, "llm.api_key", "sk-secret").unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-secret"));
        assert_eq!(get_config_value(&config, "llm.api_key").unwrap(), "********");
    }

    #[test]
    fn test_research_errors_map_to_core_errors() {
        let io = ResearchError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(matches!(into_delve_error(io), DelveError::Io(_)));

        let inference = ResearchError::inference(
            delve_research::ResearchStage::Report,
            delve_core::llm_error!("quota", "openai", "gpt-4"),
        );
        match into_delve_error(inference) {
            DelveError::Internal { context, .. } => {
                assert_eq!(context.operation.as_deref(), Some("report"));
            }
            other => panic!("Expected Internal error, got {other}"),
        }
    }
}
