//! Logging setup for the delve binaries
//!
//! Events go to stderr, or to a file, so stdout carries only the report.
//! `RUST_LOG` takes precedence over the configured level.

use serde::{Deserialize, Serialize};
use std::io;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// The `[logging]` section of the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
    /// Source file and line on every event
    pub include_location: bool,
    pub include_thread: bool,
    pub log_to_file: bool,
    /// Appended to, never truncated. Required when `log_to_file` is set.
    pub log_file_path: Option<String>,
    /// Emit a close event with the elapsed time for every span, one per research stage
    pub enable_performance_monitoring: bool,
    /// Extra directives such as `delve_research=debug`
    pub filter_directives: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
            include_location: false,
            include_thread: false,
            log_to_file: false,
            log_file_path: None,
            enable_performance_monitoring: false,
            filter_directives: Vec::new(),
        }
    }
}

impl LoggingConfig {
    /// What `--verbose` selects: debug output from every delve crate plus stage timings
    pub fn verbose() -> Self {
        Self {
            level: "info".to_string(),
            include_location: true,
            enable_performance_monitoring: true,
            filter_directives: ["delve", "delve_core", "delve_providers", "delve_research"]
                .iter()
                .map(|target| format!("{}=debug", target))
                .collect(),
            ..Self::default()
        }
    }

    fn filter(&self) -> Result<EnvFilter, Box<dyn std::error::Error + Send + Sync>> {
        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));
        for directive in &self.filter_directives {
            filter = filter.add_directive(directive.parse()?);
        }
        Ok(filter)
    }

    fn writer(&self) -> Result<BoxMakeWriter, Box<dyn std::error::Error + Send + Sync>> {
        if !self.log_to_file {
            return Ok(BoxMakeWriter::new(io::stderr));
        }
        let Some(log_path) = &self.log_file_path else {
            return Err("log_file_path must be specified when log_to_file is true".into());
        };
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;
        Ok(BoxMakeWriter::new(file))
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(
    config: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let span_events = if config.enable_performance_monitoring {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let base = fmt::layer()
        .with_span_events(span_events)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_thread_ids(config.include_thread)
        .with_thread_names(config.include_thread)
        .with_writer(config.writer()?);

    let output = match config.format {
        LogFormat::Json => base.json().boxed(),
        LogFormat::Pretty => base.pretty().boxed(),
        LogFormat::Compact => base.compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(config.filter()?)
        .with(output)
        .try_init()?;

    Ok(())
}

pub mod performance {
    use std::time::Instant;
    use tracing::{info_span, Instrument};

    /// Run `future` inside a span named after `stage` and log how long it took
    pub async fn measure_async<F, T>(stage: &str, future: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        let started = Instant::now();
        let result = future.instrument(info_span!("stage", stage)).await;

        tracing::debug!(
            target: "performance",
            stage,
            duration_ms = started.elapsed().as_millis() as u64,
            "Stage finished"
        );
        result
    }
}

/// Mark the start of a CLI command, with optional extra fields
#[macro_export]
macro_rules! log_operation_start {
    ($operation:expr $(, $($field:tt)*)?) => {
        $crate::tracing::info!(operation = $operation, $($($field)*,)? "Starting operation")
    };
}

#[macro_export]
macro_rules! log_operation_success {
    ($operation:expr $(, $($field:tt)*)?) => {
        $crate::tracing::info!(operation = $operation, $($($field)*,)? "Operation completed successfully")
    };
}
