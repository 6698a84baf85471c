//! Structured logging for the binding pipeline.
//!
//! Binders, value providers and formatters emit `tracing` events with
//! structured fields (`model_name`, `model_type`, `binder`, `formatter`,
//! `content_type`). This module re-exports the macros used internally and
//! offers a small subscriber setup for applications and tests.
//!
//! # Examples
//!
//! ```no_run
//! use trellis_core::logging::*;
//!
//! let _guard = LogConfig::new()
//!     .level(LogLevel::Debug)
//!     .format(LogFormat::Compact)
//!     .init();
//!
//! debug!(model_name = "order", "binding started");
//! ```

use std::io;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, trace, warn};

/// Minimum level of events that are recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Output format for log events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Machine-readable JSON lines (default)
    Json,
    /// Single-line human-readable text
    Plain,
    /// Multi-line, indented output for development
    Pretty,
    /// Terse single-line output
    Compact,
}

/// Destination for log events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// Append to a single file
    File(String),
    /// Daily rotated files in `directory`, named with `prefix`
    DailyFile { directory: String, prefix: String },
}

/// Subscriber configuration.
///
/// The filter defaults to `info` for every target unless `RUST_LOG` is set or
/// an explicit directive is given with [`LogConfig::with_env_filter`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    pub targets: bool,
    pub thread_ids: bool,
    pub file_line: bool,
    pub colors: bool,
    pub env_filter: Option<String>,
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_targets(mut self, enable: bool) -> Self {
        self.targets = enable;
        self
    }

    pub fn with_thread_ids(mut self, enable: bool) -> Self {
        self.thread_ids = enable;
        self
    }

    pub fn with_file_line(mut self, enable: bool) -> Self {
        self.file_line = enable;
        self
    }

    pub fn with_colors(mut self, enable: bool) -> Self {
        self.colors = enable;
        self
    }

    /// Use a custom filter directive such as `"trellis_core=trace,info"`
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Compact stderr output with binder decisions at trace level,
    /// everything else at `info`
    pub fn binding_diagnostics() -> Self {
        Self::new()
            .format(LogFormat::Compact)
            .output(LogOutput::Stderr)
            .with_env_filter(
                "trellis_core::binding=trace,trellis_core::value_provider=trace,\
                 trellis_core::negotiation=debug,trellis_core::formatters=debug,info",
            )
    }

    fn build_filter(&self) -> EnvFilter {
        match &self.env_filter {
            Some(directive) => {
                EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
            }
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.level.as_str())),
        }
    }

    /// Install the global subscriber.
    ///
    /// Returns the writer guard; keep it alive for the lifetime of the
    /// program so buffered events are flushed. Returns an error when the log
    /// file cannot be opened or a global subscriber is already installed.
    pub fn init(self) -> crate::Result<WorkerGuard> {
        let (writer, guard) = match &self.output {
            LogOutput::Stdout => tracing_appender::non_blocking(io::stdout()),
            LogOutput::Stderr => tracing_appender::non_blocking(io::stderr()),
            LogOutput::File(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                tracing_appender::non_blocking(file)
            }
            LogOutput::DailyFile { directory, prefix } => {
                tracing_appender::non_blocking(tracing_appender::rolling::daily(directory, prefix))
            }
        };

        let base = fmt::layer()
            .with_writer(writer)
            .with_target(self.targets)
            .with_thread_ids(self.thread_ids)
            .with_file(self.file_line)
            .with_line_number(self.file_line);

        let layer = match self.format {
            LogFormat::Json => base.json().boxed(),
            LogFormat::Plain => base.with_ansi(self.colors).boxed(),
            LogFormat::Pretty => base.pretty().with_ansi(self.colors).boxed(),
            LogFormat::Compact => base.compact().with_ansi(self.colors).boxed(),
        };

        tracing_subscriber::registry()
            .with(self.build_filter())
            .with(layer)
            .try_init()
            .map_err(|e| crate::Error::Config(format!("Failed to install subscriber: {}", e)))?;

        Ok(guard)
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            output: LogOutput::Stdout,
            targets: true,
            thread_ids: false,
            file_line: false,
            colors: false,
            env_filter: None,
        }
    }
}
