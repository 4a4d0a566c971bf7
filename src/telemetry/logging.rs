//! Tracing subscriber setup for the turntable binary

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*, Layer, Registry};

pub use tracing_appender::non_blocking::WorkerGuard as LogGuard;

/// Environment variable holding the filter directives
pub const LOG_ENV: &str = "TURNTABLE_LOG";
/// Environment variable overriding the console format
pub const LOG_FORMAT_ENV: &str = "TURNTABLE_LOG_FORMAT";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Console output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Write events to stderr
    pub console: bool,
    pub format: LogFormat,
    /// Also append plain-text events to this file
    pub file: Option<PathBuf>,
    /// Filter used when neither `TURNTABLE_LOG` nor `RUST_LOG` is set
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console: true,
            format: LogFormat::Compact,
            file: None,
            default_filter: "warn,immersive_turntable=info".to_string(),
        }
    }
}

impl LogConfig {
    fn effective_format(&self) -> LogFormat {
        std::env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|name| LogFormat::from_name(&name))
            .unwrap_or(self.format)
    }
}

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Split a log path into the directory and file name the appender wants
fn file_parts(path: &Path) -> anyhow::Result<(PathBuf, PathBuf)> {
    let name = path
        .file_name()
        .with_context(|| format!("log path {} has no file name", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, PathBuf::from(name)))
}

/// Install the global subscriber.
///
/// Keep the returned guard alive until exit, otherwise buffered file
/// output is lost.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<Option<LogGuard>> {
    let format = config.effective_format();
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    if config.console {
        let console = fmt::layer().with_writer(std::io::stderr).with_target(true);
        layers.push(match format {
            LogFormat::Compact => console.compact().boxed(),
            LogFormat::Json => console.json().with_current_span(false).boxed(),
        });
    }

    if let Some(path) = &config.file {
        let (dir, name) = file_parts(path)?;
        std::fs::create_dir_all(&dir).with_context(|| format!("failed to create log directory {}", dir.display()))?;
        let (writer, file_guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
        guard = Some(file_guard);
        layers.push(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_line_number(true)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter(&config.default_filter))
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    tracing::debug!(
        target: "immersive_turntable",
        ?format,
        file = ?config.file,
        "Logging initialized"
    );
    Ok(guard)
}
