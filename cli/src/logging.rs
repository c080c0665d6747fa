// Logging for the CLI, powered by tracing-subscriber.
//
// The libraries log through the `log` facade; `tracing_log::LogTracer`
// routes those records into the subscriber installed here. Logs go to
// stderr so command output on stdout stays machine-readable.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::{CLIError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// `timestamp LEVEL target - message`
    Compact,
    /// JSON Lines
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" | "jsonl" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Base level plus quieter defaults for the HTTP and socket stacks.
pub fn build_env_filter(level: &str) -> Result<EnvFilter> {
    let mut directives = vec![level.to_lowercase()];

    let noisy: &[(&str, &str)] = &[
        ("hyper", "warn"),
        ("hyper_util", "warn"),
        ("reqwest", "warn"),
        ("rustls", "warn"),
        ("tungstenite", "warn"),
        ("tokio_tungstenite", "warn"),
    ];
    for (target, lvl) in noisy {
        directives.push(format!("{}={}", target, lvl));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str).map_err(|e| {
        CLIError::LoggingError(format!("Invalid tracing filter '{}': {}", filter_str, e))
    })
}

/// Install the global subscriber. `verbose` forces `debug`.
pub fn init_logging(level: &str, format: &str, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { level };
    let filter = build_env_filter(level)?;

    tracing_log::LogTracer::init().ok();

    let layer = match LogFormat::parse(format) {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(filter)
            .boxed(),
    };

    tracing::subscriber::set_global_default(tracing_subscriber::registry().with(layer))
        .map_err(|e| CLIError::LoggingError(e.to_string()))?;

    tracing::trace!("Logging initialized: level={}, format={}", level, format);
    Ok(())
}
