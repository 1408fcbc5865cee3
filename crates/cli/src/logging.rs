// Logging setup
//
// Console output is pretty by default, JSON with JOBSIEVE_LOG_FORMAT=json.
// RUST_LOG takes precedence over the configured level.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FORMAT_ENV: &str = "JOBSIEVE_LOG_FORMAT";
const DEFAULT_LEVEL: &str = "info";

/// Directive used when RUST_LOG is not set
pub fn default_directive(level: Option<&str>) -> String {
    format!("jobsieve={}", level.unwrap_or(DEFAULT_LEVEL).trim().to_lowercase())
}

/// Install the global subscriber.
///
/// The returned guard flushes the log file on drop; keep it alive for the
/// whole run.
pub fn init(level: Option<&str>, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(level)))
        .context("Invalid log level")?;

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let directory = path.parent().unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Log file has no name: {}", path.display()))?;
            std::fs::create_dir_all(directory)
                .with_context(|| format!("Failed to create {}", directory.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let log_format = std::env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| "pretty".to_string());
    let registry = tracing_subscriber::registry().with(env_filter).with(file_layer);

    match log_format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        _ => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    }
    .context("Failed to install the log subscriber")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(None), "jobsieve=info");
        assert_eq!(default_directive(Some(" DEBUG ")), "jobsieve=debug");
    }

    #[test]
    fn test_directive_parses() {
        assert!(EnvFilter::try_new(default_directive(Some("warn"))).is_ok());
    }
}
