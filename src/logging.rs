//! Tracing subscriber setup.

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LoggingSection};

pub const LOG_ENV: &str = "CIVIC_LOG";
pub const LOG_FORMAT_ENV: &str = "CIVIC_LOG_FORMAT";

/// Pick the filter directives: `-v` beats `CIVIC_LOG`, which beats the config.
fn filter_directives(logging: &LoggingSection, verbose: bool, env: Option<String>) -> String {
    if verbose {
        return "civic_hero=debug,tower_http=debug,info".to_string();
    }
    env.filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| logging.filter.clone())
}

fn resolve_format(logging: &LoggingSection, env: Option<String>) -> LogFormat {
    env.and_then(|v| v.parse().ok())
        .unwrap_or_else(|| logging.log_format())
}

/// Install the global subscriber. Logs go to stderr so `list` output stays clean.
pub fn init_tracing(logging: &LoggingSection, verbose: bool) -> Result<()> {
    let directives = filter_directives(logging, verbose, std::env::var(LOG_ENV).ok());
    let filter = EnvFilter::try_new(&directives)
        .or_else(|_| EnvFilter::try_new(&logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("civic_hero=info,warn"));

    let registry = tracing_subscriber::registry().with(filter);

    let result = match resolve_format(logging, std::env::var(LOG_FORMAT_ENV).ok()) {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {e}"))
}
