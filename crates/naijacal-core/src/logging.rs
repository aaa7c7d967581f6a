//! Tracing subscriber setup.
//!
//! Logs go to stderr so command output on stdout stays clean.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::Config;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "NAIJACAL_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Builds the filter: `NAIJACAL_LOG` > config `log_level` > `warn`.
pub fn build_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| {
            EnvFilter::try_new(
                config
                    .log_level
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or(DEFAULT_FILTER),
            )
        })
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. Safe to call more than once; later calls are no-ops.
pub fn init(config: &Config) {
    let _ = tracing_subscriber::registry()
        .with(build_filter(config))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
