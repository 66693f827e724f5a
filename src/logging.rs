//! Logging setup for the `share-ext` binary
//!
//! Log lines go to stderr through `tracing-subscriber`, so `--json` output
//! on stdout stays machine readable. `RUST_LOG` wins over everything else.

use std::env;
use std::sync::Once;

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the default log level
pub const LOG_LEVEL_ENV: &str = "SHARE_EXT_LOG_LEVEL";

static INIT: Once = Once::new();

/// How chatty the hook should be
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Explicit level name, e.g. from `--log-level`
    pub level: Option<String>,
    pub verbose: bool,
    pub quiet: bool,
}

impl LoggingConfig {
    /// Pick the level: explicit, then verbose/quiet, then the environment
    pub fn resolve_level(&self) -> Level {
        if let Some(level) = &self.level {
            parse_level(level)
        } else if self.verbose {
            Level::DEBUG
        } else if self.quiet {
            Level::ERROR
        } else {
            let level = env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "info".to_string());
            parse_level(&level)
        }
    }
}

/// Install the global subscriber. Later calls do nothing.
pub fn init_logging(config: &LoggingConfig) {
    INIT.call_once(|| {
        let level = config.resolve_level();

        let filter = if env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(format!("share_ext_hook={},share_ext={}", level, level))
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    });
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level
            );
            Level::INFO
        }
    }
}
