//! Logging setup for the binary.
//!
//! Logs go to stderr; stdout carries the conversation.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::LogLevel;

/// Filter directive used when nothing else picks a level.
pub const DEFAULT_LEVEL: LogLevel = LogLevel::Warn;

/// Pick the filter directive.
///
/// `RUST_LOG` wins, then `--log-level`, then `DEBUG=true`, then
/// [`DEFAULT_LEVEL`].
pub fn resolve_filter(rust_log: Option<&str>, flag: Option<LogLevel>, debug_env: bool) -> String {
    if let Some(directives) = rust_log.map(str::trim).filter(|d| !d.is_empty()) {
        return directives.to_string();
    }
    let level = match flag {
        Some(level) => level,
        None if debug_env => LogLevel::Debug,
        None => DEFAULT_LEVEL,
    };
    level.as_filter_str().to_string()
}

/// Whether the environment asks for debug logging.
pub fn debug_requested(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim() == "true")
}

/// Install the global subscriber.
pub fn setup_logging(filter: &str, json: bool) {
    let filter = EnvFilter::try_new(filter)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL.as_filter_str()));
    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .init();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_rust_log_wins() {
        assert_eq!(
            resolve_filter(Some("rtchat_engine=trace"), Some(LogLevel::Error), true),
            "rtchat_engine=trace"
        );
    }

    #[test]
    fn test_flag_beats_debug_env() {
        assert_eq!(resolve_filter(None, Some(LogLevel::Info), true), "info");
        assert_eq!(resolve_filter(Some("  "), Some(LogLevel::Error), false), "error");
    }

    #[test]
    fn test_debug_env_then_default() {
        assert_eq!(resolve_filter(None, None, true), "debug");
        assert_eq!(resolve_filter(None, None, false), "warn");
    }

    #[test]
    fn test_debug_requested() {
        assert!(debug_requested(Some("true")));
        assert!(!debug_requested(Some("1")));
        assert!(!debug_requested(Some("TRUE")));
        assert!(!debug_requested(None));
    }
}
