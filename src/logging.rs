//! Diagnostic tracing.
//!
//! Tracing is for debugging kommit itself and always goes to stderr. What the
//! user sees during a run (messages, prompts, results) is printed by
//! [`crate::ui::Reporter`] and is unaffected by the log filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding a tracing filter, checked before `RUST_LOG`.
pub const LOG_ENV_VAR: &str = "KOMMIT_LOG";

/// Build the filter from `KOMMIT_LOG`, then `RUST_LOG`, defaulting to `warn`.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Initialize the tracing subscriber.
///
/// # Example
/// ```bash
/// KOMMIT_LOG=kommit=debug kommit --dry-run
/// ```
pub fn init() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_defaults_to_warn() {
        temp_env::with_vars_unset([LOG_ENV_VAR, "RUST_LOG"], || {
            assert_eq!(env_filter().to_string(), "warn");
        });
    }

    #[test]
    fn test_env_filter_prefers_kommit_log() {
        temp_env::with_vars(
            [(LOG_ENV_VAR, Some("debug")), ("RUST_LOG", Some("error"))],
            || {
                assert_eq!(env_filter().to_string(), "debug");
            },
        );
    }

    #[test]
    fn test_env_filter_falls_back_to_rust_log() {
        temp_env::with_vars([(LOG_ENV_VAR, None), ("RUST_LOG", Some("info"))], || {
            assert_eq!(env_filter().to_string(), "info");
        });
    }
}
