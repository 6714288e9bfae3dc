//! Shared logging setup for the TabSurveyor binary.
//!
//! `RUST_LOG` takes precedence when set; otherwise the level is derived from
//! the command-line verbosity and the `DEBUG` configuration flag.

use tracing_subscriber::EnvFilter;

use crate::Result;

/// Resolves the log level from verbosity flags.
///
/// `quiet` wins over everything. The `debug` configuration flag raises the
/// default INFO level to DEBUG but never lowers an explicit `-vv`.
pub fn resolve_level(verbose: u8, quiet: bool, debug: bool) -> tracing::Level {
    match (quiet, verbose, debug) {
        (true, _, _) => tracing::Level::ERROR,
        (false, 0, false) => tracing::Level::INFO,
        (false, 0, true) | (false, 1, _) => tracing::Level::DEBUG,
        (false, _, _) => tracing::Level::TRACE,
    }
}

/// Initializes structured logging.
///
/// # Arguments
/// * `verbose` - Verbosity level (0=INFO, 1=DEBUG, 2+=TRACE)
/// * `quiet` - If true, only show ERROR level logs
/// * `debug` - The `DEBUG` flag from [`crate::config::AppConfig`]
///
/// # Example
/// ```rust,no_run
/// use tabsurveyor_core::logging::init_logging;
///
/// init_logging(1, false, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(verbose: u8, quiet: bool, debug: bool) -> Result<()> {
    let level = resolve_level(verbose, quiet, debug);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| {
            crate::error::TabSurveyorError::configuration(format!(
                "Failed to initialize logging: {}",
                e
            ))
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global subscriber can only be installed once per process, so only
    // the level resolution is exercised here.

    #[test]
    fn test_verbosity_levels() {
        let test_cases = [
            ((0, true, false), tracing::Level::ERROR),
            ((5, true, true), tracing::Level::ERROR),
            ((0, false, false), tracing::Level::INFO),
            ((1, false, false), tracing::Level::DEBUG),
            ((2, false, false), tracing::Level::TRACE),
            ((10, false, false), tracing::Level::TRACE),
        ];

        for ((verbose, quiet, debug), expected) in test_cases {
            assert_eq!(
                resolve_level(verbose, quiet, debug),
                expected,
                "Failed for verbose={}, quiet={}, debug={}",
                verbose,
                quiet,
                debug
            );
        }
    }

    #[test]
    fn test_debug_flag_raises_default_level() {
        assert_eq!(resolve_level(0, false, true), tracing::Level::DEBUG);
        assert_eq!(resolve_level(1, false, true), tracing::Level::DEBUG);
        assert_eq!(resolve_level(2, false, true), tracing::Level::TRACE);
    }
}
