//! Logging for the gateway and the CLI client.
//!
//! Everything goes to stderr: `archtl timeline --json` and `archtl map` write
//! their payload to stdout and must stay machine-readable.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Targets that are chatty at debug level and only interesting when tracing.
const QUIET_DEPENDENCIES: &[&str] = &["hyper_util", "reqwest", "tower_http"];

/// How much to log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Info and above.
    #[default]
    Normal,
    /// Debug and above.
    Verbose,
    /// Everything, dependencies included.
    Trace,
}

impl Verbosity {
    /// Resolve `-v` repetitions and `-q`; quiet wins.
    #[must_use]
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// Level for this crate's own targets.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter directive used when `RUST_LOG` is unset.
    ///
    /// HTTP plumbing stays at `warn` unless tracing.
    #[must_use]
    pub fn default_directive(&self) -> String {
        let level = self.to_level_filter();
        let mut directive = format!("archive_timeline={level},archtl={level}");
        if *self != Self::Trace {
            for target in QUIET_DEPENDENCIES {
                directive.push_str(&format!(",{target}=warn"));
            }
        }
        directive
    }
}

/// Install the global subscriber.
///
/// Call once at startup. `RUST_LOG` takes precedence over `verbosity`.
///
/// # Examples
///
/// ```no_run
/// use archive_timeline::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(1, false));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.default_directive()));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity >= Verbosity::Verbose)
        .with_line_number(verbosity == Verbosity::Trace);

    // Already set in tests or by an embedding binary.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init();
}

/// Initialize logging for tests: warnings and errors, captured per test.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
