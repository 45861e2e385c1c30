//! Logging initialization.
//!
//! Library code only emits `tracing` events; the binary installs the
//! subscriber once at startup.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the logging subsystem.
///
/// # Arguments
///
/// * `level` - Default level used when `RUST_LOG` is unset.
/// * `format` - Pretty output for terminals or JSON lines for collectors.
///
/// # Notes
///
/// - Log output goes to stderr (stdout is reserved for command output)
/// - Calling it a second time is a no-op
pub fn init(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let result = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .try_init(),
    };
    // Already initialized (tests, embedding applications).
    result.ok();
}

/// Initialize from the `[logging]` section. `verbose` forces at least
/// `debug`, `json_logs` forces JSON output.
pub fn init_from_config(config: &LoggingConfig, verbose: bool, json_logs: bool) {
    let level = effective_level(&config.level, verbose);
    let format = if json_logs {
        LogFormat::Json
    } else {
        config.format
    };
    init(level, format);
}

fn effective_level(configured: &str, verbose: bool) -> &str {
    match (verbose, configured) {
        (true, "trace") => "trace",
        (true, _) => "debug",
        (false, level) => level,
    }
}
