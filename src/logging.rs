//! Structured logging setup.
//!
//! Installs a `tracing` subscriber that writes to stderr:
//! - `RUST_LOG` takes precedence over the CLI verbosity flags
//! - JSON lines when `RUST_LOG_FORMAT=json`, human-readable otherwise

use tracing_subscriber::EnvFilter;

/// Maps `-q` / `-v` flags to a default filter directive.
///
/// Quiet wins over verbose. Dependencies stay at `warn` unless `RUST_LOG`
/// says otherwise.
pub fn default_directive(quiet: bool, verbose: u8) -> String {
    let level = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    format!("warn,chunkflow={level}")
}

fn json_requested() -> bool {
    std::env::var("RUST_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"))
}

/// Initialize the global tracing subscriber.
///
/// Returns `false` when a subscriber was already installed; later calls
/// leave the first one in place.
pub fn init(quiet: bool, verbose: u8) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(quiet, verbose)));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(verbose > 0);

    if json_requested() {
        subscriber.json().try_init().is_ok()
    } else {
        subscriber.try_init().is_ok()
    }
}
