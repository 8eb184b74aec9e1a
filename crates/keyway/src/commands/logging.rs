//! Logging initialization.
//!
//! Logs are written to stderr so stdout only carries command output.

use tracing_subscriber::EnvFilter;

/// Initialize logging based on verbosity.
///
/// `RUST_LOG` takes precedence over the verbosity flag.
pub fn init_logging(verbose: bool) {
    let default = if verbose {
        "keyway=debug,keyway_auth=debug,keyway_store=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
