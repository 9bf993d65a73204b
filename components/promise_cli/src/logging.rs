//! Log output for the binary.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Filter directive for a `-v` count.
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

/// Installs the stderr subscriber. `RUST_LOG` wins over `verbosity`.
///
/// Does nothing if a global subscriber is already set.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time(),
        )
        .try_init();
}
