//! Diagnostic tracing for the retrier.
//!
//! All diagnostics go to stderr so the mirrored test-runner output on stdout
//! stays machine-consumable.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the CLI verbosity count picks the
/// level (0 = info, 1 = debug, 2+ = trace). Output: stderr, compact format.
pub fn init(verbosity: u8) {
    let default = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
