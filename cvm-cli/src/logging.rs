//! Tracing subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

/// Default log level when `RUST_LOG` is unset.
pub fn default_level(debug: bool, trace_timing: bool) -> &'static str {
    if debug {
        "debug"
    } else if trace_timing {
        "info"
    } else {
        "warn"
    }
}

/// Install a stderr subscriber. `RUST_LOG` takes precedence over
/// `default`.
pub fn init(default: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
