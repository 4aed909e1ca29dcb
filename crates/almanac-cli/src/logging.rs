//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber; `RUST_LOG` overrides the default level.
pub fn init(verbose: bool) {
    let default = if verbose { "almanac=debug" } else { "almanac=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
