use tracing_subscriber::{fmt, EnvFilter};

/// Log to stderr so JSON reports on stdout stay clean. `RUST_LOG` overrides
/// the default `info` level.
pub fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
