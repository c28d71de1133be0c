//! Author: [Seclususs](https://github.com/seclususs)

use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber; `log` records are bridged into it.
/// `RUST_LOG` wins over `level`. Repeated calls are ignored.
pub fn init(level: Option<&str>) {
    let fallback = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.unwrap_or(fallback)))
        .unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
