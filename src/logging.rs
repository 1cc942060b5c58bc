// Logging setup.
//
// Reports go to stdout, so diagnostics are written to stderr. The level is
// taken from `RUST_LOG` and defaults to `warn`.
use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global subscriber for the CLI.
///
/// `verbose` raises the default level to `debug` when `RUST_LOG` is unset,
/// which also prints every rejected row.
pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// Subscriber for unit tests; safe to call from every test.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
