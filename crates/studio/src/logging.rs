// tracing-subscriber setup shared by Storyloom binaries.

use tracing_subscriber::EnvFilter;

/// Filter directives are read from this variable first, then `RUST_LOG`.
pub const LOG_ENV: &str = "STORYLOOM_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";
const VERBOSE_DIRECTIVE: &str = "debug";

/// `verbose` forces debug output; otherwise `STORYLOOM_LOG`, then
/// `RUST_LOG`, then warnings only.
pub fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new(VERBOSE_DIRECTIVE);
    }
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber, writing to stderr. A second call is a no-op.
pub fn init(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .try_init();
}
