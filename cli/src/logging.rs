use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive, e.g. `mergeblock=trace`.
pub const LOG_ENV: &str = "MERGEBLOCK_LOG";

/// Install a stderr subscriber. `MERGEBLOCK_LOG` wins over `--verbose`.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
