use tracing_subscriber::{
    EnvFilter, fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

/// Installs the global subscriber. A set `RUST_LOG` replaces the default
/// filter entirely, in either direction.
pub fn init_logging(verbose: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(build_filter(rust_log.as_deref(), verbose))
        .init();
}

/// Uses `directives` when given, else `cotacao` at info (debug if verbose)
/// and warn for everything else.
fn build_filter(directives: Option<&str>, verbose: bool) -> EnvFilter {
    match directives {
        Some(directives) => EnvFilter::new(directives),
        None => {
            let level = if verbose { "debug" } else { "info" };
            EnvFilter::new(format!("warn,cotacao={level}"))
        }
    }
}
