use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` when set and valid, otherwise `default_directives`.
pub fn env_filter(default_directives: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives))
}

/// Compact, target-less console output; progress lines read like plain prints.
pub fn init_cli_logger(default_directives: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_directives))
        .with(fmt::layer().with_target(false).without_time().compact())
        .init();
}
