use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Installs the global subscriber. The returned guard flushes pending sentry
/// events on drop and must be held for the lifetime of the process.
pub fn init(config: Option<&LoggingConfig>) -> Option<sentry::ClientInitGuard> {
    let default_level = config.map(|c| c.level.as_str()).unwrap_or("info");
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let guard = config.and_then(|c| c.sentry_dsn.as_deref()).map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(guard.is_some().then(|| sentry::integrations::tracing::layer()))
        .init();

    guard
}
