pub mod config;
pub mod constants;
pub mod error;
pub mod logs_fmt;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the library's tracing setup. Call once from the app shell.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_timer(logs_fmt::UptimeSeconds),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lenspass=debug".into()),
        )
        .init();
}
