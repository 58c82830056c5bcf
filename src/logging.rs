//! Logging subscriber initialisation.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter};

use crate::config::StorefrontConfig;

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns an error if a subscriber is already installed.
pub fn init(config: &StorefrontConfig) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(true),
        )
        .with(build_env_filter(config))
        .try_init()
}

fn build_env_filter(config: &StorefrontConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},hyper=warn,reqwest=warn,tower_http=warn",
            config.log_level
        ))
    })
}
