//! Gateway configuration

use std::time::Duration;

use clap::Parser;

/// Storefront gateway configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "storefront", about = "Storefront session gateway", long_about = None)]
pub struct StorefrontConfig {
    /// Server host address
    #[arg(short = 'H', long, env = "STOREFRONT_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Server port
    #[arg(short, long, env = "STOREFRONT_PORT", default_value = "8000")]
    pub port: u16,

    /// Base URL of the commerce REST API
    #[arg(long, env = "STOREFRONT_API_URL", default_value = "http://localhost:9000")]
    pub api_base_url: String,

    /// Flat delivery fee added to every order
    #[arg(long, env = "STOREFRONT_DELIVERY_FEE", default_value = "350")]
    pub delivery_fee: f64,

    /// Per-request timeout for API calls, in seconds
    #[arg(long, env = "STOREFRONT_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Seconds a session may sit unused before it is dropped
    #[arg(long, env = "STOREFRONT_SESSION_IDLE_SECS", default_value = "1800")]
    pub session_idle_secs: u64,

    /// Upper bound on live sessions
    #[arg(long, env = "STOREFRONT_MAX_SESSIONS", default_value = "10000")]
    pub max_sessions: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl StorefrontConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    /// Get the socket address for binding
    #[must_use]
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}
