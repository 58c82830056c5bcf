use std::process;
use std::sync::Arc;

use storefront_rust::api::ApiClient;
use storefront_rust::config::StorefrontConfig;
use storefront_rust::router::create_app_router;
use storefront_rust::state::{spawn_session_sweeper, AppState, Backends};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load configuration from .env and CLI arguments
    let config = StorefrontConfig::load().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        process::exit(1);
    });

    // Initialize logging
    if let Err(e) = storefront_rust::logging::init(&config) {
        eprintln!("Logging error: {e}");
        process::exit(1);
    }

    let client = match ApiClient::with_timeout(&config.api_base_url, config.request_timeout()) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build API client: {e}");
            process::exit(1);
        }
    };
    info!(api = %client.base_url(), delivery_fee = config.delivery_fee, "using commerce API");

    // Initialize application state
    let state = Arc::new(
        AppState::new(Backends::from_client(client), config.delivery_fee)
            .with_session_limits(config.session_idle_timeout(), config.max_sessions),
    );
    spawn_session_sweeper(state.clone(), config.session_idle_timeout() / 2);

    // Build application router with all routes and middleware
    let app = create_app_router(state);

    let addr = config.socket_addr();
    info!("Starting server on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {addr}: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {e}");
        process::exit(1);
    }
}
