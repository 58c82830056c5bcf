//! Customer Authentication Module
//!
//! This module contains the sign-in lifecycle for a browser session:
//! - Domain models (Customer, Credentials, AuthState, token storage)
//! - The `AuthSession` state machine
//! - REST API handlers for sign-in, sign-out and password recovery

pub mod handlers;
pub mod models;
pub mod session;

// Re-export commonly used types for convenience
pub use handlers::routes;
pub use models::{AuthState, Credentials, Customer, MemoryTokenStore, TokenStore};
pub use session::AuthSession;
