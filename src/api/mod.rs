//! Remote API Module
//!
//! This module contains everything that talks to the commerce REST API:
//! - Wire models (cart lines, auth, checkout, error bodies)
//! - Backend traits the stores depend on
//! - The reqwest-based `ApiClient`

pub mod backend;
pub mod client;
pub mod models;

// Re-export commonly used types for convenience
pub use backend::{AuthBackend, CartBackend, CatalogBackend, CheckoutBackend};
pub use client::ApiClient;
