//! Shopping Cart Domain Module
//!
//! This module contains all shopping cart business logic, including:
//! - Domain models (CartLine, inputs, views)
//! - Business logic helpers (normalisation, selection, formatting)
//! - The server-authoritative `CartStore`
//! - REST API handlers

pub mod handlers;
pub mod helpers;
pub mod models;
pub mod state;

// Re-export commonly used types for convenience
pub use handlers::routes;
pub use models::CartLine;
pub use state::{CartAction, CartState, CartStore};
