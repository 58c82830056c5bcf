//! Storefront Library
//!
//! Client-side commerce logic for a multi-tenant storefront: discount and
//! order pricing, a server-authoritative cart, customer sign-in, checkout,
//! and a small axum gateway that holds one session per browser.

// Domain modules
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod pricing;

// Remote API
pub mod api;

// Infrastructure
pub mod config;
pub mod error;
pub mod logging;
pub mod router;
pub mod state;

pub use error::{ErrorKind, Result, StorefrontError};
