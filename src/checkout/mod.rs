//! Checkout Module
//!
//! This module turns a selection of cart lines into an order:
//! - Request and snapshot models
//! - Totals, validation and order submission
//! - REST API handlers

pub mod handlers;
pub mod models;
pub mod order;

// Re-export commonly used types for convenience
pub use handlers::routes;
pub use models::{CheckoutInput, CheckoutReceipt, OrderSnapshot};
pub use order::{build_snapshot, submit_order, summarize};
