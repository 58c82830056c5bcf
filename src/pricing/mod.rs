//! Pricing Domain Module
//!
//! This module contains every price computation the storefront performs:
//! - Catalog and discount models
//! - Tolerant price parsing and display formatting
//! - Discount aggregation for a single product
//! - Order totals for a checkout selection
//! - REST API handler for the product pricing view

pub mod discount;
pub mod handlers;
pub mod helpers;
pub mod models;
pub mod order;

// Re-export commonly used types and functions
pub use discount::{discount_amount, discount_percentage, discounted_price, total_discount};
pub use handlers::routes;
pub use helpers::{format_price, parse_price};
pub use models::{Amount, DiscountInfo, OrderTotals, Product};
pub use order::{compute_order_totals, CheckoutLine, PricedLine};
