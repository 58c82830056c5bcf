//! Checkout Models

use serde::{Deserialize, Serialize};

use crate::cart::CartLine;
use crate::pricing::OrderTotals;

/// Body for `POST /checkout/summary`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryInput {
    /// Cart lines to price
    pub variation_ids: Vec<String>,
}

/// Body for `POST /checkout`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutInput {
    /// Cart lines to order
    pub variation_ids: Vec<String>,

    /// Saved delivery address
    #[serde(default)]
    pub address_id: Option<String>,

    /// Payment option chosen by the customer
    #[serde(default)]
    pub payment_method: Option<String>,
}

/// Page-local view of an order about to be placed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
    pub lines: Vec<CartLine>,
    pub totals: OrderTotals,
    pub address_id: String,
    pub payment_method: String,
}

/// Returned once the API accepts an order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    pub order_id: String,
    pub message: Option<String>,
    pub totals: OrderTotals,
}
