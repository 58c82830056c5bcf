//! Order placement.
//!
//! Builds the order from the selected cart lines, submits it once, and then
//! defers to the server: the cart is re-fetched rather than edited locally.

use tracing::{info, warn};

use super::models::{CheckoutInput, CheckoutReceipt, OrderSnapshot};
use crate::api::models::{OrderLineRequest, PlaceOrderRequest};
use crate::api::CheckoutBackend;
use crate::auth::Credentials;
use crate::cart::helpers::{format_item_summary, select_lines};
use crate::cart::{CartLine, CartStore};
use crate::error::{Result, StorefrontError};
use crate::pricing::{compute_order_totals, OrderTotals};

/// Totals for the selected lines of a cart.
///
/// # Errors
///
/// Returns a validation error for an empty selection or an unknown line.
pub fn summarize(items: &[CartLine], variation_ids: &[String], delivery_fee: f64) -> Result<OrderTotals> {
    let selected = select_lines(items, variation_ids)?;

    Ok(compute_order_totals(&selected, delivery_fee))
}

/// Validates a checkout request against the cart and prices it.
///
/// # Errors
///
/// Returns a validation error when the selection is empty or stale, or when
/// the address or payment method is missing.
pub fn build_snapshot(items: &[CartLine], input: &CheckoutInput, delivery_fee: f64) -> Result<OrderSnapshot> {
    let selected = select_lines(items, &input.variation_ids)?;
    let address_id = required(input.address_id.as_deref(), "Choose a delivery address")?;
    let payment_method = required(input.payment_method.as_deref(), "Choose a payment method")?;

    Ok(OrderSnapshot {
        totals: compute_order_totals(&selected, delivery_fee),
        lines: selected.into_iter().cloned().collect(),
        address_id,
        payment_method,
    })
}

/// Converts a snapshot into the API's order body.
pub fn order_request(customer_id: &str, snapshot: &OrderSnapshot) -> PlaceOrderRequest {
    PlaceOrderRequest {
        customer_id: customer_id.to_string(),
        items: snapshot
            .lines
            .iter()
            .map(|line| OrderLineRequest {
                variation_id: line.variation_id.clone(),
                qty: line.quantity,
                unit_price: line.unit_price,
            })
            .collect(),
        address_id: snapshot.address_id.clone(),
        payment_method: snapshot.payment_method.clone(),
        subtotal: snapshot.totals.subtotal,
        total_discount: snapshot.totals.total_discount,
        delivery_fee: snapshot.totals.delivery_fee,
        total: snapshot.totals.grand_total,
    }
}

/// Places an order for the selected lines of `cart`.
///
/// After the API accepts the order the cart is re-fetched; a failure there is
/// logged but does not undo the placed order.
///
/// # Errors
///
/// Returns validation errors from [`build_snapshot`] or the API's error.
pub async fn submit_order(
    backend: &dyn CheckoutBackend,
    cart: &CartStore,
    credentials: &Credentials,
    input: &CheckoutInput,
    delivery_fee: f64,
) -> Result<CheckoutReceipt> {
    let snapshot = build_snapshot(&cart.items(), input, delivery_fee)?;
    let request = order_request(&credentials.customer_id, &snapshot);

    let confirmation = backend.place_order(credentials, &request).await?;
    info!(
        customer_id = %credentials.customer_id,
        order_id = %confirmation.order_id,
        items = %format_item_summary(&snapshot.lines),
        total = snapshot.totals.grand_total,
        "order placed"
    );

    if let Err(error) = cart.fetch(credentials).await {
        warn!(%error, "cart refresh after checkout failed");
    }

    Ok(CheckoutReceipt {
        order_id: confirmation.order_id,
        message: confirmation.message,
        totals: snapshot.totals,
    })
}

fn required(value: Option<&str>, message: &str) -> Result<String> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(StorefrontError::Validation(message.into())),
    }
}
