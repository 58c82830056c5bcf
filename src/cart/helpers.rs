//! Shopping Cart Business Logic Helpers
//!
//! This module contains helper functions for cart normalisation, selection
//! and formatting.

use super::models::CartLine;
use crate::api::models::ServerCartItem;
use crate::error::{Result, StorefrontError};

/// Converts the server's line items into cart lines, keeping server order.
pub fn normalize_cart(items: Vec<ServerCartItem>) -> Vec<CartLine> {
    items.into_iter().map(CartLine::from).collect()
}

/// Picks the lines named in `variation_ids`, in cart order.
///
/// # Errors
///
/// Returns a validation error when nothing is selected or when an id is not
/// in the cart.
pub fn select_lines<'a>(items: &'a [CartLine], variation_ids: &[String]) -> Result<Vec<&'a CartLine>> {
    if variation_ids.is_empty() {
        return Err(StorefrontError::Validation(
            "Select at least one item to check out".into(),
        ));
    }

    if let Some(missing) = variation_ids
        .iter()
        .find(|id| !items.iter().any(|line| &line.variation_id == *id))
    {
        return Err(StorefrontError::Validation(format!(
            "Item {missing} is no longer in your cart"
        )));
    }

    Ok(items
        .iter()
        .filter(|line| variation_ids.contains(&line.variation_id))
        .collect())
}

/// Appends the available-stock hint to a server error, when it carries one.
pub fn with_stock_hint(error: StorefrontError) -> StorefrontError {
    match error {
        StorefrontError::Server {
            status,
            message,
            available_quantity: Some(available),
        } => StorefrontError::Server {
            status,
            message: format!("{message} (available: {available})"),
            available_quantity: Some(available),
        },
        other => other,
    }
}

/// Produces a human-readable one-line summary for a list of cart lines.
///
/// Example output: `"2x Linen Shirt, 1x Batik Sarong"`.
pub fn format_item_summary(items: &[CartLine]) -> String {
    items
        .iter()
        .map(|line| format!("{}x {}", line.quantity, line.name))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(variation_id: &str, name: &str, quantity: u32) -> CartLine {
        CartLine {
            variation_id: variation_id.into(),
            product_id: "P1".into(),
            name: name.into(),
            image: None,
            colour: None,
            size: None,
            unit_price: 100.0,
            original_price: 100.0,
            market_price: None,
            quantity,
            available_stock: 10,
            discount_amount: 0.0,
            net_amount: 100.0 * f64::from(quantity),
        }
    }

    #[test]
    fn summary_lists_quantities_and_names() {
        let items = [line("V1", "Linen Shirt", 2), line("V2", "Batik Sarong", 1)];

        assert_eq!(format_item_summary(&items), "2x Linen Shirt, 1x Batik Sarong");
        assert_eq!(format_item_summary(&[]), "");
    }

    #[test]
    fn selection_keeps_cart_order() {
        let items = [line("V1", "A", 1), line("V2", "B", 1), line("V3", "C", 1)];

        let selected = select_lines(&items, &["V3".into(), "V1".into()]);

        let ids: Vec<_> = selected
            .unwrap_or_default()
            .iter()
            .map(|line| line.variation_id.clone())
            .collect();
        assert_eq!(ids, ["V1", "V3"]);
    }

    #[test]
    fn selection_rejects_empty_and_unknown_ids() {
        let items = [line("V1", "A", 1)];

        assert!(matches!(select_lines(&items, &[]), Err(StorefrontError::Validation(_))));
        assert!(matches!(
            select_lines(&items, &["V9".into()]),
            Err(StorefrontError::Validation(_))
        ));
    }

    #[test]
    fn stock_hint_is_appended_only_when_present() {
        let hinted = with_stock_hint(StorefrontError::Server {
            status: 400,
            message: "Requested quantity not available".into(),
            available_quantity: Some(2),
        });
        let plain = with_stock_hint(StorefrontError::server(500, "boom"));

        assert_eq!(hinted.to_string(), "Requested quantity not available (available: 2)");
        assert_eq!(plain.to_string(), "boom");
    }
}
