//! Shopping Cart Domain Models
//!
//! This module contains the normalised cart line the storefront works with,
//! built from the cart API's raw line items.

use serde::{Deserialize, Serialize};

use crate::api::models::ServerCartItem;
use crate::pricing::models::Amount;
use crate::pricing::PricedLine;

// =============================================================================
// Cart Domain Models
// =============================================================================

/// Returns the default quantity (1) for add-to-cart requests
fn default_quantity() -> u32 {
    1
}

/// One variation in the customer's cart, as last reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub variation_id: String,
    pub product_id: String,
    pub name: String,
    pub image: Option<String>,
    pub colour: Option<String>,
    pub size: Option<String>,

    /// Price actually charged per unit (`NetAmount / CartQty`).
    pub unit_price: f64,

    /// Selling price before line discounts.
    pub original_price: f64,

    pub market_price: Option<f64>,
    pub quantity: u32,
    pub available_stock: u32,
    pub discount_amount: f64,
    pub net_amount: f64,
}

impl From<ServerCartItem> for CartLine {
    fn from(item: ServerCartItem) -> Self {
        let quantity = item.cart_qty;
        let selling_price = item.selling_price.as_ref().map(Amount::value);

        let unit_price = match item.net_amount.as_ref().map(Amount::value) {
            Some(net) if quantity > 0 => net / f64::from(quantity),
            _ => selling_price.unwrap_or(0.0),
        };
        let original_price = selling_price.unwrap_or(unit_price);

        let net_amount = item
            .net_amount
            .as_ref()
            .map_or(unit_price * f64::from(quantity), Amount::value);

        let discount_amount = match item.discount_amount.as_ref() {
            Some(amount) => amount.value(),
            None => ((original_price - unit_price) * f64::from(quantity)).max(0.0),
        };

        Self {
            variation_id: item.variation_id,
            product_id: item.product_id,
            name: item.name,
            image: item.image,
            colour: item.colour,
            size: item.size,
            unit_price,
            original_price,
            market_price: item.market_price.as_ref().map(Amount::value),
            quantity,
            available_stock: item.available_stock,
            discount_amount,
            net_amount,
        }
    }
}

impl PricedLine for CartLine {
    fn line_id(&self) -> &str {
        &self.variation_id
    }

    fn unit_price(&self) -> f64 {
        self.unit_price
    }

    fn market_price(&self) -> Option<f64> {
        self.market_price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

// =============================================================================
// Gateway Inputs and Views
// =============================================================================

/// Body for `POST /cart/items`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartInput {
    /// Variation to add
    pub variation_id: String,

    /// Units to add (defaults to 1)
    #[serde(default = "default_quantity")]
    pub qty: u32,
}

/// Body for `PUT /cart/items/:variation_id`
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityInput {
    /// Requested quantity; values below 1 are ignored
    pub qty: i64,
}

/// Cart contents plus totals over every line
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub totals: crate::pricing::OrderTotals,
    pub summary: String,
}
