//! Remote API Wire Models
//!
//! Request and response bodies exchanged with the commerce REST API. Field
//! names follow the API (`Variation_ID`, `CartQty`, `NetAmount`, ...) with
//! camelCase aliases accepted on the way in.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::models::Customer;
use crate::pricing::helpers::{deserialize_count, deserialize_id, to_count};
use crate::pricing::models::{Amount, Product};

// =============================================================================
// Cart
// =============================================================================

/// A cart line exactly as the cart API returns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerCartItem {
    #[serde(rename = "Variation_ID", alias = "variationId", deserialize_with = "deserialize_id")]
    pub variation_id: String,

    #[serde(rename = "Product_ID", alias = "productId", default, deserialize_with = "deserialize_id")]
    pub product_id: String,

    #[serde(rename = "Description", alias = "description", alias = "productName", alias = "name", default)]
    pub name: String,

    #[serde(rename = "Image", alias = "image", alias = "imageUrl", default)]
    pub image: Option<String>,

    #[serde(rename = "Colour", alias = "colour", alias = "color", default)]
    pub colour: Option<String>,

    #[serde(rename = "Size", alias = "size", default)]
    pub size: Option<String>,

    #[serde(rename = "CartQty", alias = "cartQty", alias = "quantity", default, deserialize_with = "deserialize_count")]
    pub cart_qty: u32,

    #[serde(rename = "NetAmount", alias = "netAmount", default)]
    pub net_amount: Option<Amount>,

    #[serde(rename = "Selling_Price", alias = "sellingPrice", default)]
    pub selling_price: Option<Amount>,

    #[serde(rename = "Market_Price", alias = "marketPrice", default)]
    pub market_price: Option<Amount>,

    #[serde(rename = "Discount_Amount", alias = "discountAmount", default)]
    pub discount_amount: Option<Amount>,

    #[serde(rename = "Qty", alias = "availableQty", alias = "stock", default, deserialize_with = "deserialize_count")]
    pub available_stock: u32,
}

/// Shapes the cart API uses when it returns the cart.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CartPayload {
    Wrapped {
        #[serde(rename = "cartItems", alias = "items", alias = "cart")]
        cart_items: Vec<ServerCartItem>,
    },
    Bare(Vec<ServerCartItem>),
}

/// Extracts cart lines from a response body, if it carries them.
pub fn cart_items_from(body: Value) -> Option<Vec<ServerCartItem>> {
    match serde_json::from_value(body).ok()? {
        CartPayload::Wrapped { cart_items } | CartPayload::Bare(cart_items) => Some(cart_items),
    }
}

/// Body for `POST /api/carts/add` and `PUT /api/carts/update`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest<'a> {
    pub customer_id: &'a str,
    pub variation_id: &'a str,
    pub qty: u32,
}

/// Body for `DELETE /api/carts/remove`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemRequest<'a> {
    pub customer_id: &'a str,
    pub variation_id: &'a str,
}

/// Body for `DELETE /api/carts/clear`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearCartRequest<'a> {
    pub customer_id: &'a str,
}

// =============================================================================
// Checkout
// =============================================================================

/// One ordered line in a checkout submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub variation_id: String,
    pub qty: u32,
    pub unit_price: f64,
}

/// Body for `POST /api/carts/checkout`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub customer_id: String,
    pub items: Vec<OrderLineRequest>,
    pub address_id: String,
    pub payment_method: String,
    pub subtotal: f64,
    pub total_discount: f64,
    pub delivery_fee: f64,
    pub total: f64,
}

/// The API's acknowledgement of a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    #[serde(alias = "Order_ID", alias = "id", default, deserialize_with = "deserialize_id")]
    pub order_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Auth
// =============================================================================

/// Body for `POST /api/auth/customers/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body for `POST /api/auth/customers/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Token and profile returned by login and registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(alias = "user", alias = "customer")]
    pub customer: Customer,
}

/// Profile lookups come back bare or wrapped.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CustomerPayload {
    Wrapped {
        #[serde(alias = "user")]
        customer: Customer,
    },
    Bare(Customer),
}

impl CustomerPayload {
    pub(crate) fn into_customer(self) -> Customer {
        match self {
            Self::Wrapped { customer } | Self::Bare(customer) => customer,
        }
    }
}

/// Body for the password-recovery endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetRequest {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
}

/// Generic acknowledgement carrying a human-readable message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Catalog
// =============================================================================

/// Product lookups come back bare or wrapped.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProductPayload {
    Wrapped { product: Product },
    Bare(Product),
}

impl ProductPayload {
    pub(crate) fn into_product(self) -> Product {
        match self {
            Self::Wrapped { product } | Self::Bare(product) => product,
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Failure body returned by the API on non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(alias = "availableQty", alias = "availableQuantity", alias = "available", default)]
    pub available_quantity: Option<Amount>,
}

impl ErrorBody {
    /// The most specific non-empty message in the body.
    pub fn message(&self) -> Option<&str> {
        [self.message.as_deref(), self.error.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|text| !text.is_empty())
    }

    /// Available stock reported alongside a quantity failure.
    pub fn available_quantity(&self) -> Option<u32> {
        self.available_quantity
            .as_ref()
            .map(|amount| to_count(amount.value()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn cart_items_accepts_wrapped_and_bare_bodies() {
        let line = json!({ "Variation_ID": 11, "Product_ID": 3, "CartQty": 2, "NetAmount": "1800" });

        let wrapped = cart_items_from(json!({ "cartItems": [line.clone()] }));
        let bare = cart_items_from(json!([line]));

        assert_eq!(wrapped.as_ref().map(Vec::len), Some(1));
        assert_eq!(wrapped, bare);
        assert_eq!(bare.unwrap_or_default()[0].variation_id, "11");
    }

    #[test]
    fn acknowledgements_without_items_are_not_carts() {
        assert_eq!(cart_items_from(json!({ "message": "Item removed" })), None);
        assert_eq!(cart_items_from(Value::Null), None);
    }

    #[test]
    fn error_body_prefers_message_then_error() {
        let body: ErrorBody =
            serde_json::from_value(json!({ "error": "Out of stock", "availableQty": "2" }))
                .unwrap_or_default();

        assert_eq!(body.message(), Some("Out of stock"));
        assert_eq!(body.available_quantity(), Some(2));
    }
}
