//! REST API handler for the catalog pricing view

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use super::discount::total_discount;
use super::helpers::format_price;
use super::models::DiscountInfo;
use crate::error::Result;
use crate::state::SharedState;

/// Creates routes for pricing lookups
pub fn routes() -> Router<SharedState> {
    Router::new().route("/products/:product_id/pricing", get(product_pricing))
}

/// Discount breakdown for one product, with display strings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPricing {
    pub product_id: String,
    pub description: String,
    #[serde(flatten)]
    pub discount: DiscountInfo,
    pub display_price: String,
    pub display_market_price: String,
}

/// Endpoint: GET /products/:product_id/pricing
/// Public; no session required.
async fn product_pricing(
    State(state): State<SharedState>,
    Path(product_id): Path<String>,
) -> Result<Json<ProductPricing>> {
    let product = state.backends.catalog.product(&product_id).await?;
    let discount = total_discount(&product);

    Ok(Json(ProductPricing {
        product_id: product.id,
        description: product.description,
        display_price: format_price(discount.final_price),
        display_market_price: format_price(discount.market_price),
        discount,
    }))
}
