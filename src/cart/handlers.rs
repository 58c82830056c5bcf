//! REST API handlers for shopping cart operations
//!
//! Every handler forwards to the session's `CartStore` and answers with the
//! server's cart as it stands afterwards.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post, put},
    Json, Router,
};

use super::helpers::format_item_summary;
use super::models::{AddToCartInput, CartView, UpdateQuantityInput};
use crate::error::Result;
use crate::pricing::compute_order_totals;
use crate::state::{Session, SharedState};

/// Creates routes for cart-related operations
pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/cart", get(view_cart).delete(clear_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/:variation_id", put(update_item).delete(remove_item))
}

/// Endpoint: GET /cart
async fn view_cart(State(state): State<SharedState>, headers: HeaderMap) -> Result<Json<CartView>> {
    let session = state.require_session(&headers)?;

    refresh(&session, state.delivery_fee).await
}

/// Endpoint: POST /cart/items
async fn add_item(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<AddToCartInput>,
) -> Result<Json<CartView>> {
    let session = state.require_session(&headers)?;

    add(&session, &payload, state.delivery_fee).await
}

/// Endpoint: PUT /cart/items/:variation_id
/// Quantities below 1 leave the cart untouched.
async fn update_item(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(variation_id): Path<String>,
    Json(payload): Json<UpdateQuantityInput>,
) -> Result<Json<CartView>> {
    let session = state.require_session(&headers)?;

    update(&session, &variation_id, payload.qty, state.delivery_fee).await
}

/// Endpoint: DELETE /cart/items/:variation_id
async fn remove_item(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(variation_id): Path<String>,
) -> Result<Json<CartView>> {
    let session = state.require_session(&headers)?;

    remove(&session, &variation_id, state.delivery_fee).await
}

/// Endpoint: DELETE /cart
async fn clear_cart(State(state): State<SharedState>, headers: HeaderMap) -> Result<Json<CartView>> {
    let session = state.require_session(&headers)?;

    clear(&session, state.delivery_fee).await
}

async fn refresh(session: &Session, delivery_fee: f64) -> Result<Json<CartView>> {
    let credentials = session.credentials()?;
    session.guard(session.cart.fetch(&credentials).await)?;

    Ok(cart_view(session, delivery_fee))
}

async fn add(session: &Session, input: &AddToCartInput, delivery_fee: f64) -> Result<Json<CartView>> {
    let credentials = session.credentials()?;
    session.guard(session.cart.add(&credentials, &input.variation_id, input.qty).await)?;

    Ok(cart_view(session, delivery_fee))
}

async fn update(session: &Session, variation_id: &str, qty: i64, delivery_fee: f64) -> Result<Json<CartView>> {
    let credentials = session.credentials()?;
    session.guard(session.cart.update_quantity(&credentials, variation_id, qty).await)?;

    Ok(cart_view(session, delivery_fee))
}

async fn remove(session: &Session, variation_id: &str, delivery_fee: f64) -> Result<Json<CartView>> {
    let credentials = session.credentials()?;
    session.guard(session.cart.remove(&credentials, variation_id).await)?;

    Ok(cart_view(session, delivery_fee))
}

async fn clear(session: &Session, delivery_fee: f64) -> Result<Json<CartView>> {
    let credentials = session.credentials()?;
    session.guard(session.cart.clear(&credentials).await)?;

    Ok(cart_view(session, delivery_fee))
}

fn cart_view(session: &Session, delivery_fee: f64) -> Json<CartView> {
    let items = session.cart.items();

    Json(CartView {
        totals: compute_order_totals(&items, delivery_fee),
        summary: format_item_summary(&items),
        items,
    })
}
