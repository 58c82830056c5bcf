//! REST API handlers for checkout operations

use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};

use super::models::{CheckoutInput, CheckoutReceipt, SummaryInput};
use super::order::{submit_order, summarize};
use crate::error::Result;
use crate::pricing::OrderTotals;
use crate::state::{Session, SharedState};

/// Creates routes for checkout operations
pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/checkout/summary", post(checkout_summary))
        .route("/checkout", post(checkout))
}

/// Endpoint: POST /checkout/summary
/// Prices the selected lines of the last fetched cart.
async fn checkout_summary(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<SummaryInput>,
) -> Result<Json<OrderTotals>> {
    let session = state.require_session(&headers)?;

    summary(&session, &payload, state.delivery_fee)
}

/// Endpoint: POST /checkout
async fn checkout(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<CheckoutInput>,
) -> Result<Json<CheckoutReceipt>> {
    let session = state.require_session(&headers)?;

    place(&state, &session, &payload).await
}

fn summary(session: &Session, input: &SummaryInput, delivery_fee: f64) -> Result<Json<OrderTotals>> {
    session.credentials()?;

    summarize(&session.cart.items(), &input.variation_ids, delivery_fee).map(Json)
}

async fn place(state: &SharedState, session: &Session, input: &CheckoutInput) -> Result<Json<CheckoutReceipt>> {
    let credentials = session.credentials()?;
    let backend = state.backends.checkout.as_ref();

    let receipt = session.guard(
        submit_order(backend, &session.cart, &credentials, input, state.delivery_fee).await,
    )?;

    Ok(Json(receipt))
}
