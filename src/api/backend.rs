//! Backend Seams
//!
//! The stores talk to the remote API only through these traits, so they can
//! be driven by [`ApiClient`](super::ApiClient) in production and by in-memory
//! fakes in tests.

use async_trait::async_trait;

use super::models::{
    AuthResponse, LoginRequest, OrderConfirmation, PasswordResetRequest, PlaceOrderRequest,
    RegisterRequest, ServerCartItem,
};
use crate::auth::models::{Credentials, Customer};
use crate::error::Result;
use crate::pricing::models::Product;

/// Cart endpoints.
///
/// Mutations return the cart when the API includes it in the response and
/// `None` when it only acknowledges the change.
#[async_trait]
pub trait CartBackend: Send + Sync {
    /// `GET /api/carts/:customerId`
    async fn fetch_cart(&self, credentials: &Credentials) -> Result<Vec<ServerCartItem>>;

    /// `POST /api/carts/add`
    async fn add_item(
        &self,
        credentials: &Credentials,
        variation_id: &str,
        qty: u32,
    ) -> Result<Option<Vec<ServerCartItem>>>;

    /// `PUT /api/carts/update`
    async fn update_item(
        &self,
        credentials: &Credentials,
        variation_id: &str,
        qty: u32,
    ) -> Result<Option<Vec<ServerCartItem>>>;

    /// `DELETE /api/carts/remove`
    async fn remove_item(
        &self,
        credentials: &Credentials,
        variation_id: &str,
    ) -> Result<Option<Vec<ServerCartItem>>>;

    /// `DELETE /api/carts/clear`
    async fn clear_cart(&self, credentials: &Credentials) -> Result<()>;
}

/// Checkout endpoint.
#[async_trait]
pub trait CheckoutBackend: Send + Sync {
    /// `POST /api/carts/checkout`
    async fn place_order(
        &self,
        credentials: &Credentials,
        order: &PlaceOrderRequest,
    ) -> Result<OrderConfirmation>;
}

/// Customer authentication endpoints.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// `POST /api/auth/customers/login`
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse>;

    /// `POST /api/auth/customers/register`
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse>;

    /// `GET /api/customers/:id`, used to validate a stored token.
    async fn current_customer(&self, credentials: &Credentials) -> Result<Customer>;

    /// `POST /api/auth/customers/request-password-reset`
    async fn request_password_reset(&self, request: &PasswordResetRequest) -> Result<String>;

    /// `POST /api/auth/customers/verify-otp`
    async fn verify_otp(&self, request: &PasswordResetRequest) -> Result<String>;

    /// `POST /api/auth/customers/reset-password`
    async fn reset_password(&self, request: &PasswordResetRequest) -> Result<String>;
}

/// Catalog endpoints.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// `GET /api/products/:id`
    async fn product(&self, product_id: &str) -> Result<Product>;
}
