//! HTTP client for the commerce REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::backend::{AuthBackend, CartBackend, CatalogBackend, CheckoutBackend};
use super::models::{
    cart_items_from, AuthResponse, CartItemRequest, ClearCartRequest, CustomerPayload, ErrorBody,
    LoginRequest, MessageResponse, OrderConfirmation, PasswordResetRequest, PlaceOrderRequest,
    ProductPayload, RegisterRequest, RemoveItemRequest, ServerCartItem,
};
use crate::auth::models::{Credentials, Customer};
use crate::error::{Result, StorefrontError};
use crate::pricing::models::Product;

/// Client bound to one API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    /// Creates a client with the platform's default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: trim_base(base_url.into()),
            http: Client::new(),
        }
    }

    /// Creates a client, applying `timeout` to every request when given.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Network`] if the HTTP client cannot be built.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url: trim_base(base_url.into()),
            http: builder.build()?,
        })
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `path` with `id` appended as one percent-encoded segment, so an id
    /// holding `/` or `..` can never reach another endpoint.
    fn url_with_id(&self, path: &str, id: &str) -> Result<Url> {
        if matches!(id.trim(), "" | "." | "..") {
            return Err(StorefrontError::Validation(format!("Invalid id: {id:?}")));
        }

        let mut url = Url::parse(&self.url(path))
            .map_err(|error| StorefrontError::Network(format!("invalid API URL: {error}")))?;
        url.path_segments_mut()
            .map_err(|()| StorefrontError::Network(format!("API URL cannot take an id: {}", self.base_url)))?
            .push(id);

        Ok(url)
    }

    /// Sends a request and returns the decoded JSON body (`Null` when empty).
    async fn send(&self, request: RequestBuilder, fallback: &str) -> Result<Value> {
        let response = request.send().await.map_err(|error| {
            warn!(%error, "api request failed to send");
            StorefrontError::from(error)
        })?;

        let status = response.status();
        let url = response.url().path().to_string();
        let text = response.text().await?;

        if !status.is_success() {
            let error = error_from_response(status, &text, fallback);
            warn!(status = status.as_u16(), path = %url, %error, "api request rejected");
            return Err(error);
        }

        debug!(status = status.as_u16(), path = %url, "api request succeeded");

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|error| StorefrontError::Malformed(error.to_string()))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, fallback: &str) -> Result<T> {
        let body = self.send(request, fallback).await?;

        serde_json::from_value(body).map_err(|error| StorefrontError::Malformed(error.to_string()))
    }

    async fn send_message(&self, request: RequestBuilder, fallback: &str) -> Result<String> {
        let body = self.send(request, fallback).await?;
        let message = serde_json::from_value::<MessageResponse>(body)
            .ok()
            .and_then(|response| response.message);

        Ok(message.unwrap_or_default())
    }
}

fn trim_base(base_url: String) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Converts a non-2xx response into a typed error.
///
/// The server's `message` (or `error`) wins over `fallback`; 401 and 403 map
/// to [`StorefrontError::Unauthorized`].
pub(crate) fn error_from_response(status: StatusCode, body: &str, fallback: &str) -> StorefrontError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.message().unwrap_or(fallback).to_string();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StorefrontError::Unauthorized(message),
        _ => StorefrontError::Server {
            status: status.as_u16(),
            message,
            available_quantity: parsed.available_quantity(),
        },
    }
}

#[async_trait]
impl CartBackend for ApiClient {
    async fn fetch_cart(&self, credentials: &Credentials) -> Result<Vec<ServerCartItem>> {
        let request = self
            .http
            .get(self.url_with_id("/api/carts", &credentials.customer_id)?)
            .bearer_auth(&credentials.token);

        let body = self.send(request, "Failed to fetch cart").await?;
        if body.is_null() {
            return Ok(Vec::new());
        }

        cart_items_from(body).ok_or_else(|| StorefrontError::Malformed("cart response has no items".into()))
    }

    async fn add_item(
        &self,
        credentials: &Credentials,
        variation_id: &str,
        qty: u32,
    ) -> Result<Option<Vec<ServerCartItem>>> {
        let request = self
            .http
            .post(self.url("/api/carts/add"))
            .bearer_auth(&credentials.token)
            .json(&CartItemRequest {
                customer_id: &credentials.customer_id,
                variation_id,
                qty,
            });

        Ok(cart_items_from(self.send(request, "Failed to add item to cart").await?))
    }

    async fn update_item(
        &self,
        credentials: &Credentials,
        variation_id: &str,
        qty: u32,
    ) -> Result<Option<Vec<ServerCartItem>>> {
        let request = self
            .http
            .put(self.url("/api/carts/update"))
            .bearer_auth(&credentials.token)
            .json(&CartItemRequest {
                customer_id: &credentials.customer_id,
                variation_id,
                qty,
            });

        Ok(cart_items_from(self.send(request, "Failed to update cart item").await?))
    }

    async fn remove_item(
        &self,
        credentials: &Credentials,
        variation_id: &str,
    ) -> Result<Option<Vec<ServerCartItem>>> {
        let request = self
            .http
            .delete(self.url("/api/carts/remove"))
            .bearer_auth(&credentials.token)
            .json(&RemoveItemRequest {
                customer_id: &credentials.customer_id,
                variation_id,
            });

        Ok(cart_items_from(self.send(request, "Failed to remove cart item").await?))
    }

    async fn clear_cart(&self, credentials: &Credentials) -> Result<()> {
        let request = self
            .http
            .delete(self.url("/api/carts/clear"))
            .bearer_auth(&credentials.token)
            .json(&ClearCartRequest {
                customer_id: &credentials.customer_id,
            });

        self.send(request, "Failed to clear cart").await?;
        Ok(())
    }
}

#[async_trait]
impl CheckoutBackend for ApiClient {
    async fn place_order(
        &self,
        credentials: &Credentials,
        order: &PlaceOrderRequest,
    ) -> Result<OrderConfirmation> {
        let request = self
            .http
            .post(self.url("/api/carts/checkout"))
            .bearer_auth(&credentials.token)
            .json(order);

        self.send_json(request, "Failed to place order").await
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        let request = self
            .http
            .post(self.url("/api/auth/customers/login"))
            .json(request);

        self.send_json(request, "Login failed").await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        let request = self
            .http
            .post(self.url("/api/auth/customers/register"))
            .json(request);

        self.send_json(request, "Registration failed").await
    }

    async fn current_customer(&self, credentials: &Credentials) -> Result<Customer> {
        let request = self
            .http
            .get(self.url_with_id("/api/customers", &credentials.customer_id)?)
            .bearer_auth(&credentials.token);

        let payload: CustomerPayload = self.send_json(request, "Failed to load profile").await?;
        Ok(payload.into_customer())
    }

    async fn request_password_reset(&self, request: &PasswordResetRequest) -> Result<String> {
        let request = self
            .http
            .post(self.url("/api/auth/customers/request-password-reset"))
            .json(request);

        self.send_message(request, "Failed to request password reset").await
    }

    async fn verify_otp(&self, request: &PasswordResetRequest) -> Result<String> {
        let request = self
            .http
            .post(self.url("/api/auth/customers/verify-otp"))
            .json(request);

        self.send_message(request, "OTP verification failed").await
    }

    async fn reset_password(&self, request: &PasswordResetRequest) -> Result<String> {
        let request = self
            .http
            .post(self.url("/api/auth/customers/reset-password"))
            .json(request);

        self.send_message(request, "Failed to reset password").await
    }
}

#[async_trait]
impl CatalogBackend for ApiClient {
    async fn product(&self, product_id: &str) -> Result<Product> {
        let request = self.http.get(self.url_with_id("/api/products", product_id)?);

        let payload: ProductPayload = self.send_json(request, "Failed to load product").await?;
        Ok(payload.into_product())
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn server_message_beats_fallback() {
        let error = error_from_response(
            StatusCode::CONFLICT,
            r#"{"message":"Out of stock"}"#,
            "Failed to add item to cart",
        );

        assert_eq!(error, StorefrontError::server(409, "Out of stock"));
    }

    #[test]
    fn fallback_used_for_empty_or_unreadable_bodies() {
        let empty = error_from_response(StatusCode::INTERNAL_SERVER_ERROR, "", "Failed to fetch cart");
        let html = error_from_response(StatusCode::BAD_GATEWAY, "<html>", "Failed to fetch cart");

        assert_eq!(empty.to_string(), "Failed to fetch cart");
        assert_eq!(html.to_string(), "Failed to fetch cart");
    }

    #[test]
    fn rejected_tokens_are_auth_errors() {
        let error = error_from_response(StatusCode::UNAUTHORIZED, r#"{"error":"jwt expired"}"#, "x");

        assert_eq!(error, StorefrontError::Unauthorized("jwt expired".into()));
    }

    #[test]
    fn stock_hint_is_kept() {
        let error = error_from_response(
            StatusCode::BAD_REQUEST,
            r#"{"message":"Not enough stock","availableQty":3}"#,
            "x",
        );

        assert!(matches!(
            error,
            StorefrontError::Server {
                available_quantity: Some(3),
                ..
            }
        ));
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let client = ApiClient::new("http://localhost:9000/");

        assert_eq!(client.url("/api/products"), "http://localhost:9000/api/products");
    }

    #[test]
    fn ids_stay_inside_their_path_segment() -> TestResult {
        let client = ApiClient::new("http://localhost:9000/shop/");

        let url = client.url_with_id("/api/products", "../carts/C1")?;
        assert_eq!(url.path(), "/shop/api/products/..%2Fcarts%2FC1");

        let url = client.url_with_id("/api/products", "42?admin=1#x")?;
        assert_eq!(url.path(), "/shop/api/products/42%3Fadmin=1%23x");
        assert_eq!(url.query(), None);

        for id in ["", ".", ".."] {
            assert!(matches!(
                client.url_with_id("/api/products", id),
                Err(StorefrontError::Validation(_))
            ));
        }

        Ok(())
    }
}
