//! Storefront Errors
//!
//! Every fallible operation in the crate returns [`StorefrontError`]. Callers
//! branch on [`StorefrontError::kind`] instead of inspecting message text.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Broad classification of a failure, used for branching and status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request was rejected before leaving the client.
    Validation,
    /// Missing, expired or rejected credentials.
    Auth,
    /// The remote API could not be reached.
    Network,
    /// The remote API answered with a failure or an unreadable body.
    Server,
    /// The response arrived after its request was superseded.
    Cancelled,
}

/// Errors surfaced by the pricing, cart, auth and checkout layers.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StorefrontError {
    /// Input failed a client-side check.
    #[error("{0}")]
    Validation(String),

    /// The session has no usable token, or the API rejected it.
    #[error("{0}")]
    Unauthorized(String),

    /// Transport failure talking to the remote API.
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response from the remote API.
    #[error("{message}")]
    Server {
        /// HTTP status returned by the API.
        status: u16,
        /// Server-provided message, or the call site's fallback.
        message: String,
        /// Stock still available, when the API reports it.
        available_quantity: Option<u32>,
    },

    /// 2xx response whose body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Malformed(String),

    /// A newer request or a cancellation superseded this one.
    #[error("request was cancelled")]
    Cancelled,
}

impl StorefrontError {
    /// Returns the classification used by callers and the gateway.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Unauthorized(_) => ErrorKind::Auth,
            Self::Network(_) => ErrorKind::Network,
            Self::Server { .. } | Self::Malformed(_) => ErrorKind::Server,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Shorthand for a server failure without a stock hint.
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
            available_quantity: None,
        }
    }
}

impl ErrorKind {
    /// Lower-case name used in JSON error bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Auth => "auth",
            Self::Network => "network",
            Self::Server => "server",
            Self::Cancelled => "cancelled",
        }
    }
}

impl StorefrontError {
    /// HTTP status the gateway answers with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Network(_) | Self::Malformed(_) => StatusCode::BAD_GATEWAY,
            Self::Server { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|code| code.is_client_error() || code.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Self::Cancelled => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for StorefrontError {
    fn into_response(self) -> Response {
        let available_quantity = match &self {
            Self::Server {
                available_quantity, ..
            } => *available_quantity,
            _ => None,
        };

        let body = json!({
            "error": self.to_string(),
            "kind": self.kind().as_str(),
            "availableQuantity": available_quantity,
        });

        (self.status_code(), Json(body)).into_response()
    }
}

impl From<reqwest::Error> for StorefrontError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Malformed(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, StorefrontError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_displays_only_the_message() {
        let error = StorefrontError::server(409, "Out of stock");

        assert_eq!(error.to_string(), "Out of stock");
        assert_eq!(error.kind(), ErrorKind::Server);
    }

    #[test]
    fn malformed_is_classified_as_server() {
        let error = StorefrontError::Malformed("missing field".into());

        assert_eq!(error.kind(), ErrorKind::Server);
    }

    #[test]
    fn status_codes_follow_the_error_kind() {
        assert_eq!(
            StorefrontError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            StorefrontError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            StorefrontError::Network("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(StorefrontError::Cancelled.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn server_status_is_passed_through_when_it_is_an_error() {
        assert_eq!(
            StorefrontError::server(409, "Out of stock").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            StorefrontError::server(200, "odd").status_code(),
            StatusCode::BAD_GATEWAY
        );
    }
}
