//! The API's single error type and its JSON rendering.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Every handler and service returns this; the variant picks the HTTP
/// status and the machine-readable `code` of the response body.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Any sqlx failure. Details are logged, never returned.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Bearer token or webhook callback token is missing or invalid.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to perform the operation.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Forbidden")]
    Forbidden,

    /// Requested resource does not exist or is not visible to the caller.
    ///
    /// Returns HTTP 404 Not Found. The String names the resource.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Validation failure; the message is shown to the client as is.
    ///
    /// HTTP 400.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Phone number already registered.
    ///
    /// Returns HTTP 400 Bad Request with its own error code so the
    /// storefront can point at the phone field.
    #[error("Phone number is already registered")]
    PhoneTaken,

    /// Request conflicts with the current state of a resource.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Conflict")]
    Conflict(String),

    /// Too many requests from the same client inside the current window.
    ///
    /// Returns HTTP 429 Too Many Requests.
    #[error("Too many requests, please try again later")]
    RateLimited,

    /// Outbound call to the payment gateway or messaging provider failed.
    ///
    /// Returns HTTP 502 Bad Gateway.
    #[error("Upstream error: {0}")]
    Gateway(String),

    /// Unexpected internal failure that is not a database error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::InvalidRequest(message.into())
    }
}

/// Body shape: `{"error": {"code": "not_found", "message": "Order not found"}}`.
///
/// Database and internal errors are logged and replaced by a generic message.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Unauthorized(ref msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone())
            }
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::PhoneTaken => (StatusCode::BAD_REQUEST, "phone_taken", self.to_string()),
            AppError::Conflict(ref msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                self.to_string(),
            ),
            AppError::Gateway(ref msg) => {
                tracing::error!("upstream failure: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_error",
                    "Payment or messaging provider is unavailable".to_string(),
                )
            }
            AppError::Database(ref e) => {
                tracing::error!("database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Internal(ref msg) => {
                tracing::error!("internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_variants() {
        let cases = [
            (AppError::unauthorized("nope"), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden, StatusCode::FORBIDDEN),
            (AppError::NotFound("Order"), StatusCode::NOT_FOUND),
            (AppError::invalid("bad"), StatusCode::BAD_REQUEST),
            (AppError::PhoneTaken, StatusCode::BAD_REQUEST),
            (AppError::Conflict("dup".into()), StatusCode::CONFLICT),
            (AppError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (AppError::Gateway("down".into()), StatusCode::BAD_GATEWAY),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn not_found_names_the_resource() {
        assert_eq!(AppError::NotFound("Product").to_string(), "Product not found");
    }
}
