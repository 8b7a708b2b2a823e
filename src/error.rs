//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error code.
///
/// # Error Categories
///
/// - **Infrastructure Errors**: database, mail relay, payment provider
/// - **Authentication Errors**: missing/invalid session, wrong credentials, insufficient role
/// - **Resource Errors**: requested resources not found
/// - **Conflict Errors**: uniqueness rules (email, record title, one review per record)
/// - **Business Logic Errors**: stock, coupon and checkout rules
/// - **Validation Errors**: invalid request data
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No session token, or the token is invalid or expired.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Authentication required")]
    Unauthorized,

    /// Login with an unknown email or a wrong password.
    ///
    /// Returns HTTP 401 Unauthorized. The two cases are not distinguished.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Authenticated, but acting on another user's data or on an admin-only resource.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("You are not allowed to perform this action")]
    Forbidden,

    #[error("User not found")]
    UserNotFound,

    #[error("Record not found")]
    RecordNotFound,

    #[error("Genre not found")]
    GenreNotFound,

    #[error("Review not found")]
    ReviewNotFound,

    #[error("Purchase history not found")]
    PurchaseNotFound,

    #[error("Basket not found")]
    BasketNotFound,

    #[error("Record {record_id} is not in the basket of user {user_id}")]
    RecordNotInBasket { record_id: i64, user_id: i64 },

    #[error("Image not found")]
    ImageNotFound,

    #[error("Guest order not found")]
    GuestOrderNotFound,

    #[error("Invalid or expired coupon")]
    CouponNotFound,

    /// Returns HTTP 409 Conflict.
    #[error("Email already exists")]
    EmailAlreadyExists,

    /// Returns HTTP 409 Conflict.
    #[error("User has already reviewed this record")]
    DuplicateReview,

    /// Returns HTTP 409 Conflict.
    #[error("Record with this title already exists")]
    DuplicateRecordTitle,

    /// Requested quantity exceeds the record's stock.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Not enough stock for '{title}': requested {requested}, available {available}")]
    OutOfStock {
        title: String,
        requested: i32,
        available: i32,
    },

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Uploaded image rejected (size, type, per-record limit).
    #[error("Invalid image")]
    InvalidImage(String),

    /// Payment provider webhook signature missing, malformed, stale or wrong.
    #[error("Invalid webhook signature")]
    InvalidWebhookSignature,

    /// Payment provider call failed or returned an unexpected response.
    ///
    /// Returns HTTP 502 Bad Gateway.
    #[error("Payment provider error: {0}")]
    PaymentProvider(String),

    /// Outbound mail could not be sent.
    #[error("Email delivery failed: {0}")]
    Email(String),

    /// Anything else; details are logged, never returned.
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Database(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
            AppError::Email(_) => (StatusCode::INTERNAL_SERVER_ERROR, "email_error"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found"),
            AppError::RecordNotFound => (StatusCode::NOT_FOUND, "record_not_found"),
            AppError::GenreNotFound => (StatusCode::NOT_FOUND, "genre_not_found"),
            AppError::ReviewNotFound => (StatusCode::NOT_FOUND, "review_not_found"),
            AppError::PurchaseNotFound => (StatusCode::NOT_FOUND, "purchase_not_found"),
            AppError::BasketNotFound => (StatusCode::NOT_FOUND, "basket_not_found"),
            AppError::RecordNotInBasket { .. } => (StatusCode::NOT_FOUND, "record_not_in_basket"),
            AppError::ImageNotFound => (StatusCode::NOT_FOUND, "image_not_found"),
            AppError::GuestOrderNotFound => (StatusCode::NOT_FOUND, "guest_order_not_found"),
            AppError::CouponNotFound => (StatusCode::NOT_FOUND, "coupon_not_found"),
            AppError::EmailAlreadyExists => (StatusCode::CONFLICT, "email_already_exists"),
            AppError::DuplicateReview => (StatusCode::CONFLICT, "duplicate_review"),
            AppError::DuplicateRecordTitle => (StatusCode::CONFLICT, "duplicate_record_title"),
            AppError::OutOfStock { .. } => (StatusCode::BAD_REQUEST, "out_of_stock"),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            AppError::InvalidImage(_) => (StatusCode::BAD_REQUEST, "invalid_image"),
            AppError::InvalidWebhookSignature => (StatusCode::BAD_REQUEST, "invalid_signature"),
            AppError::PaymentProvider(_) => (StatusCode::BAD_GATEWAY, "payment_provider_error"),
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Server-side failures (database, internal, mail, provider) are logged here and
/// answered with a generic message so that no internals leak to the client.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::InvalidRequest(msg) | AppError::InvalidImage(msg) => msg.clone(),
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                "An internal error occurred".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal server error");
                "An internal error occurred".to_string()
            }
            AppError::Email(e) => {
                tracing::error!(error = %e, "Email delivery failed");
                "Failed to send email".to_string()
            }
            AppError::PaymentProvider(e) => {
                tracing::error!(error = %e, "Payment provider error");
                "Payment provider request failed".to_string()
            }
            _ => self.to_string(),
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

/// Result type alias for handlers and services.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 4096).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn out_of_stock_reports_quantities() {
        let (status, body) = body_json(AppError::OutOfStock {
            title: "Blue Train".to_string(),
            requested: 3,
            available: 1,
        })
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "out_of_stock");
        assert_eq!(
            body["error"]["message"],
            "Not enough stock for 'Blue Train': requested 3, available 1"
        );
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let (status, body) =
            body_json(AppError::Internal(anyhow::anyhow!("secret connection string"))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn invalid_request_passes_message_through() {
        let (status, body) =
            body_json(AppError::InvalidRequest("Quantity must be positive".to_string())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_request");
        assert_eq!(body["error"]["message"], "Quantity must be positive");
    }

    #[test]
    fn conflicts_map_to_409() {
        for error in [
            AppError::EmailAlreadyExists,
            AppError::DuplicateReview,
            AppError::DuplicateRecordTitle,
        ] {
            assert_eq!(error.status_and_code().0, StatusCode::CONFLICT);
        }
    }
}
