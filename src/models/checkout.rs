//! Checkout session and payment-provider payloads.
//!
//! Request/response bodies for the `/api/payment` routes, plus the subset of
//! the provider's event and session objects this service reads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::guest::GuestDetails;

/// Most line items accepted in one checkout.
pub const MAX_CHECKOUT_ITEMS: usize = 10;

/// Event type that triggers order fulfilment.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// One line of the checkout, as sent by the storefront.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutItem {
    #[serde(default)]
    pub record_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub artist: String,
    /// Undiscounted unit price in cents.
    pub price_cents: i64,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub condition: String,
}

fn default_quantity() -> i32 {
    1
}

/// What the webhook needs of a line, stored under the `items` metadata key.
///
/// Short keys keep ten lines inside the provider's 500-character limit per
/// metadata value. Title, artist and condition are reloaded from the record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataItem {
    #[serde(rename = "r")]
    pub record_id: i64,
    /// Undiscounted unit price in cents.
    #[serde(rename = "p")]
    pub price_cents: i64,
    #[serde(rename = "q")]
    pub quantity: i32,
}

impl From<&CheckoutItem> for MetadataItem {
    fn from(item: &CheckoutItem) -> Self {
        Self {
            record_id: item.record_id.unwrap_or_default(),
            price_cents: item.price_cents,
            quantity: item.quantity,
        }
    }
}

/// Coupon the customer wants applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CouponInfo {
    pub code: String,
    pub discount_percentage: i32,
}

/// Request body for `POST /api/payment/create-checkout-session`.
///
/// # JSON Example
///
/// ```json
/// {
///   "items": [{"record_id": 4, "title": "Blue Train", "artist": "John Coltrane",
///              "price_cents": 2499, "quantity": 1, "condition": "Mint"}],
///   "metadata": {"isGuest": "false", "userId": "12"},
///   "coupon": {"code": "SPIN1A2B3C4D", "discount_percentage": 30}
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub guest_details: Option<GuestDetails>,
    #[serde(default)]
    pub coupon: Option<CouponInfo>,
}

/// Response body for a created checkout session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutSessionResponse {
    pub session_id: String,
    pub client_secret: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifySessionResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentConfigResponse {
    pub publishable_key: String,
}

/// Webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// The fields of a checkout session this service reads.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub customer_details: Option<StripeCustomerDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}
