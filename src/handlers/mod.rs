//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Checks the caller's rights against the [`AuthContext`](crate::middleware::auth::AuthContext)
//! 3. Delegates to a service
//! 4. Returns HTTP response (JSON, status code)

/// Login, logout and session validation
pub mod auth;
pub mod basket;
pub mod coupons;
pub mod genres;
pub mod guest_orders;
/// Health check endpoint
pub mod health;
/// Checkout sessions and provider webhooks
pub mod payments;
pub mod purchases;
pub mod records;
pub mod reviews;
pub mod search;
pub mod subscribers;
pub mod users;
