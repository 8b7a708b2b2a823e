//! Data models representing database entities and API payloads.
//!
//! Each module pairs the row type that maps to a table (`sqlx::FromRow`)
//! with the request/response bodies exposed over HTTP.

pub mod auth;
pub mod basket;
pub mod checkout;
pub mod coupon;
pub mod genre;
pub mod guest;
pub mod purchase;
pub mod record;
pub mod review;
pub mod subscriber;
pub mod user;
