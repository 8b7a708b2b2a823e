//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, validation, and complex operations.

pub mod auth_service;
pub mod basket_service;
pub mod checkout_service;
pub mod coupon_service;
pub mod email_templates;
pub mod genre_service;
pub mod guest_service;
pub mod mailer;
pub mod purchase_service;
pub mod record_service;
pub mod review_service;
pub mod search_service;
pub mod stripe_service;
pub mod subscriber_service;
pub mod user_service;
pub mod validation;
