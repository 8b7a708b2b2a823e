//! Discount coupon models.
//!
//! Coupons are issued to frequent shoppers and redeemed at checkout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Percentage knocked off every unit price when a coupon is applied.
pub const FREQUENT_SHOPPER_DISCOUNT: i32 = 30;

/// A row from the `coupons` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Coupon {
    pub id: i64,
    pub user_id: i64,
    pub coupon_code: String,
    pub discount_percentage: i32,
    pub valid_until: DateTime<Utc>,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    /// Unused and not yet expired at `now`.
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && self.valid_until > now
    }
}

/// Request body for `POST /coupons/generate`.
#[derive(Debug, Deserialize)]
pub struct GenerateCouponRequest {
    pub user_id: i64,
}

/// Response body for `POST /coupons/generate`.
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateCouponResponse {
    pub generated: bool,
}

/// Response body for `GET /coupons/validate/{code}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CouponValidationResponse {
    pub code: String,
    pub valid: bool,
    pub discount_percentage: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(is_used: bool, valid_for: Duration) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: 1,
            user_id: 7,
            coupon_code: "SPIN1A2B3C4D".to_string(),
            discount_percentage: FREQUENT_SHOPPER_DISCOUNT,
            valid_until: now + valid_for,
            is_used,
            created_at: now,
        }
    }

    #[test]
    fn fresh_coupon_is_redeemable() {
        assert!(coupon(false, Duration::days(30)).is_redeemable(Utc::now()));
    }

    #[test]
    fn used_or_expired_coupon_is_not_redeemable() {
        assert!(!coupon(true, Duration::days(30)).is_redeemable(Utc::now()));
        assert!(!coupon(false, Duration::days(-1)).is_redeemable(Utc::now()));
    }
}
