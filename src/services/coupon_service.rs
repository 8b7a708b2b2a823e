//! Frequent-shopper coupons.
//!
//! A registered customer earns a single-use coupon for every third purchase
//! line within 30 days, unless they already hold a redeemable one.

use chrono::{DateTime, Duration, Months, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::coupon::{Coupon, FREQUENT_SHOPPER_DISCOUNT},
};

const PURCHASE_WINDOW_DAYS: i64 = 30;
const PURCHASES_PER_COUPON: i64 = 3;

/// `SPIN` followed by 8 upper-case hex characters.
pub fn generate_coupon_code() -> String {
    let id = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("SPIN{}", &id[..8])
}

/// Whether `recent_purchases` (in the window) earns a new coupon.
pub fn earns_coupon(recent_purchases: i64) -> bool {
    recent_purchases > 0 && recent_purchases % PURCHASES_PER_COUPON == 0
}

fn expiry_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_add_months(Months::new(1))
        .unwrap_or(now + Duration::days(30))
}

/// Issue a coupon if the user qualifies. Returns whether one was created.
pub async fn generate_frequent_shopper_coupon(
    pool: &DbPool,
    user_id: i64,
) -> Result<bool, AppError> {
    let now = Utc::now();

    let holds_valid: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM coupons WHERE user_id = $1 AND is_used = FALSE AND valid_until > $2)",
    )
    .bind(user_id)
    .bind(now)
    .fetch_one(pool)
    .await?;
    if holds_valid {
        return Ok(false);
    }

    let recent: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM purchase_history WHERE user_id = $1 AND purchase_date >= $2",
    )
    .bind(user_id)
    .bind(now - Duration::days(PURCHASE_WINDOW_DAYS))
    .fetch_one(pool)
    .await?;

    if !earns_coupon(recent) {
        return Ok(false);
    }

    let coupon = sqlx::query_as::<_, Coupon>(
        r#"
        INSERT INTO coupons (user_id, coupon_code, discount_percentage, valid_until)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(generate_coupon_code())
    .bind(FREQUENT_SHOPPER_DISCOUNT)
    .bind(expiry_from(now))
    .fetch_one(pool)
    .await?;

    tracing::info!(user_id, coupon_id = coupon.id, "Frequent shopper coupon issued");
    Ok(true)
}

pub async fn coupons_for_user(pool: &DbPool, user_id: i64) -> Result<Vec<Coupon>, AppError> {
    let coupons = sqlx::query_as::<_, Coupon>(
        "SELECT * FROM coupons WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(coupons)
}

pub async fn find_by_code(pool: &DbPool, code: &str) -> Result<Option<Coupon>, AppError> {
    let coupon = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE coupon_code = $1")
        .bind(code.trim())
        .fetch_optional(pool)
        .await?;
    Ok(coupon)
}

/// Exists, unused and unexpired.
pub async fn validate(pool: &DbPool, code: &str) -> Result<bool, AppError> {
    Ok(find_by_code(pool, code)
        .await?
        .is_some_and(|coupon| coupon.is_redeemable(Utc::now())))
}

/// Mark a coupon used. Returns whether the code existed.
pub async fn mark_used(conn: &mut PgConnection, code: &str) -> Result<bool, AppError> {
    let updated = sqlx::query("UPDATE coupons SET is_used = TRUE WHERE coupon_code = $1")
        .bind(code.trim())
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if updated > 0 {
        tracing::info!(code = code.trim(), "Coupon marked used");
    }
    Ok(updated > 0)
}

/// Use up a redeemable coupon. Returns false if it is unknown, already used
/// or expired.
///
/// The guarded update makes this the single point where a coupon changes
/// hands, so two orders racing for one coupon cannot both succeed.
pub async fn redeem(conn: &mut PgConnection, code: &str) -> Result<bool, AppError> {
    let redeemed = sqlx::query(
        r#"
        UPDATE coupons SET is_used = TRUE
        WHERE coupon_code = $1 AND is_used = FALSE AND valid_until > NOW()
        "#,
    )
    .bind(code.trim())
    .execute(&mut *conn)
    .await?
    .rows_affected()
        > 0;

    if redeemed {
        tracing::info!(code = code.trim(), "Coupon redeemed");
    }
    Ok(redeemed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn code_format() {
        let code = generate_coupon_code();
        assert_eq!(code.len(), 12);
        assert!(code.starts_with("SPIN"));
        assert!(code[4..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn every_third_purchase_earns_a_coupon() {
        assert!(!earns_coupon(0));
        assert!(!earns_coupon(1));
        assert!(!earns_coupon(2));
        assert!(earns_coupon(3));
        assert!(!earns_coupon(4));
        assert!(earns_coupon(6));
    }

    #[test]
    fn coupon_is_valid_for_one_calendar_month() {
        let now = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();
        let expiry = expiry_from(now);
        assert_eq!(expiry, Utc.with_ymd_and_hms(2025, 2, 28, 12, 0, 0).unwrap());
    }
}
