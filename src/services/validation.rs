//! Input validation shared by the services.
//!
//! Every check returns `AppError::InvalidRequest` with a message naming the
//! offending field.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::AppError;

/// Largest unit amount the payment provider accepts, in cents.
pub const MAX_PRICE_CENTS: i64 = 99_999_999;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+_.-]+@(.+)$").expect("Invalid regex"));

/// Reject blank (empty or whitespace-only) values.
pub fn require_non_blank(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidRequest(format!("{field} is required")));
    }
    Ok(())
}

/// Character length of `value` (trimmed) must be within `min..=max`.
pub fn require_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), AppError> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(AppError::InvalidRequest(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

pub fn require_email(value: &str) -> Result<(), AppError> {
    if !EMAIL.is_match(value.trim()) {
        return Err(AppError::InvalidRequest("Invalid email format".to_string()));
    }
    Ok(())
}

pub fn require_positive(field: &str, value: i64) -> Result<(), AppError> {
    if value <= 0 {
        return Err(AppError::InvalidRequest(format!("{field} must be positive")));
    }
    Ok(())
}

/// Positive and no larger than [`MAX_PRICE_CENTS`].
pub fn require_price(field: &str, cents: i64) -> Result<(), AppError> {
    require_positive(field, cents)?;
    if cents > MAX_PRICE_CENTS {
        return Err(AppError::InvalidRequest(format!(
            "{field} must not exceed {MAX_PRICE_CENTS} cents"
        )));
    }
    Ok(())
}

/// `unit_cents * quantity`, rejecting totals that do not fit.
pub fn line_total(unit_cents: i64, quantity: i32) -> Result<i64, AppError> {
    unit_cents
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| AppError::InvalidRequest("Line total is too large".to_string()))
}

/// Map a unique-constraint violation to `conflict`, pass anything else through.
pub fn unique_violation_as(error: sqlx::Error, conflict: AppError) -> AppError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => conflict,
        _ => AppError::Database(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_format() {
        assert!(require_email("ada@example.com").is_ok());
        assert!(require_email("first.last+tag@sub.example.org").is_ok());
        assert!(require_email("no-at-sign").is_err());
        assert!(require_email("spaces in@example.com").is_err());
        assert!(require_email("@example.com").is_err());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        assert!(require_length("fname", "Zoë", 2, 50).is_ok());
        assert!(require_length("fname", "Z", 2, 50).is_err());
        assert!(require_length("fname", &"x".repeat(51), 2, 50).is_err());
    }

    #[test]
    fn price_is_capped_at_the_provider_maximum() {
        assert!(require_price("price", 2499).is_ok());
        assert!(require_price("price", MAX_PRICE_CENTS).is_ok());
        assert!(require_price("price", MAX_PRICE_CENTS + 1).is_err());
        assert!(require_price("price", i64::MAX / 10).is_err());
        assert!(require_price("price", 0).is_err());
    }

    #[test]
    fn line_total_overflow_is_an_invalid_request() {
        assert_eq!(line_total(1750, 2).unwrap(), 3500);
        assert!(matches!(
            line_total(i64::MAX / 2, 3),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn blank_is_rejected_with_field_name() {
        let err = require_non_blank("city", "   ").unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(msg) if msg == "city is required"));
    }
}
