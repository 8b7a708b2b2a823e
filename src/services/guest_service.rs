//! Guest order details.

use std::sync::LazyLock;

use regex::Regex;
use sqlx::PgConnection;

use crate::{
    db::DbPool,
    error::AppError,
    models::guest::{GuestDetails, GuestOrder},
    services::validation,
};

static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\s]{2,50}$").expect("Invalid regex"));
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[\d\s-]{6,15}$").expect("Invalid regex"));
static POSTAL_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9\s-]{3,10}$").expect("Invalid regex"));

fn require_match(re: &Regex, field: &str, value: &str) -> Result<(), AppError> {
    if !re.is_match(value.trim()) {
        return Err(AppError::InvalidRequest(format!("Invalid {field}")));
    }
    Ok(())
}

pub fn validate_guest_details(details: &GuestDetails) -> Result<(), AppError> {
    require_match(&NAME, "first name", &details.fname)?;
    require_match(&NAME, "last name", &details.lname)?;
    validation::require_email(&details.email)?;
    require_match(&PHONE, "phone number", &details.phone_number)?;
    require_match(&POSTAL_CODE, "postal code", &details.postal_code)?;
    validation::require_non_blank("address", &details.address)?;
    validation::require_non_blank("city", &details.city)?;
    validation::require_non_blank("region", &details.region)?;
    validation::require_non_blank("country", &details.country)?;
    Ok(())
}

/// Store guest details against a purchase row.
///
/// Runs on the caller's connection so the checkout can keep it in its transaction.
pub async fn insert_guest_order(
    conn: &mut PgConnection,
    purchase_history_id: i64,
    details: &GuestDetails,
) -> Result<GuestOrder, AppError> {
    let order = sqlx::query_as::<_, GuestOrder>(
        r#"
        INSERT INTO guest_orders (
            purchase_history_id, fname, lname, email, address,
            postal_code, country, city, region, phone_number
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(purchase_history_id)
    .bind(details.fname.trim())
    .bind(details.lname.trim())
    .bind(details.email.trim())
    .bind(details.address.trim())
    .bind(details.postal_code.trim())
    .bind(details.country.trim())
    .bind(details.city.trim())
    .bind(details.region.trim())
    .bind(details.phone_number.trim())
    .fetch_one(&mut *conn)
    .await?;
    Ok(order)
}

/// # Errors
///
/// - `InvalidRequest`: details failed validation
/// - `PurchaseNotFound`: no purchase with that id
pub async fn create_guest_order(
    pool: &DbPool,
    purchase_history_id: i64,
    details: GuestDetails,
) -> Result<GuestOrder, AppError> {
    validate_guest_details(&details)?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM purchase_history WHERE id = $1)")
            .bind(purchase_history_id)
            .fetch_one(pool)
            .await?;
    if !exists {
        return Err(AppError::PurchaseNotFound);
    }

    let mut conn = pool.acquire().await?;
    let order = insert_guest_order(&mut conn, purchase_history_id, &details).await?;

    tracing::info!(guest_order_id = order.id, purchase_history_id, "Guest order stored");
    Ok(order)
}

pub async fn guest_orders_for_purchase(
    pool: &DbPool,
    purchase_history_id: i64,
) -> Result<Vec<GuestOrder>, AppError> {
    let orders = sqlx::query_as::<_, GuestOrder>(
        "SELECT * FROM guest_orders WHERE purchase_history_id = $1 ORDER BY id",
    )
    .bind(purchase_history_id)
    .fetch_all(pool)
    .await?;
    Ok(orders)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> GuestDetails {
        GuestDetails {
            fname: "Zoë".to_string(),
            lname: "van Dijk".to_string(),
            email: "zoe@example.com".to_string(),
            address: "Stratumseind 1".to_string(),
            postal_code: "5611 ET".to_string(),
            country: "Netherlands".to_string(),
            city: "Eindhoven".to_string(),
            region: "Noord-Brabant".to_string(),
            phone_number: "+31 6 1234 5678".to_string(),
        }
    }

    #[test]
    fn accepts_unicode_names_and_spaced_phone() {
        assert!(validate_guest_details(&details()).is_ok());
    }

    #[test]
    fn rejects_digits_in_name() {
        let mut d = details();
        d.fname = "R2D2".to_string();
        assert!(matches!(
            validate_guest_details(&d),
            Err(AppError::InvalidRequest(msg)) if msg == "Invalid first name"
        ));
    }

    #[test]
    fn rejects_lowercase_postal_code() {
        let mut d = details();
        d.postal_code = "5611 et".to_string();
        assert!(validate_guest_details(&d).is_err());
    }

    #[test]
    fn rejects_phone_with_letters() {
        let mut d = details();
        d.phone_number = "call me".to_string();
        assert!(validate_guest_details(&d).is_err());
    }

    #[test]
    fn region_is_required() {
        let mut d = details();
        d.region = String::new();
        assert!(validate_guest_details(&d).is_err());
    }
}
