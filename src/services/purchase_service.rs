//! Purchase service - stock-safe order lines.
//!
//! This service handles:
//! - Atomic stock decrement plus purchase row insertion
//! - Order number generation
//! - Purchase history queries and admin statistics
//!
//! # Atomicity Guarantees
//!
//! Stock changes happen inside a PostgreSQL transaction with the record row
//! locked (`FOR UPDATE`), so concurrent checkouts cannot oversell.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        purchase::{
            AdminDashboard, CreatePurchaseRequest, Purchase, PurchaseStats, RecordSales,
            STATUS_COMPLETED,
        },
        record::Record,
    },
    services::validation,
};

/// Number of rows returned by the "recent" views.
const RECENT_LIMIT: i64 = 10;

/// `ORD-` followed by 8 upper-case hex characters.
pub fn generate_order_number() -> String {
    let id = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("ORD-{}", &id[..8])
}

fn validate_purchase(request: &CreatePurchaseRequest) -> Result<(), AppError> {
    if request.record_id <= 0 {
        return Err(AppError::InvalidRequest("Invalid record ID".to_string()));
    }
    validation::require_price("Price", request.price_cents)?;
    if request.quantity <= 0 {
        return Err(AppError::InvalidRequest(
            "Quantity must be positive".to_string(),
        ));
    }
    if let Some(pct) = request.discount_percentage {
        if !(0..=100).contains(&pct) {
            return Err(AppError::InvalidRequest(
                "Discount must be between 0 and 100".to_string(),
            ));
        }
    }
    Ok(())
}

/// Lock the record, take stock and insert the purchase row.
///
/// Runs on a connection that is already inside a transaction; the caller
/// commits. Returns the purchase and the record with its new stock.
///
/// # Errors
///
/// - `InvalidRequest`: non-positive id, price or quantity
/// - `RecordNotFound`: the record does not exist
/// - `OutOfStock`: not enough stock
pub async fn insert_purchase(
    conn: &mut PgConnection,
    request: &CreatePurchaseRequest,
    order_number: &str,
) -> Result<(Purchase, Record), AppError> {
    validate_purchase(request)?;

    // FOR UPDATE keeps concurrent orders for the same record serialized
    let record = sqlx::query_as::<_, Record>("SELECT * FROM records WHERE id = $1 FOR UPDATE")
        .bind(request.record_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::RecordNotFound)?;

    if record.quantity < request.quantity {
        return Err(AppError::OutOfStock {
            title: record.title,
            requested: request.quantity,
            available: record.quantity,
        });
    }

    let record = sqlx::query_as::<_, Record>(
        "UPDATE records SET quantity = quantity - $1 WHERE id = $2 RETURNING *",
    )
    .bind(request.quantity)
    .bind(request.record_id)
    .fetch_one(&mut *conn)
    .await?;

    let total_cents = validation::line_total(request.price_cents, request.quantity)?;

    let purchase = sqlx::query_as::<_, Purchase>(
        r#"
        INSERT INTO purchase_history (
            order_number, user_id, is_guest, status, record_id,
            quantity, price_cents, total_cents, discount_percentage
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(order_number)
    .bind(request.user_id)
    .bind(request.is_guest)
    .bind(STATUS_COMPLETED)
    .bind(request.record_id)
    .bind(request.quantity)
    .bind(request.price_cents)
    .bind(total_cents)
    .bind(request.discount_percentage)
    .fetch_one(&mut *conn)
    .await?;

    Ok((purchase, record))
}

/// Create a single purchase in its own transaction.
pub async fn create_purchase(
    pool: &DbPool,
    request: CreatePurchaseRequest,
) -> Result<(Purchase, Record), AppError> {
    validate_purchase(&request)?;

    let order_number = request
        .order_number
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(generate_order_number);

    let mut tx = pool.begin().await?;
    let (purchase, record) = insert_purchase(&mut tx, &request, &order_number).await?;
    tx.commit().await?;

    tracing::info!(
        purchase_id = purchase.id,
        order_number = %purchase.order_number,
        record_id = record.id,
        remaining = record.quantity,
        "Purchase recorded"
    );

    Ok((purchase, record))
}

pub async fn purchases_for_user(pool: &DbPool, user_id: i64) -> Result<Vec<Purchase>, AppError> {
    let purchases = sqlx::query_as::<_, Purchase>(
        "SELECT * FROM purchase_history WHERE user_id = $1 ORDER BY purchase_date DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(purchases)
}

pub async fn get_purchase(pool: &DbPool, purchase_id: i64) -> Result<Purchase, AppError> {
    sqlx::query_as::<_, Purchase>("SELECT * FROM purchase_history WHERE id = $1")
        .bind(purchase_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::PurchaseNotFound)
}

/// Every line of the order that `purchase` belongs to.
pub async fn order_lines(pool: &DbPool, purchase: &Purchase) -> Result<Vec<Purchase>, AppError> {
    let lines = sqlx::query_as::<_, Purchase>(
        "SELECT * FROM purchase_history WHERE order_number = $1 ORDER BY id",
    )
    .bind(&purchase.order_number)
    .fetch_all(pool)
    .await?;
    Ok(lines)
}

pub async fn delete_purchase(pool: &DbPool, purchase_id: i64) -> Result<(), AppError> {
    let deleted = sqlx::query("DELETE FROM purchase_history WHERE id = $1")
        .bind(purchase_id)
        .execute(pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(AppError::PurchaseNotFound);
    }
    tracing::info!(purchase_id, "Purchase deleted");
    Ok(())
}

pub async fn all_purchases(pool: &DbPool) -> Result<Vec<Purchase>, AppError> {
    let purchases = sqlx::query_as::<_, Purchase>(
        "SELECT * FROM purchase_history ORDER BY purchase_date DESC, id DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(purchases)
}

pub async fn recent_purchases(pool: &DbPool) -> Result<Vec<Purchase>, AppError> {
    let purchases = sqlx::query_as::<_, Purchase>(
        "SELECT * FROM purchase_history ORDER BY purchase_date DESC, id DESC LIMIT $1",
    )
    .bind(RECENT_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(purchases)
}

/// (row count, revenue in cents)
async fn totals(pool: &DbPool) -> Result<(i64, i64), AppError> {
    let totals = sqlx::query_as::<_, (i64, i64)>(
        "SELECT COUNT(*), COALESCE(SUM(total_cents), 0)::BIGINT FROM purchase_history",
    )
    .fetch_one(pool)
    .await?;
    Ok(totals)
}

pub async fn stats(pool: &DbPool) -> Result<PurchaseStats, AppError> {
    let (total_orders, total_revenue_cents) = totals(pool).await?;

    let units_per_record = sqlx::query_as::<_, RecordSales>(
        r#"
        SELECT record_id, SUM(quantity)::BIGINT AS units_sold
        FROM purchase_history
        GROUP BY record_id
        ORDER BY units_sold DESC, record_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let average_order_value_cents = if total_orders > 0 {
        total_revenue_cents / total_orders
    } else {
        0
    };

    Ok(PurchaseStats {
        total_orders,
        total_revenue_cents,
        units_per_record,
        average_order_value_cents,
    })
}

pub async fn dashboard(pool: &DbPool, active_users: usize) -> Result<AdminDashboard, AppError> {
    let (total_orders, total_revenue_cents) = totals(pool).await?;
    let recent_purchases = recent_purchases(pool).await?;

    Ok(AdminDashboard {
        total_orders,
        total_revenue_cents,
        active_users,
        recent_purchases,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreatePurchaseRequest {
        CreatePurchaseRequest {
            user_id: Some(1),
            is_guest: false,
            record_id: 3,
            quantity: 2,
            price_cents: 1999,
            order_number: None,
            discount_percentage: None,
        }
    }

    #[test]
    fn order_number_format() {
        let number = generate_order_number();
        assert_eq!(number.len(), 12);
        assert!(number.starts_with("ORD-"));
        assert!(
            number[4..]
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        );
    }

    #[test]
    fn order_numbers_differ() {
        assert_ne!(generate_order_number(), generate_order_number());
    }

    #[test]
    fn purchase_validation() {
        assert!(validate_purchase(&request()).is_ok());

        for broken in [
            CreatePurchaseRequest { record_id: 0, ..request() },
            CreatePurchaseRequest { price_cents: 0, ..request() },
            CreatePurchaseRequest { price_cents: i64::MAX / 10, ..request() },
            CreatePurchaseRequest { quantity: 0, ..request() },
            CreatePurchaseRequest { discount_percentage: Some(101), ..request() },
        ] {
            assert!(matches!(validate_purchase(&broken), Err(AppError::InvalidRequest(_))));
        }
    }
}
