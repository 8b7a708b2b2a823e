//! Persistent per-user shopping basket.
//!
//! The basket only checks stock; it does not reserve it. Stock is taken
//! when the order is paid, under a row lock in the purchase transaction.

use sqlx::PgExecutor;

use crate::{
    db::DbPool,
    error::AppError,
    models::basket::{Basket, BasketItem, BasketResponse, BasketTotalResponse},
    services::record_service,
};

async fn find_basket(pool: &DbPool, user_id: i64) -> Result<Option<Basket>, AppError> {
    let basket = sqlx::query_as::<_, Basket>("SELECT id, user_id FROM baskets WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(basket)
}

/// Existing basket, or a new empty one.
async fn find_or_create_basket<'e>(
    executor: impl PgExecutor<'e>,
    user_id: i64,
) -> Result<Basket, AppError> {
    let basket = sqlx::query_as::<_, Basket>(
        r#"
        INSERT INTO baskets (user_id) VALUES ($1)
        ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
        RETURNING id, user_id
        "#,
    )
    .bind(user_id)
    .fetch_one(executor)
    .await?;
    Ok(basket)
}

async fn load_items(pool: &DbPool, basket_id: i64) -> Result<Vec<BasketItem>, AppError> {
    let items = sqlx::query_as::<_, BasketItem>(
        "SELECT record_id, quantity, added_at FROM basket_items WHERE basket_id = $1 ORDER BY added_at, record_id",
    )
    .bind(basket_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

async fn to_response(pool: &DbPool, basket: Basket) -> Result<BasketResponse, AppError> {
    let items = load_items(pool, basket.id).await?;
    Ok(BasketResponse {
        id: basket.id,
        user_id: basket.user_id,
        items,
    })
}

/// The quantity must be positive and within the record's current stock.
fn check_quantity(title: &str, requested: i32, available: i32) -> Result<(), AppError> {
    if requested <= 0 {
        return Err(AppError::InvalidRequest(
            "Quantity must be positive".to_string(),
        ));
    }
    if requested > available {
        return Err(AppError::OutOfStock {
            title: title.to_string(),
            requested,
            available,
        });
    }
    Ok(())
}

pub async fn get_basket(pool: &DbPool, user_id: i64) -> Result<BasketResponse, AppError> {
    let basket = find_basket(pool, user_id)
        .await?
        .ok_or(AppError::BasketNotFound)?;
    to_response(pool, basket).await
}

/// Add `quantity` of a record, merging with any existing line.
///
/// # Errors
///
/// - `RecordNotFound`: no such record
/// - `OutOfStock`: the merged quantity exceeds the stock
pub async fn add_item(
    pool: &DbPool,
    user_id: i64,
    record_id: i64,
    quantity: i32,
) -> Result<BasketResponse, AppError> {
    if quantity <= 0 {
        return Err(AppError::InvalidRequest(
            "Quantity must be positive".to_string(),
        ));
    }

    let record = record_service::find_record(pool, record_id).await?;

    let mut tx = pool.begin().await?;
    let basket = find_or_create_basket(&mut *tx, user_id).await?;

    // The row lock taken by the upsert serializes concurrent adds of one record
    let merged: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO basket_items (basket_id, record_id, quantity)
        VALUES ($1, $2, $3)
        ON CONFLICT (basket_id, record_id) DO UPDATE
            SET quantity = LEAST(basket_items.quantity::BIGINT + EXCLUDED.quantity, 2147483647)::INTEGER
        RETURNING quantity
        "#,
    )
    .bind(basket.id)
    .bind(record_id)
    .bind(quantity)
    .fetch_one(&mut *tx)
    .await?;

    // Dropping the transaction on error rolls the merge back
    check_quantity(&record.title, merged, record.quantity)?;
    tx.commit().await?;

    tracing::debug!(user_id, record_id, quantity = merged, "Basket item added");
    to_response(pool, basket).await
}

/// Set the quantity of a line already in the basket.
pub async fn update_item(
    pool: &DbPool,
    user_id: i64,
    record_id: i64,
    quantity: i32,
) -> Result<BasketResponse, AppError> {
    let basket = find_basket(pool, user_id)
        .await?
        .ok_or(AppError::BasketNotFound)?;

    let record = record_service::find_record(pool, record_id).await?;
    check_quantity(&record.title, quantity, record.quantity)?;

    let updated = sqlx::query(
        "UPDATE basket_items SET quantity = $1 WHERE basket_id = $2 AND record_id = $3",
    )
    .bind(quantity)
    .bind(basket.id)
    .bind(record_id)
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(AppError::RecordNotInBasket { record_id, user_id });
    }

    to_response(pool, basket).await
}

pub async fn remove_item(
    pool: &DbPool,
    user_id: i64,
    record_id: i64,
) -> Result<BasketResponse, AppError> {
    let basket = find_basket(pool, user_id)
        .await?
        .ok_or(AppError::BasketNotFound)?;

    let removed = sqlx::query("DELETE FROM basket_items WHERE basket_id = $1 AND record_id = $2")
        .bind(basket.id)
        .bind(record_id)
        .execute(pool)
        .await?
        .rows_affected();

    if removed == 0 {
        return Err(AppError::RecordNotInBasket { record_id, user_id });
    }

    to_response(pool, basket).await
}

/// Empty the basket, creating it first if the user has none.
pub async fn clear_basket(pool: &DbPool, user_id: i64) -> Result<BasketResponse, AppError> {
    let basket = find_or_create_basket(pool, user_id).await?;

    sqlx::query("DELETE FROM basket_items WHERE basket_id = $1")
        .bind(basket.id)
        .execute(pool)
        .await?;

    to_response(pool, basket).await
}

/// Price the basket at current record prices.
pub async fn basket_total(pool: &DbPool, user_id: i64) -> Result<BasketTotalResponse, AppError> {
    let basket = find_basket(pool, user_id)
        .await?
        .ok_or(AppError::BasketNotFound)?;

    let (item_count, total_cents): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(bi.quantity), 0)::BIGINT,
               COALESCE(SUM(bi.quantity * r.price_cents), 0)::BIGINT
        FROM basket_items bi
        JOIN records r ON r.id = bi.record_id
        WHERE bi.basket_id = $1
        "#,
    )
    .bind(basket.id)
    .fetch_one(pool)
    .await?;

    Ok(BasketTotalResponse {
        user_id,
        item_count,
        total_cents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_within_stock_is_accepted() {
        assert!(check_quantity("Blue Train", 2, 2).is_ok());
    }

    #[test]
    fn quantity_above_stock_reports_both_numbers() {
        let err = check_quantity("Blue Train", 3, 2).unwrap_err();
        assert!(matches!(
            err,
            AppError::OutOfStock { requested: 3, available: 2, .. }
        ));
    }

    #[test]
    fn zero_or_negative_quantity_is_invalid() {
        assert!(matches!(check_quantity("x", 0, 5), Err(AppError::InvalidRequest(_))));
        assert!(matches!(check_quantity("x", -1, 5), Err(AppError::InvalidRequest(_))));
    }
}
