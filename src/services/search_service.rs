//! Catalogue and order search.

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        purchase::Purchase,
        record::{Record, RecordResponse},
    },
    services::record_service,
};

/// `%term%` with LIKE wildcards in the term escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Records whose title, artist or genre contains `term`, ignoring case.
///
/// A blank term matches nothing.
pub async fn search_records(pool: &DbPool, term: &str) -> Result<Vec<RecordResponse>, AppError> {
    if term.trim().is_empty() {
        return Ok(Vec::new());
    }

    let records = sqlx::query_as::<_, Record>(
        r#"
        SELECT r.* FROM records r
        JOIN genres g ON g.id = r.genre_id
        WHERE r.title ILIKE $1 OR r.artist ILIKE $1 OR g.name ILIKE $1
        ORDER BY r.title
        "#,
    )
    .bind(like_pattern(term))
    .fetch_all(pool)
    .await
    .inspect_err(|e| tracing::error!(term, error = %e, "Record search failed"))?;

    record_service::into_record_responses(pool, records).await
}

/// Purchases matching order number, status or record title; a numeric term
/// also matches the purchase id.
pub async fn search_orders(pool: &DbPool, term: &str) -> Result<Vec<Purchase>, AppError> {
    let term = term.trim();
    if term.is_empty() {
        return Ok(Vec::new());
    }

    let purchase_id = term.parse::<i64>().ok();

    let purchases = sqlx::query_as::<_, Purchase>(
        r#"
        SELECT p.* FROM purchase_history p
        LEFT JOIN records r ON r.id = p.record_id
        WHERE p.order_number ILIKE $1
           OR p.status ILIKE $1
           OR r.title ILIKE $1
           OR p.id = $2
        ORDER BY p.purchase_date DESC, p.id DESC
        "#,
    )
    .bind(like_pattern(term))
    .bind(purchase_id)
    .fetch_all(pool)
    .await
    .inspect_err(|e| tracing::error!(term, error = %e, "Order search failed"))?;

    Ok(purchases)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" blue "), "%blue%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }

    #[tokio::test]
    async fn blank_terms_short_circuit() {
        let pool = crate::db::create_lazy_pool("postgres://localhost/unused").unwrap();
        assert!(search_records(&pool, "   ").await.unwrap().is_empty());
        assert!(search_orders(&pool, "").await.unwrap().is_empty());
    }
}
