//! Record reviews: one per user and record.

use crate::{
    db::DbPool,
    error::AppError,
    models::review::{CreateReviewRequest, Review, UpdateReviewRequest},
    services::{record_service, validation},
};

fn validate_rating(rating: i32) -> Result<(), AppError> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::InvalidRequest(
            "Rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(())
}

/// Blank comments are stored as `NULL`.
fn normalize_comment(comment: Option<String>) -> Option<String> {
    comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// # Errors
///
/// - `InvalidRequest`: rating outside 1..=5
/// - `RecordNotFound`: the record does not exist
/// - `DuplicateReview`: the user already reviewed this record
pub async fn create_review(pool: &DbPool, request: CreateReviewRequest) -> Result<Review, AppError> {
    validate_rating(request.rating)?;
    record_service::find_record(pool, request.record_id).await?;

    let review = sqlx::query_as::<_, Review>(
        r#"
        INSERT INTO reviews (user_id, record_id, rating, comment)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(request.user_id)
    .bind(request.record_id)
    .bind(request.rating)
    .bind(normalize_comment(request.comment))
    .fetch_one(pool)
    .await
    .map_err(|e| validation::unique_violation_as(e, AppError::DuplicateReview))?;

    tracing::info!(review_id = review.id, record_id = review.record_id, "Review created");
    Ok(review)
}

pub async fn get_review(pool: &DbPool, review_id: i64) -> Result<Review, AppError> {
    sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
        .bind(review_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::ReviewNotFound)
}

pub async fn reviews_for_record(pool: &DbPool, record_id: i64) -> Result<Vec<Review>, AppError> {
    let reviews = sqlx::query_as::<_, Review>(
        "SELECT * FROM reviews WHERE record_id = $1 ORDER BY created_at DESC",
    )
    .bind(record_id)
    .fetch_all(pool)
    .await?;
    Ok(reviews)
}

pub async fn update_review(
    pool: &DbPool,
    review_id: i64,
    request: UpdateReviewRequest,
) -> Result<Review, AppError> {
    validate_rating(request.rating)?;

    sqlx::query_as::<_, Review>(
        r#"
        UPDATE reviews SET rating = $1, comment = $2, updated_at = NOW()
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(request.rating)
    .bind(normalize_comment(request.comment))
    .bind(review_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::ReviewNotFound)
}

pub async fn delete_review(pool: &DbPool, review_id: i64) -> Result<(), AppError> {
    let deleted = sqlx::query("DELETE FROM reviews WHERE id = $1")
        .bind(review_id)
        .execute(pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(AppError::ReviewNotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn blank_comment_becomes_none() {
        assert_eq!(normalize_comment(Some("   ".to_string())), None);
        assert_eq!(
            normalize_comment(Some(" Great pressing ".to_string())),
            Some("Great pressing".to_string())
        );
    }
}
