//! Genre catalogue persistence.

use crate::{
    db::DbPool,
    error::AppError,
    models::genre::{Genre, GenreKind},
};

/// Insert every catalogue genre that is missing. Safe to run on every start.
pub async fn seed_genres(pool: &DbPool) -> Result<(), AppError> {
    let mut inserted = 0;
    for kind in GenreKind::ALL {
        inserted += sqlx::query("INSERT INTO genres (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(kind.display_name())
            .execute(pool)
            .await?
            .rows_affected();
    }

    if inserted > 0 {
        tracing::info!(inserted, "Seeded genres");
    }
    Ok(())
}

pub async fn list_genres(pool: &DbPool) -> Result<Vec<Genre>, AppError> {
    let genres = sqlx::query_as::<_, Genre>("SELECT id, name FROM genres ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(genres)
}

pub async fn get_genre(pool: &DbPool, genre_id: i64) -> Result<Genre, AppError> {
    sqlx::query_as::<_, Genre>("SELECT id, name FROM genres WHERE id = $1")
        .bind(genre_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::GenreNotFound)
}

/// Case-insensitive lookup by stored name.
pub async fn find_by_name(pool: &DbPool, name: &str) -> Result<Option<Genre>, AppError> {
    let genre = sqlx::query_as::<_, Genre>("SELECT id, name FROM genres WHERE LOWER(name) = LOWER($1)")
        .bind(name.trim())
        .fetch_optional(pool)
        .await?;
    Ok(genre)
}

/// Create a catalogue genre if it does not exist yet.
///
/// # Errors
///
/// - `InvalidRequest`: `raw_name` is not one of the catalogue genres
pub async fn create_genre(pool: &DbPool, raw_name: &str) -> Result<Genre, AppError> {
    let kind = GenreKind::parse(raw_name)
        .ok_or_else(|| AppError::InvalidRequest(format!("Unknown genre: {raw_name}")))?;

    sqlx::query("INSERT INTO genres (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
        .bind(kind.display_name())
        .execute(pool)
        .await?;

    let genre = sqlx::query_as::<_, Genre>("SELECT id, name FROM genres WHERE name = $1")
        .bind(kind.display_name())
        .fetch_one(pool)
        .await?;

    tracing::info!(genre_id = genre.id, name = %genre.name, "Genre ensured");
    Ok(genre)
}
