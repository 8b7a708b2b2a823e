//! Record catalogue service.
//!
//! This service handles:
//! - Record CRUD with title uniqueness and genre checks
//! - Cover image storage and validation
//! - Catalogue queries (by genre, by artist, new releases, top artists)

use std::collections::HashMap;

use chrono::{Duration, Utc};

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        genre::GenreKind,
        record::{ImageUpload, Record, RecordImage, RecordImageMeta, RecordRequest, RecordResponse},
    },
    services::validation,
};

pub const MAX_IMAGES_PER_RECORD: i64 = 4;
pub const MAX_IMAGE_BYTES: usize = 5_000_000;

/// How far back `new-releases` looks.
const NEW_RELEASE_WINDOW_HOURS: i64 = 24;

pub fn validate_record(request: &RecordRequest) -> Result<(), AppError> {
    validation::require_non_blank("title", &request.title)?;
    validation::require_non_blank("artist", &request.artist)?;
    validation::require_non_blank("condition", &request.condition)?;
    validation::require_price("price_cents", request.price_cents)?;
    if request.year < 1900 {
        return Err(AppError::InvalidRequest(
            "year must be 1900 or later".to_string(),
        ));
    }
    if request.quantity < 0 {
        return Err(AppError::InvalidRequest(
            "quantity cannot be negative".to_string(),
        ));
    }
    Ok(())
}

/// Check an uploaded image and return its content type.
pub fn validate_image(upload: &ImageUpload) -> Result<String, AppError> {
    if upload.data.is_empty() {
        return Err(AppError::InvalidImage("Image file is empty".to_string()));
    }
    if upload.data.len() > MAX_IMAGE_BYTES {
        return Err(AppError::InvalidImage(format!(
            "Image exceeds {MAX_IMAGE_BYTES} bytes"
        )));
    }
    match upload.content_type.as_deref() {
        Some(content_type) if content_type.starts_with("image/") => Ok(content_type.to_string()),
        _ => Err(AppError::InvalidImage(
            "Only image files are allowed".to_string(),
        )),
    }
}

/// Image metadata row including its owner, for batch loading.
#[derive(sqlx::FromRow)]
struct OwnedImageMeta {
    id: i64,
    record_id: i64,
    image_type: String,
}

/// Attach image metadata to each record with a single query.
pub async fn into_record_responses(
    pool: &DbPool,
    records: Vec<Record>,
) -> Result<Vec<RecordResponse>, AppError> {
    let ids: Vec<i64> = records.iter().map(|r| r.id).collect();

    let rows = sqlx::query_as::<_, OwnedImageMeta>(
        "SELECT id, record_id, image_type FROM record_images WHERE record_id = ANY($1) ORDER BY id",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut by_record: HashMap<i64, Vec<RecordImageMeta>> = HashMap::new();
    for row in rows {
        by_record.entry(row.record_id).or_default().push(RecordImageMeta {
            id: row.id,
            image_type: row.image_type,
        });
    }

    Ok(records
        .into_iter()
        .map(|record| {
            let images = by_record.remove(&record.id).unwrap_or_default();
            RecordResponse::from_record(record, images)
        })
        .collect())
}

async fn into_response(pool: &DbPool, record: Record) -> Result<RecordResponse, AppError> {
    let images = list_image_meta(pool, record.id).await?;
    Ok(RecordResponse::from_record(record, images))
}

async fn ensure_genre_exists(pool: &DbPool, genre_id: i64) -> Result<(), AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM genres WHERE id = $1)")
        .bind(genre_id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(AppError::InvalidRequest(format!("Genre {genre_id} not found")));
    }
    Ok(())
}

/// Store uploaded images for a record, skipping (and logging) any that fail.
async fn store_images(pool: &DbPool, record_id: i64, images: Vec<ImageUpload>) {
    for upload in images {
        if let Err(e) = add_image(pool, record_id, upload).await {
            tracing::warn!(record_id, error = %e, "Skipped record image");
        }
    }
}

/// Store one image, enforcing the per-record limit.
pub async fn add_image(
    pool: &DbPool,
    record_id: i64,
    upload: ImageUpload,
) -> Result<RecordImageMeta, AppError> {
    let content_type = validate_image(&upload)?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM record_images WHERE record_id = $1")
        .bind(record_id)
        .fetch_one(pool)
        .await?;
    if count >= MAX_IMAGES_PER_RECORD {
        return Err(AppError::InvalidImage(format!(
            "A record can have at most {MAX_IMAGES_PER_RECORD} images"
        )));
    }

    let meta = sqlx::query_as::<_, RecordImageMeta>(
        "INSERT INTO record_images (record_id, image_data, image_type) VALUES ($1, $2, $3) RETURNING id, image_type",
    )
    .bind(record_id)
    .bind(upload.data)
    .bind(content_type)
    .fetch_one(pool)
    .await?;

    Ok(meta)
}

/// Create a record and store its images.
///
/// Image failures are logged and do not fail creation.
///
/// # Errors
///
/// - `InvalidRequest`: field validation failed or the genre does not exist
/// - `DuplicateRecordTitle`: another record has the same title
pub async fn create_record(
    pool: &DbPool,
    request: RecordRequest,
    images: Vec<ImageUpload>,
) -> Result<RecordResponse, AppError> {
    validate_record(&request)?;
    ensure_genre_exists(pool, request.genre_id).await?;

    let record = sqlx::query_as::<_, Record>(
        r#"
        INSERT INTO records (title, artist, genre_id, price_cents, release_year, condition, quantity)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(request.title.trim())
    .bind(request.artist.trim())
    .bind(request.genre_id)
    .bind(request.price_cents)
    .bind(request.year)
    .bind(request.condition.trim())
    .bind(request.quantity)
    .fetch_one(pool)
    .await
    .map_err(|e| validation::unique_violation_as(e, AppError::DuplicateRecordTitle))?;

    tracing::info!(record_id = record.id, title = %record.title, "Record created");

    store_images(pool, record.id, images).await;
    into_response(pool, record).await
}

/// Update a record, delete the listed images and append new ones.
///
/// # Errors
///
/// - `RecordNotFound`: no such record
/// - `InvalidRequest`, `DuplicateRecordTitle`: as for [`create_record`]
pub async fn update_record(
    pool: &DbPool,
    record_id: i64,
    request: RecordRequest,
    images: Vec<ImageUpload>,
) -> Result<RecordResponse, AppError> {
    validate_record(&request)?;
    ensure_genre_exists(pool, request.genre_id).await?;

    let record = sqlx::query_as::<_, Record>(
        r#"
        UPDATE records
        SET title = $1, artist = $2, genre_id = $3, price_cents = $4,
            release_year = $5, condition = $6, quantity = $7
        WHERE id = $8
        RETURNING *
        "#,
    )
    .bind(request.title.trim())
    .bind(request.artist.trim())
    .bind(request.genre_id)
    .bind(request.price_cents)
    .bind(request.year)
    .bind(request.condition.trim())
    .bind(request.quantity)
    .bind(record_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| validation::unique_violation_as(e, AppError::DuplicateRecordTitle))?
    .ok_or(AppError::RecordNotFound)?;

    for image_id in request.images_to_delete {
        let result = sqlx::query("DELETE FROM record_images WHERE id = $1 AND record_id = $2")
            .bind(image_id)
            .bind(record_id)
            .execute(pool)
            .await;
        match result {
            Ok(done) if done.rows_affected() == 0 => {
                tracing::warn!(record_id, image_id, "Image to delete not found on record");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(record_id, image_id, error = %e, "Failed to delete record image"),
        }
    }

    store_images(pool, record_id, images).await;

    tracing::info!(record_id, "Record updated");
    into_response(pool, record).await
}

/// Raw record row, for callers that need stock or price.
pub async fn find_record(pool: &DbPool, record_id: i64) -> Result<Record, AppError> {
    sqlx::query_as::<_, Record>("SELECT * FROM records WHERE id = $1")
        .bind(record_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::RecordNotFound)
}

pub async fn get_record(pool: &DbPool, record_id: i64) -> Result<RecordResponse, AppError> {
    let record = find_record(pool, record_id).await?;
    into_response(pool, record).await
}

pub async fn list_records(pool: &DbPool) -> Result<Vec<RecordResponse>, AppError> {
    let records = sqlx::query_as::<_, Record>("SELECT * FROM records ORDER BY id")
        .fetch_all(pool)
        .await?;
    into_record_responses(pool, records).await
}

/// Delete a record and return the row as it was.
pub async fn delete_record(pool: &DbPool, record_id: i64) -> Result<Record, AppError> {
    let record = sqlx::query_as::<_, Record>("DELETE FROM records WHERE id = $1 RETURNING *")
        .bind(record_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::RecordNotFound)?;

    tracing::info!(record_id, title = %record.title, "Record deleted");
    Ok(record)
}

/// Stored genre name for a URL segment such as `hip_hop`; unknown names pass through.
fn genre_name_for(raw: &str) -> String {
    GenreKind::parse(raw)
        .map(|kind| kind.display_name().to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

pub async fn records_by_genre(pool: &DbPool, genre: &str) -> Result<Vec<RecordResponse>, AppError> {
    let records = sqlx::query_as::<_, Record>(
        r#"
        SELECT r.* FROM records r
        JOIN genres g ON g.id = r.genre_id
        WHERE LOWER(g.name) = LOWER($1)
        ORDER BY r.id
        "#,
    )
    .bind(genre_name_for(genre))
    .fetch_all(pool)
    .await?;
    into_record_responses(pool, records).await
}

/// Records by artist; `-` in the path segment stands for a space.
pub async fn records_by_artist(pool: &DbPool, artist: &str) -> Result<Vec<RecordResponse>, AppError> {
    let artist = artist.replace('-', " ");
    let records = sqlx::query_as::<_, Record>(
        "SELECT * FROM records WHERE LOWER(artist) = LOWER($1) ORDER BY id",
    )
    .bind(artist.trim())
    .fetch_all(pool)
    .await?;
    into_record_responses(pool, records).await
}

/// Records added within the last day, optionally filtered by genre.
pub async fn new_releases(
    pool: &DbPool,
    genre: Option<&str>,
) -> Result<Vec<RecordResponse>, AppError> {
    let since = Utc::now() - Duration::hours(NEW_RELEASE_WINDOW_HOURS);

    let records = match genre {
        Some(genre) => {
            sqlx::query_as::<_, Record>(
                r#"
                SELECT r.* FROM records r
                JOIN genres g ON g.id = r.genre_id
                WHERE r.created_at >= $1 AND LOWER(g.name) = LOWER($2)
                ORDER BY r.created_at DESC
                "#,
            )
            .bind(since)
            .bind(genre_name_for(genre))
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Record>(
                "SELECT * FROM records WHERE created_at >= $1 ORDER BY created_at DESC",
            )
            .bind(since)
            .fetch_all(pool)
            .await?
        }
    };

    into_record_responses(pool, records).await
}

/// Units sold per record, zero for records never bought.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecordSalesRow {
    pub record_id: i64,
    pub artist: String,
    pub units_sold: i64,
}

/// Rank artists by total units sold and pick each one's best-selling record.
///
/// Returns record ids, best artist first. Artists with equal totals are
/// ordered by name; a tie between records goes to the lower id.
pub fn rank_top_artists(rows: &[RecordSalesRow], limit: usize) -> Vec<i64> {
    // artist -> (total units, best record id, best record units)
    let mut artists: HashMap<&str, (i64, i64, i64)> = HashMap::new();
    for row in rows {
        let entry = artists
            .entry(row.artist.as_str())
            .or_insert((0, row.record_id, row.units_sold));
        entry.0 += row.units_sold;
        if row.units_sold > entry.2 || (row.units_sold == entry.2 && row.record_id < entry.1) {
            entry.1 = row.record_id;
            entry.2 = row.units_sold;
        }
    }

    let mut ranked: Vec<(&str, i64, i64)> = artists
        .into_iter()
        .map(|(artist, (total, best, _))| (artist, total, best))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    ranked.into_iter().take(limit).map(|(_, _, best)| best).collect()
}

/// Best-selling record of each of the three best-selling artists.
pub async fn top_artists(pool: &DbPool) -> Result<Vec<RecordResponse>, AppError> {
    let rows = sqlx::query_as::<_, RecordSalesRow>(
        r#"
        SELECT r.id AS record_id, r.artist, COALESCE(SUM(p.quantity), 0)::BIGINT AS units_sold
        FROM records r
        LEFT JOIN purchase_history p ON p.record_id = r.id
        GROUP BY r.id, r.artist
        "#,
    )
    .fetch_all(pool)
    .await?;

    let ids = rank_top_artists(&rows, 3);

    let mut records = sqlx::query_as::<_, Record>("SELECT * FROM records WHERE id = ANY($1)")
        .bind(&ids)
        .fetch_all(pool)
        .await?;
    records.sort_by_key(|r| ids.iter().position(|id| *id == r.id));

    into_record_responses(pool, records).await
}

async fn list_image_meta(pool: &DbPool, record_id: i64) -> Result<Vec<RecordImageMeta>, AppError> {
    let images = sqlx::query_as::<_, RecordImageMeta>(
        "SELECT id, image_type FROM record_images WHERE record_id = $1 ORDER BY id",
    )
    .bind(record_id)
    .fetch_all(pool)
    .await?;
    Ok(images)
}

pub async fn list_images(pool: &DbPool, record_id: i64) -> Result<Vec<RecordImageMeta>, AppError> {
    find_record(pool, record_id).await?;
    list_image_meta(pool, record_id).await
}

pub async fn get_image(pool: &DbPool, image_id: i64) -> Result<RecordImage, AppError> {
    sqlx::query_as::<_, RecordImage>("SELECT * FROM record_images WHERE id = $1")
        .bind(image_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::ImageNotFound)
}

pub async fn delete_image(pool: &DbPool, image_id: i64) -> Result<(), AppError> {
    let deleted = sqlx::query("DELETE FROM record_images WHERE id = $1")
        .bind(image_id)
        .execute(pool)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(AppError::ImageNotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales(record_id: i64, artist: &str, units_sold: i64) -> RecordSalesRow {
        RecordSalesRow {
            record_id,
            artist: artist.to_string(),
            units_sold,
        }
    }

    fn record_request() -> RecordRequest {
        RecordRequest {
            title: "Kind of Blue".to_string(),
            artist: "Miles Davis".to_string(),
            genre_id: 3,
            price_cents: 2999,
            year: 1959,
            condition: "Mint".to_string(),
            quantity: 5,
            images_to_delete: Vec::new(),
        }
    }

    #[test]
    fn ranks_artists_by_total_units() {
        let rows = vec![
            sales(1, "Coltrane", 3),
            sales(2, "Coltrane", 4),
            sales(3, "Davis", 6),
            sales(4, "Monk", 1),
            sales(5, "Evans", 0),
        ];

        // Coltrane 7 (best record 2), Davis 6, Monk 1
        assert_eq!(rank_top_artists(&rows, 3), vec![2, 3, 4]);
    }

    #[test]
    fn ties_go_to_artist_name_then_lower_record_id() {
        let rows = vec![
            sales(10, "Zappa", 2),
            sales(11, "Abba", 1),
            sales(12, "Abba", 1),
        ];

        assert_eq!(rank_top_artists(&rows, 3), vec![11, 10]);
    }

    #[test]
    fn no_records_no_artists() {
        assert!(rank_top_artists(&[], 3).is_empty());
    }

    #[test]
    fn record_validation() {
        assert!(validate_record(&record_request()).is_ok());

        let mut free = record_request();
        free.price_cents = 0;
        assert!(validate_record(&free).is_err());

        let mut ancient = record_request();
        ancient.year = 1899;
        assert!(validate_record(&ancient).is_err());

        let mut negative = record_request();
        negative.quantity = -1;
        assert!(validate_record(&negative).is_err());

        let mut untitled = record_request();
        untitled.title = "  ".to_string();
        assert!(validate_record(&untitled).is_err());
    }

    #[test]
    fn image_validation() {
        let ok = ImageUpload {
            content_type: Some("image/png".to_string()),
            data: vec![1, 2, 3],
        };
        assert_eq!(validate_image(&ok).unwrap(), "image/png");

        let not_image = ImageUpload {
            content_type: Some("application/pdf".to_string()),
            data: vec![1],
        };
        assert!(matches!(validate_image(&not_image), Err(AppError::InvalidImage(_))));

        let empty = ImageUpload {
            content_type: Some("image/jpeg".to_string()),
            data: Vec::new(),
        };
        assert!(validate_image(&empty).is_err());

        let huge = ImageUpload {
            content_type: Some("image/jpeg".to_string()),
            data: vec![0; MAX_IMAGE_BYTES + 1],
        };
        assert!(validate_image(&huge).is_err());
    }

    #[test]
    fn genre_segment_maps_to_stored_name() {
        assert_eq!(genre_name_for("hip_hop"), "Hip Hop");
        assert_eq!(genre_name_for("unknown"), "unknown");
    }
}
