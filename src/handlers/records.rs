//! Record catalogue HTTP handlers.
//!
//! This module implements the record endpoints:
//! - POST /records - Create a record with images (admin, multipart)
//! - PUT /records/{id} - Update a record and its images (admin, multipart)
//! - GET /records, GET /records/{id} - Browse the catalogue
//! - DELETE /records/{id} - Remove a record (admin)
//! - GET /records/genre/{name}, /records/artist/{artist} - Filtered listings
//! - GET /records/new-releases[/{genre}] - Added in the last 24 hours
//! - GET /records/top-artists - Best sellers of the three top artists
//! - Image listing, download and deletion

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::{
    AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::record::{
        ImageUpload, InventoryUpdate, InventoryUpdateType, RecordImageMeta, RecordRequest,
        RecordResponse,
    },
    services::{record_service, subscriber_service},
};

/// Multipart part carrying the record JSON.
const RECORD_PART: &str = "record";
/// Multipart part(s) carrying image files.
const IMAGES_PART: &str = "images";

/// Split a multipart body into the record JSON and its image uploads.
async fn read_record_form(
    mut multipart: Multipart,
) -> Result<(RecordRequest, Vec<ImageUpload>), AppError> {
    let mut record = None;
    let mut images = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(RECORD_PART) => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidRequest(format!("Unreadable record part: {e}")))?;
                let request: RecordRequest = serde_json::from_slice(&bytes)
                    .map_err(|e| AppError::InvalidRequest(format!("Invalid record JSON: {e}")))?;
                record = Some(request);
            }
            Some(IMAGES_PART) => {
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidImage(format!("Unreadable image part: {e}")))?;
                images.push(ImageUpload {
                    content_type,
                    data: data.to_vec(),
                });
            }
            other => tracing::debug!(part = ?other, "Ignoring unexpected multipart part"),
        }
    }

    let record = record.ok_or_else(|| {
        AppError::InvalidRequest(format!("Missing '{RECORD_PART}' part"))
    })?;
    Ok((record, images))
}

/// Create a record.
///
/// # Endpoint
///
/// `POST /records` (admin)
///
/// # Request Body
///
/// `multipart/form-data` with a `record` part (JSON, see [`RecordRequest`])
/// and zero or more `images` parts.
///
/// # Response
///
/// - **Success (201 Created)**: The record with its image metadata
/// - **Error (400)**: Validation failed or unknown genre
/// - **Error (409)**: Title already exists
///
/// Subscribers are emailed about the new release in the background.
pub async fn create_record(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<RecordResponse>), AppError> {
    auth.ensure_admin()?;
    let (request, images) = read_record_form(multipart).await?;

    let record = record_service::create_record(&state.pool, request, images).await?;
    state.hub.publish_inventory_update(&InventoryUpdate::for_response(
        &record,
        InventoryUpdateType::Created,
    ));

    let notify_state = state.clone();
    let released = record.clone();
    tokio::spawn(async move {
        if let Err(e) = subscriber_service::notify_new_release(
            &notify_state.pool,
            &notify_state.mailer,
            std::slice::from_ref(&released),
        )
        .await
        {
            tracing::error!(record_id = released.id, error = %e, "New release notification failed");
        }
    });

    Ok((StatusCode::CREATED, Json(record)))
}

/// `PUT /records/{id}` (admin, multipart)
///
/// `images_to_delete` in the record JSON lists image ids to drop; new
/// `images` parts are appended.
pub async fn update_record(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(record_id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<RecordResponse>, AppError> {
    auth.ensure_admin()?;
    let (request, images) = read_record_form(multipart).await?;

    let record = record_service::update_record(&state.pool, record_id, request, images).await?;
    state.hub.publish_inventory_update(&InventoryUpdate::for_response(
        &record,
        InventoryUpdateType::Updated,
    ));
    Ok(Json(record))
}

pub async fn list_records(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RecordResponse>>, AppError> {
    Ok(Json(record_service::list_records(&state.pool).await?))
}

pub async fn get_record(
    State(state): State<Arc<AppState>>,
    Path(record_id): Path<i64>,
) -> Result<Json<RecordResponse>, AppError> {
    Ok(Json(record_service::get_record(&state.pool, record_id).await?))
}

pub async fn delete_record(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(record_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    auth.ensure_admin()?;
    let record = record_service::delete_record(&state.pool, record_id).await?;
    state.hub.publish_inventory_update(&InventoryUpdate::for_record(
        &record,
        InventoryUpdateType::Deleted,
    ));
    Ok(StatusCode::NO_CONTENT)
}

pub async fn records_by_genre(
    State(state): State<Arc<AppState>>,
    Path(genre): Path<String>,
) -> Result<Json<Vec<RecordResponse>>, AppError> {
    Ok(Json(record_service::records_by_genre(&state.pool, &genre).await?))
}

/// `GET /records/artist/{artist}`; `-` in the path stands for a space.
pub async fn records_by_artist(
    State(state): State<Arc<AppState>>,
    Path(artist): Path<String>,
) -> Result<Json<Vec<RecordResponse>>, AppError> {
    Ok(Json(record_service::records_by_artist(&state.pool, &artist).await?))
}

pub async fn new_releases(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RecordResponse>>, AppError> {
    Ok(Json(record_service::new_releases(&state.pool, None).await?))
}

pub async fn new_releases_by_genre(
    State(state): State<Arc<AppState>>,
    Path(genre): Path<String>,
) -> Result<Json<Vec<RecordResponse>>, AppError> {
    Ok(Json(
        record_service::new_releases(&state.pool, Some(&genre)).await?,
    ))
}

pub async fn top_artists(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RecordResponse>>, AppError> {
    Ok(Json(record_service::top_artists(&state.pool).await?))
}

pub async fn list_images(
    State(state): State<Arc<AppState>>,
    Path(record_id): Path<i64>,
) -> Result<Json<Vec<RecordImageMeta>>, AppError> {
    Ok(Json(record_service::list_images(&state.pool, record_id).await?))
}

/// Raw image bytes, served with the stored content type.
pub async fn get_image(
    State(state): State<Arc<AppState>>,
    Path(image_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let image = record_service::get_image(&state.pool, image_id).await?;
    Ok(([(header::CONTENT_TYPE, image.image_type)], image.image_data))
}

pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(image_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    auth.ensure_admin()?;
    record_service::delete_image(&state.pool, image_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
