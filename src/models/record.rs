//! Vinyl record models and API request/response types.
//!
//! This module defines:
//! - `Record`: Database entity for a record in the catalogue
//! - `RecordImage` / `RecordImageMeta`: Stored cover images and their listing form
//! - `RecordRequest`: Body of the `record` multipart part on create/update
//! - `RecordResponse`: Response body returned to clients
//! - `InventoryUpdate`: Stock change pushed to real-time subscribers
//!
//! # Price Storage
//!
//! Prices are stored as `i64` euro cents, e.g. €24.99 is `2499`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a record row from the database.
///
/// Maps to the `records` table. `quantity` is the stock on hand and never
/// goes below zero (enforced by a CHECK constraint).
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Record {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub genre_id: i64,
    pub price_cents: i64,
    pub release_year: i32,
    pub condition: String,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// A stored cover image, including the raw bytes.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecordImage {
    pub id: i64,
    pub record_id: i64,
    pub image_data: Vec<u8>,
    pub image_type: String,
}

/// Image listing entry; the bytes are fetched separately.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize, PartialEq)]
pub struct RecordImageMeta {
    pub id: i64,
    pub image_type: String,
}

/// An uploaded image before it is stored.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Record fields sent by admins when creating or updating a record.
///
/// # JSON Example
///
/// ```json
/// {
///   "title": "Kind of Blue",
///   "artist": "Miles Davis",
///   "genre_id": 3,
///   "price_cents": 2999,
///   "year": 1959,
///   "condition": "Mint",
///   "quantity": 5,
///   "images_to_delete": [12]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RecordRequest {
    pub title: String,
    pub artist: String,
    pub genre_id: i64,
    pub price_cents: i64,
    pub year: i32,
    pub condition: String,
    pub quantity: i32,

    /// Image ids to remove during an update; ignored on create.
    #[serde(default)]
    pub images_to_delete: Vec<i64>,
}

/// Response body for record endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordResponse {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub genre_id: i64,
    pub price_cents: i64,
    pub year: i32,
    pub condition: String,
    pub quantity: i32,
    pub images: Vec<RecordImageMeta>,
    pub created_at: DateTime<Utc>,
}

impl RecordResponse {
    pub fn from_record(record: Record, images: Vec<RecordImageMeta>) -> Self {
        Self {
            id: record.id,
            title: record.title,
            artist: record.artist,
            genre_id: record.genre_id,
            price_cents: record.price_cents,
            year: record.release_year,
            condition: record.condition,
            quantity: record.quantity,
            images,
            created_at: record.created_at,
        }
    }
}

/// Kind of stock change broadcast on `/topic/inventory`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryUpdateType {
    Created,
    Updated,
    Deleted,
    Purchased,
}

/// Stock change pushed to real-time subscribers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryUpdate {
    pub record_id: i64,
    pub title: String,
    pub quantity: i32,
    pub update_type: InventoryUpdateType,
}

impl InventoryUpdate {
    pub fn for_record(record: &Record, update_type: InventoryUpdateType) -> Self {
        Self {
            record_id: record.id,
            title: record.title.clone(),
            quantity: record.quantity,
            update_type,
        }
    }

    pub fn for_response(record: &RecordResponse, update_type: InventoryUpdateType) -> Self {
        Self {
            record_id: record.id,
            title: record.title.clone(),
            quantity: record.quantity,
            update_type,
        }
    }
}
