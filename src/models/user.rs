//! User account models and API request/response types.
//!
//! This module defines:
//! - `User`: Database entity representing a registered customer or admin
//! - `CreateUserRequest` / `UpdateUserRequest`: Request bodies
//! - `UserResponse`: Response body returned to clients (no password hash)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a user record from the database.
///
/// # Database Table
///
/// Maps to the `app_users` table. The password is stored only as an Argon2id
/// PHC string and is never serialized.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub password_hash: String,
    pub address: String,
    pub postal_code: String,
    pub country: String,
    pub city: String,
    pub region: Option<String>,
    pub phone_number: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Request body for registering a new user.
///
/// # JSON Example
///
/// ```json
/// {
///   "fname": "Ada",
///   "lname": "Lovelace",
///   "email": "ada@example.com",
///   "password": "correct horse battery staple",
///   "address": "12 Vinyl Lane",
///   "postal_code": "5611 AB",
///   "country": "Netherlands",
///   "city": "Eindhoven",
///   "region": "Noord-Brabant",
///   "phone_number": "+31612345678"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub password: String,
    pub address: String,
    pub postal_code: String,
    pub country: String,
    pub city: String,
    #[serde(default)]
    pub region: Option<String>,
    pub phone_number: String,
}

/// Request body for updating a profile.
///
/// Password and admin flag are deliberately absent: they cannot be changed here.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserRequest {
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub address: String,
    pub postal_code: String,
    pub country: String,
    pub city: String,
    #[serde(default)]
    pub region: Option<String>,
    pub phone_number: String,
}

/// Response body for user endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub fname: String,
    pub lname: String,
    pub email: String,
    pub address: String,
    pub postal_code: String,
    pub country: String,
    pub city: String,
    pub region: Option<String>,
    pub phone_number: String,
    pub is_admin: bool,
}

/// Convert database User to API UserResponse, dropping the password hash.
impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            fname: user.fname,
            lname: user.lname,
            email: user.email,
            address: user.address,
            postal_code: user.postal_code,
            country: user.country,
            city: user.city,
            region: user.region,
            phone_number: user.phone_number,
            is_admin: user.is_admin,
        }
    }
}
