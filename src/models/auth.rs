//! Login request/response bodies.

use serde::{Deserialize, Serialize};

/// Credentials posted to `POST /tokens`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Identity returned after login or token validation.
///
/// The token itself travels only in the HttpOnly cookie, never in the body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginResponse {
    pub user_id: i64,
    pub email: String,
    pub is_admin: bool,
}
