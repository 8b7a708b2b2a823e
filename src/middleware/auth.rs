//! Session token authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Read the session token from the auth cookie, or from `Authorization: Bearer`
//! 2. Verify its HS256 signature and expiry
//! 3. Inject an [`AuthContext`] into the request
//! 4. Reject the request with HTTP 401 otherwise

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    config::Config,
    error::{AppError, Result},
    models::user::User,
};

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user email)
    pub sub: String,
    pub user_id: i64,
    pub is_admin: bool,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
}

/// Authentication context attached to authenticated requests.
///
/// Handlers extract it with `Extension<AuthContext>`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    pub user_id: i64,
    pub email: String,
    pub is_admin: bool,
}

impl AuthContext {
    /// Allow the caller to act on `user_id`'s data only if it is their own,
    /// or if they are an admin.
    pub fn ensure_self_or_admin(&self, user_id: i64) -> Result<()> {
        if self.is_admin || self.user_id == user_id {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn ensure_admin(&self) -> Result<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.sub,
            is_admin: claims.is_admin,
        }
    }
}

/// Create a signed session token for `user`.
pub fn issue_token(user: &User, config: &Config) -> anyhow::Result<String> {
    let now = chrono::Utc::now().timestamp() as usize;

    let claims = Claims {
        sub: user.email.clone(),
        user_id: user.id,
        is_admin: user.is_admin,
        iat: now,
        exp: now + config.jwt_expiration_secs as usize,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?)
}

/// Verify signature and expiry. A leading `Bearer ` is tolerated.
pub fn decode_token(token: &str, config: &Config) -> Result<Claims> {
    let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
    if token.is_empty() {
        return Err(AppError::Unauthorized);
    }

    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected session token");
            AppError::Unauthorized
        })
}

/// Token from the auth cookie, falling back to the bearer header.
pub fn extract_token(jar: &CookieJar, headers: &HeaderMap, config: &Config) -> Option<String> {
    if let Some(cookie) = jar.get(&config.jwt_cookie_name) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Authenticate `jar`/`headers` into an [`AuthContext`].
pub fn authenticate(jar: &CookieJar, headers: &HeaderMap, config: &Config) -> Result<AuthContext> {
    let token = extract_token(jar, headers, config).ok_or(AppError::Unauthorized)?;
    Ok(decode_token(&token, config)?.into())
}

/// Middleware that requires a valid session token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let auth_context = authenticate(&jar, request.headers(), &state.config)?;

    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await)
}

/// HttpOnly session cookie carrying `token`.
pub fn session_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build((config.jwt_cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(time::Duration::seconds(config.jwt_expiration_secs as i64))
        .build()
}

/// Expired copy of the session cookie, with the same attributes, so browsers drop it.
pub fn removal_cookie(config: &Config) -> Cookie<'static> {
    Cookie::build((config.jwt_cookie_name.clone(), ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(time::Duration::ZERO)
        .build()
}
