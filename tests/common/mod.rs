use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response};
use chrono::Utc;
use spinning_motion::{
    AppState, config::Config, db, db::DbPool, middleware::auth::issue_token, models::user::User,
    routes::create_router, services::genre_service,
};

/// Skip the test unless `TEST_DATABASE_URL` points at a disposable Postgres.
///
/// Evaluates to a migrated, genre-seeded pool.
#[macro_export]
macro_rules! require_database {
    () => {
        match crate::common::test_pool().await {
            Some(pool) => pool,
            None => {
                eprintln!("⚠️  Skipping: TEST_DATABASE_URL not set");
                return;
            }
        }
    };
}

#[allow(dead_code)]
pub async fn test_pool() -> Option<DbPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = db::create_pool(&url)
        .await
        .expect("Failed to connect to test database");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    genre_service::seed_genres(&pool)
        .await
        .expect("Failed to seed genres");
    Some(pool)
}

/// State over a real pool, with the mock gateway and log-only mailer.
#[allow(dead_code)]
pub fn state_with_pool(pool: DbPool) -> Arc<AppState> {
    Arc::new(AppState::new(Config::test_default(), pool).expect("Failed to build state"))
}

/// Create a test app with a lazily connected pool, the mock payment gateway
/// and the log-only mailer. Nothing here touches the network.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let pool = db::create_lazy_pool(&config.database_url).expect("Failed to create lazy pool");
    let state = Arc::new(AppState::new(config, pool).expect("Failed to build state"));
    (create_router(state.clone()), state)
}

#[allow(dead_code)]
pub fn test_user(id: i64, is_admin: bool) -> User {
    User {
        id,
        fname: "Ada".to_string(),
        lname: "Lovelace".to_string(),
        email: format!("user{id}@example.com"),
        password_hash: String::new(),
        address: "12 Vinyl Lane".to_string(),
        postal_code: "5611 AB".to_string(),
        country: "Netherlands".to_string(),
        city: "Eindhoven".to_string(),
        region: None,
        phone_number: "+31612345678".to_string(),
        is_admin,
        created_at: Utc::now(),
    }
}

/// Session token for a user with `id`, signed with the test secret.
#[allow(dead_code)]
pub fn token_for(id: i64, is_admin: bool) -> String {
    issue_token(&test_user(id, is_admin), &Config::test_default()).expect("Failed to issue token")
}

/// `Cookie` header value carrying a session for `id`.
#[allow(dead_code)]
pub fn session_cookie(id: i64, is_admin: bool) -> String {
    format!(
        "{}={}",
        Config::test_default().jwt_cookie_name,
        token_for(id, is_admin)
    )
}

#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
