//! SpinningMotion - Main Application Entry Point
//!
//! REST + WebSocket backend for an online vinyl record shop.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server, WebSocket upgrade)
//! - **Database**: PostgreSQL with sqlx (async queries, versioned migrations)
//! - **Authentication**: HS256 JWT in an HttpOnly cookie, Argon2 password hashes
//! - **Payments**: Hosted checkout sessions and signed webhooks
//! - **Real time**: STOMP frames over WebSocket, fanned out from a broadcast hub
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations and seed the genre catalogue
//! 4. Build shared state (mailer, payment gateway, real-time hub)
//! 5. Build HTTP router and start server on configured port

use std::sync::Arc;

use spinning_motion::{AppState, config, db, routes, services::genre_service};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    genre_service::seed_genres(&pool).await?;

    let addr = format!("0.0.0.0:{}", config.server_port);
    let state = Arc::new(AppState::new(config, pool)?);
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
