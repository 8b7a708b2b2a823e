//! SpinningMotion: backend for an online vinyl record shop.
//!
//! Catalogue, baskets, reviews, purchases and coupons over a PostgreSQL
//! store, with cookie-based JWT sessions, hosted checkout through the payment
//! provider, STOMP-over-WebSocket live updates and SMTP mail.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod realtime;
pub mod routes;
pub mod services;

use config::Config;
use db::DbPool;
use realtime::RealtimeHub;
use services::{mailer::Mailer, stripe_service::PaymentGateway};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub pool: DbPool,
    pub hub: RealtimeHub,
    pub mailer: Mailer,
    pub payments: PaymentGateway,
}

impl AppState {
    /// Build the outbound integrations from `config`.
    pub fn new(config: Config, pool: DbPool) -> anyhow::Result<Self> {
        let mailer = Mailer::from_config(&config)?;
        let payments = PaymentGateway::from_config(&config)?;
        Ok(Self {
            config,
            pool,
            hub: RealtimeHub::new(),
            mailer,
            payments,
        })
    }
}
