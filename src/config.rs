//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `JWT_SECRET` (required): HS256 signing secret for session tokens
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 8080
/// - `STRIPE_SECRET_KEY`, `STRIPE_PUBLISHABLE_KEY`, `STRIPE_WEBHOOK_SECRET`
///   (optional): payment provider credentials, empty when unset
/// - `SMTP_HOST` (optional): outbound mail relay; mail is only logged when unset
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    pub jwt_secret: String,

    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: u64,

    #[serde(default = "default_cookie_name")]
    pub jwt_cookie_name: String,

    /// `Secure` attribute on the session cookie. Turn off only for plain-HTTP local development.
    #[serde(default = "default_true")]
    pub cookie_secure: bool,

    /// Browser origin allowed by CORS and by the WebSocket handshake.
    #[serde(default = "default_frontend_origin")]
    pub frontend_origin: String,

    #[serde(default)]
    pub stripe_secret_key: String,

    #[serde(default)]
    pub stripe_publishable_key: String,

    #[serde(default)]
    pub stripe_webhook_secret: String,

    #[serde(default = "default_stripe_api_base")]
    pub stripe_api_base: String,

    #[serde(default)]
    pub smtp_host: Option<String>,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub smtp_username: String,

    #[serde(default)]
    pub smtp_password: String,

    #[serde(default = "default_mail_from")]
    pub mail_from: String,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    8080
}

/// Tokens live for 24 hours unless configured otherwise.
fn default_jwt_expiration() -> u64 {
    86_400
}

fn default_cookie_name() -> String {
    "spinning_token".to_string()
}

fn default_true() -> bool {
    true
}

fn default_frontend_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_stripe_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_mail_from() -> String {
    "no-reply@spinningmotion.local".to_string()
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),

    #[error("JWT_SECRET must not be empty")]
    EmptyJwtSecret,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL, JWT_SECRET)
    /// - Environment variable values cannot be parsed into expected types
    /// - `JWT_SECRET` is blank
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would start a server with forgeable tokens.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::EmptyJwtSecret);
        }
        Ok(())
    }

    /// Whether a real payment provider key is configured.
    pub fn stripe_enabled(&self) -> bool {
        !self.stripe_secret_key.trim().is_empty()
    }

    /// Configuration for tests: no payment provider, no SMTP relay.
    pub fn test_default() -> Self {
        Self {
            database_url: "postgres://localhost/spinning_motion_test".to_string(),
            server_port: default_port(),
            jwt_secret: "test_signing_key_32_bytes_long!!".to_string(),
            jwt_expiration_secs: default_jwt_expiration(),
            jwt_cookie_name: default_cookie_name(),
            cookie_secure: false,
            frontend_origin: default_frontend_origin(),
            stripe_secret_key: String::new(),
            stripe_publishable_key: "pk_test_123".to_string(),
            stripe_webhook_secret: "whsec_test_secret".to_string(),
            stripe_api_base: default_stripe_api_base(),
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            mail_from: default_mail_from(),
        }
    }
}
