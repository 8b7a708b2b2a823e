//! Payment provider integration.
//!
//! This module handles:
//! - Creating embedded checkout sessions (form-encoded POST to the provider API)
//! - Checking whether a session has been paid
//! - Verifying webhook signatures (HMAC-SHA256 with a timestamp tolerance)
//!
//! Without a secret key an offline mock gateway stands in, so the storefront
//! can be developed and tested without provider credentials.

use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{
    config::Config,
    error::AppError,
    models::checkout::{CheckoutSessionResponse, StripeCheckoutSession},
};

type HmacSha256 = Hmac<Sha256>;

/// Webhook timestamps older (or newer) than this are rejected.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub const MOCK_SESSION_ID: &str = "mock_session_123";
pub const MOCK_CLIENT_SECRET: &str = "mock_client_secret_456";

/// Provider limit on each metadata value.
pub const MAX_METADATA_VALUE_CHARS: usize = 500;

const CURRENCY: &str = "eur";

/// One priced line of a checkout session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionLineItem {
    pub name: String,
    pub description: Option<String>,
    /// Charged unit amount in cents.
    pub unit_amount_cents: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct SessionParams {
    pub line_items: Vec<SessionLineItem>,
    pub return_url: String,
    pub metadata: Vec<(String, String)>,
}

impl SessionParams {
    /// Provider form fields, using its bracketed nesting convention.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("ui_mode".to_string(), "embedded".to_string()),
            ("return_url".to_string(), self.return_url.clone()),
        ];

        for (i, item) in self.line_items.iter().enumerate() {
            let prefix = format!("line_items[{i}]");
            form.push((format!("{prefix}[price_data][currency]"), CURRENCY.to_string()));
            form.push((
                format!("{prefix}[price_data][product_data][name]"),
                item.name.clone(),
            ));
            if let Some(description) = item.description.as_ref().filter(|d| !d.is_empty()) {
                form.push((
                    format!("{prefix}[price_data][product_data][description]"),
                    description.clone(),
                ));
            }
            form.push((
                format!("{prefix}[price_data][unit_amount]"),
                item.unit_amount_cents.to_string(),
            ));
            form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
        }

        for (key, value) in &self.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }

        form
    }
}

/// Client for the real provider API.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(secret_key: String, api_base: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            secret_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    async fn create_session(&self, params: &SessionParams) -> Result<StripeCheckoutSession, AppError> {
        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&params.to_form())
            .send()
            .await
            .map_err(|e| AppError::PaymentProvider(format!("Request failed: {e}")))?;

        parse_session_response(response).await
    }

    /// `{api_base}/v1/checkout/sessions/{session_id}` with the id as one escaped segment.
    fn session_url(&self, session_id: &str) -> Result<url::Url, AppError> {
        let mut url = url::Url::parse(&self.api_base)
            .map_err(|e| anyhow::anyhow!("Invalid STRIPE_API_BASE: {e}"))?;
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("STRIPE_API_BASE cannot carry a path"))?
            .pop_if_empty()
            .extend(["v1", "checkout", "sessions", session_id]);
        Ok(url)
    }

    /// `None` when the provider does not know the session (any 4xx).
    async fn retrieve_session(
        &self,
        session_id: &str,
    ) -> Result<Option<StripeCheckoutSession>, AppError> {
        let response = self
            .http
            .get(self.session_url(session_id)?)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AppError::PaymentProvider(format!("Request failed: {e}")))?;

        if response.status().is_client_error() {
            tracing::info!(session_id, status = %response.status(), "Session lookup rejected by provider");
            return Ok(None);
        }
        parse_session_response(response).await.map(Some)
    }
}

/// Provider checkout session ids look like `cs_test_a1B2...`.
pub fn is_session_id(id: &str) -> bool {
    id.strip_prefix("cs_")
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}

async fn parse_session_response(
    response: reqwest::Response,
) -> Result<StripeCheckoutSession, AppError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::PaymentProvider(format!(
            "Provider returned {status}: {body}"
        )));
    }

    response
        .json::<StripeCheckoutSession>()
        .await
        .map_err(|e| AppError::PaymentProvider(format!("Unexpected session payload: {e}")))
}

pub enum PaymentGateway {
    Stripe(StripeClient),
    /// Offline stand-in used when no secret key is configured.
    Mock,
}

impl PaymentGateway {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        if !config.stripe_enabled() {
            tracing::warn!("STRIPE_SECRET_KEY not set, using mock payment gateway");
            return Ok(PaymentGateway::Mock);
        }
        Ok(PaymentGateway::Stripe(StripeClient::new(
            config.stripe_secret_key.clone(),
            config.stripe_api_base.clone(),
        )?))
    }

    pub async fn create_checkout_session(
        &self,
        params: &SessionParams,
    ) -> Result<CheckoutSessionResponse, AppError> {
        match self {
            PaymentGateway::Stripe(client) => {
                let session = client.create_session(params).await?;
                let client_secret = session.client_secret.ok_or_else(|| {
                    AppError::PaymentProvider("Session has no client secret".to_string())
                })?;
                tracing::info!(session_id = %session.id, "Checkout session created");
                Ok(CheckoutSessionResponse {
                    session_id: session.id,
                    client_secret,
                })
            }
            PaymentGateway::Mock => Ok(CheckoutSessionResponse {
                session_id: MOCK_SESSION_ID.to_string(),
                client_secret: MOCK_CLIENT_SECRET.to_string(),
            }),
        }
    }

    /// Whether the session's status is `complete`.
    ///
    /// Ids the provider could never have issued, and sessions it rejects,
    /// count as not complete.
    pub async fn session_is_complete(&self, session_id: &str) -> Result<bool, AppError> {
        match self {
            PaymentGateway::Stripe(client) => {
                if !is_session_id(session_id) {
                    return Ok(false);
                }
                let session = client.retrieve_session(session_id).await?;
                Ok(session.is_some_and(|s| s.status.as_deref() == Some("complete")))
            }
            PaymentGateway::Mock => Ok(session_id == MOCK_SESSION_ID),
        }
    }
}

/// Signature header value for `payload` at `timestamp`: `t=<ts>,v1=<hex>`.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid webhook secret: {e}"))?;
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    Ok(format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Verify a `Stripe-Signature` header against the raw request body.
///
/// The header carries `t=<unix seconds>` and one or more `v1=<hex>` entries;
/// any matching `v1` is accepted. Comparison is constant-time.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), AppError> {
    if secret.is_empty() {
        tracing::error!("Webhook received but STRIPE_WEBHOOK_SECRET is not configured");
        return Err(AppError::InvalidWebhookSignature);
    }

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(AppError::InvalidWebhookSignature)?;
    if signatures.is_empty() || (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(AppError::InvalidWebhookSignature);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::InvalidWebhookSignature)?;
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);

    if signatures
        .iter()
        .any(|signature| mac.clone().verify_slice(signature).is_ok())
    {
        Ok(())
    } else {
        Err(AppError::InvalidWebhookSignature)
    }
}

/// Validate the browser origin that the payment page returns to.
///
/// # Rules
///
/// - Must be a valid `http` or `https` URL
/// - Maximum 2048 characters
pub fn validate_return_origin(origin: &str) -> Result<String, AppError> {
    if origin.len() > 2048 {
        return Err(AppError::InvalidRequest(
            "Origin exceeds 2048 characters".to_string(),
        ));
    }

    let parsed = url::Url::parse(origin)
        .map_err(|_| AppError::InvalidRequest("Invalid Origin header".to_string()))?;

    match parsed.scheme() {
        "http" | "https" => Ok(origin.trim_end_matches('/').to_string()),
        _ => Err(AppError::InvalidRequest(
            "Origin must use http or https".to_string(),
        )),
    }
}
